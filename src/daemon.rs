//! The daemon event loop.
//!
//! The [`Server`] state machine runs on exactly one task. This loop owns it
//! together with the UDP socket, feeding in datagrams, timer expirations,
//! and commands (handler verdicts, publisher events, API queries) arriving
//! over a channel. After every event the socket is reconciled against the
//! server's desired listening state and queued responses are flushed.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};

use crate::api::model::HostSnapshot;
use crate::config::Config;
use crate::error::Error;
use crate::publisher::Publisher;
use crate::server::{PublisherEvent, Server, UpdateId};
use crate::store::SettingsStore;

/// Largest datagram we accept.
const MAX_DATAGRAM_SIZE: usize = 1500;

enum Command {
    Enable(bool),
    PublisherEvent(PublisherEvent),
    UpdateResult {
        id: UpdateId,
        result: Result<(), Error>,
    },
    Hosts(oneshot::Sender<Vec<HostSnapshot>>),
}

/// A cloneable handle for talking to the daemon from other tasks. This is
/// how update-handler verdicts are marshaled back onto the server's task.
#[derive(Clone)]
pub struct Handle {
    tx: mpsc::Sender<Command>,
}

impl Handle {
    pub async fn enable(&self, enabled: bool) -> anyhow::Result<()> {
        self.tx.send(Command::Enable(enabled)).await?;
        Ok(())
    }

    pub async fn publisher_event(&self, event: PublisherEvent) -> anyhow::Result<()> {
        self.tx.send(Command::PublisherEvent(event)).await?;
        Ok(())
    }

    /// Delivers the handler's verdict for `id`.
    pub async fn service_update_result(
        &self,
        id: UpdateId,
        result: Result<(), Error>,
    ) -> anyhow::Result<()> {
        self.tx.send(Command::UpdateResult { id, result }).await?;
        Ok(())
    }

    /// A snapshot of the registered hosts, for the status API.
    pub async fn hosts(&self) -> anyhow::Result<Vec<HostSnapshot>> {
        let (reply, response) = oneshot::channel();
        self.tx.send(Command::Hosts(reply)).await?;
        Ok(response.await?)
    }
}

pub struct Daemon {
    server: Server,
    bind_addr: IpAddr,
    rx: mpsc::Receiver<Command>,
    tx: mpsc::Sender<Command>,
}

impl Daemon {
    pub fn new(
        config: &Config,
        publisher: Box<dyn Publisher>,
        store: Box<dyn SettingsStore>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(64);
        Self {
            server: Server::new(config, publisher, store),
            bind_addr: config.bind_addr,
            rx,
            tx,
        }
    }

    pub fn handle(&self) -> Handle {
        Handle {
            tx: self.tx.clone(),
        }
    }

    /// The server under the loop, e.g. to install an update handler before
    /// running.
    pub fn server_mut(&mut self) -> &mut Server {
        &mut self.server
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let Daemon {
            mut server,
            bind_addr,
            mut rx,
            tx,
        } = self;
        drop(tx);

        let mut socket: Option<Arc<UdpSocket>> = None;

        loop {
            reconcile_socket(&mut server, &mut socket, bind_addr).await;
            flush_responses(&mut server, socket.as_deref());

            let wakeup = server.next_wakeup();
            let recv_socket = socket.clone();

            tokio::select! {
                command = rx.recv() => match command {
                    Some(command) => handle_command(&mut server, command),
                    // All handles dropped: the daemon is done.
                    None => break,
                },
                received = recv_datagram(recv_socket) => {
                    if let Some((message, peer)) = received {
                        server.handle_datagram(&message, peer, Instant::now());
                    }
                },
                _ = sleep_until_wakeup(wakeup) => {
                    server.handle_timers(Instant::now());
                },
            }
        }

        Ok(())
    }
}

fn handle_command(server: &mut Server, command: Command) {
    match command {
        Command::Enable(enabled) => server.enable(enabled),
        Command::PublisherEvent(event) => server.handle_publisher_event(event),
        Command::UpdateResult { id, result } => {
            server.handle_service_update_result(id, result, Instant::now());
        }
        Command::Hosts(reply) => {
            let snapshot = server.registry().hosts().map(HostSnapshot::from).collect();
            let _ = reply.send(snapshot);
        }
    }
}

async fn recv_datagram(socket: Option<Arc<UdpSocket>>) -> Option<(Vec<u8>, std::net::SocketAddr)> {
    match socket {
        Some(socket) => {
            let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
            match socket.recv_from(&mut buf).await {
                Ok((len, peer)) => {
                    buf.truncate(len);
                    Some((buf, peer))
                }
                Err(err) => {
                    tracing::warn!("failed to receive datagram: {err}");
                    None
                }
            }
        }
        None => std::future::pending().await,
    }
}

async fn sleep_until_wakeup(wakeup: Option<Instant>) {
    match wakeup {
        Some(instant) => tokio::time::sleep_until(tokio::time::Instant::from_std(instant)).await,
        None => std::future::pending().await,
    }
}

/// Binds or closes the UDP socket so it matches the server's desired
/// listening state. A bind failure degrades the server to Stopped.
async fn reconcile_socket(
    server: &mut Server,
    socket: &mut Option<Arc<UdpSocket>>,
    bind_addr: IpAddr,
) {
    let desired = server.listen_port();
    let current = socket
        .as_ref()
        .and_then(|socket| socket.local_addr().ok())
        .map(|addr| addr.port());
    if desired == current {
        return;
    }

    *socket = None;
    if let Some(port) = desired {
        match UdpSocket::bind((bind_addr, port)).await {
            Ok(bound) => {
                tracing::debug!("bound UDP socket on port {port}");
                *socket = Some(Arc::new(bound));
            }
            Err(err) => {
                tracing::error!("failed to bind UDP socket on port {port}: {err}");
                server.handle_socket_failure();
            }
        }
    }
}

/// Sends queued responses. A send failure is logged and the response
/// dropped; the client will retransmit its update.
fn flush_responses(server: &mut Server, socket: Option<&UdpSocket>) {
    for response in server.take_responses() {
        let Some(socket) = socket else {
            continue;
        };
        if let Err(err) = socket.try_send_to(&response.payload, response.peer) {
            tracing::warn!("failed to send response to {}: {err}", response.peer);
        }
    }
}
