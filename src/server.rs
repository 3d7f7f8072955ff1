//! The SRP server state machine.
//!
//! Everything here runs on one task: inbound datagrams, timer expirations
//! and handler replies are fed in serially, so the server holds no locks.
//! Timers are exposed as data ([`Server::next_wakeup`]) and outbound
//! responses are queued for the caller to drain ([`Server::take_responses`]),
//! which keeps the state machine independent of the socket it serves.
//!
//! Lifecycle: the server starts Disabled. Enabling it publishes the
//! DNS/SRP service entry (unicast or anycast) and moves to Stopped; the
//! publisher's "entry added" event then starts it listening. Disabling
//! unpublishes and tears everything down.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use trust_dns_proto::op::{Header, ResponseCode};
use trust_dns_proto::rr::Name;

use crate::config::{AddressMode, Config, LeaseConfig, Limits};
use crate::error::Error;
use crate::parser::{self, MessageMetadata, UpdateParser};
use crate::publisher::Publisher;
use crate::registry::{DisplayName, Host, Registry, ServiceAction};
use crate::store::SettingsStore;
use crate::wire;

/// First port tried in unicast address mode.
pub const UDP_PORT_MIN: u16 = 53535;
/// Last port tried in unicast address mode.
pub const UDP_PORT_MAX: u16 = 53554;
/// Fixed port used in anycast address mode.
pub const ANYCAST_PORT: u16 = 53;

/// Identifies one outstanding service update towards the handler.
pub type UpdateId = u32;

/// The downstream consumer (typically an mDNS advertiser) asked to accept
/// or reject each update before it is committed.
///
/// `host` is a snapshot valid only for the duration of the call; the
/// handler answers later by delivering the id to
/// [`Server::handle_service_update_result`] on the server's task. Removal
/// notifications are fire-and-forget: their ids are never awaited, and a
/// reply to one is ignored.
pub trait UpdateHandler: Send {
    fn on_update(&mut self, id: UpdateId, host: &Host, timeout: Duration);
}

/// Server lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Disabled,
    Stopped,
    Running,
}

/// Events from the publisher about our DNS/SRP service entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherEvent {
    EntryAdded,
    EntryRemoved,
}

/// An outbound datagram queued for the socket.
#[derive(Debug, Clone)]
pub struct Response {
    pub peer: SocketAddr,
    pub payload: Vec<u8>,
}

/// A parsed update awaiting the handler's verdict.
struct OutstandingUpdate {
    id: UpdateId,
    expire_time: Instant,
    host: Host,
    metadata: MessageMetadata,
}

pub struct Server {
    state: State,
    domain: Name,
    lease_config: LeaseConfig,
    limits: Limits,
    address_mode: AddressMode,
    anycast_sequence_number: u8,
    handler_timeout: Duration,
    port: u16,
    registry: Registry,
    outstanding: VecDeque<OutstandingUpdate>,
    next_update_id: UpdateId,
    lease_timer: Option<Instant>,
    updates_timer: Option<Instant>,
    handler: Option<Box<dyn UpdateHandler>>,
    publisher: Box<dyn Publisher>,
    store: Box<dyn SettingsStore>,
    responses: Vec<Response>,
    has_registered_any_service: bool,
    /// Port of a co-resident DNS-SD server, when one is running.
    dnssd_port: Option<u16>,
    /// Whether we receive through the DNS-SD server's socket instead of our
    /// own.
    socket_shared: bool,
}

impl Server {
    pub fn new(
        config: &Config,
        publisher: Box<dyn Publisher>,
        store: Box<dyn SettingsStore>,
    ) -> Self {
        Self {
            state: State::Disabled,
            domain: config.domain.clone(),
            lease_config: config.lease,
            limits: config.limits,
            address_mode: config.address_mode,
            anycast_sequence_number: config.anycast_sequence_number,
            handler_timeout: config.handler_timeout,
            port: UDP_PORT_MIN,
            registry: Registry::new(),
            outstanding: VecDeque::new(),
            next_update_id: rand::random(),
            lease_timer: None,
            updates_timer: None,
            handler: None,
            publisher,
            store,
            responses: Vec::new(),
            has_registered_any_service: false,
            dnssd_port: None,
            socket_shared: false,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn domain(&self) -> &Name {
        &self.domain
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn lease_config(&self) -> &LeaseConfig {
        &self.lease_config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn set_service_handler(&mut self, handler: Box<dyn UpdateHandler>) {
        self.handler = Some(handler);
    }

    // ── Configuration (only while Disabled) ─────────────────────────────

    pub fn set_address_mode(&mut self, mode: AddressMode) -> Result<(), Error> {
        if self.state != State::Disabled {
            return Err(Error::InvalidState);
        }
        if self.address_mode != mode {
            tracing::info!("address mode: {} -> {}", self.address_mode, mode);
            self.address_mode = mode;
        }
        Ok(())
    }

    pub fn set_anycast_sequence_number(&mut self, sequence_number: u8) -> Result<(), Error> {
        if self.state != State::Disabled {
            return Err(Error::InvalidState);
        }
        self.anycast_sequence_number = sequence_number;
        tracing::info!("anycast address mode sequence number set to {sequence_number}");
        Ok(())
    }

    pub fn set_domain(&mut self, domain: Name) -> Result<(), Error> {
        if self.state != State::Disabled {
            return Err(Error::InvalidState);
        }
        if domain.is_root() || domain.num_labels() == 0 {
            return Err(Error::InvalidArgs("domain must not be empty".to_string()));
        }
        let mut domain = domain;
        domain.set_fqdn(true);
        self.domain = domain;
        Ok(())
    }

    pub fn set_lease_config(&mut self, lease_config: LeaseConfig) -> Result<(), Error> {
        if self.state != State::Disabled {
            return Err(Error::InvalidState);
        }
        if !lease_config.is_valid() {
            return Err(Error::InvalidArgs("lease bounds are inconsistent".to_string()));
        }
        self.lease_config = lease_config;
        Ok(())
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Enables or disables the server. Enabling publishes our service entry
    /// and waits for the publisher's [`PublisherEvent::EntryAdded`] before
    /// listening.
    pub fn enable(&mut self, enabled: bool) {
        if enabled {
            if self.state != State::Disabled {
                return;
            }
            self.state = State::Stopped;

            match self.address_mode {
                AddressMode::Unicast => {
                    self.select_port();
                    if let Err(err) = self.publisher.publish_unicast(self.port) {
                        tracing::warn!("failed to publish DNS/SRP unicast entry: {err}");
                    }
                }
                AddressMode::Anycast => {
                    self.port = ANYCAST_PORT;
                    if let Err(err) = self.publisher.publish_anycast(self.anycast_sequence_number) {
                        tracing::warn!("failed to publish DNS/SRP anycast entry: {err}");
                    }
                }
            }
        } else {
            if self.state == State::Disabled {
                return;
            }
            if let Err(err) = self.publisher.unpublish() {
                tracing::warn!("failed to unpublish DNS/SRP entry: {err}");
            }
            self.stop();
            self.state = State::Disabled;
        }
    }

    /// Unicast port selection: continue one past the previously persisted
    /// port, wrapping back into the range.
    fn select_port(&mut self) {
        self.port = UDP_PORT_MIN;
        if let Some(previous) = self.store.load_port() {
            let next = previous.wrapping_add(1);
            self.port = if (UDP_PORT_MIN..=UDP_PORT_MAX).contains(&next) {
                next
            } else {
                UDP_PORT_MIN
            };
        }
        tracing::info!("selected port {}", self.port);
    }

    pub fn handle_publisher_event(&mut self, event: PublisherEvent) {
        match event {
            PublisherEvent::EntryAdded => self.start(),
            PublisherEvent::EntryRemoved => self.stop(),
        }
    }

    fn start(&mut self) {
        if self.state != State::Stopped {
            return;
        }
        self.state = State::Running;
        self.prepare_socket();
        tracing::info!("start listening on port {}", self.port);
    }

    fn stop(&mut self) {
        if self.state != State::Running {
            return;
        }
        self.state = State::Stopped;

        let names: Vec<Name> = self
            .registry
            .hosts()
            .filter_map(|host| host.full_name().cloned())
            .collect();
        for name in names {
            self.remove_host_fully(&name, true);
        }

        // Outstanding updates are discarded without a response; the clients
        // will retransmit.
        self.outstanding.clear();
        self.lease_timer = None;
        self.updates_timer = None;
        self.has_registered_any_service = false;

        tracing::info!("stop listening on port {}", self.port);
    }

    /// The port the caller should bind a socket on, when we own one.
    pub fn listen_port(&self) -> Option<u16> {
        (self.state == State::Running && !self.socket_shared).then_some(self.port)
    }

    fn prepare_socket(&mut self) {
        // A co-resident DNS-SD server bound to our port shares its socket
        // with us; otherwise we listen on our own.
        self.socket_shared = self.dnssd_port == Some(self.port);
    }

    /// Called when the co-resident DNS-SD server starts or stops; we
    /// re-evaluate whether to share its socket.
    pub fn handle_dnssd_server_state_change(&mut self, dnssd_port: Option<u16>) {
        self.dnssd_port = dnssd_port;
        if self.state == State::Running {
            self.prepare_socket();
        }
    }

    /// Called when the socket could not be prepared; the server degrades to
    /// Stopped until the publisher re-adds the entry.
    pub fn handle_socket_failure(&mut self) {
        tracing::error!("failed to prepare socket");
        self.stop();
    }

    // ── Wire intake ─────────────────────────────────────────────────────

    /// Handles a datagram received on our own socket.
    pub fn handle_datagram(&mut self, message: &[u8], peer: SocketAddr, now: Instant) {
        if self.state != State::Running {
            return;
        }
        if let Err(error) = self.process_message(message, now, self.lease_config, Some(peer)) {
            tracing::debug!("failed to handle DNS message: {error}");
        }
    }

    /// Handles a datagram received on the co-resident DNS-SD server's
    /// socket. Returns [`Error::Drop`] when we are not sharing it (the
    /// message is someone else's).
    pub fn handle_dnssd_datagram(
        &mut self,
        message: &[u8],
        peer: SocketAddr,
        now: Instant,
    ) -> Result<(), Error> {
        if self.state != State::Running || !self.socket_shared {
            return Err(Error::Drop);
        }
        self.process_message(message, now, self.lease_config, Some(peer))
    }

    /// Processes one message. `peer` is absent for replicated updates,
    /// which receive no response.
    pub fn process_message(
        &mut self,
        message: &[u8],
        rx_time: Instant,
        lease_config: LeaseConfig,
        peer: Option<SocketAddr>,
    ) -> Result<(), Error> {
        let header = parser::read_update_header(message)?;
        let mut metadata = MessageMetadata {
            header,
            zone_class: 0,
            offset: wire::HEADER_LEN,
            rx_time,
            lease_config,
            peer,
        };
        self.process_dns_update(message, &mut metadata);
        Ok(())
    }

    fn process_dns_update(&mut self, message: &[u8], metadata: &mut MessageMetadata) {
        match metadata.peer {
            Some(peer) => tracing::info!("received DNS update from {peer}"),
            None => tracing::info!("received DNS update from a replication partner"),
        }

        let parsed = {
            let parser = UpdateParser::new(message, &self.domain, &self.limits, &self.registry);
            match parser.process_zone_section(metadata) {
                Err(error) => Err(error),
                // A retransmission of an update we are still deciding on is
                // silently dropped; the handler will answer the original.
                Ok(()) if self.find_outstanding_update(metadata).is_some() => Ok(None),
                Ok(()) => parser.process_update(metadata).map(Some),
            }
        };

        match parsed {
            Ok(Some(host)) => self.handle_update(host, metadata),
            Ok(None) => {
                tracing::info!(
                    "drop duplicated SRP update request: message id = {}",
                    metadata.header.id()
                );
            }
            Err(error) => {
                tracing::info!("failed to process DNS update: {error}");
                if let Some(peer) = metadata.peer {
                    self.send_response(&metadata.header, error.response_code(), peer);
                }
            }
        }
    }

    fn find_outstanding_update(&self, metadata: &MessageMetadata) -> Option<&OutstandingUpdate> {
        if !metadata.is_direct_rx_from_client() {
            return None;
        }
        self.outstanding.iter().find(|update| {
            update.metadata.header.id() == metadata.header.id()
                && update.metadata.peer == metadata.peer
        })
    }

    // ── Coordinator and commit ──────────────────────────────────────────

    fn allocate_id(&mut self) -> UpdateId {
        let id = self.next_update_id;
        self.next_update_id = self.next_update_id.wrapping_add(1);
        id
    }

    /// A successfully parsed update: defer it to the handler when one is
    /// installed, otherwise commit immediately.
    fn handle_update(&mut self, mut host: Host, metadata: &MessageMetadata) {
        let prepared = self.prepare_removal(&mut host, metadata);

        if prepared.is_err() || self.handler.is_none() {
            self.commit_update(prepared, host, metadata, metadata.rx_time);
            return;
        }

        let id = self.allocate_id();
        let expire_time = metadata.rx_time + self.handler_timeout;
        let timeout = self.handler_timeout;

        tracing::info!("SRP update handler is notified (update id = {id})");
        if let Some(handler) = self.handler.as_mut() {
            handler.on_update(id, &host, timeout);
        }

        self.outstanding.push_back(OutstandingUpdate {
            id,
            expire_time,
            host,
            metadata: metadata.clone(),
        });
        if self.updates_timer.map_or(true, |current| expire_time < current) {
            self.updates_timer = Some(expire_time);
        }
    }

    /// When the update removes the host, the client may not have listed all
    /// services it registered earlier; the missing ones are copied onto the
    /// candidate as deleted so the handler sees the complete removal set.
    fn prepare_removal(&mut self, host: &mut Host, metadata: &MessageMetadata) -> Result<(), Error> {
        if host.lease() != 0 {
            return Ok(());
        }

        host.clear_resources();

        let full_name = match host.full_name() {
            Some(name) => name.clone(),
            None => return Ok(()),
        };
        let existing = match self.registry.find_host(&full_name) {
            Some(existing) => existing,
            None => return Ok(()),
        };

        let missing: Vec<(Name, Name, bool)> = existing
            .services()
            .filter(|service| !service.is_deleted())
            .filter(|service| {
                host.find_service(service.service_name(), service.instance_name())
                    .is_none()
            })
            .map(|service| {
                (
                    service.service_name().clone(),
                    service.instance_name().clone(),
                    service.is_sub_type(),
                )
            })
            .collect();

        for (service_name, instance_name, is_sub_type) in missing {
            let index = host.add_service(
                service_name,
                instance_name.clone(),
                is_sub_type,
                metadata.rx_time,
                &self.limits,
            )?;
            host.mark_service_deleted(index);
            if let Some(description) = host.find_description_mut(&instance_name) {
                description.update_time = Some(metadata.rx_time);
            }
        }

        Ok(())
    }

    /// Delivers the handler's verdict for an outstanding update. Unknown or
    /// late ids are ignored.
    pub fn handle_service_update_result(
        &mut self,
        id: UpdateId,
        result: Result<(), Error>,
        now: Instant,
    ) {
        let index = match self.outstanding.iter().position(|update| update.id == id) {
            Some(index) => index,
            None => {
                tracing::info!(
                    "delayed SRP host update result; the update has been committed (update id = {id})"
                );
                return;
            }
        };

        match &result {
            Ok(()) => tracing::info!("handler result of SRP update (id = {id}) received: ok"),
            Err(error) => {
                tracing::info!("handler result of SRP update (id = {id}) received: {error}")
            }
        }

        if let Some(update) = self.outstanding.remove(index) {
            self.commit_update(result, update.host, &update.metadata, now);
        }
        self.updates_timer = self.outstanding.front().map(|update| update.expire_time);
    }

    fn handle_outstanding_updates_timer(&mut self, now: Instant) {
        while self
            .outstanding
            .front()
            .map_or(false, |update| update.expire_time <= now)
        {
            if let Some(update) = self.outstanding.pop_front() {
                tracing::info!(
                    "outstanding service update timeout (update id = {})",
                    update.id
                );
                self.commit_update(Err(Error::ResponseTimeout), update.host, &update.metadata, now);
            }
        }
        self.updates_timer = self.outstanding.front().map(|update| update.expire_time);
    }

    /// Commits (or rejects) a decided update and responds to the client.
    /// The response carries the granted lease pair only when it differs
    /// from what the client asked for.
    fn commit_update(
        &mut self,
        result: Result<(), Error>,
        host: Host,
        metadata: &MessageMetadata,
        now: Instant,
    ) {
        let requested_lease = host.lease();
        let requested_key_lease = host.key_lease();
        let granted_lease = metadata.lease_config.grant_lease(requested_lease);
        let granted_key_lease = metadata.lease_config.grant_key_lease(requested_key_lease);

        let committed = match result {
            Ok(()) => self.apply_update(host, granted_lease, granted_key_lease, now),
            Err(error) => Err(error),
        };

        if let Some(peer) = metadata.peer {
            match &committed {
                Ok(())
                    if granted_lease != requested_lease
                        || granted_key_lease != requested_key_lease =>
                {
                    self.send_lease_response(
                        &metadata.header,
                        granted_lease,
                        granted_key_lease,
                        peer,
                    );
                }
                Ok(()) => self.send_response(&metadata.header, ResponseCode::NoError, peer),
                Err(error) => self.send_response(&metadata.header, error.response_code(), peer),
            }
        }
    }

    fn apply_update(
        &mut self,
        mut host: Host,
        granted_lease: u32,
        granted_key_lease: u32,
        now: Instant,
    ) -> Result<(), Error> {
        host.set_leases(granted_lease, granted_key_lease);
        for description in host.descriptions_mut() {
            description.lease = granted_lease;
            description.key_lease = granted_key_lease;
        }

        let full_name = match host.full_name() {
            Some(name) => name.clone(),
            None => return Err(Error::Failed),
        };

        if granted_lease == 0 {
            if granted_key_lease == 0 {
                tracing::info!("remove key of host '{full_name}'");
                // The handler already saw this removal; no re-notification.
                if self.registry.take_host(&full_name).is_some() {
                    tracing::info!("fully remove host '{full_name}'");
                }
            } else if self.registry.find_host(&full_name).is_some() {
                self.remove_host_retain_name(&full_name, granted_key_lease);
            }
        } else if self.registry.find_host(&full_name).is_some() {
            let limits = self.limits;
            if let Some(existing) = self.registry.find_host_mut(&full_name) {
                existing.merge_from(host, now, &limits)?;
            }
        } else {
            tracing::info!("add new host '{full_name}'");
            host.commit_services();
            self.registry.add_host(host, &self.limits)?;

            if !self.has_registered_any_service && self.address_mode == AddressMode::Unicast {
                self.has_registered_any_service = true;
                if let Err(err) = self.store.save_port(self.port) {
                    tracing::warn!("failed to persist port {}: {err}", self.port);
                }
            }
        }

        self.handle_lease_timer(now);
        Ok(())
    }

    /// Marks the named host deleted but keeps its name (and its services'
    /// names) reserved for the given key lease.
    fn remove_host_retain_name(&mut self, full_name: &Name, key_lease: u32) {
        let Some(host) = self.registry.find_host_mut(full_name) else {
            return;
        };
        host.set_leases(0, key_lease);
        host.clear_resources();
        tracing::info!("remove host '{full_name}' (but retain its name)");
        for index in 0..host.services.len() {
            host.remove_service(index, true);
        }
    }

    /// Removes the named host and everything under it, optionally letting
    /// the handler know (fire-and-forget).
    fn remove_host_fully(&mut self, full_name: &Name, notify: bool) {
        let Some(mut host) = self.registry.take_host(full_name) else {
            return;
        };
        host.set_leases(0, 0);
        host.clear_resources();
        tracing::info!("fully remove host '{full_name}'");
        if notify {
            self.notify_handler_of_removal(&host);
        }
    }

    /// Removal notifications do not wait for a reply: removing is expected
    /// to fail only when the downstream itself has failed, in which case
    /// the entry is gone anyway.
    fn notify_handler_of_removal(&mut self, host: &Host) {
        if self.handler.is_none() {
            return;
        }
        let id = self.allocate_id();
        let timeout = self.handler_timeout;
        tracing::info!("SRP update handler is notified (update id = {id})");
        if let Some(handler) = self.handler.as_mut() {
            handler.on_update(id, host, timeout);
        }
    }

    // ── Lease scheduler ─────────────────────────────────────────────────

    /// Scans all hosts, applying lease and key-lease expirations, and
    /// re-arms the lease timer at the earliest remaining expiry.
    fn handle_lease_timer(&mut self, now: Instant) {
        let mut earliest: Option<Instant> = None;
        let mut track = |time: Instant, earliest: &mut Option<Instant>| {
            if earliest.map_or(true, |current| time < current) {
                *earliest = Some(time);
            }
        };

        // Split borrows: the scan walks the registry while notifying the
        // handler about expired entries.
        let registry = &mut self.registry;
        let handler = &mut self.handler;
        let next_update_id = &mut self.next_update_id;
        let handler_timeout = self.handler_timeout;

        let mut notify = |host: &Host| {
            if let Some(handler) = handler.as_mut() {
                let id = *next_update_id;
                *next_update_id = next_update_id.wrapping_add(1);
                tracing::info!("SRP update handler is notified (update id = {id})");
                handler.on_update(id, host, handler_timeout);
            }
        };

        let hosts = registry.hosts_mut();
        let mut index = 0;
        while index < hosts.len() {
            let host = &mut hosts[index];

            if host.key_expire_time() <= now {
                tracing::info!("KEY LEASE of host {} expired", DisplayName(&host.full_name));
                let mut removed = hosts.remove(index);
                removed.set_leases(0, 0);
                removed.clear_resources();
                tracing::info!("fully remove host {}", DisplayName(&removed.full_name));
                notify(&removed);
                continue;
            }

            if host.is_deleted() {
                // Only the names remain; drop each service whose reserved
                // name has lapsed.
                track(host.key_expire_time(), &mut earliest);

                let mut service_index = 0;
                while service_index < host.services.len() {
                    let key_expire = host.service_key_expire_time(&host.services[service_index]);
                    if key_expire <= now {
                        host.services[service_index].log(ServiceAction::KeyLeaseExpired);
                        host.remove_service(service_index, false);
                        notify(host);
                    } else {
                        track(key_expire, &mut earliest);
                        service_index += 1;
                    }
                }
            } else if host.expire_time() <= now {
                tracing::info!("LEASE of host {} expired", DisplayName(&host.full_name));

                for service_index in 0..host.services.len() {
                    host.remove_service(service_index, true);
                }
                host.set_leases(0, host.key_lease());
                host.clear_resources();
                tracing::info!(
                    "remove host {} (but retain its name)",
                    DisplayName(&host.full_name)
                );
                notify(host);

                track(host.key_expire_time(), &mut earliest);
            } else {
                track(host.expire_time(), &mut earliest);

                let mut service_index = 0;
                while service_index < host.services.len() {
                    let key_expire = host.service_key_expire_time(&host.services[service_index]);
                    let expire = host.service_expire_time(&host.services[service_index]);

                    if key_expire <= now {
                        host.services[service_index].log(ServiceAction::KeyLeaseExpired);
                        host.remove_service(service_index, false);
                        notify(host);
                    } else if host.services[service_index].is_deleted {
                        track(key_expire, &mut earliest);
                        service_index += 1;
                    } else if expire <= now {
                        host.services[service_index].log(ServiceAction::LeaseExpired);
                        host.remove_service(service_index, true);
                        notify(host);
                        track(key_expire, &mut earliest);
                        service_index += 1;
                    } else {
                        track(expire, &mut earliest);
                        service_index += 1;
                    }
                }
            }

            index += 1;
        }

        match earliest {
            Some(time) => {
                if self.lease_timer.map_or(true, |current| time <= current) {
                    tracing::debug!(
                        "lease timer scheduled in {:?}",
                        time.saturating_duration_since(now)
                    );
                    self.lease_timer = Some(time);
                }
            }
            None => {
                tracing::debug!("lease timer stopped");
                self.lease_timer = None;
            }
        }
    }

    // ── Timers ──────────────────────────────────────────────────────────

    /// The earliest instant at which [`Server::handle_timers`] needs to run.
    pub fn next_wakeup(&self) -> Option<Instant> {
        match (self.lease_timer, self.updates_timer) {
            (Some(lease), Some(updates)) => Some(lease.min(updates)),
            (lease, updates) => lease.or(updates),
        }
    }

    /// Fires any due timers.
    pub fn handle_timers(&mut self, now: Instant) {
        if self.lease_timer.map_or(false, |time| time <= now) {
            self.lease_timer = None;
            self.handle_lease_timer(now);
        }
        if self.updates_timer.map_or(false, |time| time <= now) {
            self.updates_timer = None;
            self.handle_outstanding_updates_timer(now);
        }
    }

    // ── Responses ───────────────────────────────────────────────────────

    fn send_response(&mut self, request: &Header, response_code: ResponseCode, peer: SocketAddr) {
        match wire::encode_response(request, response_code) {
            Ok(payload) => {
                if response_code == ResponseCode::NoError {
                    tracing::info!("send success response");
                } else {
                    tracing::info!("send fail response: {response_code}");
                }
                self.responses.push(Response { peer, payload });
            }
            Err(error) => tracing::warn!("failed to encode response: {error}"),
        }
    }

    fn send_lease_response(
        &mut self,
        request: &Header,
        lease: u32,
        key_lease: u32,
        peer: SocketAddr,
    ) {
        match wire::encode_lease_response(request, lease, key_lease) {
            Ok(payload) => {
                tracing::info!(
                    "send response with granted lease: {lease} and key lease: {key_lease}"
                );
                self.responses.push(Response { peer, payload });
            }
            Err(error) => tracing::warn!("failed to encode response: {error}"),
        }
    }

    /// Drains the queued outbound responses.
    pub fn take_responses(&mut self) -> Vec<Response> {
        std::mem::take(&mut self.responses)
    }
}
