//! Publishing the server's existence.
//!
//! The server asks its publisher to announce the DNS/SRP service entry when
//! enabled and to withdraw it when disabled; the daemon feeds the resulting
//! [`PublisherEvent`]s back into the server, which starts or stops
//! listening accordingly.
//!
//! Two implementations: [`MdnsPublisher`] advertises the server itself over
//! mDNS as `_srp._udp.local.`, and [`StaticPublisher`] only logs (for
//! deployments where clients are configured with the server address out of
//! band, and for tests).

use anyhow::{Context, Result};
use mdns_sd::{ServiceDaemon, ServiceInfo};
use std::collections::HashMap;

use crate::config::AdvertiseConfig;

pub use crate::server::PublisherEvent;

/// Announces (and withdraws) the DNS/SRP service entry.
pub trait Publisher: Send {
    fn publish_unicast(&mut self, port: u16) -> Result<()>;
    fn publish_anycast(&mut self, sequence_number: u8) -> Result<()>;
    fn unpublish(&mut self) -> Result<()>;
}

/// A publisher that only logs. The service entry is considered added as
/// soon as it is published.
#[derive(Default)]
pub struct StaticPublisher;

impl StaticPublisher {
    pub fn new() -> Self {
        Self
    }
}

impl Publisher for StaticPublisher {
    fn publish_unicast(&mut self, port: u16) -> Result<()> {
        tracing::info!("publishing DNS/SRP unicast service on port {port}");
        Ok(())
    }

    fn publish_anycast(&mut self, sequence_number: u8) -> Result<()> {
        tracing::info!("publishing DNS/SRP anycast service (seq {sequence_number})");
        Ok(())
    }

    fn unpublish(&mut self) -> Result<()> {
        tracing::info!("unpublishing DNS/SRP service");
        Ok(())
    }
}

const SRP_SERVICE_TYPE: &str = "_srp._udp.local.";

/// Advertises the SRP server itself via mDNS.
pub struct MdnsPublisher {
    daemon: ServiceDaemon,
    config: AdvertiseConfig,
    registered: Option<ServiceInfo>,
}

impl MdnsPublisher {
    pub fn new(config: AdvertiseConfig) -> Result<Self> {
        let daemon = ServiceDaemon::new().context("failed to create mDNS daemon")?;
        Ok(Self {
            daemon,
            config,
            registered: None,
        })
    }

    fn hostname(&self) -> Result<String> {
        match &self.config.hostname {
            Some(hostname) => Ok(hostname.clone()),
            None => Ok(hostname::get()
                .context("failed to get system hostname")?
                .to_string_lossy()
                .to_string()),
        }
    }

    fn register(&mut self, port: u16, txt_records: HashMap<String, String>) -> Result<()> {
        let hostname = self.hostname()?;
        let instance_name = format!("srpd-{hostname}");
        let host_fullname = format!("{hostname}.local.");

        let service_info = ServiceInfo::new(
            SRP_SERVICE_TYPE,
            &instance_name,
            &host_fullname,
            self.config.address,
            port,
            txt_records,
        )
        .context("failed to create service info")?;

        self.daemon
            .register(service_info.clone())
            .context("failed to register mDNS service")?;

        tracing::info!(
            "registered {SRP_SERVICE_TYPE} as {instance_name} on port {port}"
        );
        self.registered = Some(service_info);
        Ok(())
    }
}

impl Publisher for MdnsPublisher {
    fn publish_unicast(&mut self, port: u16) -> Result<()> {
        self.register(port, HashMap::new())
    }

    fn publish_anycast(&mut self, sequence_number: u8) -> Result<()> {
        let txt_records = HashMap::from([("seq".to_string(), sequence_number.to_string())]);
        self.register(crate::server::ANYCAST_PORT, txt_records)
    }

    fn unpublish(&mut self) -> Result<()> {
        if let Some(service_info) = self.registered.take() {
            self.daemon
                .unregister(service_info.get_fullname())
                .context("failed to unregister mDNS service")?;
            tracing::info!("unregistered {}", service_info.get_fullname());
        }
        Ok(())
    }
}
