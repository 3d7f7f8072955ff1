use crate::error::Error;
use crate::name;
use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use trust_dns_proto::rr::Name;

pub type SharedConfig = Arc<Config>;

/// Lease and key-lease timers run on a millisecond clock; a key lease must
/// stay representable in u32 milliseconds (≈49.7 days).
const MAX_TIMER_DELAY_MS: u64 = u32::MAX as u64;

/// How the server address is advertised to clients.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AddressMode {
    #[default]
    Unicast,
    Anycast,
}

impl fmt::Display for AddressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressMode::Unicast => write!(f, "unicast"),
            AddressMode::Anycast => write!(f, "anycast"),
        }
    }
}

/// Bounds applied when granting leases requested by clients.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct LeaseConfig {
    /// Minimum lease in seconds.
    pub min_lease: u32,
    /// Maximum lease in seconds.
    pub max_lease: u32,
    /// Minimum key lease in seconds.
    pub min_key_lease: u32,
    /// Maximum key lease in seconds.
    pub max_key_lease: u32,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            min_lease: 60 * 30,                // 30 minutes
            max_lease: 3600 * 2,               // 2 hours
            min_key_lease: 3600 * 24,          // 1 day
            max_key_lease: 3600 * 24 * 14,     // 14 days
        }
    }
}

impl LeaseConfig {
    pub fn is_valid(&self) -> bool {
        u64::from(self.max_key_lease) * 1000 <= MAX_TIMER_DELAY_MS
            && self.min_lease <= self.max_lease
            && self.min_key_lease <= self.max_key_lease
            && self.min_lease <= self.min_key_lease
            && self.max_lease <= self.max_key_lease
    }

    /// The lease granted for a requested lease. A zero request is a removal
    /// and stays zero; anything else is clamped into `[min, max]`.
    pub fn grant_lease(&self, lease: u32) -> u32 {
        match lease {
            0 => 0,
            requested => requested.clamp(self.min_lease, self.max_lease),
        }
    }

    pub fn grant_key_lease(&self, key_lease: u32) -> u32 {
        match key_lease {
            0 => 0,
            requested => requested.clamp(self.min_key_lease, self.max_key_lease),
        }
    }
}

/// Registry resource bounds. Exceeding any of them fails the offending
/// update with SERVFAIL.
#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct Limits {
    pub max_hosts: usize,
    pub max_services_per_host: usize,
    pub max_addresses_per_host: usize,
    pub max_txt_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_hosts: 32,
            max_services_per_host: 16,
            max_addresses_per_host: 8,
            max_txt_len: 512,
        }
    }
}

/// mDNS self-advertisement settings. When absent the server is only
/// announced through logs.
#[derive(Deserialize, Debug, Clone)]
pub struct AdvertiseConfig {
    /// Interface address published in the mDNS service record.
    pub address: IpAddr,
    /// Hostname override; defaults to the system hostname.
    #[serde(default)]
    pub hostname: Option<String>,
}

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Registration domain served by this instance. A trailing dot is added
    /// when missing.
    #[serde(default = "default_domain")]
    pub domain: Name,
    #[serde(default)]
    pub address_mode: AddressMode,
    #[serde(default)]
    pub anycast_sequence_number: u8,
    #[serde(default)]
    pub lease: LeaseConfig,
    /// How long the update handler gets to accept or reject an update.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_handler_timeout", rename = "handler_timeout_ms")]
    pub handler_timeout: Duration,
    /// Address the UDP socket binds to (the port is chosen by the server).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: IpAddr,
    /// Where the last-used unicast port is remembered across restarts.
    /// Without a path, port memory is in-process only.
    #[serde(default)]
    pub port_store_path: Option<String>,
    /// Bind address for the read-only status API; absent disables it.
    #[serde(default)]
    pub api_bind_addr: Option<SocketAddr>,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_api_timeout")]
    pub api_timeout: Duration,
    #[serde(default)]
    pub advertise: Option<AdvertiseConfig>,
    #[serde(default)]
    pub limits: Limits,
}

fn default_domain() -> Name {
    name::default_domain().clone()
}

fn default_handler_timeout() -> Duration {
    Duration::from_millis(500)
}

fn default_bind_addr() -> IpAddr {
    IpAddr::V6(Ipv6Addr::UNSPECIFIED)
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            address_mode: AddressMode::default(),
            anycast_sequence_number: 0,
            lease: LeaseConfig::default(),
            handler_timeout: default_handler_timeout(),
            bind_addr: default_bind_addr(),
            port_store_path: None,
            api_bind_addr: None,
            api_timeout: default_api_timeout(),
            advertise: None,
            limits: Limits::default(),
        }
    }
}

impl Config {
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let mut conf: Config = serde_json::from_reader(reader)?;
        conf.validate()?;
        Ok(conf)
    }

    /// Normalizes and checks the configuration, returning
    /// [`Error::InvalidArgs`] on any malformed value.
    pub fn validate(&mut self) -> Result<(), Error> {
        if self.domain.is_root() || self.domain.num_labels() == 0 {
            return Err(Error::InvalidArgs("domain must not be empty".to_string()));
        }
        self.domain.set_fqdn(true);

        if !self.lease.is_valid() {
            return Err(Error::InvalidArgs(
                "lease bounds must satisfy min <= max, lease <= key lease, \
                 and the maximum key lease must fit the millisecond timer"
                    .to_string(),
            ));
        }

        if self.handler_timeout.is_zero() {
            return Err(Error::InvalidArgs("handler timeout must be non-zero".to_string()));
        }

        Ok(())
    }
}
