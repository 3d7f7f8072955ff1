//! srpd
//!
//! A [Service Registration Protocol][SRP] server. Constrained clients
//! register hosts, IPv6 addresses and [DNS-SD][RFC-6763] services by
//! sending [DNS UPDATE][RFC-2136] messages signed with [SIG(0)][RFC-2931];
//! the server maintains a leased registry of the registrations and asks a
//! pluggable downstream handler (typically an mDNS advertiser) to accept
//! each update before committing it.
//!
//! Registrations are leased: clients refresh before expiry, and names stay
//! reserved for the (longer) key lease so a quiet client does not lose its
//! name to a competitor. All name ownership is proven with an ECDSA P-256
//! key carried in the update itself.
//!
//! [SRP]: https://datatracker.ietf.org/doc/draft-ietf-dnssd-srp/
//! [RFC-2136]: https://www.rfc-editor.org/rfc/rfc2136
//! [RFC-2931]: https://www.rfc-editor.org/rfc/rfc2931
//! [RFC-6763]: https://www.rfc-editor.org/rfc/rfc6763
//!
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod api;
#[doc(hidden)]
pub mod banner;
pub mod config;
pub mod crypto;
pub mod daemon;
pub mod error;
pub mod name;
mod parser;
pub mod publisher;
pub mod registry;
pub mod server;
pub mod store;
pub mod wire;

pub use config::{Config, SharedConfig};
pub use daemon::{Daemon, Handle};
pub use error::Error;
pub use registry::{Host, Registry, Service, ServiceDescription};
pub use server::{PublisherEvent, Server, State, UpdateHandler, UpdateId};
