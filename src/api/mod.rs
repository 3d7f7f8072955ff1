//! Read-only status API.
//!
//! A small HTTP surface for operators, disabled unless
//! [`Config::api_bind_addr`][crate::config::Config::api_bind_addr] is set:
//!
//! - `GET /healthcheck` returns `{"ok":"healthy"}`.
//! - `GET /hosts` returns the registered hosts with their addresses, lease
//!   state and services.
//!
//! ```bash
//! ❯ curl http://localhost:3000/hosts
//! [{"full_name":"printer.default.service.arpa.","addresses":["fd00::1"], ...}]
//! ```
//!
//! The API never touches the registry directly: queries travel over the
//! daemon's channel to the server task, which answers with a snapshot.

mod api_error;
pub mod model;
mod routes;
pub mod server;

pub use server::new;
