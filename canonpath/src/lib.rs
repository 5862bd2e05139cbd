//! Canonical request paths for HTTP routers.
//!
//! [`path::clean_path`] turns whatever a client sent into the one form a
//! routing table is keyed on. The rest of the crate wires it into a batch
//! CLI and a small HTTP front that redirects to the canonical location.

pub mod config;
pub mod metrics;
pub mod path;
pub mod report;
pub mod server;
pub mod telemetry;
