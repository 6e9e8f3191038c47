//! HTTP control plane for the channel monitor.
//!
//! Exposes start/stop, verification-code hand-in and channel management
//! under `/telegram`, plus `/livez` and `/readyz` probes.

pub mod health;
pub mod routes;
pub mod server;
