//! ReviewRoot HTTP server.
//!
//! Exposes the router, configuration and observability setup so the binary
//! and the integration tests build the service the same way.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
