//! HTTP surface of the exporter.
//!
//! - `GET /metrics` (and `GET /`): Prometheus text exposition
//! - `GET /health`: liveness

pub mod routes;
pub mod server;

pub use server::{AppState, MetricsServer, build_router};
