//! dkron-exporter library crate.
//!
//! Fetches the job list from a Dkron scheduler on every scrape and exposes it
//! as Prometheus metrics.

pub mod api;
pub mod app;
pub mod collector;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod upstream;

pub use error::{Error, Result};
