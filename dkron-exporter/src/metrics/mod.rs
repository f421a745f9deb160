//! Metrics derivation and exposition.
//!
//! # Features
//!
//! - Job record to metric family derivation (counts, timestamps, status,
//!   info and schedule health)
//! - Explicit collector registry, one per process
//! - Prometheus text exporter (/metrics)
//!
//! # Example
//!
//! ```ignore
//! use dkron_exporter::metrics::{Registry, PrometheusExporter};
//!
//! let mut registry = Registry::new();
//! registry.register(Arc::new(DkronCollector::new(client)))?;
//!
//! let exporter = PrometheusExporter::new(Arc::new(registry));
//! let body = exporter.export().await?;
//! ```

pub mod derive;
mod family;
mod prometheus;
mod registry;
mod timestamp;

pub use derive::{ScheduleHealth, derive_all, names, schedule_health};
pub use family::{JOB_LABEL, MetricFamily, MetricKind, Sample, SampleValue, StateValue};
pub use prometheus::{CONTENT_TYPE, PrometheusExporter, encode};
pub use registry::{Collector, Registry};
pub use timestamp::{JobTimestamp, parse_job_timestamp};
