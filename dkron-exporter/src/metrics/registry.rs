//! Collector registry.
//!
//! One registry is built at startup and shared by handle with the HTTP layer.
//! Every scrape calls [`Registry::gather`], which runs each registered
//! collector once.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::family::MetricFamily;
use crate::error::{Error, Result};

/// A source of metric families, invoked once per scrape.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Name used for logging and duplicate detection.
    fn name(&self) -> &str;

    /// Produce this cycle's metric families.
    async fn collect(&self) -> Result<Vec<MetricFamily>>;
}

/// Registry of collectors.
#[derive(Default)]
pub struct Registry {
    collectors: Vec<Arc<dyn Collector>>,
    /// Held for the duration of a gather so collection cycles never overlap.
    cycle: Mutex<()>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collector. Names must be unique.
    pub fn register(&mut self, collector: Arc<dyn Collector>) -> Result<()> {
        if self.collectors.iter().any(|c| c.name() == collector.name()) {
            return Err(Error::config(format!(
                "collector {} is already registered",
                collector.name()
            )));
        }
        self.collectors.push(collector);
        Ok(())
    }

    /// Run every collector once and return all families.
    ///
    /// The first collector error aborts the cycle; no partial result is
    /// returned.
    pub async fn gather(&self) -> Result<Vec<MetricFamily>> {
        let _cycle = self.cycle.lock().await;

        let mut families = Vec::new();
        for collector in &self.collectors {
            let collected = collector.collect().await?;
            debug!(
                collector = collector.name(),
                families = collected.len(),
                "Collected metric families"
            );
            families.extend(collected);
        }
        Ok(families)
    }
}
