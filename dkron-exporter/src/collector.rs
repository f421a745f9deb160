//! Dkron collector.
//!
//! Bridges a [`JobSource`] into the metrics registry: one fetch per cycle,
//! then every family is derived from that single job list.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::error::Result;
use crate::metrics::{Collector, MetricFamily, derive_all};
use crate::upstream::JobSource;

pub struct DkronCollector<S> {
    source: S,
}

impl<S: JobSource> DkronCollector<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Run one collection cycle as of `now`.
    pub async fn collect_at(&self, now: DateTime<Utc>) -> Result<Vec<MetricFamily>> {
        let jobs = match self.source.fetch_jobs().await {
            Ok(jobs) => jobs,
            Err(e) => {
                error!(error = %e, "Failed to fetch Dkron job list");
                return Err(e);
            }
        };
        debug!(jobs = jobs.len(), "Deriving metrics from job list");
        Ok(derive_all(&jobs, now))
    }
}

#[async_trait]
impl<S: JobSource> Collector for DkronCollector<S> {
    fn name(&self) -> &str {
        "dkron"
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>> {
        self.collect_at(Utc::now()).await
    }
}
