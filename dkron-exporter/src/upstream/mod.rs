//! Dkron management API access.
//!
//! The exporter only needs one thing from the scheduler: the current job list.
//! [`JobSource`] is that contract; [`DkronClient`] fulfils it over HTTP.

mod client;
mod job;
mod retry;

use async_trait::async_trait;

use crate::error::Result;

pub use client::{DkronClient, JOBS_PATH, install_rustls_provider, jobs_url};
pub use job::{JobRecord, SENTINEL};
pub use retry::{Attempt, RetryPolicy, is_transient, with_retries};

/// Something that can produce the scheduler's current job list.
///
/// Implementations return either the full list or an error; there is no
/// partial result.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>>;
}
