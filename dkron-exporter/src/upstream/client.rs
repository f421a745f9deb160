use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::JobSource;
use super::job::JobRecord;
use super::retry::{Attempt, RetryPolicy, is_transient, with_retries};
use crate::error::{Error, Result};

/// Path of the job listing endpoint, relative to the Dkron base URL.
pub const JOBS_PATH: &str = "/v1/jobs";

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the job listing URL for a Dkron base URL.
pub fn jobs_url(base: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), JOBS_PATH)
}

/// HTTP client for the Dkron management API.
#[derive(Debug, Clone)]
pub struct DkronClient {
    client: reqwest::Client,
    jobs_url: String,
    retry: RetryPolicy,
    token: CancellationToken,
}

impl DkronClient {
    /// Create a client for the Dkron instance at `base_url`.
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        retry: RetryPolicy,
        token: CancellationToken,
    ) -> Result<Self> {
        install_rustls_provider();

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("dkron-exporter/", env!("CARGO_PKG_VERSION")));
        if request_timeout > Duration::ZERO {
            builder = builder.timeout(request_timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, base_url, retry, token))
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        retry: RetryPolicy,
        token: CancellationToken,
    ) -> Self {
        Self {
            client,
            jobs_url: jobs_url(base_url),
            retry,
            token,
        }
    }

    pub fn jobs_url(&self) -> &str {
        &self.jobs_url
    }

    async fn fetch_once(&self) -> Attempt<Vec<JobRecord>> {
        let response = match self
            .client
            .get(&self.jobs_url)
            .header(ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(source) => {
                let retryable = is_transient(&source);
                let err = Error::Upstream {
                    url: self.jobs_url.clone(),
                    source,
                };
                return if retryable {
                    Attempt::Transient(err)
                } else {
                    Attempt::Permanent(err)
                };
            }
        };

        let status = response.status();
        debug!("{} - {}", response.url(), status.as_u16());

        if !status.is_success() {
            let err = Error::UpstreamStatus {
                url: self.jobs_url.clone(),
                status: status.as_u16(),
            };
            return if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                Attempt::Transient(err)
            } else {
                Attempt::Permanent(err)
            };
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(source) => {
                return Attempt::Transient(Error::Upstream {
                    url: self.jobs_url.clone(),
                    source,
                });
            }
        };

        match serde_json::from_slice::<Vec<JobRecord>>(&body) {
            Ok(jobs) => Attempt::Done(jobs),
            Err(source) => Attempt::Permanent(Error::Decode {
                url: self.jobs_url.clone(),
                source,
            }),
        }
    }
}

#[async_trait]
impl JobSource for DkronClient {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>> {
        let jobs = with_retries(&self.retry, &self.token, || self.fetch_once()).await?;
        debug!(url = %self.jobs_url, jobs = jobs.len(), "Fetched job list");
        Ok(jobs)
    }
}
