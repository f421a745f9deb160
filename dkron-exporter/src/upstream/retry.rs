// Bounded retries for job list fetches.
//
// A scrape must answer within the scraper's own timeout, so the budget is
// small: a couple of retries with doubling delay, capped, plus some jitter.

use std::future::Future;
use std::time::Duration;

use rand::RngExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{Error, Result};

/// How often and how patiently a failed fetch is repeated.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further one.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Add up to a quarter of the delay at random.
    pub jitter: bool,
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Delay before retry number `retry` (0 for the first retry).
    fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        if !self.jitter || delay.is_zero() {
            return delay;
        }

        let spread = u64::try_from((delay / 4).as_nanos()).unwrap_or(u64::MAX);
        let extra = Duration::from_nanos(rand::rng().random_range(0..=spread));
        (delay + extra).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }
}

/// Outcome of one fetch attempt.
pub enum Attempt<T> {
    Done(T),
    /// Worth another try (transport failure, 5xx, 429).
    Transient(Error),
    /// Retrying cannot help (other 4xx, undecodable body).
    Permanent(Error),
}

/// Run `attempt` until it is done, fails permanently or the policy runs out.
///
/// When retries are exhausted the last transient error is returned as is.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let mut retries = 0;
    loop {
        let err = match token.run_until_cancelled(attempt()).await {
            None => return Err(Error::Cancelled),
            Some(Attempt::Done(value)) => return Ok(value),
            Some(Attempt::Permanent(err)) => return Err(err),
            Some(Attempt::Transient(err)) => err,
        };
        if retries >= policy.max_retries {
            return Err(err);
        }

        let delay = policy.backoff(retries);
        retries += 1;
        warn!(
            retry = retries,
            of = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Job list fetch failed, retrying"
        );
        if token.run_until_cancelled(tokio::time::sleep(delay)).await.is_none() {
            return Err(Error::Cancelled);
        }
    }
}

/// Transport failures that may succeed on a second try.
pub fn is_transient(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout() || e.is_request() || e.is_body()
}
