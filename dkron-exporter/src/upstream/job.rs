//! Job records as returned by the Dkron `/v1/jobs` endpoint.

use serde::{Deserialize, Serialize};

/// Placeholder used for string fields the scheduler left empty or null.
pub const SENTINEL: &str = "None";

/// A single job as reported by Dkron.
///
/// Only the fields the exporter reads are modelled; everything else in the
/// upstream payload is ignored. `name` is the only required field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_success: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub error_count: Option<u64>,
    #[serde(default)]
    pub success_count: Option<u64>,
}

impl JobRecord {
    /// Create a record with only a name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Raw status string, or [`SENTINEL`] when absent.
    pub fn status_or_sentinel(&self) -> &str {
        or_sentinel(&self.status)
    }

    /// Raw last-success timestamp, or [`SENTINEL`] when absent.
    pub fn last_success_or_sentinel(&self) -> &str {
        or_sentinel(&self.last_success)
    }

    /// Raw next-run timestamp, or [`SENTINEL`] when absent.
    pub fn next_or_sentinel(&self) -> &str {
        or_sentinel(&self.next)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.unwrap_or(0)
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.unwrap_or(0)
    }
}

fn or_sentinel(value: &Option<String>) -> &str {
    value
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(SENTINEL)
}
