//! Exporter configuration.
//!
//! Every option can be given as a flag or through the environment:
//!
//! ```bash
//! DKRON_TARGET_HOSTNAME=http://dkron:8080 EXPORTER_PORT=9100 dkron-exporter
//! dkron-exporter --target http://dkron:8080 --port 9100 --log-level debug
//! ```

use std::time::Duration;

use clap::Parser;

use crate::error::{Error, Result};
use crate::logging::{DEFAULT_LOG_LEVEL, parse_level};
use crate::upstream::{RetryPolicy, jobs_url};

pub const DEFAULT_TARGET: &str = "http://dkron.svc.cluster.local:8080";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Upper bound for the backoff between fetch retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Exporter configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "dkron-exporter")]
#[command(about = "Expose Dkron job state as Prometheus metrics")]
#[command(version)]
pub struct ExporterConfig {
    /// Base URL of the Dkron API
    #[arg(long = "target", env = "DKRON_TARGET_HOSTNAME", default_value = DEFAULT_TARGET)]
    pub target: String,

    /// Port the metrics endpoint listens on
    #[arg(short, long, env = "EXPORTER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address the metrics endpoint binds to
    #[arg(long = "bind", env = "EXPORTER_BIND_ADDRESS", default_value = DEFAULT_BIND_ADDRESS)]
    pub bind_address: String,

    /// Log verbosity (TRACE, DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[arg(long, env = "EXPORTER_LOGLEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Timeout for a single request to Dkron, in seconds
    #[arg(long, env = "EXPORTER_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// Retries after a transient fetch failure before the exporter gives up
    #[arg(long, env = "EXPORTER_FETCH_RETRIES", default_value_t = 2)]
    pub fetch_retries: u32,

    /// Base delay between fetch retries, in milliseconds
    #[arg(long, env = "EXPORTER_FETCH_RETRY_DELAY_MS", default_value_t = 500)]
    pub fetch_retry_delay_ms: u64,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            port: DEFAULT_PORT,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            fetch_timeout_secs: 10,
            fetch_retries: 2,
            fetch_retry_delay_ms: 500,
        }
    }
}

impl ExporterConfig {
    /// Address the metrics endpoint binds to (host:port).
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Full URL of the Dkron job listing.
    pub fn jobs_url(&self) -> String {
        jobs_url(&self.target)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let base_delay = Duration::from_millis(self.fetch_retry_delay_ms);
        RetryPolicy {
            max_retries: self.fetch_retries,
            base_delay,
            max_delay: MAX_RETRY_DELAY.max(base_delay),
            jitter: true,
        }
    }

    /// Check values clap cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        parse_level(&self.log_level)?;

        let target = self.target.trim();
        if target.is_empty() {
            return Err(Error::config("Dkron target must not be empty"));
        }
        if !(target.starts_with("http://") || target.starts_with("https://")) {
            return Err(Error::config(format!(
                "Dkron target must be an http(s) URL: {target}"
            )));
        }
        if self.bind_address.trim().is_empty() {
            return Err(Error::config("Bind address must not be empty"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(Error::config("Fetch timeout must be > 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExporterConfig::default();
        assert_eq!(config.target, "http://dkron.svc.cluster.local:8080");
        assert_eq!(config.port, 8000);
        assert_eq!(config.log_level, "INFO");
        assert_eq!(config.listen_address(), "0.0.0.0:8000");
        assert_eq!(
            config.jobs_url(),
            "http://dkron.svc.cluster.local:8080/v1/jobs"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_flags() {
        let config = ExporterConfig::try_parse_from([
            "dkron-exporter",
            "--target",
            "http://dkron:8080/",
            "--port",
            "9100",
            "--log-level",
            "debug",
            "--fetch-retries",
            "0",
        ])
        .unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.jobs_url(), "http://dkron:8080/v1/jobs");
        assert_eq!(config.retry_policy().max_retries, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let config = ExporterConfig {
            log_level: "VERBOSE".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_invalid_target_rejected() {
        for target in ["", "dkron:8080", "ftp://dkron"] {
            let config = ExporterConfig {
                target: target.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{target}");
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ExporterConfig {
            fetch_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_policy_caps_delay() {
        let config = ExporterConfig {
            fetch_retries: 4,
            fetch_retry_delay_ms: 250,
            ..Default::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 4);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_secs(5));
    }
}
