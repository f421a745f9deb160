//! Logging setup.
//!
//! The exporter takes a single verbosity level (long-form names are
//! accepted, e.g. `WARNING` or `CRITICAL`) and turns it into an `EnvFilter`
//! directive. `RUST_LOG` still wins when set.

use chrono::Local;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{Error, Result};

/// Default verbosity level.
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Custom timer that uses the local timezone via chrono.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Parse a verbosity level name, case-insensitively.
pub fn parse_level(level: &str) -> Result<Level> {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "NOTSET" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" | "CRITICAL" | "FATAL" => Ok(Level::ERROR),
        _ => Err(Error::config(format!(
            "Invalid log level specified: {level}"
        ))),
    }
}

/// Filter directive for a verbosity level.
pub fn filter_directive(level: &str) -> Result<String> {
    let level = parse_level(level)?.to_string().to_lowercase();
    Ok(format!("dkron_exporter={level},tower_http={level},reqwest=warn"))
}

/// Initialize the global subscriber.
pub fn init_logging(level: &str) -> Result<()> {
    let directive = filter_directive(level)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(true).with_timer(LocalTimer))
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to set global default subscriber: {}", e)))
}
