//! Parsing of the ISO-8601-ish timestamps Dkron reports.
//!
//! Accepted layouts, tried in order:
//!
//! - RFC 3339 (`2024-01-01T00:00:00.5+02:00`, `...Z`)
//! - ISO-8601 with a numeric offset, `T` or space separated (`+0100`, ` +01:00`)
//! - offset-less date-time, read as UTC, optionally followed by a `UTC`, `GMT`
//!   or `Z` zone name (`2024-01-01 00:00:00 UTC`)
//! - a bare date, read as midnight UTC
//!
//! Anything else (named non-UTC zones, month names, relative dates) is
//! malformed. Callers log and skip those rather than failing the scrape.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::{Error, Result};
use crate::upstream::SENTINEL;

/// Explicit-offset layouts tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

/// Offset-less layouts, read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Zone names equivalent to UTC that may trail an offset-less timestamp.
const UTC_ZONE_NAMES: &[&str] = &["UTC", "GMT", "Z"];

/// A job timestamp after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTimestamp {
    /// The scheduler reported nothing. Exported as the Unix epoch.
    Absent,
    At(DateTime<Utc>),
}

impl JobTimestamp {
    /// The instant this timestamp stands for.
    pub fn instant(&self) -> DateTime<Utc> {
        match self {
            JobTimestamp::Absent => DateTime::UNIX_EPOCH,
            JobTimestamp::At(at) => *at,
        }
    }

    /// Seconds since the Unix epoch, fractional.
    pub fn epoch_seconds(&self) -> f64 {
        let at = self.instant();
        at.timestamp() as f64 + f64::from(at.timestamp_subsec_nanos()) / 1_000_000_000.0
    }
}

/// Parse a raw timestamp field.
///
/// The sentinel and the empty string resolve to [`JobTimestamp::Absent`];
/// anything else that is not a recognizable date-time is an
/// [`Error::MalformedTimestamp`].
pub fn parse_job_timestamp(raw: &str) -> Result<JobTimestamp> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == SENTINEL {
        return Ok(JobTimestamp::Absent);
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(JobTimestamp::At(at.with_timezone(&Utc)));
    }

    for format in OFFSET_FORMATS {
        if let Ok(at) = DateTime::parse_from_str(trimmed, format) {
            return Ok(JobTimestamp::At(at.with_timezone(&Utc)));
        }
    }

    let naive = UTC_ZONE_NAMES
        .iter()
        .find_map(|zone| trimmed.strip_suffix(zone))
        .map(str::trim_end)
        .unwrap_or(trimmed);

    parse_naive_utc(naive)
        .map(JobTimestamp::At)
        .ok_or_else(|| Error::MalformedTimestamp(raw.to_string()))
}

fn parse_naive_utc(raw: &str) -> Option<DateTime<Utc>> {
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .map(|naive| naive.and_utc())
}
