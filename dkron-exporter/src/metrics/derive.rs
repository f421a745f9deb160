//! Job record to metric family derivation.
//!
//! Each derivation walks the full job list once and produces one family.
//! Nothing here performs I/O or reads the clock: the collection instant is a
//! parameter, so the same records and instant always yield the same output.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use super::family::{JOB_LABEL, MetricFamily, MetricKind, SampleValue, StateValue};
use super::timestamp::{JobTimestamp, parse_job_timestamp};
use crate::upstream::JobRecord;

/// Metric family names.
pub mod names {
    pub const INFO: &str = "dkron_info";
    pub const JOB_STATUS: &str = "dkron_job_status";
    pub const SCHEDULE_STATUS: &str = "dkron_job_schedule_status";
    pub const LAST_SUCCESS_TS: &str = "dkron_job_last_success_ts";
    pub const NEXT_EXEC_TS: &str = "dkron_job_next_exec_ts";
    pub const ERROR_COUNTS: &str = "dkron_job_error_counts";
    pub const SUCCESS_COUNT: &str = "dkron_job_success_count";
}

/// State key used by both state-set families.
pub const SUCCESS_STATE: &str = "success";

/// How far in the past a job's next run may be before its schedule counts
/// as stalled.
pub const MAX_SCHEDULE_LAG_SECS: i64 = 60;

/// Schedule health of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleHealth {
    Healthy,
    Unhealthy,
}

impl ScheduleHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ScheduleHealth::Healthy)
    }
}

/// Classify a job by how far its next run lies behind `now`.
///
/// A next run more than [`MAX_SCHEDULE_LAG_SECS`] in the past means the
/// scheduler did not fire it.
pub fn schedule_health(next: &JobTimestamp, now: DateTime<Utc>) -> ScheduleHealth {
    let drift = next.instant() - now;
    if drift < -TimeDelta::seconds(MAX_SCHEDULE_LAG_SECS) {
        ScheduleHealth::Unhealthy
    } else {
        ScheduleHealth::Healthy
    }
}

/// Derive all seven families from one job list.
pub fn derive_all(jobs: &[JobRecord], now: DateTime<Utc>) -> Vec<MetricFamily> {
    vec![
        error_count_metrics(jobs),
        success_count_metrics(jobs),
        last_success_metrics(jobs),
        next_exec_metrics(jobs),
        status_metrics(jobs),
        info_metrics(jobs),
        schedule_status_metrics(jobs, now),
    ]
}

pub fn info_metrics(jobs: &[JobRecord]) -> MetricFamily {
    let mut family = MetricFamily::new(
        names::INFO,
        "Dkron existings jobs information",
        MetricKind::Info,
        &[JOB_LABEL],
    );

    for job in jobs {
        let attributes = [("owner", &job.owner), ("owner_email", &job.owner_email)]
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
            .collect();
        family.add_metric(&[&job.name], SampleValue::Info(attributes));
    }
    family
}

/// Status as reported by the scheduler.
///
/// The raw status string is kept as the state value; a missing status
/// becomes the sentinel rather than a missing sample.
pub fn status_metrics(jobs: &[JobRecord]) -> MetricFamily {
    let mut family = MetricFamily::new(
        names::JOB_STATUS,
        "Dkron job status",
        MetricKind::StateSet,
        &[JOB_LABEL],
    );

    for job in jobs {
        let status = job.status_or_sentinel().to_string();
        family.add_metric(
            &[&job.name],
            SampleValue::States(vec![(SUCCESS_STATE.to_string(), StateValue::Raw(status))]),
        );
    }
    family
}

pub fn schedule_status_metrics(jobs: &[JobRecord], now: DateTime<Utc>) -> MetricFamily {
    let mut family = MetricFamily::new(
        names::SCHEDULE_STATUS,
        "Dkron job schedule status",
        MetricKind::StateSet,
        &[JOB_LABEL],
    );

    for job in jobs {
        let Some(next) = resolve_timestamp(job, "next", job.next_or_sentinel(), family.name())
        else {
            continue;
        };
        let health = schedule_health(&next, now);
        if !health.is_healthy() {
            debug!(jobname = %job.name, next = %next.instant(), "Job is behind schedule");
        }
        family.add_metric(
            &[&job.name],
            SampleValue::States(vec![(
                SUCCESS_STATE.to_string(),
                StateValue::Flag(health.is_healthy()),
            )]),
        );
    }
    family
}

pub fn last_success_metrics(jobs: &[JobRecord]) -> MetricFamily {
    timestamp_gauge(
        jobs,
        names::LAST_SUCCESS_TS,
        "Dkron job last successful execution timestamp in unixtime",
        "last_success",
        JobRecord::last_success_or_sentinel,
    )
}

pub fn next_exec_metrics(jobs: &[JobRecord]) -> MetricFamily {
    timestamp_gauge(
        jobs,
        names::NEXT_EXEC_TS,
        "Dkron job next execution timestamp in unixtime",
        "next",
        JobRecord::next_or_sentinel,
    )
}

pub fn error_count_metrics(jobs: &[JobRecord]) -> MetricFamily {
    let mut family = MetricFamily::new(
        names::ERROR_COUNTS,
        "Dkron job error counts",
        MetricKind::Counter,
        &[JOB_LABEL],
    );
    for job in jobs {
        family.add_metric(&[&job.name], SampleValue::Counter(job.error_count()));
    }
    family
}

pub fn success_count_metrics(jobs: &[JobRecord]) -> MetricFamily {
    let mut family = MetricFamily::new(
        names::SUCCESS_COUNT,
        "Dkron job success count",
        MetricKind::Counter,
        &[JOB_LABEL],
    );
    for job in jobs {
        family.add_metric(&[&job.name], SampleValue::Counter(job.success_count()));
    }
    family
}

fn timestamp_gauge(
    jobs: &[JobRecord],
    name: &str,
    help: &str,
    field: &'static str,
    raw: fn(&JobRecord) -> &str,
) -> MetricFamily {
    let mut family = MetricFamily::new(name, help, MetricKind::Gauge, &[JOB_LABEL]);
    for job in jobs {
        if let Some(ts) = resolve_timestamp(job, field, raw(job), name) {
            family.add_metric(&[&job.name], SampleValue::Gauge(ts.epoch_seconds()));
        }
    }
    family
}

/// Parse a timestamp field, logging the two non-instant outcomes.
///
/// Returns `None` only for malformed values; the caller skips the job for
/// that family.
fn resolve_timestamp(
    job: &JobRecord,
    field: &'static str,
    raw: &str,
    family: &str,
) -> Option<JobTimestamp> {
    match parse_job_timestamp(raw) {
        Ok(JobTimestamp::Absent) => {
            debug!(jobname = %job.name, field, family, "No timestamp reported, using the Unix epoch");
            Some(JobTimestamp::Absent)
        }
        Ok(ts) => Some(ts),
        Err(e) => {
            warn!(jobname = %job.name, field, family, error = %e, "Skipping job with malformed timestamp");
            None
        }
    }
}
