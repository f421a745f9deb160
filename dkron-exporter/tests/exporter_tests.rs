//! Integration tests for the derivation engine and the scrape endpoint.
//!
//! Job lists come from in-memory sources, so these tests need no Dkron.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tower::ServiceExt;

use dkron_exporter::api::{AppState, build_router};
use dkron_exporter::collector::DkronCollector;
use dkron_exporter::metrics::{
    JOB_LABEL, PrometheusExporter, Registry, SampleValue, StateValue, derive_all, encode, names,
};
use dkron_exporter::upstream::{JobRecord, JobSource};
use dkron_exporter::{Error, Result};

struct StaticSource(Vec<JobRecord>);

#[async_trait]
impl JobSource for StaticSource {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>> {
        Ok(self.0.clone())
    }
}

struct DownSource;

#[async_trait]
impl JobSource for DownSource {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>> {
        Err(Error::UpstreamStatus {
            url: "http://dkron:8080/v1/jobs".to_string(),
            status: 502,
        })
    }
}

fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

fn sample_jobs() -> Vec<JobRecord> {
    serde_json::from_str(
        r#"[
            {
                "name": "backup",
                "owner": "ops",
                "owner_email": "ops@example.com",
                "status": "success",
                "last_success": "2024-01-01T00:00:00Z",
                "next": "2024-01-01T00:00:00Z",
                "error_count": 2,
                "success_count": 40
            },
            {
                "name": "sync",
                "status": null,
                "last_success": null,
                "next": "2024-01-01T00:05:00Z",
                "error_count": null,
                "success_count": 5
            }
        ]"#,
    )
    .unwrap()
}

fn router_for<S: JobSource + 'static>(source: S) -> (axum::Router, mpsc::Receiver<Error>) {
    let mut registry = Registry::new();
    registry
        .register(Arc::new(DkronCollector::new(source)))
        .unwrap();
    let exporter = Arc::new(PrometheusExporter::new(Arc::new(registry)));
    let (tx, rx) = mpsc::channel(1);
    (build_router(AppState::new(exporter, tx)), rx)
}

async fn get(router: axum::Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

mod derivation_tests {
    use super::*;

    #[tokio::test]
    async fn test_overdue_job_is_unhealthy() {
        let collector = DkronCollector::new(StaticSource(vec![JobRecord {
            next: Some("2024-01-01T00:00:00Z".to_string()),
            ..JobRecord::new("backup")
        }]));

        let families = collector.collect_at(at("2024-01-01T00:02:00Z")).await.unwrap();
        let output = encode(&families);
        assert!(output.contains(
            "dkron_job_schedule_status{jobname=\"backup\",dkron_job_schedule_status=\"success\"} 0\n"
        ));
    }

    #[tokio::test]
    async fn test_upcoming_job_is_healthy() {
        let collector = DkronCollector::new(StaticSource(vec![JobRecord {
            next: Some("2024-01-01T00:00:30Z".to_string()),
            ..JobRecord::new("backup")
        }]));

        let families = collector.collect_at(at("2024-01-01T00:00:00Z")).await.unwrap();
        let output = encode(&families);
        assert!(output.contains(
            "dkron_job_schedule_status{jobname=\"backup\",dkron_job_schedule_status=\"success\"} 1\n"
        ));
    }

    #[test]
    fn test_null_error_count_is_zero() {
        let jobs: Vec<JobRecord> =
            serde_json::from_str(r#"[{"name": "sync", "error_count": null, "success_count": 5}]"#)
                .unwrap();
        let output = encode(&derive_all(&jobs, at("2024-01-01T00:00:00Z")));

        assert!(output.contains("dkron_job_error_counts_total{jobname=\"sync\"} 0\n"));
        assert!(output.contains("dkron_job_success_count_total{jobname=\"sync\"} 5\n"));
    }

    #[test]
    fn test_null_status_emits_sentinel() {
        let jobs: Vec<JobRecord> =
            serde_json::from_str(r#"[{"name": "sync", "status": null}]"#).unwrap();
        let families = derive_all(&jobs, at("2024-01-01T00:00:00Z"));

        let status = families
            .iter()
            .find(|f| f.name() == names::JOB_STATUS)
            .unwrap();
        let sample = status.sample_for("sync").expect("status sample present");
        assert_eq!(
            sample.value.state("success"),
            Some(&StateValue::Raw("None".to_string()))
        );

        let output = encode(&families);
        assert!(output.contains("dkron_job_status{jobname=\"sync\",dkron_job_status=\"success\"} 1\n"));
    }

    #[test]
    fn test_job_names_consistent_across_families() {
        let jobs = sample_jobs();
        let families = derive_all(&jobs, at("2024-01-01T00:02:00Z"));

        assert_eq!(families.len(), 7);
        for family in &families {
            assert_eq!(family.label_names(), &[JOB_LABEL.to_string()]);
            assert_eq!(family.job_names(), vec!["backup", "sync"], "{}", family.name());
        }
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let jobs = sample_jobs();
        let now = at("2024-01-01T00:02:00Z");

        let first = encode(&derive_all(&jobs, now));
        let second = encode(&derive_all(&jobs, now));
        assert_eq!(first, second);
        assert_eq!(derive_all(&jobs, now), derive_all(&jobs, now));
    }

    #[test]
    fn test_sample_jobs_values() {
        let families = derive_all(&sample_jobs(), at("2024-01-01T00:02:00Z"));
        let by_name = |name: &str| families.iter().find(|f| f.name() == name).unwrap();

        assert_eq!(
            by_name(names::LAST_SUCCESS_TS).sample_for("backup").unwrap().value,
            SampleValue::Gauge(1_704_067_200.0)
        );
        assert_eq!(
            by_name(names::LAST_SUCCESS_TS).sample_for("sync").unwrap().value,
            SampleValue::Gauge(0.0)
        );
        assert_eq!(
            by_name(names::NEXT_EXEC_TS).sample_for("sync").unwrap().value,
            SampleValue::Gauge(1_704_067_500.0)
        );
        assert_eq!(
            by_name(names::SCHEDULE_STATUS)
                .sample_for("sync")
                .unwrap()
                .value
                .state("success"),
            Some(&StateValue::Flag(true))
        );
        assert_eq!(
            by_name(names::ERROR_COUNTS).sample_for("backup").unwrap().value,
            SampleValue::Counter(2)
        );
    }
}

mod endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_endpoint_serves_all_families() {
        let (router, _rx) = router_for(StaticSource(sample_jobs()));
        let (status, content_type, body) = get(router, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/plain"));
        for name in [
            "dkron_job_error_counts_total",
            "dkron_job_success_count_total",
            "dkron_job_last_success_ts",
            "dkron_job_next_exec_ts",
            "dkron_job_status",
            "dkron_info_info",
            "dkron_job_schedule_status",
        ] {
            assert!(body.contains(&format!("# TYPE {name} ")), "missing {name}");
        }
        assert!(body.contains(
            "dkron_info_info{jobname=\"backup\",owner=\"ops\",owner_email=\"ops@example.com\"} 1\n"
        ));
        assert!(body.contains("dkron_info_info{jobname=\"sync\"} 1\n"));
    }

    #[tokio::test]
    async fn test_root_path_serves_metrics() {
        let (router, _rx) = router_for(StaticSource(vec![JobRecord::new("backup")]));
        let (status, _, body) = get(router, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("dkron_job_error_counts_total{jobname=\"backup\"} 0\n"));
    }

    #[tokio::test]
    async fn test_fetch_failure_reports_fatal_and_serves_nothing() {
        let (router, mut rx) = router_for(DownSource);
        let (status, _, body) = get(router, "/metrics").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.contains("dkron_job"));

        let fatal = rx.try_recv().expect("fatal error forwarded");
        assert!(fatal.is_fatal());
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (router, _rx) = router_for(DownSource);
        let (status, _, body) = get(router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "alive");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}
