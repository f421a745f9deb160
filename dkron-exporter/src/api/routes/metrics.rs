//! Prometheus scrape route.

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::api::server::AppState;
use crate::metrics::CONTENT_TYPE;

/// Create the metrics router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(scrape))
        .route("/metrics", get(scrape))
}

/// Run one collection cycle and return it in text format.
///
/// A fatal collection error yields 503 with no metrics at all and is
/// forwarded to the process entry point, which shuts the exporter down.
async fn scrape(State(state): State<AppState>) -> Response {
    match state.exporter.export().await {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) if e.is_fatal() => {
            let message = format!("metrics collection failed: {e}\n");
            state.report_fatal(e);
            (StatusCode::SERVICE_UNAVAILABLE, message).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Metrics collection failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("metrics collection failed: {e}\n"),
            )
                .into_response()
        }
    }
}
