//! Metrics server setup.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::Request;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::routes;
use crate::error::{Error, Result};
use crate::metrics::PrometheusExporter;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server start time for uptime calculation
    pub start_time: Instant,
    /// Exporter backing the metrics endpoint
    pub exporter: Arc<PrometheusExporter>,
    /// Fatal collection errors are forwarded here for the process entry point
    pub fatal_tx: mpsc::Sender<Error>,
}

impl AppState {
    pub fn new(exporter: Arc<PrometheusExporter>, fatal_tx: mpsc::Sender<Error>) -> Self {
        Self {
            start_time: Instant::now(),
            exporter,
            fatal_tx,
        }
    }

    /// Hand a fatal error to whoever owns the process.
    ///
    /// Only the first report matters; later ones are dropped once the
    /// receiver is full or gone.
    pub fn report_fatal(&self, error: Error) {
        if let Err(e) = self.fatal_tx.try_send(error) {
            tracing::debug!(error = %e, "Fatal error already reported");
        }
    }
}

/// Build the router with all middleware and routes.
pub fn build_router(state: AppState) -> Router {
    routes::create_router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request| {
                if req.uri().path().starts_with("/health") {
                    Span::none()
                } else {
                    let mut make_span =
                        tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::DEBUG);
                    use tower_http::trace::MakeSpan;
                    make_span.make_span(req)
                }
            })
            .on_response(
                |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                    if span.is_disabled() {
                        return;
                    }
                    let on_response =
                        tower_http::trace::DefaultOnResponse::new().level(tracing::Level::DEBUG);
                    use tower_http::trace::OnResponse;
                    on_response.on_response(res, latency, span);
                },
            ),
    )
}

/// Metrics HTTP server.
pub struct MetricsServer {
    state: AppState,
    cancel_token: CancellationToken,
}

impl MetricsServer {
    pub fn new(state: AppState, cancel_token: CancellationToken) -> Self {
        Self {
            state,
            cancel_token,
        }
    }

    /// Serve on an already bound listener until the token is cancelled.
    pub async fn run(self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        let router = build_router(self.state);

        tracing::info!("Serving metrics on http://{}/metrics", addr);

        let cancel_token = self.cancel_token;
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("Metrics server shutting down...");
            })
            .await
            .map_err(|e| Error::Other(format!("Server error: {}", e)))?;

        Ok(())
    }
}
