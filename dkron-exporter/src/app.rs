//! Process wiring: client, collector, registry and server.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::api::{AppState, MetricsServer};
use crate::collector::DkronCollector;
use crate::config::ExporterConfig;
use crate::error::{Error, Result};
use crate::metrics::{PrometheusExporter, Registry};
use crate::upstream::DkronClient;

/// Bind the configured address and run until shutdown or a fatal error.
pub async fn run(config: ExporterConfig, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(config.listen_address()).await?;
    serve(config, listener, shutdown).await
}

/// Run the exporter on an already bound listener.
///
/// Returns `Ok(())` after a requested shutdown. A fatal collection error
/// stops the server and is returned to the caller.
pub async fn serve(
    config: ExporterConfig,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> Result<()> {
    let client = DkronClient::new(
        &config.target,
        config.fetch_timeout(),
        config.retry_policy(),
        shutdown.clone(),
    )?;
    info!(target_url = %client.jobs_url(), "Scraping Dkron jobs");

    let mut registry = Registry::new();
    registry.register(Arc::new(DkronCollector::new(client)))?;
    let exporter = Arc::new(PrometheusExporter::new(Arc::new(registry)));

    let (fatal_tx, mut fatal_rx) = mpsc::channel::<Error>(1);
    let server_token = shutdown.child_token();
    let server = MetricsServer::new(AppState::new(exporter, fatal_tx), server_token.clone());
    let mut server_task = tokio::spawn(server.run(listener));

    tokio::select! {
        Some(fatal) = fatal_rx.recv() => {
            error!(error = %fatal, "Fatal collection error, shutting down");
            server_token.cancel();
            Err(fatal)
        }
        result = &mut server_task => {
            result.map_err(|e| Error::Other(format!("Server task failed: {e}")))?
        }
    }
}
