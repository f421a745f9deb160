use clap::Parser;
use tokio_util::sync::CancellationToken;

use dkron_exporter::{app, config::ExporterConfig, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = ExporterConfig::parse();
    config.validate()?;
    logging::init_logging(&config.log_level)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        dkron = %config.target,
        listen = %config.listen_address(),
        "dkron-exporter starting"
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, shutting down");
            signal_token.cancel();
        }
    });

    app::run(config, shutdown).await?;
    Ok(())
}
