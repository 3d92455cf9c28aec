use anyhow::Context;
use gamezone::utils::config::Config;
use gamezone::SyncEngine;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::new().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.level.clone()));

    // Keep the appender guard alive for the life of the process.
    let _guard = match &config.log.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "gamezone.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .init();
            None
        }
    };

    info!("Starting Game Zone sync engine v{}", env!("CARGO_PKG_VERSION"));

    let engine = SyncEngine::new(config).context("Failed to initialize engine")?;

    match engine.restore_session().await {
        Ok(true) => {
            engine.start().await?;
            info!("Session restored; synchronizing");
        }
        Ok(false) => {
            info!("No stored session; engine idle until login");
        }
        Err(e) => {
            error!("Session restore failed: {}", e);
        }
    }

    signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Received shutdown signal");

    engine.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}
