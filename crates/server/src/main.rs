use anyhow::Result;
use patron_core::config::{AppConfig, LoadOptions};
use patron_server::{bootstrap, http};

fn init_logging(config: &AppConfig) {
    use patron_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.log_format() {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging must be live before bootstrap emits its first event.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    tracing::info!(
        event_name = "system.server.started",
        backend = app.repository.backend().as_str(),
        port = app.config.server.port,
        "patron-server started"
    );
    http::serve(&app).await?;
    tracing::info!(event_name = "system.server.stopping", "patron-server stopping");

    if let Some(pool) = app.db_pool {
        pool.close().await;
    }
    Ok(())
}
