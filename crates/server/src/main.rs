mod bootstrap;
mod health;
pub mod pages;

use anyhow::Result;
use axum::Router;
use spectrum_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use spectrum_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
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
    run().await
}

pub async fn run() -> Result<()> {
    let config =
        AppConfig::load(LoadOptions::default()).map_err(bootstrap::BootstrapError::Config)?;
    init_logging(&config);

    let application = bootstrap::bootstrap_with_config(config)?;
    let router = Router::new()
        .merge(pages::router(application.app.clone()))
        .merge(health::router(application.app.clone()));

    let address =
        format!("{}:{}", application.config.server.bind_address, application.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "spectrum-server listening"
    );
    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "spectrum-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for shutdown signal"
        );
    }
}
