use std::sync::Arc;

use spectrum_core::config::{AppConfig, ConfigError};
use spectrum_core::errors::ArtifactError;
use spectrum_core::App;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub app: Arc<App>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("artifact loading failed: {0}")]
    Artifacts(#[source] ArtifactError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        catalog_path = %config.artifacts.catalog_path.display(),
        similarity_path = %config.artifacts.similarity_path.display(),
        segment_model_path = %config.artifacts.segment_model_path.display(),
        "starting application bootstrap"
    );

    let app = App::load(&config).map_err(BootstrapError::Artifacts)?;
    info!(
        event_name = "system.bootstrap.artifacts_loaded",
        correlation_id = "bootstrap",
        "artifacts loaded into memory"
    );

    Ok(Application { config, app: Arc::new(app) })
}
