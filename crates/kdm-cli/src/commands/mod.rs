//! CLI commands

pub mod channels;
pub mod charts;
pub mod predecessor;

use std::path::Path;

use kdm_repo::{HttpChartSource, SourceConfig};

use crate::error::{CliError, Result};

/// Load the source configuration from `path`, else the default location
pub fn load_config(path: Option<&Path>) -> Result<SourceConfig> {
    let config = match path {
        Some(path) => SourceConfig::load_from(path)?,
        None => SourceConfig::load()?,
    };
    tracing::debug!("chart list template: {}", config.url_template);
    Ok(config)
}

pub fn chart_source(config: Option<&Path>, product: &str) -> Result<HttpChartSource> {
    Ok(HttpChartSource::new(load_config(config)?, product)?)
}

pub fn read_manifest(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| CliError::io_at(path, e))
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::internal(format!("Failed to start runtime: {}", e)))
}
