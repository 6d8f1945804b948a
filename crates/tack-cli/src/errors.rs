//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use tack_plugins::PluginError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error("plugins were not installed: {}", .0.join(", "))]
    NotInstalled(Vec<String>),
    #[error("failed to serialise plugin list: {0}")]
    SerialiseList(serde_json::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
