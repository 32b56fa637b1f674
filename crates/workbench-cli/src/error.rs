use std::path::PathBuf;
use thiserror::Error;
use workbench::config::ConfigError;
use workbench::harness::HarnessError;
use workbench::protein::BatchError;
use workbench::transforms::TransformError;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Failed to open log file '{path}': {source}", path = path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
