use crate::config::ConfigError;
use crate::protein::{BatchError, StructureGenerationError};
use crate::transforms::TransformError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Structure generation failed: {0}")]
    StructureGeneration(#[from] StructureGenerationError),

    #[error("Batch construction failed: {0}")]
    Batch(#[from] BatchError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Cannot compare {left} CA atoms with {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("CA RMSD {rmsd} is out of bounds: expected a finite value greater than zero")]
    DeviationOutOfBounds { rmsd: f64 },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
