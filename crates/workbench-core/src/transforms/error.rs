use crate::protein::StructureError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    #[error("Transform config has no '_target_' key")]
    MissingTarget,

    #[error("Unknown transform target '{target}' (registered: {registered})")]
    UnknownTarget { target: String, registered: String },

    #[error("Transform config must be a mapping, found {found}")]
    InvalidNode { found: &'static str },

    #[error("Invalid parameter '{parameter}' for transform '{transform}': {reason}")]
    InvalidParameter {
        transform: String,
        parameter: String,
        reason: String,
    },

    #[error("A transform named '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("Structure has {len} residue(s), '{transform}' needs at least {min}")]
    StructureTooShort {
        transform: &'static str,
        len: usize,
        min: usize,
    },

    #[error("Degenerate backbone geometry at residue {residue}")]
    DegenerateGeometry { residue: usize },

    #[error("Transform '{transform}' produced non-finite coordinates")]
    NonFinite { transform: &'static str },

    #[error(transparent)]
    Structure(#[from] StructureError),
}
