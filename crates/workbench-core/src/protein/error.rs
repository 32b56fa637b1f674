use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StructureError {
    #[error("Field '{field}' has {found} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Residue {residue} is missing backbone atom {atom}")]
    MissingBackboneAtom { residue: usize, atom: &'static str },

    #[error("Unknown residue code '{code}'")]
    UnknownResidue { code: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum StructureGenerationError {
    #[error("Invalid length range {min}..={max}: need 2 <= min <= max")]
    InvalidLength { min: usize, max: usize },

    #[error("Generated non-finite coordinates at residue {residue}")]
    NonFiniteCoordinates { residue: usize },

    #[error("Generated structure is inconsistent: {0}")]
    Structure(#[from] StructureError),
}

#[derive(Debug, Error, PartialEq)]
pub enum BatchError {
    #[error("Cannot build a batch from an empty list of structures")]
    Empty,

    #[error("Unknown batch field '{field}'")]
    UnknownField { field: String },

    #[error("Invalid edge specification '{spec}': {reason}")]
    InvalidEdgeSpec { spec: String, reason: String },

    #[error("Example index {index} out of range for a batch of {len} graphs")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid structure in batch: {0}")]
    Structure(#[from] StructureError),
}
