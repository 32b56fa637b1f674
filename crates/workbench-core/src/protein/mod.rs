//! # Protein Module
//!
//! Protein structures in the atom37 representation, random structure
//! generation and batching with cached neighbour graphs.
//!
//! - [`residue`] - Residue vocabulary (20 standard types plus `Unknown`)
//! - [`atoms`] - The 37-slot heavy-atom layout
//! - [`structure`] - A single [`Protein`] and its backbone measurements
//! - [`random`] - Random proteins with ideal backbone geometry
//! - [`batch`] - [`ProteinBatch`], concatenation with membership indices
//! - [`graph`] - kNN and radius graphs that stay within each member structure

pub mod atoms;
pub mod batch;
mod error;
pub mod graph;
pub mod random;
pub mod residue;
pub mod structure;

pub use batch::ProteinBatch;
pub use error::{BatchError, StructureError, StructureGenerationError};
pub use graph::{EdgeIndex, EdgeSpec};
pub use random::{RandomProteinOptions, random_protein};
pub use residue::ResidueType;
pub use structure::{AtomCoords, AtomMask, BackboneDihedrals, Protein};
