//! # Transforms Module
//!
//! Stochastic corruptions applied to a single [`Protein`], used as denoising
//! objectives. Transforms are built from config nodes through an explicit
//! [`TransformRegistry`] keyed by the node's `_target_`.
//!
//! - [`TorsionalNoise`] (`torsional_noise`) - backbone torsion perturbation with NeRF rebuild
//! - [`CoordinateNoise`] (`coordinate_noise`) - Gaussian noise on atom positions
//! - [`SequenceNoise`] (`sequence_noise`) - residue identity mutation or masking
//! - [`Compose`] (`compose`) - several transforms in order

use crate::protein::Protein;
use rand::{Rng, RngCore};
use std::fmt;

pub mod compose;
pub mod coordinate;
mod error;
mod params;
pub mod registry;
pub mod sequence;
pub mod torsional;

pub use compose::Compose;
pub use coordinate::CoordinateNoise;
pub use error::TransformError;
pub use params::TransformParams;
pub use registry::{TARGET_KEY, TransformFactory, TransformRegistry};
pub use sequence::{SequenceCorruption, SequenceNoise};
pub use torsional::{CorruptionStrategy, TorsionalNoise};

/// A configured map from one protein to a modified protein.
///
/// Implementations hold no state between calls; all randomness is drawn from
/// `rng`.
pub trait Transform: fmt::Debug {
    fn name(&self) -> &'static str;

    fn apply(&self, protein: Protein, rng: &mut dyn RngCore) -> Result<Protein, TransformError>;
}

/// Picks each candidate with probability `rate`, falling back to one
/// uniformly chosen candidate when nothing was picked.
pub(crate) fn select_residues(rng: &mut dyn RngCore, candidates: &[usize], rate: f64) -> Vec<usize> {
    let mut selected: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|_| rng.gen_bool(rate))
        .collect();
    if selected.is_empty() && !candidates.is_empty() {
        selected.push(candidates[rng.gen_range(0..candidates.len())]);
    }
    selected
}
