use super::error::TransformError;
use super::params::TransformParams;
use super::registry::TransformRegistry;
use super::{Transform, select_residues};
use crate::protein::Protein;
use crate::protein::residue::{ResidueType, STANDARD_RESIDUES};
use rand::{Rng, RngCore};
use std::str::FromStr;
use tracing::debug;

pub const NAME: &str = "sequence_noise";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceCorruption {
    /// Replace with a different standard residue.
    Mutate,
    /// Replace with [`ResidueType::Unknown`].
    Mask,
}

impl FromStr for SequenceCorruption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mutate" => Ok(SequenceCorruption::Mutate),
            "mask" => Ok(SequenceCorruption::Mask),
            other => Err(format!(
                "unknown strategy '{}'; expected 'mutate' or 'mask'",
                other
            )),
        }
    }
}

/// Corrupts residue identities of a random subset of residues and keeps the
/// clean sequence in `true_residue_type`. Coordinates are untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceNoise {
    pub corruption_strategy: SequenceCorruption,
    pub corruption_rate: f64,
}

impl Default for SequenceNoise {
    fn default() -> Self {
        Self {
            corruption_strategy: SequenceCorruption::Mutate,
            corruption_rate: 0.25,
        }
    }
}

impl SequenceNoise {
    pub fn from_params(params: &TransformParams<'_>) -> Result<Self, TransformError> {
        params.expect_only(&["corruption_strategy", "corruption_rate"])?;
        let corruption_strategy = params
            .str_or("corruption_strategy", "mutate")?
            .parse()
            .map_err(|reason| params.invalid("corruption_strategy", reason))?;
        Ok(Self {
            corruption_strategy,
            corruption_rate: params
                .probability_or("corruption_rate", Self::default().corruption_rate)?,
        })
    }
}

pub(crate) fn factory(
    params: &TransformParams<'_>,
    _registry: &TransformRegistry,
) -> Result<Box<dyn Transform>, TransformError> {
    Ok(Box::new(SequenceNoise::from_params(params)?))
}

fn mutate(rng: &mut dyn RngCore, current: ResidueType) -> ResidueType {
    let others: Vec<ResidueType> = STANDARD_RESIDUES
        .iter()
        .copied()
        .filter(|r| *r != current)
        .collect();
    others[rng.gen_range(0..others.len())]
}

impl Transform for SequenceNoise {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&self, mut protein: Protein, rng: &mut dyn RngCore) -> Result<Protein, TransformError> {
        if protein.is_empty() {
            return Err(TransformError::StructureTooShort {
                transform: NAME,
                len: 0,
                min: 1,
            });
        }
        let candidates: Vec<usize> = (0..protein.len()).collect();
        let selected = select_residues(rng, &candidates, self.corruption_rate);
        let clean = protein.residue_type.clone();

        for &i in &selected {
            protein.residue_type[i] = match self.corruption_strategy {
                SequenceCorruption::Mutate => mutate(rng, protein.residue_type[i]),
                SequenceCorruption::Mask => ResidueType::Unknown,
            };
        }

        protein.true_residue_type = Some(clean);
        debug!(
            "Corrupted {} of {} residue identities ({:?})",
            selected.len(),
            protein.len(),
            self.corruption_strategy
        );
        Ok(protein)
    }
}
