use super::error::TransformError;
use super::params::TransformParams;
use super::registry::TransformRegistry;
use super::{Transform, select_residues};
use crate::protein::Protein;
use nalgebra::Vector3;
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

pub const NAME: &str = "coordinate_noise";

/// Adds isotropic Gaussian noise (`noise_scale` Å) to every present atom of a
/// random subset of residues. The clean coordinates are kept in `true_coords`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateNoise {
    pub corruption_rate: f64,
    pub noise_scale: f64,
}

impl Default for CoordinateNoise {
    fn default() -> Self {
        Self {
            corruption_rate: 1.0,
            noise_scale: 0.1,
        }
    }
}

impl CoordinateNoise {
    pub fn from_params(params: &TransformParams<'_>) -> Result<Self, TransformError> {
        params.expect_only(&["corruption_rate", "noise_scale"])?;
        let defaults = Self::default();
        Ok(Self {
            corruption_rate: params.probability_or("corruption_rate", defaults.corruption_rate)?,
            noise_scale: params.non_negative_or("noise_scale", defaults.noise_scale)?,
        })
    }
}

pub(crate) fn factory(
    params: &TransformParams<'_>,
    _registry: &TransformRegistry,
) -> Result<Box<dyn Transform>, TransformError> {
    Ok(Box::new(CoordinateNoise::from_params(params)?))
}

impl Transform for CoordinateNoise {
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
        let clean = protein.coords.clone();

        for &i in &selected {
            for (pos, present) in protein.coords[i].iter_mut().zip(protein.atom_mask[i]) {
                if !present {
                    continue;
                }
                let x: f64 = StandardNormal.sample(rng);
                let y: f64 = StandardNormal.sample(rng);
                let z: f64 = StandardNormal.sample(rng);
                *pos += Vector3::new(x, y, z) * self.noise_scale;
            }
        }

        if !protein.is_finite() {
            return Err(TransformError::NonFinite { transform: NAME });
        }
        protein.true_coords = Some(clean);
        debug!(
            "Added coordinate noise to {} of {} residues",
            selected.len(),
            protein.len()
        );
        Ok(protein)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protein::atoms::FILL_VALUE;
    use crate::protein::{RandomProteinOptions, random_protein};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn keeps_clean_coordinates_and_leaves_absent_atoms_alone() {
        let mut rng = StdRng::seed_from_u64(0);
        let input = random_protein(&mut rng, &RandomProteinOptions::default()).unwrap();
        let out = CoordinateNoise::default()
            .apply(input.clone(), &mut rng)
            .unwrap();

        assert_eq!(out.true_coords.as_ref(), Some(&input.coords));
        for i in 0..out.len() {
            for (atom, present) in out.atom_mask[i].iter().enumerate() {
                if !present {
                    assert_eq!(out.coords[i][atom].x, FILL_VALUE);
                } else {
                    assert_ne!(out.coords[i][atom], input.coords[i][atom]);
                }
            }
        }
    }

    #[test]
    fn zero_rate_still_corrupts_one_residue() {
        let mut rng = StdRng::seed_from_u64(1);
        let input = random_protein(&mut rng, &RandomProteinOptions::default()).unwrap();
        let transform = CoordinateNoise {
            corruption_rate: 0.0,
            noise_scale: 1.0,
        };
        let out = transform.apply(input.clone(), &mut rng).unwrap();
        let changed = (0..input.len())
            .filter(|&i| input.coords[i] != out.coords[i])
            .count();
        assert_eq!(changed, 1);
    }
}
