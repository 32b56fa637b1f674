use super::error::TransformError;
use super::params::TransformParams;
use super::registry::TransformRegistry;
use super::{Transform, select_residues};
use crate::geometry::{
    ResidueFrame, bond_angle, dihedral_angle, place_atom, residue_frame, wrap_angle,
};
use crate::protein::Protein;
use crate::protein::atoms::{C, CA, N, NUM_ATOM_TYPES, O};
use nalgebra::Point3;
use rand::{Rng, RngCore};
use rand_distr::{Distribution, StandardNormal};
use std::ops::Range;
use std::str::FromStr;
use tracing::debug;

pub const NAME: &str = "torsional_noise";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionStrategy {
    /// Zero-mean normal noise with standard deviation `noise_scale`.
    Gaussian,
    /// Uniform noise in `[-noise_scale, noise_scale]`.
    Uniform,
}

impl FromStr for CorruptionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gaussian" | "normal" => Ok(CorruptionStrategy::Gaussian),
            "uniform" => Ok(CorruptionStrategy::Uniform),
            other => Err(format!(
                "unknown strategy '{}'; expected 'gaussian' or 'uniform'",
                other
            )),
        }
    }
}

impl CorruptionStrategy {
    pub(crate) fn sample(self, rng: &mut dyn RngCore, scale: f64) -> f64 {
        match self {
            CorruptionStrategy::Gaussian => {
                let z: f64 = StandardNormal.sample(rng);
                z * scale
            }
            CorruptionStrategy::Uniform => rng.gen_range(-scale..=scale),
        }
    }
}

/// Perturbs backbone torsions and rebuilds the chain with its own bond
/// lengths and angles.
///
/// Each candidate residue `i` (one with a successor in the same chain) is
/// selected with probability `corruption_rate`; at least one always is. A
/// selected residue gets noise on `psi_i`, on `phi_i` when `i > 0`, and on
/// `omega_i` when `perturb_omega` is set. Since `psi_i` rotates everything
/// after `C_i`, every non-zero draw moves at least one CA atom.
#[derive(Debug, Clone, PartialEq)]
pub struct TorsionalNoise {
    pub corruption_strategy: CorruptionStrategy,
    pub corruption_rate: f64,
    /// Radians.
    pub noise_scale: f64,
    pub perturb_omega: bool,
}

impl Default for TorsionalNoise {
    fn default() -> Self {
        Self {
            corruption_strategy: CorruptionStrategy::Gaussian,
            corruption_rate: 0.5,
            noise_scale: 10f64.to_radians(),
            perturb_omega: false,
        }
    }
}

impl TorsionalNoise {
    pub fn from_params(params: &TransformParams<'_>) -> Result<Self, TransformError> {
        params.expect_only(&[
            "corruption_strategy",
            "corruption_rate",
            "noise_scale",
            "perturb_omega",
        ])?;
        let defaults = Self::default();
        let corruption_strategy = params
            .str_or("corruption_strategy", "gaussian")?
            .parse()
            .map_err(|reason| params.invalid("corruption_strategy", reason))?;
        Ok(Self {
            corruption_strategy,
            corruption_rate: params.probability_or("corruption_rate", defaults.corruption_rate)?,
            noise_scale: params.non_negative_or("noise_scale", defaults.noise_scale)?,
            perturb_omega: params.bool_or("perturb_omega", defaults.perturb_omega)?,
        })
    }
}

pub(crate) fn factory(
    params: &TransformParams<'_>,
    _registry: &TransformRegistry,
) -> Result<Box<dyn Transform>, TransformError> {
    Ok(Box::new(TorsionalNoise::from_params(params)?))
}

/// Internal coordinates of the flattened backbone `N0 CA0 C0 N1 CA1 C1 ...`.
///
/// Entry `k` (for `k >= 3`) places atom `k` from atoms `k-3..k`. The torsion of
/// `N_{i+1}` is `psi_i`, of `CA_{i+1}` is `omega_i`, of `C_{i+1}` is `phi_{i+1}`.
struct InternalCoords {
    lengths: Vec<f64>,
    angles: Vec<f64>,
    torsions: Vec<f64>,
}

fn psi_slot(i: usize) -> usize {
    3 * i + 3
}

fn omega_slot(i: usize) -> usize {
    3 * i + 4
}

fn phi_slot(i: usize) -> usize {
    3 * i + 2
}

/// Atom ranges of each chain in the flattened trace. Chains are rebuilt
/// independently so a torsion change never moves a later chain.
fn chain_segments(protein: &Protein) -> Vec<Range<usize>> {
    let len = protein.len();
    let mut segments = Vec::new();
    let mut start = 0;
    for i in 1..=len {
        if i == len || !protein.same_chain(i - 1, i) {
            segments.push(3 * start..3 * i);
            start = i;
        }
    }
    segments
}

fn measure(atoms: &[Point3<f64>], segments: &[Range<usize>]) -> InternalCoords {
    let n = atoms.len();
    let mut ic = InternalCoords {
        lengths: vec![0.0; n],
        angles: vec![0.0; n],
        torsions: vec![0.0; n],
    };
    for segment in segments {
        for k in segment.start + 3..segment.end {
            ic.lengths[k] = (atoms[k] - atoms[k - 1]).norm();
            ic.angles[k] = bond_angle(&atoms[k - 2], &atoms[k - 1], &atoms[k]);
            ic.torsions[k] =
                dihedral_angle(&atoms[k - 3], &atoms[k - 2], &atoms[k - 1], &atoms[k]);
        }
    }
    ic
}

/// Rebuilds every segment from its own first three atoms.
fn rebuild(
    anchor: &[Point3<f64>],
    ic: &InternalCoords,
    segments: &[Range<usize>],
) -> Vec<Point3<f64>> {
    let mut atoms = anchor.to_vec();
    for segment in segments {
        for k in segment.start + 3..segment.end {
            atoms[k] = place_atom(
                &atoms[k - 3],
                &atoms[k - 2],
                &atoms[k - 1],
                ic.lengths[k],
                ic.angles[k],
                ic.torsions[k],
            );
        }
    }
    atoms
}

fn frame(
    residue: usize,
    plane: &Point3<f64>,
    origin: &Point3<f64>,
    axis: &Point3<f64>,
) -> Result<ResidueFrame, TransformError> {
    residue_frame(plane, origin, axis).ok_or(TransformError::DegenerateGeometry { residue })
}

impl Transform for TorsionalNoise {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&self, mut protein: Protein, rng: &mut dyn RngCore) -> Result<Protein, TransformError> {
        let len = protein.len();
        if len < 2 {
            return Err(TransformError::StructureTooShort {
                transform: NAME,
                len,
                min: 2,
            });
        }
        let true_dihedrals = protein.backbone_dihedrals()?;

        let mut flat = Vec::with_capacity(3 * len);
        for i in 0..len {
            for atom in [N, CA, C] {
                flat.push(protein.backbone_atom(i, atom)?);
            }
        }

        let candidates: Vec<usize> = (0..len - 1)
            .filter(|&i| protein.same_chain(i, i + 1))
            .collect();
        if candidates.is_empty() {
            return Err(TransformError::StructureTooShort {
                transform: NAME,
                len: 1,
                min: 2,
            });
        }
        let selected = select_residues(rng, &candidates, self.corruption_rate);

        let segments = chain_segments(&protein);
        let mut ic = measure(&flat, &segments);
        let mut perturb = |slot: usize, rng: &mut dyn RngCore| {
            let delta = self.corruption_strategy.sample(rng, self.noise_scale);
            ic.torsions[slot] = wrap_angle(ic.torsions[slot] + delta);
        };
        for &i in &selected {
            perturb(psi_slot(i), rng);
            if i > 0 && protein.same_chain(i - 1, i) {
                perturb(phi_slot(i), rng);
            }
            if self.perturb_omega {
                perturb(omega_slot(i), rng);
            }
        }
        let rebuilt = rebuild(&flat, &ic, &segments);

        let mut coords = protein.coords.clone();
        for i in 0..len {
            let (old_n, old_ca, old_c) = (flat[3 * i], flat[3 * i + 1], flat[3 * i + 2]);
            let (new_n, new_ca, new_c) = (rebuilt[3 * i], rebuilt[3 * i + 1], rebuilt[3 * i + 2]);
            let old_frame = frame(i, &old_n, &old_ca, &old_c)?;
            let new_frame = frame(i, &new_n, &new_ca, &new_c)?;

            // The carbonyl O lies in the peptide plane and follows psi.
            let peptide = if i + 1 < len && protein.same_chain(i, i + 1) {
                let (old_next, new_next) = (flat[3 * i + 3], rebuilt[3 * i + 3]);
                Some((
                    frame(i, &old_next, &old_c, &old_ca)?,
                    frame(i, &new_next, &new_c, &new_ca)?,
                ))
            } else {
                None
            };

            for atom in 0..NUM_ATOM_TYPES {
                if !protein.atom_mask[i][atom] {
                    continue;
                }
                let old = protein.coords[i][atom];
                coords[i][atom] = match (atom, &peptide) {
                    (N, _) => new_n,
                    (CA, _) => new_ca,
                    (C, _) => new_c,
                    (O, Some((old_p, new_p))) => new_p.to_global(&old_p.to_local(&old)),
                    _ => new_frame.to_global(&old_frame.to_local(&old)),
                };
            }
        }

        protein.coords = coords;
        if !protein.is_finite() {
            return Err(TransformError::NonFinite { transform: NAME });
        }
        protein.true_dihedrals = Some(true_dihedrals);
        debug!(
            "Perturbed torsions of {} of {} residues ({:?}, scale {:.4} rad)",
            selected.len(),
            len,
            self.corruption_strategy,
            self.noise_scale
        );
        Ok(protein)
    }
}
