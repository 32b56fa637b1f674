use super::atoms::{C, CA, CB, N, NUM_ATOM_TYPES, O};
use super::error::StructureGenerationError;
use super::residue::{ResidueType, STANDARD_RESIDUES};
use super::structure::{AtomCoords, AtomMask, Protein, filled_coords};
use crate::geometry::{ideal_cb_position, place_atom};
use nalgebra::Point3;
use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

/// Ideal backbone geometry (Engh & Huber), lengths in Å.
pub mod ideal {
    pub const N_CA: f64 = 1.458;
    pub const CA_C: f64 = 1.525;
    pub const C_N: f64 = 1.329;
    pub const C_O: f64 = 1.231;

    pub const N_CA_C_DEG: f64 = 111.2;
    pub const CA_C_N_DEG: f64 = 116.2;
    pub const C_N_CA_DEG: f64 = 121.7;
    pub const CA_C_O_DEG: f64 = 120.5;
}

#[derive(Debug, Clone, Copy)]
struct Basin {
    phi_deg: f64,
    psi_deg: f64,
}

const HELIX: Basin = Basin {
    phi_deg: -57.0,
    psi_deg: -47.0,
};
const SHEET: Basin = Basin {
    phi_deg: -119.0,
    psi_deg: 113.0,
};

const TORSION_JITTER_DEG: f64 = 10.0;
const OMEGA_JITTER_DEG: f64 = 5.0;
const BASIN_PERSISTENCE: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct RandomProteinOptions {
    pub min_length: usize,
    pub max_length: usize,
    pub chain: char,
}

impl Default for RandomProteinOptions {
    fn default() -> Self {
        Self {
            min_length: 16,
            max_length: 64,
            chain: 'A',
        }
    }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, std_deg: f64) -> f64 {
    let z: f64 = StandardNormal.sample(rng);
    z * std_deg
}

/// Sampled `(phi, psi, omega)` per residue, radians.
fn sample_torsions<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Vec<(f64, f64, f64)> {
    let mut basin = if rng.gen_bool(0.5) { HELIX } else { SHEET };
    (0..len)
        .map(|_| {
            if !rng.gen_bool(BASIN_PERSISTENCE) {
                basin = if rng.gen_bool(0.5) { HELIX } else { SHEET };
            }
            let phi = basin.phi_deg + jitter(rng, TORSION_JITTER_DEG);
            let psi = basin.psi_deg + jitter(rng, TORSION_JITTER_DEG);
            let omega = 180.0 + jitter(rng, OMEGA_JITTER_DEG);
            (phi.to_radians(), psi.to_radians(), omega.to_radians())
        })
        .collect()
}

/// Builds N, CA, C for every residue from backbone torsions with ideal
/// bond geometry.
fn build_backbone(torsions: &[(f64, f64, f64)]) -> Vec<[Point3<f64>; 3]> {
    let n_ca_c = ideal::N_CA_C_DEG.to_radians();
    let ca_c_n = ideal::CA_C_N_DEG.to_radians();
    let c_n_ca = ideal::C_N_CA_DEG.to_radians();

    let n0 = Point3::origin();
    let ca0 = Point3::new(ideal::N_CA, 0.0, 0.0);
    let c0 = ca0 + nalgebra::Vector3::new(-n_ca_c.cos(), n_ca_c.sin(), 0.0) * ideal::CA_C;

    let mut backbone = Vec::with_capacity(torsions.len());
    backbone.push([n0, ca0, c0]);
    for i in 1..torsions.len() {
        let [n, ca, c] = backbone[i - 1];
        let (_, psi_prev, omega_prev) = torsions[i - 1];
        let (phi, _, _) = torsions[i];
        let next_n = place_atom(&n, &ca, &c, ideal::C_N, ca_c_n, psi_prev);
        let next_ca = place_atom(&ca, &c, &next_n, ideal::N_CA, c_n_ca, omega_prev);
        let next_c = place_atom(&c, &next_n, &next_ca, ideal::CA_C, n_ca_c, phi);
        backbone.push([next_n, next_ca, next_c]);
    }
    backbone
}

/// Generates a random single-chain protein with a physically plausible
/// backbone, carbonyl oxygens and (except for glycine) CB atoms.
pub fn random_protein<R: Rng + ?Sized>(
    rng: &mut R,
    options: &RandomProteinOptions,
) -> Result<Protein, StructureGenerationError> {
    let RandomProteinOptions {
        min_length,
        max_length,
        chain,
    } = *options;
    if min_length < 2 || min_length > max_length {
        return Err(StructureGenerationError::InvalidLength {
            min: min_length,
            max: max_length,
        });
    }

    let len = rng.gen_range(min_length..=max_length);
    let residue_type: Vec<ResidueType> = (0..len)
        .map(|_| {
            *STANDARD_RESIDUES
                .choose(rng)
                .unwrap_or(&ResidueType::Alanine)
        })
        .collect();
    let torsions = sample_torsions(rng, len);
    let backbone = build_backbone(&torsions);
    let ca_c_o = ideal::CA_C_O_DEG.to_radians();

    let mut coords: Vec<AtomCoords> = Vec::with_capacity(len);
    let mut atom_mask: Vec<AtomMask> = Vec::with_capacity(len);
    for (i, [n, ca, c]) in backbone.iter().enumerate() {
        let mut residue = filled_coords();
        let mut mask = [false; NUM_ATOM_TYPES];

        let psi = torsions[i].1;
        let o = place_atom(n, ca, c, ideal::C_O, ca_c_o, psi + std::f64::consts::PI);
        for (slot, pos) in [(N, *n), (CA, *ca), (C, *c), (O, o)] {
            residue[slot] = pos;
            mask[slot] = true;
        }
        if residue_type[i] != ResidueType::Glycine {
            residue[CB] = ideal_cb_position(n, ca, c);
            mask[CB] = true;
        }

        let finite = residue
            .iter()
            .zip(&mask)
            .filter(|(_, present)| **present)
            .all(|(p, _)| p.coords.iter().all(|v| v.is_finite()));
        if !finite {
            return Err(StructureGenerationError::NonFiniteCoordinates { residue: i });
        }
        coords.push(residue);
        atom_mask.push(mask);
    }

    let residue_id = (1..=len as i32).collect();
    let protein = Protein::new(coords, atom_mask, residue_type, residue_id, vec![chain; len])?;
    debug!(
        "Generated random protein of {} residues ({} atoms)",
        protein.len(),
        protein.num_atoms()
    );
    Ok(protein)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{bond_angle, dihedral_angle};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn rejects_invalid_length_ranges() {
        let mut rng = StdRng::seed_from_u64(0);
        for (min, max) in [(1, 10), (10, 5), (0, 0)] {
            let options = RandomProteinOptions {
                min_length: min,
                max_length: max,
                ..Default::default()
            };
            assert_eq!(
                random_protein(&mut rng, &options).unwrap_err(),
                StructureGenerationError::InvalidLength { min, max }
            );
        }
    }

    #[test]
    fn length_and_chain_follow_options() {
        let mut rng = StdRng::seed_from_u64(1);
        let options = RandomProteinOptions {
            min_length: 20,
            max_length: 30,
            chain: 'B',
        };
        for _ in 0..10 {
            let protein = random_protein(&mut rng, &options).unwrap();
            assert!((20..=30).contains(&protein.len()));
            assert!(protein.chains.iter().all(|&c| c == 'B'));
            assert_eq!(protein.residue_id.first(), Some(&1));
            assert!(protein.residue_type.iter().all(|r| r.is_standard()));
        }
    }

    #[test]
    fn backbone_has_ideal_geometry() {
        let mut rng = StdRng::seed_from_u64(2);
        let protein = random_protein(&mut rng, &RandomProteinOptions::default()).unwrap();
        for i in 0..protein.len() {
            let n = protein.atom(i, N).unwrap();
            let ca = protein.atom(i, CA).unwrap();
            let c = protein.atom(i, C).unwrap();
            assert!(((ca - n).norm() - ideal::N_CA).abs() < 1e-6);
            assert!(((c - ca).norm() - ideal::CA_C).abs() < 1e-6);
            assert!((bond_angle(&n, &ca, &c).to_degrees() - ideal::N_CA_C_DEG).abs() < 1e-6);
            if i + 1 < protein.len() {
                let next_n = protein.atom(i + 1, N).unwrap();
                assert!(((next_n - c).norm() - ideal::C_N).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn consecutive_ca_atoms_are_about_3_8_angstrom_apart() {
        let mut rng = StdRng::seed_from_u64(3);
        let protein = random_protein(&mut rng, &RandomProteinOptions::default()).unwrap();
        let ca = protein.ca_coords();
        for pair in ca.windows(2) {
            let d = (pair[1] - pair[0]).norm();
            assert!((3.7..3.9).contains(&d), "CA-CA distance {}", d);
        }
    }

    #[test]
    fn measured_torsions_match_sampled_basins() {
        let mut rng = StdRng::seed_from_u64(4);
        let protein = random_protein(&mut rng, &RandomProteinOptions::default()).unwrap();
        for d in protein.backbone_dihedrals().unwrap() {
            if let Some(phi) = d.phi {
                let phi = phi.to_degrees();
                assert!((-170.0..-10.0).contains(&phi), "phi {}", phi);
            }
            if let Some(omega) = d.omega {
                assert!(omega.to_degrees().abs() > 150.0);
            }
        }
    }

    #[test]
    fn glycine_has_no_cb_and_others_do() {
        let mut rng = StdRng::seed_from_u64(5);
        let protein = random_protein(&mut rng, &RandomProteinOptions::default()).unwrap();
        for (i, residue) in protein.residue_type.iter().enumerate() {
            assert_eq!(
                protein.atom(i, CB).is_some(),
                *residue != ResidueType::Glycine
            );
            assert!(protein.atom(i, O).is_some());
        }
        assert!(protein.is_finite());
    }

    #[test]
    fn carbonyl_oxygen_is_trans_to_next_nitrogen() {
        let mut rng = StdRng::seed_from_u64(6);
        let protein = random_protein(&mut rng, &RandomProteinOptions::default()).unwrap();
        let n = protein.atom(0, N).unwrap();
        let ca = protein.atom(0, CA).unwrap();
        let c = protein.atom(0, C).unwrap();
        let o = protein.atom(0, O).unwrap();
        let next_n = protein.atom(1, N).unwrap();
        let psi = dihedral_angle(&n, &ca, &c, &next_n);
        let o_torsion = dihedral_angle(&n, &ca, &c, &o);
        let diff = crate::geometry::wrap_angle(o_torsion - psi);
        assert!((diff.abs() - std::f64::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn same_seed_gives_same_structure() {
        let a = random_protein(&mut StdRng::seed_from_u64(9), &RandomProteinOptions::default())
            .unwrap();
        let b = random_protein(&mut StdRng::seed_from_u64(9), &RandomProteinOptions::default())
            .unwrap();
        assert_eq!(a, b);
    }
}
