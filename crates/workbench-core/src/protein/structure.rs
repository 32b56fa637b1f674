use super::atoms::{self, CA, C, FILL_VALUE, N, NUM_ATOM_TYPES};
use super::error::StructureError;
use super::residue::ResidueType;
use crate::geometry::dihedral_angle;
use nalgebra::Point3;

pub type AtomCoords = [Point3<f64>; NUM_ATOM_TYPES];
pub type AtomMask = [bool; NUM_ATOM_TYPES];

/// Backbone torsions of one residue, in radians.
///
/// `phi` is undefined for the first residue of a chain, `psi` and `omega`
/// (the peptide bond towards the next residue) for the last.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BackboneDihedrals {
    pub phi: Option<f64>,
    pub psi: Option<f64>,
    pub omega: Option<f64>,
}

pub fn filled_coords() -> AtomCoords {
    [Point3::new(FILL_VALUE, FILL_VALUE, FILL_VALUE); NUM_ATOM_TYPES]
}

/// A single protein in atom37 representation.
///
/// All per-residue vectors have the same length. Slots whose mask entry is
/// `false` hold [`FILL_VALUE`] on every axis. The `true_*` fields are written by
/// transforms to keep the uncorrupted values as denoising targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Protein {
    pub coords: Vec<AtomCoords>,
    pub atom_mask: Vec<AtomMask>,
    pub residue_type: Vec<ResidueType>,
    pub residue_id: Vec<i32>,
    pub chains: Vec<char>,
    pub true_dihedrals: Option<Vec<BackboneDihedrals>>,
    pub true_residue_type: Option<Vec<ResidueType>>,
    pub true_coords: Option<Vec<AtomCoords>>,
}

impl Protein {
    pub fn new(
        coords: Vec<AtomCoords>,
        atom_mask: Vec<AtomMask>,
        residue_type: Vec<ResidueType>,
        residue_id: Vec<i32>,
        chains: Vec<char>,
    ) -> Result<Self, StructureError> {
        let protein = Self {
            coords,
            atom_mask,
            residue_type,
            residue_id,
            chains,
            true_dihedrals: None,
            true_residue_type: None,
            true_coords: None,
        };
        protein.validate()?;
        Ok(protein)
    }

    pub fn len(&self) -> usize {
        self.residue_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residue_type.is_empty()
    }

    /// Checks that every per-residue field is aligned with `residue_type`.
    pub fn validate(&self) -> Result<(), StructureError> {
        let expected = self.len();
        let check = |field: &'static str, found: usize| {
            if found == expected {
                Ok(())
            } else {
                Err(StructureError::LengthMismatch {
                    field,
                    expected,
                    found,
                })
            }
        };
        check("coords", self.coords.len())?;
        check("atom_mask", self.atom_mask.len())?;
        check("residue_id", self.residue_id.len())?;
        check("chains", self.chains.len())?;
        if let Some(values) = &self.true_dihedrals {
            check("true_dihedrals", values.len())?;
        }
        if let Some(values) = &self.true_residue_type {
            check("true_residue_type", values.len())?;
        }
        if let Some(values) = &self.true_coords {
            check("true_coords", values.len())?;
        }
        Ok(())
    }

    pub fn atom(&self, residue: usize, atom: usize) -> Option<Point3<f64>> {
        let present = *self.atom_mask.get(residue)?.get(atom)?;
        present.then(|| self.coords[residue][atom])
    }

    pub(crate) fn backbone_atom(
        &self,
        residue: usize,
        atom: usize,
    ) -> Result<Point3<f64>, StructureError> {
        self.atom(residue, atom)
            .ok_or(StructureError::MissingBackboneAtom {
                residue,
                atom: atoms::atom_name(atom).unwrap_or("?"),
            })
    }

    /// Alpha-carbon coordinates, one per residue (fill value where absent).
    pub fn ca_coords(&self) -> Vec<Point3<f64>> {
        self.coords.iter().map(|residue| residue[CA]).collect()
    }

    pub fn num_atoms(&self) -> usize {
        self.atom_mask
            .iter()
            .map(|mask| mask.iter().filter(|&&present| present).count())
            .sum()
    }

    pub fn sequence(&self) -> String {
        self.residue_type.iter().map(|r| r.one_letter()).collect()
    }

    /// Whether every present atom has finite coordinates.
    pub fn is_finite(&self) -> bool {
        self.coords
            .iter()
            .zip(&self.atom_mask)
            .all(|(coords, mask)| {
                coords
                    .iter()
                    .zip(mask)
                    .filter(|(_, present)| **present)
                    .all(|(p, _)| p.coords.iter().all(|v| v.is_finite()))
            })
    }

    pub(crate) fn same_chain(&self, i: usize, j: usize) -> bool {
        self.chains.get(i).is_some() && self.chains.get(i) == self.chains.get(j)
    }

    /// Measures phi, psi and omega for every residue.
    pub fn backbone_dihedrals(&self) -> Result<Vec<BackboneDihedrals>, StructureError> {
        let len = self.len();
        let mut backbone = Vec::with_capacity(len);
        for i in 0..len {
            backbone.push([
                self.backbone_atom(i, N)?,
                self.backbone_atom(i, CA)?,
                self.backbone_atom(i, C)?,
            ]);
        }

        let mut dihedrals = vec![BackboneDihedrals::default(); len];
        for i in 0..len.saturating_sub(1) {
            if !self.same_chain(i, i + 1) {
                continue;
            }
            let [n_i, ca_i, c_i] = &backbone[i];
            let [n_j, ca_j, c_j] = &backbone[i + 1];
            dihedrals[i].psi = Some(dihedral_angle(n_i, ca_i, c_i, n_j));
            dihedrals[i].omega = Some(dihedral_angle(ca_i, c_i, n_j, ca_j));
            dihedrals[i + 1].phi = Some(dihedral_angle(c_i, n_j, ca_j, c_j));
        }
        Ok(dihedrals)
    }

    /// Renders present atoms as PDB `ATOM` records.
    pub fn to_pdb(&self) -> String {
        let mut out = String::new();
        let mut serial = 1usize;
        for i in 0..self.len() {
            let residue_name = self.residue_type[i].three_letter();
            for atom in 0..NUM_ATOM_TYPES {
                let Some(pos) = self.atom(i, atom) else {
                    continue;
                };
                let name = atoms::atom_name(atom).unwrap_or("X");
                let padded = if name.len() < 4 {
                    format!(" {:<3}", name)
                } else {
                    name.to_string()
                };
                out.push_str(&format!(
                    "ATOM  {:>5} {:<4} {:>3} {}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}\n",
                    serial % 100_000,
                    padded,
                    residue_name,
                    self.chains[i],
                    self.residue_id[i],
                    pos.x,
                    pos.y,
                    pos.z,
                    1.0,
                    0.0,
                    atoms::element(atom).unwrap_or('X'),
                ));
                serial += 1;
            }
            let chain_ends = i + 1 == self.len() || !self.same_chain(i, i + 1);
            if chain_ends {
                out.push_str(&format!(
                    "TER   {:>5}      {:>3} {}{:>4}\n",
                    serial % 100_000,
                    residue_name,
                    self.chains[i],
                    self.residue_id[i]
                ));
                serial += 1;
            }
        }
        out.push_str("END\n");
        out
    }
}
