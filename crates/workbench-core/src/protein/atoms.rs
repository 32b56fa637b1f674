//! The fixed 37-slot heavy-atom layout used for per-residue coordinates.

use phf::{Map, phf_map};

pub const NUM_ATOM_TYPES: usize = 37;

/// Coordinate written into every slot whose atom is absent.
pub const FILL_VALUE: f64 = 1e-5;

pub const N: usize = 0;
pub const CA: usize = 1;
pub const C: usize = 2;
pub const CB: usize = 3;
pub const O: usize = 4;
pub const OXT: usize = 36;

pub const BACKBONE_ATOMS: [usize; 4] = [N, CA, C, O];

pub const ATOM_TYPES: [&str; NUM_ATOM_TYPES] = [
    "N", "CA", "C", "CB", "O", "CG", "CG1", "CG2", "OG", "OG1", "SG", "CD", "CD1", "CD2", "ND1",
    "ND2", "OD1", "OD2", "SD", "CE", "CE1", "CE2", "CE3", "NE", "NE1", "NE2", "OE1", "OE2", "CH2",
    "NH1", "NH2", "OH", "CZ", "CZ2", "CZ3", "NZ", "OXT",
];

static ATOM_ORDER: Map<&'static str, usize> = phf_map! {
    "N" => 0, "CA" => 1, "C" => 2, "CB" => 3, "O" => 4,
    "CG" => 5, "CG1" => 6, "CG2" => 7, "OG" => 8, "OG1" => 9, "SG" => 10,
    "CD" => 11, "CD1" => 12, "CD2" => 13, "ND1" => 14, "ND2" => 15, "OD1" => 16, "OD2" => 17, "SD" => 18,
    "CE" => 19, "CE1" => 20, "CE2" => 21, "CE3" => 22, "NE" => 23, "NE1" => 24, "NE2" => 25,
    "OE1" => 26, "OE2" => 27, "CH2" => 28, "NH1" => 29, "NH2" => 30, "OH" => 31,
    "CZ" => 32, "CZ2" => 33, "CZ3" => 34, "NZ" => 35, "OXT" => 36,
};

pub fn atom_index(name: &str) -> Option<usize> {
    ATOM_ORDER.get(name.trim()).copied()
}

pub fn atom_name(index: usize) -> Option<&'static str> {
    ATOM_TYPES.get(index).copied()
}

/// Element symbol of an atom37 slot (every slot is a heavy atom named after
/// its element).
pub fn element(index: usize) -> Option<char> {
    atom_name(index).and_then(|name| name.chars().next())
}

pub fn is_backbone(index: usize) -> bool {
    BACKBONE_ATOMS.contains(&index) || index == OXT
}
