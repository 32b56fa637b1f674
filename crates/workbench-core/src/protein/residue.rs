use super::error::StructureError;
use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;

/// Residue identity, indexed in one-letter-code order with `Unknown` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResidueType {
    Alanine,
    Cysteine,
    AsparticAcid,
    GlutamicAcid,
    Phenylalanine,
    Glycine,
    Histidine,
    Isoleucine,
    Lysine,
    Leucine,
    Methionine,
    Asparagine,
    Proline,
    Glutamine,
    Arginine,
    Serine,
    Threonine,
    Valine,
    Tryptophan,
    Tyrosine,
    Unknown,
}

pub const NUM_STANDARD_RESIDUES: usize = 20;

pub const STANDARD_RESIDUES: [ResidueType; NUM_STANDARD_RESIDUES] = [
    ResidueType::Alanine,
    ResidueType::Cysteine,
    ResidueType::AsparticAcid,
    ResidueType::GlutamicAcid,
    ResidueType::Phenylalanine,
    ResidueType::Glycine,
    ResidueType::Histidine,
    ResidueType::Isoleucine,
    ResidueType::Lysine,
    ResidueType::Leucine,
    ResidueType::Methionine,
    ResidueType::Asparagine,
    ResidueType::Proline,
    ResidueType::Glutamine,
    ResidueType::Arginine,
    ResidueType::Serine,
    ResidueType::Threonine,
    ResidueType::Valine,
    ResidueType::Tryptophan,
    ResidueType::Tyrosine,
];

static THREE_LETTER_CODES: Map<&'static str, ResidueType> = phf_map! {
    "ALA" => ResidueType::Alanine,
    "CYS" => ResidueType::Cysteine,
    "ASP" => ResidueType::AsparticAcid,
    "GLU" => ResidueType::GlutamicAcid,
    "PHE" => ResidueType::Phenylalanine,
    "GLY" => ResidueType::Glycine,
    "HIS" => ResidueType::Histidine,
    "HSE" => ResidueType::Histidine,
    "HSD" => ResidueType::Histidine,
    "HSP" => ResidueType::Histidine,
    "ILE" => ResidueType::Isoleucine,
    "LYS" => ResidueType::Lysine,
    "LEU" => ResidueType::Leucine,
    "MET" => ResidueType::Methionine,
    "MSE" => ResidueType::Methionine,
    "ASN" => ResidueType::Asparagine,
    "PRO" => ResidueType::Proline,
    "GLN" => ResidueType::Glutamine,
    "ARG" => ResidueType::Arginine,
    "SER" => ResidueType::Serine,
    "THR" => ResidueType::Threonine,
    "VAL" => ResidueType::Valine,
    "TRP" => ResidueType::Tryptophan,
    "TYR" => ResidueType::Tyrosine,
    "UNK" => ResidueType::Unknown,
};

impl ResidueType {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            i if i < NUM_STANDARD_RESIDUES => Some(STANDARD_RESIDUES[i]),
            NUM_STANDARD_RESIDUES => Some(ResidueType::Unknown),
            _ => None,
        }
    }

    pub fn is_standard(self) -> bool {
        self != ResidueType::Unknown
    }

    pub fn three_letter(self) -> &'static str {
        match self {
            ResidueType::Alanine => "ALA",
            ResidueType::Cysteine => "CYS",
            ResidueType::AsparticAcid => "ASP",
            ResidueType::GlutamicAcid => "GLU",
            ResidueType::Phenylalanine => "PHE",
            ResidueType::Glycine => "GLY",
            ResidueType::Histidine => "HIS",
            ResidueType::Isoleucine => "ILE",
            ResidueType::Lysine => "LYS",
            ResidueType::Leucine => "LEU",
            ResidueType::Methionine => "MET",
            ResidueType::Asparagine => "ASN",
            ResidueType::Proline => "PRO",
            ResidueType::Glutamine => "GLN",
            ResidueType::Arginine => "ARG",
            ResidueType::Serine => "SER",
            ResidueType::Threonine => "THR",
            ResidueType::Valine => "VAL",
            ResidueType::Tryptophan => "TRP",
            ResidueType::Tyrosine => "TYR",
            ResidueType::Unknown => "UNK",
        }
    }

    pub fn one_letter(self) -> char {
        match self {
            ResidueType::Alanine => 'A',
            ResidueType::Cysteine => 'C',
            ResidueType::AsparticAcid => 'D',
            ResidueType::GlutamicAcid => 'E',
            ResidueType::Phenylalanine => 'F',
            ResidueType::Glycine => 'G',
            ResidueType::Histidine => 'H',
            ResidueType::Isoleucine => 'I',
            ResidueType::Lysine => 'K',
            ResidueType::Leucine => 'L',
            ResidueType::Methionine => 'M',
            ResidueType::Asparagine => 'N',
            ResidueType::Proline => 'P',
            ResidueType::Glutamine => 'Q',
            ResidueType::Arginine => 'R',
            ResidueType::Serine => 'S',
            ResidueType::Threonine => 'T',
            ResidueType::Valine => 'V',
            ResidueType::Tryptophan => 'W',
            ResidueType::Tyrosine => 'Y',
            ResidueType::Unknown => 'X',
        }
    }

    pub fn from_one_letter(code: char) -> Option<Self> {
        let upper = code.to_ascii_uppercase();
        if upper == 'X' {
            return Some(ResidueType::Unknown);
        }
        STANDARD_RESIDUES
            .iter()
            .copied()
            .find(|r| r.one_letter() == upper)
    }
}

impl FromStr for ResidueType {
    type Err = StructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        THREE_LETTER_CODES
            .get(code.as_str())
            .copied()
            .ok_or(StructureError::UnknownResidue { code })
    }
}

impl fmt::Display for ResidueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.three_letter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_one_letter_order() {
        let letters: String = STANDARD_RESIDUES.iter().map(|r| r.one_letter()).collect();
        assert_eq!(letters, "ACDEFGHIKLMNPQRSTVWY");
        for (i, residue) in STANDARD_RESIDUES.iter().enumerate() {
            assert_eq!(residue.index(), i);
            assert_eq!(ResidueType::from_index(i), Some(*residue));
        }
        assert_eq!(ResidueType::Unknown.index(), 20);
        assert_eq!(ResidueType::from_index(20), Some(ResidueType::Unknown));
        assert_eq!(ResidueType::from_index(21), None);
    }

    #[test]
    fn parses_three_letter_codes_case_insensitively() {
        assert_eq!("gly".parse::<ResidueType>().unwrap(), ResidueType::Glycine);
        assert_eq!(" MSE ".parse::<ResidueType>().unwrap(), ResidueType::Methionine);
        assert_eq!("HSP".parse::<ResidueType>().unwrap(), ResidueType::Histidine);
    }

    #[test]
    fn rejects_unknown_codes() {
        assert_eq!(
            "XYZ".parse::<ResidueType>(),
            Err(StructureError::UnknownResidue { code: "XYZ".into() })
        );
    }

    #[test]
    fn one_letter_round_trip_for_standard_residues() {
        for residue in STANDARD_RESIDUES {
            assert_eq!(ResidueType::from_one_letter(residue.one_letter()), Some(residue));
            assert_eq!(
                residue.three_letter().parse::<ResidueType>().unwrap(),
                residue
            );
        }
        assert_eq!(ResidueType::from_one_letter('B'), None);
    }
}
