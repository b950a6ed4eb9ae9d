use phf::{Map, Set, phf_map, phf_set};

/// Chain identifiers handed out to molecules in order of appearance.
pub const CHAIN_ID_LIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789abcdefghijklmnopqrstuvwxyz";

static AMINO_ACID_CODES: Map<&'static str, char> = phf_map! {
    "ALA" => 'A', "ARG" => 'R', "ASN" => 'N', "ASP" => 'D', "CYS" => 'C',
    "GLN" => 'Q', "GLU" => 'E', "GLY" => 'G', "HIS" => 'H', "ILE" => 'I',
    "LEU" => 'L', "LYS" => 'K', "MET" => 'M', "PHE" => 'F', "PRO" => 'P',
    "SER" => 'S', "THR" => 'T', "TRP" => 'W', "TYR" => 'Y', "VAL" => 'V',
};

static SINGLE_LETTER_ELEMENTS: Set<&'static str> = phf_set! {
    "H", "C", "N", "O", "F", "P", "S",
};

static ELEMENT_PREFIXES: Map<&'static str, &'static str> = phf_map! {
    "CA" => "C", "CB" => "C", "CG" => "C", "CD" => "C", "CE" => "C", "CH" => "C", "CZ" => "C",
    "ND" => "N", "NE" => "N", "NH" => "N", "NZ" => "N",
    "HA" => "H", "HB" => "H", "HG" => "H", "HD" => "H", "HE" => "H", "HH" => "H", "HT" => "H", "HZ" => "H",
    "OG" => "O", "OD" => "O", "OE" => "O", "OH" => "O", "OT" => "O",
    "SD" => "S", "SG" => "S",
};

static ELEMENTS_BY_ATOMIC_NUMBER: [&str; 54] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe",
];

static HET_CHEMICAL_NAMES: Map<&'static str, &'static str> = phf_map! {
    "TNS" => "Tensor",
    "COM" => "Centre of mass",
    "AXS" => "Tensor axes",
    "SIM" => "Monte Carlo simulation tensor axes",
    "PIV" => "Pivot point",
    "CON" => "Cone",
    "AVE" => "Average vector",
    "HOH" => "Water",
};

pub fn is_amino_acid(res_name: &str) -> bool {
    AMINO_ACID_CODES.contains_key(res_name.trim())
}

/// Returns the one-letter code for a residue name, `'X'` when it is not one of the
/// twenty standard amino acids.
pub fn one_letter_code(res_name: &str) -> char {
    AMINO_ACID_CODES
        .get(res_name.trim())
        .copied()
        .unwrap_or('X')
}

/// Guesses the element of an atom from its PDB atom name.
///
/// Primes and digits are stripped first, so `1HB`, `HB2` and `H5'` are handled. Names that
/// do not resolve to a known element yield `None`.
pub fn element_from_atom_name(atom_name: &str) -> Option<&'static str> {
    let stripped: String = atom_name
        .trim()
        .chars()
        .filter(|c| *c != '\'' && !c.is_ascii_digit())
        .collect();

    if let Some(element) = SINGLE_LETTER_ELEMENTS.get_key(stripped.as_str()) {
        return Some(*element);
    }
    stripped
        .get(0..2)
        .and_then(|prefix| ELEMENT_PREFIXES.get(prefix))
        .copied()
}

pub fn element_from_atomic_number(number: usize) -> Option<&'static str> {
    number
        .checked_sub(1)
        .and_then(|i| ELEMENTS_BY_ATOMIC_NUMBER.get(i))
        .copied()
}

pub fn het_chemical_name(res_name: &str) -> Option<&'static str> {
    HET_CHEMICAL_NAMES.get(res_name.trim()).copied()
}

/// Maps a molecule index onto the PDB chain identifier used for it on output.
pub fn chain_id_for_index(index: usize) -> Option<char> {
    CHAIN_ID_LIST.chars().nth(index)
}

/// Inverse of [`chain_id_for_index`].
pub fn index_for_chain_id(chain_id: char) -> Option<usize> {
    CHAIN_ID_LIST.chars().position(|c| c == chain_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_letter_code_maps_standard_residues_and_defaults_to_x() {
        assert_eq!(one_letter_code("ALA"), 'A');
        assert_eq!(one_letter_code(" TRP "), 'W');
        assert_eq!(one_letter_code("HOH"), 'X');
        assert_eq!(one_letter_code("ala"), 'X');
    }

    #[test]
    fn is_amino_acid_recognizes_only_the_twenty_standard_residues() {
        assert!(is_amino_acid("GLY"));
        assert!(is_amino_acid("LYS"));
        assert!(!is_amino_acid("HOH"));
        assert!(!is_amino_acid("TNS"));
    }

    #[test]
    fn element_from_atom_name_handles_single_letters_and_digits() {
        assert_eq!(element_from_atom_name("N"), Some("N"));
        assert_eq!(element_from_atom_name("O5'"), Some("O"));
        assert_eq!(element_from_atom_name("1HB"), Some("H"));
        assert_eq!(element_from_atom_name("H2"), Some("H"));
    }

    #[test]
    fn element_from_atom_name_resolves_greek_branch_prefixes() {
        assert_eq!(element_from_atom_name("CA"), Some("C"));
        assert_eq!(element_from_atom_name("CG1"), Some("C"));
        assert_eq!(element_from_atom_name("NZ"), Some("N"));
        assert_eq!(element_from_atom_name("HD21"), Some("H"));
        assert_eq!(element_from_atom_name("OXT"), None);
        assert_eq!(element_from_atom_name("SG"), Some("S"));
        assert_eq!(element_from_atom_name("ZN"), None);
    }

    #[test]
    fn element_from_atomic_number_is_one_based() {
        assert_eq!(element_from_atomic_number(1), Some("H"));
        assert_eq!(element_from_atomic_number(6), Some("C"));
        assert_eq!(element_from_atomic_number(26), Some("Fe"));
        assert_eq!(element_from_atomic_number(0), None);
        assert_eq!(element_from_atomic_number(200), None);
    }

    #[test]
    fn het_chemical_name_knows_special_residues() {
        assert_eq!(het_chemical_name("COM"), Some("Centre of mass"));
        assert_eq!(het_chemical_name("PIV"), Some("Pivot point"));
        assert_eq!(het_chemical_name("XYZ"), None);
    }

    #[test]
    fn chain_ids_round_trip_through_indices() {
        assert_eq!(chain_id_for_index(0), Some('A'));
        assert_eq!(chain_id_for_index(26), Some('0'));
        assert_eq!(chain_id_for_index(62), None);
        assert_eq!(index_for_chain_id('B'), Some(1));
        assert_eq!(index_for_chain_id('#'), None);
    }
}
