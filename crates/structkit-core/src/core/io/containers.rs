use crate::core::models::molecule::Molecule;
use crate::core::models::secondary::{Helix, Sheet};

/// A molecule as read from a file, tagged with its 1-based position in that file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMolecule {
    pub file_mol_num: usize,
    pub molecule: Molecule,
}

/// A model as read from a file, before it is packed into a structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedModel {
    /// The model number found in the file, if any.
    pub number: Option<u32>,
    pub molecules: Vec<ParsedMolecule>,
}

/// Everything a reader extracted from one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFile {
    pub models: Vec<ParsedModel>,
    pub helices: Vec<Helix>,
    pub sheets: Vec<Sheet>,
}

impl ParsedFile {
    pub fn is_empty(&self) -> bool {
        self.models.iter().all(|m| m.molecules.is_empty())
    }
}

/// Filters applied while reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// 1-based molecule numbers to keep; `None` keeps all.
    pub read_mol: Option<Vec<usize>>,
    /// Model numbers to keep; `None` keeps all.
    pub read_model: Option<Vec<u32>>,
    /// The alternate location indicator to keep.
    pub alt_loc: Option<char>,
}

impl ReadOptions {
    pub fn wants_mol(&self, number: usize) -> bool {
        self.read_mol.as_ref().is_none_or(|list| list.contains(&number))
    }

    pub fn wants_model(&self, number: u32) -> bool {
        self.read_model.as_ref().is_none_or(|list| list.contains(&number))
    }
}
