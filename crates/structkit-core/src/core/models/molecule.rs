use super::atom::Atom;
use super::structure::StructureError;
use crate::core::utils::identifiers::is_amino_acid;
use nalgebra::Point3;
use std::collections::HashSet;
use std::path::PathBuf;

/// Where a molecule was loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSource {
    /// The bare file name.
    pub file_name: String,
    /// The path as supplied by the caller.
    pub file_path: Option<PathBuf>,
    /// The absolute path, when it could be resolved.
    pub file_path_abs: Option<PathBuf>,
    /// The molecule number within the source file (1-based).
    pub file_mol_num: Option<usize>,
    /// The model number within the source file.
    pub file_model: Option<u32>,
}

/// Broad chemical classification used when bonds have to be guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoleculeKind {
    Protein,
    Other,
}

/// A molecule within a single model: its atoms plus the bond adjacency list.
///
/// The atom list and the adjacency list always have the same length, and bonds are kept
/// symmetric, so both are only reachable through methods that maintain this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Molecule {
    pub name: Option<String>,
    pub source: Option<FileSource>,
    atoms: Vec<Atom>,
    bonded: Vec<Vec<usize>>,
}

impl Molecule {
    pub fn new(name: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Mutable access to the atoms; the list itself cannot grow or shrink through this.
    pub fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// True for a molecule that carries no information at all.
    pub fn is_blank(&self) -> bool {
        self.atoms.is_empty() && self.name.is_none() && self.source.is_none()
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.bonded.push(Vec::new());
        self.atoms.len() - 1
    }

    /// Bonds two atoms. Connecting an already bonded pair, or an atom to itself, is a no-op.
    pub fn connect(&mut self, index1: usize, index2: usize) -> Result<(), StructureError> {
        for index in [index1, index2] {
            if index >= self.atoms.len() {
                return Err(StructureError::AtomIndexOutOfRange {
                    index,
                    len: self.atoms.len(),
                });
            }
        }
        if index1 == index2 {
            return Ok(());
        }
        if !self.bonded[index1].contains(&index2) {
            self.bonded[index1].push(index2);
        }
        if !self.bonded[index2].contains(&index1) {
            self.bonded[index2].push(index1);
        }
        Ok(())
    }

    pub fn bonded(&self, index: usize) -> &[usize] {
        self.bonded.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn are_bonded(&self, index1: usize, index2: usize) -> bool {
        self.bonded(index1).contains(&index2)
    }

    pub fn num_bonds(&self) -> usize {
        self.bonded.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn index_of_number(&self, number: u32) -> Option<usize> {
        self.atoms.iter().position(|a| a.number == Some(number))
    }

    pub fn index_of_name(&self, res_num: Option<i32>, name: &str) -> Option<usize> {
        self.atoms
            .iter()
            .position(|a| a.res_num == res_num && a.name.as_deref() == Some(name))
    }

    pub fn last_residue_number(&self) -> Option<i32> {
        self.atoms.iter().rev().find_map(|a| a.res_num)
    }

    /// Residues in order of appearance; a new residue starts whenever the residue number
    /// changes from one atom to the next.
    pub fn residues(&self) -> Vec<(Option<i32>, Option<String>)> {
        let mut residues: Vec<(Option<i32>, Option<String>)> = Vec::new();
        for atom in &self.atoms {
            if residues.last().map(|(num, _)| *num) != Some(atom.res_num) {
                residues.push((atom.res_num, atom.res_name.clone()));
            }
        }
        residues
    }

    /// Indices of the atoms of each residue, grouped the same way as [`Molecule::residues`].
    pub fn residue_atom_indices(&self) -> Vec<Vec<usize>> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut current: Option<Option<i32>> = None;
        for (i, atom) in self.atoms.iter().enumerate() {
            if current != Some(atom.res_num) {
                groups.push(Vec::new());
                current = Some(atom.res_num);
            }
            if let Some(group) = groups.last_mut() {
                group.push(i);
            }
        }
        groups
    }

    pub fn kind(&self) -> MoleculeKind {
        let is_protein = self
            .atoms
            .iter()
            .filter_map(|a| a.res_name.as_deref())
            .any(is_amino_acid);
        if is_protein {
            MoleculeKind::Protein
        } else {
            MoleculeKind::Other
        }
    }

    /// Appends all atoms and bonds of `other`.
    ///
    /// Incoming atoms keep their numbers unless a number is already taken, in which case
    /// they are numbered after the current maximum.
    pub fn merge(&mut self, other: Molecule) {
        let offset = self.atoms.len();
        let mut taken: HashSet<u32> = self.atoms.iter().filter_map(|a| a.number).collect();
        let mut next_free = taken.iter().max().copied().unwrap_or(0) + 1;

        for mut atom in other.atoms {
            if let Some(number) = atom.number {
                if taken.contains(&number) {
                    while taken.contains(&next_free) {
                        next_free += 1;
                    }
                    atom.number = Some(next_free);
                }
            }
            if let Some(number) = atom.number {
                taken.insert(number);
            }
            self.atoms.push(atom);
        }
        self.bonded.extend(
            other
                .bonded
                .into_iter()
                .map(|list| list.into_iter().map(|j| j + offset).collect()),
        );
    }

    /// Removes an atom, dropping every bond to it and shifting higher indices down by one.
    pub fn remove_atom(&mut self, index: usize) -> Result<Atom, StructureError> {
        if index >= self.atoms.len() {
            return Err(StructureError::AtomIndexOutOfRange {
                index,
                len: self.atoms.len(),
            });
        }
        let atom = self.atoms.remove(index);
        self.bonded.remove(index);
        for list in &mut self.bonded {
            list.retain(|&j| j != index);
            for j in list.iter_mut() {
                if *j > index {
                    *j -= 1;
                }
            }
        }
        Ok(atom)
    }

    /// Drops all atoms and bonds.
    pub fn clear_atoms(&mut self) {
        self.atoms.clear();
        self.bonded.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;

    fn atom(number: u32, name: &str, res_num: i32, res_name: &str) -> Atom {
        Atom::new(Point3::new(number as f64, 0.0, 0.0))
            .with_number(number)
            .with_name(name)
            .with_residue(res_num, res_name)
    }

    fn create_chain_molecule() -> Molecule {
        let mut mol = Molecule::new(Some("chain"));
        mol.add_atom(atom(1, "N", 1, "GLY"));
        mol.add_atom(atom(2, "CA", 1, "GLY"));
        mol.add_atom(atom(3, "C", 1, "GLY"));
        mol.add_atom(atom(4, "N", 2, "ALA"));
        mol.connect(0, 1).unwrap();
        mol.connect(1, 2).unwrap();
        mol.connect(2, 3).unwrap();
        mol
    }

    fn assert_symmetric(mol: &Molecule) {
        for i in 0..mol.len() {
            for &j in mol.bonded(i) {
                assert!(mol.bonded(j).contains(&i), "bond {i}-{j} is not symmetric");
            }
        }
    }

    #[test]
    fn connect_is_symmetric_and_idempotent() {
        let mut mol = create_chain_molecule();
        mol.connect(1, 0).unwrap();
        mol.connect(3, 3).unwrap();
        assert_eq!(mol.bonded(0), &[1]);
        assert_eq!(mol.bonded(1), &[0, 2]);
        assert_eq!(mol.num_bonds(), 3);
        assert_symmetric(&mol);
    }

    #[test]
    fn connect_rejects_out_of_range_indices() {
        let mut mol = create_chain_molecule();
        let err = mol.connect(0, 10).unwrap_err();
        assert_eq!(
            err,
            StructureError::AtomIndexOutOfRange { index: 10, len: 4 }
        );
    }

    #[test]
    fn remove_atom_renumbers_bonds() {
        let mut mol = create_chain_molecule();
        let removed = mol.remove_atom(1).unwrap();
        assert_eq!(removed.name.as_deref(), Some("CA"));
        assert_eq!(mol.len(), 3);
        assert!(mol.bonded(0).is_empty());
        assert_eq!(mol.bonded(1), &[2]);
        assert_eq!(mol.bonded(2), &[1]);
        assert_symmetric(&mol);
    }

    #[test]
    fn residues_are_grouped_by_consecutive_numbers() {
        let mol = create_chain_molecule();
        assert_eq!(
            mol.residues(),
            vec![
                (Some(1), Some("GLY".to_string())),
                (Some(2), Some("ALA".to_string()))
            ]
        );
        assert_eq!(mol.residue_atom_indices(), vec![vec![0, 1, 2], vec![3]]);
        assert_eq!(mol.last_residue_number(), Some(2));
    }

    #[test]
    fn merge_offsets_bonds_and_resolves_number_clashes() {
        let mut mol = create_chain_molecule();
        let mut other = Molecule::new(Some("chain"));
        other.add_atom(atom(2, "O", 3, "HOH"));
        other.add_atom(atom(9, "H1", 3, "HOH"));
        other.connect(0, 1).unwrap();

        mol.merge(other);

        assert_eq!(mol.len(), 6);
        assert_eq!(mol.atom(4).unwrap().number, Some(5));
        assert_eq!(mol.atom(5).unwrap().number, Some(9));
        assert_eq!(mol.bonded(4), &[5]);
        assert_eq!(mol.bonded(5), &[4]);
        assert_symmetric(&mol);
    }

    #[test]
    fn lookups_by_number_and_name() {
        let mol = create_chain_molecule();
        assert_eq!(mol.index_of_number(3), Some(2));
        assert_eq!(mol.index_of_number(42), None);
        assert_eq!(mol.index_of_name(Some(2), "N"), Some(3));
        assert_eq!(mol.index_of_name(Some(1), "CB"), None);
    }

    #[test]
    fn kind_detects_amino_acids() {
        assert_eq!(create_chain_molecule().kind(), MoleculeKind::Protein);
        let mut water = Molecule::new(Some("water"));
        water.add_atom(atom(1, "O", 1, "HOH"));
        assert_eq!(water.kind(), MoleculeKind::Other);
    }

    #[test]
    fn blank_molecule_has_no_name_atoms_or_source() {
        assert!(Molecule::new(None).is_blank());
        assert!(!Molecule::new(Some("x")).is_blank());
    }
}
