use std::collections::{BTreeMap, BTreeSet};

/// A resolved selection: atom indices grouped by molecule index, both in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSelection {
    entries: BTreeMap<usize, BTreeSet<usize>>,
}

impl IndexSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mol_index: usize, atom_index: usize) {
        self.entries.entry(mol_index).or_default().insert(atom_index);
    }

    pub fn contains(&self, mol_index: usize, atom_index: usize) -> bool {
        self.entries
            .get(&mol_index)
            .is_some_and(|atoms| atoms.contains(&atom_index))
    }

    pub fn contains_molecule(&self, mol_index: usize) -> bool {
        self.entries.contains_key(&mol_index)
    }

    pub fn atoms_of(&self, mol_index: usize) -> Option<&BTreeSet<usize>> {
        self.entries.get(&mol_index)
    }

    /// Iterates over `(molecule index, atom indices)` pairs.
    pub fn molecules(&self) -> impl Iterator<Item = (usize, &BTreeSet<usize>)> {
        self.entries.iter().map(|(m, atoms)| (*m, atoms))
    }

    /// Iterates over all `(molecule index, atom index)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.entries
            .iter()
            .flat_map(|(m, atoms)| atoms.iter().map(move |a| (*m, *a)))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<(usize, usize)> for IndexSelection {
    fn from_iter<T: IntoIterator<Item = (usize, usize)>>(iter: T) -> Self {
        let mut selection = Self::new();
        for (mol, atom) in iter {
            selection.insert(mol, atom);
        }
        selection
    }
}
