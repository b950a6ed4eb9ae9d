use super::molecule::Molecule;

/// One member of an ensemble, e.g. a single NMR conformer.
///
/// Files without `MODEL` records produce a single unnumbered model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub number: Option<u32>,
    molecules: Vec<Molecule>,
}

impl Model {
    pub fn new(number: Option<u32>) -> Self {
        Self {
            number,
            molecules: Vec::new(),
        }
    }

    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    pub fn molecules_mut(&mut self) -> &mut [Molecule] {
        &mut self.molecules
    }

    pub fn molecule_at(&self, index: usize) -> Option<&Molecule> {
        self.molecules.get(index)
    }

    pub fn molecule_index(&self, name: Option<&str>) -> Option<usize> {
        self.molecules.iter().position(|m| m.name() == name)
    }

    pub fn molecule(&self, name: Option<&str>) -> Option<&Molecule> {
        self.molecule_index(name).map(|i| &self.molecules[i])
    }

    pub fn molecule_mut(&mut self, name: Option<&str>) -> Option<&mut Molecule> {
        self.molecule_index(name)
            .map(move |i| &mut self.molecules[i])
    }

    pub fn add_molecule(&mut self, molecule: Molecule) -> usize {
        self.molecules.push(molecule);
        self.molecules.len() - 1
    }

    /// Returns the index of the named molecule, creating an empty one if needed.
    pub fn ensure_molecule(&mut self, name: Option<&str>) -> usize {
        match self.molecule_index(name) {
            Some(index) => index,
            None => self.add_molecule(Molecule::new(name)),
        }
    }

    pub fn num_molecules(&self) -> usize {
        self.molecules.len()
    }

    pub fn num_atoms(&self) -> usize {
        self.molecules.iter().map(Molecule::len).sum()
    }

    /// A model with no molecules, or with only blank molecules, holds no data.
    pub fn is_empty(&self) -> bool {
        self.molecules.iter().all(Molecule::is_blank)
    }
}
