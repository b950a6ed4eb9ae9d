use super::atom::Atom;
use super::model::Model;
use super::molecule::{Molecule, MoleculeKind};
use super::secondary::{Helix, Sheet};
use super::topology::{self, DEFAULT_BOND_RADIUS};
use crate::core::selection::{AtomSelection, IndexSelection, SelectionError, wildcard_regex};
use crate::core::utils::geometry::rotate_about;
use crate::core::utils::identifiers::{chain_id_for_index, one_letter_code};
use nalgebra::{Point3, Rotation3, Vector3};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructureError {
    #[error("Model {0} already exists")]
    DuplicateModel(u32),
    #[error("Model {0} does not exist")]
    ModelNotFound(u32),
    #[error("The structure holds {count} models, so a model number must be supplied")]
    AmbiguousModel { count: usize },
    #[error("The structure holds no models")]
    NoModels,
    #[error("Molecule '{0}' already exists")]
    DuplicateMolecule(String),
    #[error("Molecule '{0}' does not exist")]
    MoleculeNotFound(String),
    #[error("Atom index {index} is out of range for a molecule of {len} atoms")]
    AtomIndexOutOfRange { index: usize, len: usize },
    #[error("{actual} atomic positions were supplied for {expected} models")]
    PositionCount { expected: usize, actual: usize },
    #[error("Inconsistent models: {0}")]
    Inconsistent(String),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

const ATOM_NOT_FOUND: &str = "Cannot find the atom in the structure";
const NO_ATTACHED_ATOM: &str = "No attached atom could be found";
const MULTIPLE_ATTACHED_ATOMS: &str = "More than one attached atom found";

/// Positions for an atom added to every model at once.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomPositions {
    /// The same position in every model.
    Single(Point3<f64>),
    /// One position per model, in storage order.
    PerModel(Vec<Point3<f64>>),
}

/// Criteria identifying a single atom. Unset criteria match anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomQuery<'a> {
    pub mol_name: Option<&'a str>,
    pub res_num: Option<i32>,
    pub res_name: Option<&'a str>,
    pub atom_num: Option<u32>,
    pub atom_name: Option<&'a str>,
}

impl AtomQuery<'_> {
    fn matches(&self, atom: &Atom) -> bool {
        self.res_num.is_none_or(|n| atom.res_num == Some(n))
            && self.res_name.is_none_or(|n| atom.res_name.as_deref() == Some(n))
            && self.atom_num.is_none_or(|n| atom.number == Some(n))
            && self.atom_name.is_none_or(|n| atom.name.as_deref() == Some(n))
    }
}

/// The result of [`Structure::bond_vectors`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BondVectors {
    /// One vector per model in which the attached atom was found.
    pub vectors: Vec<Vector3<f64>>,
    pub attached_name: Option<String>,
    pub warning: Option<String>,
}

/// A view of one selected atom across the looped models.
#[derive(Debug, Clone)]
pub struct AtomView<'a> {
    pub mol_index: usize,
    pub mol_name: Option<&'a str>,
    pub atom_index: usize,
    /// The atom as stored in the first looped model.
    pub atom: &'a Atom,
    /// One position per looped model, or a single averaged position.
    pub positions: Vec<Point3<f64>>,
}

enum AttachedLookup {
    Found(usize),
    NotFound,
    Ambiguous,
}

fn model_label(number: Option<u32>) -> String {
    number.map_or_else(|| "<unnumbered>".to_string(), |n| n.to_string())
}

fn molecule_label(name: Option<&str>) -> String {
    name.unwrap_or("<unnamed>").to_string()
}

fn residue_map(molecule: &Molecule) -> BTreeMap<i32, String> {
    let mut map = BTreeMap::new();
    for atom in molecule.atoms() {
        if let (Some(num), Some(name)) = (atom.res_num, &atom.res_name) {
            map.entry(num).or_insert_with(|| name.clone());
        }
    }
    map
}

fn chain_of(molecule: &Molecule, mol_index: usize) -> Option<char> {
    molecule
        .atoms()
        .iter()
        .find_map(|a| a.chain_id)
        .or_else(|| chain_id_for_index(mol_index))
}

fn find_attached(
    molecule: &mut Molecule,
    index: usize,
    pattern: &Regex,
) -> Result<AttachedLookup, StructureError> {
    if molecule.bonded(index).is_empty() {
        match molecule.kind() {
            MoleculeKind::Protein => topology::protein_connect(molecule)?,
            MoleculeKind::Other => {
                topology::find_bonded_atoms(molecule, index, DEFAULT_BOND_RADIUS)?;
            }
        }
    }
    let matches: Vec<usize> = molecule
        .bonded(index)
        .iter()
        .copied()
        .filter(|&j| {
            molecule.atoms()[j]
                .name
                .as_deref()
                .is_some_and(|name| pattern.is_match(name))
        })
        .collect();
    Ok(match matches.as_slice() {
        [j] => AttachedLookup::Found(*j),
        [] => AttachedLookup::NotFound,
        _ => AttachedLookup::Ambiguous,
    })
}

/// A multi-model, multi-molecule atomic structure.
///
/// Every model is expected to carry the same molecules in the same order; operations
/// that depend on this check it through [`Structure::validate`] or
/// [`Structure::validate_models`]. Secondary structure annotations are held at the
/// structure level and are trimmed when residues disappear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    models: Vec<Model>,
    helices: Vec<Helix>,
    sheets: Vec<Sheet>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.models.iter().all(Model::is_empty)
    }

    pub fn num_models(&self) -> usize {
        self.models.len()
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn model_list(&self) -> Vec<Option<u32>> {
        self.models.iter().map(|m| m.number).collect()
    }

    pub fn first_model(&self) -> Option<&Model> {
        self.models.first()
    }

    pub fn model(&self, number: u32) -> Option<&Model> {
        self.models.iter().find(|m| m.number == Some(number))
    }

    pub fn model_mut(&mut self, number: u32) -> Option<&mut Model> {
        self.models.iter_mut().find(|m| m.number == Some(number))
    }

    fn model_position(&self, number: u32) -> Option<usize> {
        self.models.iter().position(|m| m.number == Some(number))
    }

    pub fn helices(&self) -> &[Helix] {
        &self.helices
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn add_helix(&mut self, helix: Helix) {
        self.helices.push(helix);
    }

    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn delete_secondary_structure(&mut self) {
        self.helices.clear();
        self.sheets.clear();
    }

    /// The number of molecules per model, after checking that all models agree.
    pub fn num_molecules(&self) -> Result<usize, StructureError> {
        self.validate()?;
        Ok(self.models.first().map_or(0, Model::num_molecules))
    }

    /// The models to operate on: only `model` when given, otherwise all of them ordered by
    /// number with unnumbered models first.
    pub fn model_loop(&self, model: Option<u32>) -> Vec<&Model> {
        match model {
            Some(n) => self.model(n).into_iter().collect(),
            None => {
                let mut models: Vec<&Model> = self.models.iter().collect();
                models.sort_by_key(|m| m.number);
                models
            }
        }
    }

    fn target_indices(&self, model: Option<u32>) -> Result<Vec<usize>, StructureError> {
        match model {
            Some(n) => self
                .model_position(n)
                .map(|i| vec![i])
                .ok_or(StructureError::ModelNotFound(n)),
            None => {
                let mut indices: Vec<usize> = (0..self.models.len()).collect();
                indices.sort_by_key(|&i| self.models[i].number);
                Ok(indices)
            }
        }
    }

    /// Returns the requested model, creating it when it does not exist yet.
    ///
    /// Without a number the structure must hold at most one model.
    pub fn get_model(&mut self, number: Option<u32>) -> Result<&mut Model, StructureError> {
        let index = match number {
            None => match self.models.len() {
                0 => {
                    self.models.push(Model::new(None));
                    0
                }
                1 => 0,
                count => return Err(StructureError::AmbiguousModel { count }),
            },
            Some(n) => match self.model_position(n) {
                Some(i) => i,
                None => {
                    self.models.push(Model::new(Some(n)));
                    self.models.len() - 1
                }
            },
        };
        Ok(&mut self.models[index])
    }

    pub fn get_molecule(
        &self,
        name: &str,
        model: Option<u32>,
    ) -> Result<Option<&Molecule>, StructureError> {
        let model = match model {
            None if self.models.len() > 1 => {
                return Err(StructureError::AmbiguousModel {
                    count: self.models.len(),
                });
            }
            None => self.models.first(),
            Some(n) => self.model(n),
        };
        Ok(model.and_then(|m| m.molecule(Some(name))))
    }

    pub fn has_molecule(&self, name: &str, model: Option<u32>) -> Result<bool, StructureError> {
        Ok(self.get_molecule(name, model)?.is_some())
    }

    fn number_unnumbered_models(&mut self, reserved: Option<u32>) {
        let mut used: BTreeSet<u32> = self.models.iter().filter_map(|m| m.number).collect();
        used.extend(reserved);
        let mut next = 1;
        for model in self.models.iter_mut().filter(|m| m.number.is_none()) {
            while used.contains(&next) {
                next += 1;
            }
            model.number = Some(next);
            used.insert(next);
        }
    }

    /// Adds a model whose molecules, atoms and bonds are copied from the first model, or
    /// from model `coords_from` when given.
    ///
    /// Without a number the new model is numbered after the highest existing one. Adding a
    /// second model numbers any unnumbered models first. Returns the new model's number.
    pub fn add_model(
        &mut self,
        number: Option<u32>,
        coords_from: Option<u32>,
    ) -> Result<Option<u32>, StructureError> {
        if let Some(n) = number {
            if self.model_position(n).is_some() {
                return Err(StructureError::DuplicateModel(n));
            }
        }
        let template = match coords_from {
            Some(n) => Some(
                self.model(n)
                    .ok_or(StructureError::ModelNotFound(n))?
                    .molecules()
                    .to_vec(),
            ),
            None => self.models.first().map(|m| m.molecules().to_vec()),
        };

        let number = if self.models.is_empty() {
            number
        } else {
            self.number_unnumbered_models(number);
            Some(number.unwrap_or_else(|| {
                self.models.iter().filter_map(|m| m.number).max().unwrap_or(0) + 1
            }))
        };

        let mut model = Model::new(number);
        for molecule in template.unwrap_or_default() {
            model.add_molecule(molecule);
        }
        self.models.push(model);
        debug!(model = %model_label(number), "Added model.");
        Ok(number)
    }

    /// Adds an empty molecule to every model, or only to `model`.
    pub fn add_molecule(&mut self, name: &str, model: Option<u32>) -> Result<(), StructureError> {
        if self.models.is_empty() {
            self.models.push(Model::new(None));
        }
        let targets = self.target_indices(model)?;
        if targets
            .iter()
            .any(|&i| self.models[i].molecule_index(Some(name)).is_some())
        {
            return Err(StructureError::DuplicateMolecule(name.to_string()));
        }
        for i in targets {
            self.models[i].add_molecule(Molecule::new(Some(name)));
        }
        Ok(())
    }

    /// Adds an atom to the named molecule of every model, creating the molecule (and a
    /// first model) when missing. Returns the atom's index within its molecule.
    pub fn add_atom(
        &mut self,
        mol_name: Option<&str>,
        atom: Atom,
        positions: AtomPositions,
    ) -> Result<usize, StructureError> {
        if self.models.is_empty() {
            self.models.push(Model::new(None));
        }
        if let AtomPositions::PerModel(list) = &positions {
            if list.len() != self.models.len() {
                return Err(StructureError::PositionCount {
                    expected: self.models.len(),
                    actual: list.len(),
                });
            }
        }

        let mut index = 0;
        for (i, model) in self.models.iter_mut().enumerate() {
            let mut atom = atom.clone();
            atom.position = match &positions {
                AtomPositions::Single(p) => *p,
                AtomPositions::PerModel(list) => list[i],
            };
            let mol_index = model.ensure_molecule(mol_name);
            index = model.molecules_mut()[mol_index].add_atom(atom);
        }
        Ok(index)
    }

    /// Bonds two atoms of the named molecule in every model.
    pub fn connect_atom(
        &mut self,
        mol_name: Option<&str>,
        index1: usize,
        index2: usize,
    ) -> Result<(), StructureError> {
        for model in &mut self.models {
            model
                .molecule_mut(mol_name)
                .ok_or_else(|| StructureError::MoleculeNotFound(molecule_label(mol_name)))?
                .connect(index1, index2)?;
        }
        Ok(())
    }

    /// Resolves a selection string against the first model. `None` selects everything.
    pub fn select(&self, atom_id: Option<&str>) -> Result<IndexSelection, StructureError> {
        let selection = match atom_id {
            Some(id) => id.parse::<AtomSelection>()?,
            None => AtomSelection::all(),
        };
        self.select_with(&selection)
    }

    pub fn select_with(&self, selection: &AtomSelection) -> Result<IndexSelection, StructureError> {
        self.validate()?;
        let mut result = IndexSelection::new();
        let Some(model) = self.models.first() else {
            return Ok(result);
        };
        for (mol_index, mol) in model.molecules().iter().enumerate() {
            if !selection.contains_mol(mol.name()) {
                continue;
            }
            for (atom_index, atom) in mol.atoms().iter().enumerate() {
                if selection.contains_atom(
                    atom.number,
                    atom.name.as_deref(),
                    atom.res_num,
                    atom.res_name.as_deref(),
                    mol.name(),
                ) {
                    result.insert(mol_index, atom_index);
                }
            }
        }
        Ok(result)
    }

    /// Checks whether the first atoms matching two selection strings are bonded in the
    /// first model. Atoms without any bonds are connected by a distance search first.
    pub fn are_bonded(&mut self, atom_id1: &str, atom_id2: &str) -> Result<bool, StructureError> {
        let first = self.select(Some(atom_id1))?.iter().next();
        let second = self.select(Some(atom_id2))?.iter().next();
        let (Some((mol1, index1)), Some((mol2, index2))) = (first, second) else {
            return Ok(false);
        };
        if mol1 != mol2 {
            return Ok(false);
        }
        let molecule = &mut self.models[0].molecules_mut()[mol1];
        for index in [index1, index2] {
            if molecule.bonded(index).is_empty() {
                topology::find_bonded_atoms(molecule, index, DEFAULT_BOND_RADIUS)?;
            }
        }
        Ok(molecule.are_bonded(index1, index2))
    }

    /// Computes the bond vectors from a base atom to its bonded neighbour named `attached`
    /// (wildcards allowed), one per model.
    ///
    /// The base atom is located in the first model. When it has no bonds yet they are
    /// built from backbone templates for proteins and from a distance search otherwise.
    pub fn bond_vectors(
        &mut self,
        attached: &str,
        query: &AtomQuery<'_>,
        model: Option<u32>,
    ) -> Result<BondVectors, StructureError> {
        let pattern = wildcard_regex(attached)?;
        let mut result = BondVectors::default();

        let base = self.models.first().and_then(|first| {
            first
                .molecules()
                .iter()
                .enumerate()
                .filter(|(_, mol)| query.mol_name.is_none_or(|name| mol.name() == Some(name)))
                .find_map(|(mi, mol)| {
                    mol.atoms()
                        .iter()
                        .position(|a| query.matches(a))
                        .map(|ai| (mi, ai))
                })
        });
        let Some((mol_index, index)) = base else {
            result.warning = Some(ATOM_NOT_FOUND.to_string());
            return Ok(result);
        };

        for i in self.target_indices(model)? {
            let Some(mol) = self.models[i].molecules_mut().get_mut(mol_index) else {
                continue;
            };
            if index >= mol.len() {
                continue;
            }
            match find_attached(mol, index, &pattern)? {
                AttachedLookup::Found(j) => {
                    let atoms = mol.atoms();
                    result.vectors.push(atoms[j].position - atoms[index].position);
                    result.attached_name = atoms[j].name.clone();
                }
                AttachedLookup::NotFound => {
                    warn!(attached, "{}", NO_ATTACHED_ATOM);
                    result.warning = Some(NO_ATTACHED_ATOM.to_string());
                }
                AttachedLookup::Ambiguous => {
                    warn!(attached, "{}", MULTIPLE_ATTACHED_ATOMS);
                    result.warning = Some(MULTIPLE_ATTACHED_ATOMS.to_string());
                }
            }
        }
        Ok(result)
    }

    /// The one-letter sequence of a molecule in the first model.
    pub fn one_letter_codes(&self, mol_name: &str) -> Result<String, StructureError> {
        let molecule = self
            .models
            .first()
            .and_then(|m| m.molecule(Some(mol_name)))
            .ok_or_else(|| StructureError::MoleculeNotFound(mol_name.to_string()))?;
        Ok(molecule
            .residues()
            .iter()
            .map(|(_, name)| name.as_deref().map_or('X', one_letter_code))
            .collect())
    }

    /// Walks the selected atoms of the first looped model, gathering their positions in all
    /// looped models.
    ///
    /// With `average_positions` the positions are collapsed into their mean, which requires
    /// identical atom numbering across models.
    pub fn atom_loop(
        &self,
        selection: Option<&IndexSelection>,
        model: Option<u32>,
        average_positions: bool,
    ) -> Result<Vec<AtomView<'_>>, StructureError> {
        let targets = self.target_indices(model)?;
        let Some(&reference) = targets.first() else {
            return Ok(Vec::new());
        };

        let mut views = Vec::new();
        for (mol_index, mol) in self.models[reference].molecules().iter().enumerate() {
            for (atom_index, atom) in mol.atoms().iter().enumerate() {
                if selection.is_some_and(|s| !s.contains(mol_index, atom_index)) {
                    continue;
                }
                let mut positions = Vec::with_capacity(targets.len());
                for &t in &targets {
                    let other = self.models[t]
                        .molecule_at(mol_index)
                        .and_then(|m| m.atom(atom_index))
                        .ok_or_else(|| {
                            StructureError::Inconsistent(format!(
                                "atom {} of molecule {} is missing from model {}",
                                atom_index,
                                molecule_label(mol.name()),
                                model_label(self.models[t].number)
                            ))
                        })?;
                    if average_positions && other.number != atom.number {
                        return Err(StructureError::Inconsistent(format!(
                            "atom numbers {:?} and {:?} differ between models, positions cannot be averaged",
                            atom.number, other.number
                        )));
                    }
                    positions.push(other.position);
                }
                if average_positions {
                    let sum = positions
                        .iter()
                        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
                    positions = vec![Point3::from(sum / positions.len() as f64)];
                }
                views.push(AtomView {
                    mol_index,
                    mol_name: mol.name(),
                    atom_index,
                    atom,
                    positions,
                });
            }
        }
        Ok(views)
    }

    pub fn delete_all(&mut self) {
        self.models.clear();
        self.delete_secondary_structure();
    }

    pub fn delete_model(&mut self, number: u32) -> Result<(), StructureError> {
        let index = self
            .model_position(number)
            .ok_or(StructureError::ModelNotFound(number))?;
        self.models.remove(index);
        Ok(())
    }

    /// Deletes the selected atoms from every model, or only from `model`.
    ///
    /// Bonds are renumbered, and molecules left without atoms lose their provenance.
    /// Residues that disappear entirely trim the helices and sheets covering them, unless
    /// only one model of a multi-model structure was edited.
    pub fn delete_atoms(
        &mut self,
        selection: &IndexSelection,
        model: Option<u32>,
    ) -> Result<(), StructureError> {
        let targets = self.target_indices(model)?;
        let Some(&reference) = targets.first() else {
            return Ok(());
        };

        let before: Vec<(usize, Option<char>, BTreeMap<i32, String>)> = selection
            .molecules()
            .filter_map(|(mol_index, _)| {
                let mol = self.models[reference].molecule_at(mol_index)?;
                Some((mol_index, chain_of(mol, mol_index), residue_map(mol)))
            })
            .collect();

        for &t in &targets {
            for (mol_index, atoms) in selection.molecules() {
                let Some(mol) = self.models[t].molecules_mut().get_mut(mol_index) else {
                    continue;
                };
                for &atom_index in atoms.iter().rev() {
                    if atom_index < mol.len() {
                        mol.remove_atom(atom_index)?;
                    }
                }
                if mol.is_empty() {
                    mol.source = None;
                }
            }
        }
        debug!(atoms = selection.len(), models = targets.len(), "Deleted atoms.");

        if model.is_some() && self.models.len() > 1 {
            return Ok(());
        }

        for (mol_index, chain, residues) in before {
            let remaining: BTreeSet<i32> = self.models[reference]
                .molecule_at(mol_index)
                .map(|m| m.atoms().iter().filter_map(|a| a.res_num).collect())
                .unwrap_or_default();
            let deleted: BTreeSet<i32> = residues
                .keys()
                .filter(|r| !remaining.contains(r))
                .copied()
                .collect();
            if deleted.is_empty() {
                continue;
            }
            self.helices = std::mem::take(&mut self.helices)
                .into_iter()
                .filter_map(|h| {
                    if h.belongs_to(chain) {
                        h.trimmed(&deleted, &residues)
                    } else {
                        Some(h)
                    }
                })
                .collect();
            self.sheets = std::mem::take(&mut self.sheets)
                .into_iter()
                .filter_map(|s| {
                    if s.belongs_to(chain) {
                        s.trimmed(&deleted, &residues)
                    } else {
                        Some(s)
                    }
                })
                .collect();
        }
        Ok(())
    }

    /// Renumbers a model. Without `original` the structure must hold exactly one model.
    pub fn set_model(&mut self, original: Option<u32>, new: u32) -> Result<(), StructureError> {
        let index = match original {
            None => match self.models.len() {
                0 => return Err(StructureError::NoModels),
                1 => 0,
                count => return Err(StructureError::AmbiguousModel { count }),
            },
            Some(n) => self
                .model_position(n)
                .ok_or(StructureError::ModelNotFound(n))?,
        };
        if self.model_position(new).is_some_and(|other| other != index) {
            return Err(StructureError::DuplicateModel(new));
        }
        self.models[index].number = Some(new);
        Ok(())
    }

    /// Keeps only model `keep` and renumbers it to `model_to` (1 by default).
    pub fn collapse_ensemble(&mut self, keep: u32, model_to: Option<u32>) -> Result<(), StructureError> {
        if self.model_position(keep).is_none() {
            return Err(StructureError::ModelNotFound(keep));
        }
        self.models.retain(|m| m.number == Some(keep));
        self.set_model(Some(keep), model_to.unwrap_or(1))
    }

    /// Replaces the ensemble by a single model holding the mean position of every atom.
    pub fn mean(&mut self) -> Result<(), StructureError> {
        self.validate_models()?;
        let first = self.models.first().ok_or(StructureError::NoModels)?;
        let count = self.models.len() as f64;

        let mut mean_model = first.clone();
        for (mol_index, mol) in mean_model.molecules_mut().iter_mut().enumerate() {
            for (atom_index, atom) in mol.atoms_mut().iter_mut().enumerate() {
                let sum = self
                    .models
                    .iter()
                    .map(|m| m.molecules()[mol_index].atoms()[atom_index].position.coords)
                    .fold(Vector3::zeros(), |acc, v| acc + v);
                atom.position = Point3::from(sum / count);
            }
        }
        self.models = vec![mean_model];
        Ok(())
    }

    fn transform_atoms(
        &mut self,
        model: Option<u32>,
        selection: Option<&IndexSelection>,
        transform: impl Fn(&Point3<f64>) -> Point3<f64>,
    ) -> Result<(), StructureError> {
        for t in self.target_indices(model)? {
            for (mol_index, mol) in self.models[t].molecules_mut().iter_mut().enumerate() {
                for (atom_index, atom) in mol.atoms_mut().iter_mut().enumerate() {
                    if selection.is_none_or(|s| s.contains(mol_index, atom_index)) {
                        atom.position = transform(&atom.position);
                    }
                }
            }
        }
        Ok(())
    }

    /// Rotates atoms about `origin`: `p ← R·(p − origin) + origin`.
    pub fn rotate(
        &mut self,
        rotation: &Rotation3<f64>,
        origin: &Point3<f64>,
        model: Option<u32>,
        selection: Option<&IndexSelection>,
    ) -> Result<(), StructureError> {
        self.transform_atoms(model, selection, |p| rotate_about(p, rotation, origin))
    }

    pub fn translate(
        &mut self,
        translation: &Vector3<f64>,
        model: Option<u32>,
        selection: Option<&IndexSelection>,
    ) -> Result<(), StructureError> {
        self.transform_atoms(model, selection, |p| p + translation)
    }

    /// Checks that every model holds the same molecules, by count and name.
    pub fn validate(&self) -> Result<(), StructureError> {
        let Some(first) = self.models.first() else {
            return Ok(());
        };
        for model in &self.models[1..] {
            if model.num_molecules() != first.num_molecules() {
                return Err(StructureError::Inconsistent(format!(
                    "model {} holds {} molecules but model {} holds {}",
                    model_label(model.number),
                    model.num_molecules(),
                    model_label(first.number),
                    first.num_molecules()
                )));
            }
            for (a, b) in first.molecules().iter().zip(model.molecules()) {
                if a.name != b.name {
                    return Err(StructureError::Inconsistent(format!(
                        "molecule '{}' of model {} does not match molecule '{}' of model {}",
                        molecule_label(b.name()),
                        model_label(model.number),
                        molecule_label(a.name()),
                        model_label(first.number)
                    )));
                }
            }
        }
        Ok(())
    }

    /// Like [`Structure::validate`], and additionally requires identical atoms (all but
    /// the positions) in every model.
    pub fn validate_models(&self) -> Result<(), StructureError> {
        self.validate()?;
        let Some(first) = self.models.first() else {
            return Ok(());
        };
        for model in &self.models[1..] {
            for (a, b) in first.molecules().iter().zip(model.molecules()) {
                if a.len() != b.len() {
                    return Err(StructureError::Inconsistent(format!(
                        "molecule '{}' has {} atoms in model {} but {} in model {}",
                        molecule_label(a.name()),
                        a.len(),
                        model_label(first.number),
                        b.len(),
                        model_label(model.number)
                    )));
                }
                if let Some(i) = (0..a.len()).find(|&i| !a.atoms()[i].same_identity(&b.atoms()[i])) {
                    return Err(StructureError::Inconsistent(format!(
                        "atom {} of molecule '{}' differs between models {} and {}",
                        i,
                        molecule_label(a.name()),
                        model_label(first.number),
                        model_label(model.number)
                    )));
                }
            }
        }
        Ok(())
    }

    /// Inserts freshly read molecules, grouped by target model number.
    ///
    /// Without `merge`, a molecule whose name already exists in its target model is an
    /// error; with it, the atoms are merged into the existing molecule. Molecules placed
    /// in later models must line up with the molecules of the first model.
    pub fn pack(
        &mut self,
        models: Vec<(Option<u32>, Vec<Molecule>)>,
        merge: bool,
    ) -> Result<(), StructureError> {
        if !merge {
            for (number, molecules) in &models {
                let existing = match number {
                    Some(n) => self.model(*n),
                    None => self.models.first(),
                };
                let Some(existing) = existing else { continue };
                if let Some(mol) = molecules
                    .iter()
                    .find(|mol| existing.molecule_index(mol.name()).is_some())
                {
                    return Err(StructureError::DuplicateMolecule(molecule_label(mol.name())));
                }
            }
        }

        for (number, molecules) in models {
            let mut created = false;
            let model_index = match number {
                Some(n) => match self.model_position(n) {
                    Some(i) => i,
                    None => {
                        self.models.push(Model::new(Some(n)));
                        created = true;
                        self.models.len() - 1
                    }
                },
                None => {
                    if self.models.is_empty() {
                        self.models.push(Model::new(None));
                    }
                    0
                }
            };
            for molecule in molecules {
                let name = molecule.name.clone();
                let existing = self.models[model_index].molecule_index(name.as_deref());
                let mol_index =
                    existing.unwrap_or_else(|| self.models[model_index].num_molecules());
                if model_index != 0 {
                    let expected = self.models[0].molecule_at(mol_index).map(Molecule::name);
                    if expected != Some(name.as_deref()) {
                        if created && self.models[model_index].num_molecules() == 0 {
                            self.models.remove(model_index);
                        }
                        return Err(StructureError::Inconsistent(format!(
                            "molecule '{}' of model {} does not line up with the first model",
                            molecule_label(name.as_deref()),
                            model_label(number)
                        )));
                    }
                }
                let model = &mut self.models[model_index];
                match existing {
                    Some(i) => model.molecules_mut()[i].merge(molecule),
                    None => {
                        model.add_molecule(molecule);
                    }
                }
            }
        }
        Ok(())
    }
}
