use super::error::EngineError;
use crate::core::models::atom::Atom;
use crate::core::models::model::Model;
use crate::core::models::molecule::Molecule;
use crate::core::models::structure::{Structure, StructureError};
use crate::core::selection::AtomSelection;
use nalgebra::Point3;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Describes one atom of an assembled ensemble, taken from the first member.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomIdentity {
    pub molecule: Option<String>,
    pub res_num: Option<i32>,
    pub res_name: Option<String>,
    pub atom_name: Option<String>,
    pub atom_num: Option<u32>,
    pub element: Option<String>,
}

/// One structure of an ensemble: a whole model, one molecule of a model, or one
/// molecule among several in a single model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub label: String,
    pub model: Option<u32>,
    /// `None` when the member spans every molecule of its model.
    pub molecule: Option<String>,
}

/// Matched coordinates of an ensemble, indexed as `coords[member][atom]`.
#[derive(Debug, Clone)]
pub struct CoordinateSet {
    pub members: Vec<Member>,
    pub atoms: Vec<AtomIdentity>,
    pub coords: Vec<Vec<Point3<f64>>>,
}

impl CoordinateSet {
    pub fn num_members(&self) -> usize {
        self.members.len()
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn labels(&self) -> Vec<String> {
        self.members.iter().map(|m| m.label.clone()).collect()
    }
}

/// Where the members of an ensemble come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsembleSource {
    /// Each selected model is a member. `None` selects every model.
    Models {
        models: Option<Vec<u32>>,
        molecule: Option<String>,
    },
    /// Each named molecule of a single model is a member.
    Molecules {
        model: Option<u32>,
        names: Vec<String>,
    },
}

impl Default for EnsembleSource {
    fn default() -> Self {
        EnsembleSource::Models {
            models: None,
            molecule: None,
        }
    }
}

/// Matching key of an atom. The trailing counter tells apart atoms that share all
/// descriptive fields, as happens for XYZ input.
type AtomKey = (Option<usize>, Option<i32>, Option<String>, Option<String>, usize);

struct RawMember<'a> {
    member: Member,
    atoms: Vec<(AtomKey, &'a Atom, Option<&'a str>)>,
}

fn keyed_atoms<'a>(
    molecules: impl Iterator<Item = (Option<usize>, &'a Molecule)>,
    selection: &AtomSelection,
) -> Vec<(AtomKey, &'a Atom, Option<&'a str>)> {
    let mut seen: HashMap<(Option<usize>, Option<i32>, Option<String>, Option<String>), usize> = HashMap::new();
    let mut atoms = Vec::new();
    for (mol_index, molecule) in molecules {
        if !selection.contains_mol(molecule.name()) {
            continue;
        }
        let name = molecule.name();
        let chosen = molecule.atoms().iter().filter(|atom| {
            selection.contains_atom(
                atom.number,
                atom.name.as_deref(),
                atom.res_num,
                atom.res_name.as_deref(),
                name,
            )
        });
        for atom in chosen {
            let base = (mol_index, atom.res_num, atom.res_name.clone(), atom.name.clone());
            let count = seen.entry(base.clone()).or_insert(0);
            let key = (base.0, base.1, base.2, base.3, *count);
            *count += 1;
            atoms.push((key, atom, name));
        }
    }
    atoms
}

fn model_label(model: &Model) -> String {
    match model.number {
        Some(n) => format!("model {n}"),
        None => "model".to_string(),
    }
}

fn members_from_models<'a>(
    structure: &'a Structure,
    models: Option<&[u32]>,
    molecule: Option<&str>,
    selection: &AtomSelection,
) -> Result<Vec<RawMember<'a>>, EngineError> {
    let chosen: Vec<&Model> = match models {
        Some(numbers) => numbers
            .iter()
            .map(|&n| structure.model(n).ok_or(StructureError::ModelNotFound(n)))
            .collect::<Result<_, _>>()?,
        None => structure.model_loop(None),
    };

    chosen
        .into_iter()
        .map(|model| -> Result<RawMember<'a>, EngineError> {
            let molecules: Vec<(Option<usize>, &Molecule)> = match molecule {
                Some(name) => {
                    let index = model
                        .molecule_index(Some(name))
                        .ok_or_else(|| StructureError::MoleculeNotFound(name.to_string()))?;
                    vec![(Some(index), &model.molecules()[index])]
                }
                None => model
                    .molecules()
                    .iter()
                    .enumerate()
                    .map(|(i, m)| (Some(i), m))
                    .collect(),
            };
            Ok(RawMember {
                member: Member {
                    label: model_label(model),
                    model: model.number,
                    molecule: molecule.map(str::to_string),
                },
                atoms: keyed_atoms(molecules.into_iter(), selection),
            })
        })
        .collect()
}

fn members_from_molecules<'a>(
    structure: &'a Structure,
    model: Option<u32>,
    names: &[String],
    selection: &AtomSelection,
) -> Result<Vec<RawMember<'a>>, EngineError> {
    let model = match model {
        Some(n) => structure.model(n).ok_or(StructureError::ModelNotFound(n))?,
        None => match structure.num_models() {
            0 => return Err(StructureError::NoModels.into()),
            1 => &structure.models()[0],
            count => return Err(StructureError::AmbiguousModel { count }.into()),
        },
    };

    names
        .iter()
        .map(|name| -> Result<RawMember<'a>, EngineError> {
            let molecule = model
                .molecule(Some(name))
                .ok_or_else(|| StructureError::MoleculeNotFound(name.clone()))?;
            Ok(RawMember {
                member: Member {
                    label: name.clone(),
                    model: model.number,
                    molecule: Some(name.clone()),
                },
                atoms: keyed_atoms(std::iter::once((None, molecule)), selection),
            })
        })
        .collect()
}

/// Gathers the coordinates of the atoms common to every member of an ensemble.
///
/// Atoms are matched by molecule position, residue number, residue name and atom name.
/// Atoms missing from any member are dropped with a warning.
///
/// # Errors
///
/// Returns an error if a requested model or molecule does not exist, if there are no
/// members, or if the members share no atoms.
pub fn assemble(
    structure: &Structure,
    source: &EnsembleSource,
    selection: &AtomSelection,
) -> Result<CoordinateSet, EngineError> {
    let raw = match source {
        EnsembleSource::Models { models, molecule } => {
            members_from_models(structure, models.as_deref(), molecule.as_deref(), selection)?
        }
        EnsembleSource::Molecules { model, names } => {
            members_from_molecules(structure, *model, names, selection)?
        }
    };

    let Some(first) = raw.first() else {
        return Err(EngineError::TooFewStructures {
            required: 1,
            found: 0,
        });
    };

    let lookups: Vec<HashMap<&AtomKey, &Atom>> = raw
        .iter()
        .map(|m| m.atoms.iter().map(|(key, atom, _)| (key, *atom)).collect())
        .collect();

    let common: Vec<(&AtomKey, &Atom, Option<&str>)> = first
        .atoms
        .iter()
        .filter(|(key, _, _)| lookups.iter().all(|lookup| lookup.contains_key(key)))
        .map(|(key, atom, mol)| (key, *atom, *mol))
        .collect();

    if common.is_empty() {
        return Err(EngineError::Coordinates(
            "the ensemble members have no atoms in common".to_string(),
        ));
    }

    for member in &raw {
        let dropped = member.atoms.len() - common.len();
        if dropped > 0 {
            warn!(
                member = %member.member.label,
                dropped,
                "Atoms missing from other ensemble members were skipped."
            );
        }
    }

    let atoms = common
        .iter()
        .map(|(_, atom, mol)| AtomIdentity {
            molecule: mol.map(str::to_string),
            res_num: atom.res_num,
            res_name: atom.res_name.clone(),
            atom_name: atom.name.clone(),
            atom_num: atom.number,
            element: atom.element.clone(),
        })
        .collect();

    let coords = lookups
        .iter()
        .map(|lookup| {
            common
                .iter()
                .filter_map(|(key, _, _)| lookup.get(key).map(|atom| atom.position))
                .collect()
        })
        .collect();

    debug!(members = raw.len(), atoms = common.len(), "Assembled ensemble coordinates.");
    Ok(CoordinateSet {
        members: raw.into_iter().map(|m| m.member).collect(),
        atoms,
        coords,
    })
}

/// Checks that every member holds the same, non-zero number of atoms.
pub(crate) fn check_shape(coords: &[Vec<Point3<f64>>]) -> Result<usize, EngineError> {
    let Some(first) = coords.first() else {
        return Err(EngineError::TooFewStructures {
            required: 1,
            found: 0,
        });
    };
    if first.is_empty() {
        return Err(EngineError::ShapeMismatch("the structures hold no atoms".to_string()));
    }
    if let Some((i, other)) = coords.iter().enumerate().find(|(_, c)| c.len() != first.len()) {
        return Err(EngineError::ShapeMismatch(format!(
            "structure {} has {} atoms, but structure 1 has {}",
            i + 1,
            other.len(),
            first.len()
        )));
    }
    Ok(first.len())
}
