use crate::core::models::structure::{Structure, StructureError};
use crate::core::selection::{AtomSelection, IndexSelection};
use crate::engine::config::{FitMethod, SuperpositionConfig};
use crate::engine::coordinates::{EnsembleSource, Member, assemble};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::statistics::atomic_rmsd;
use crate::engine::superimpose::{Displacement, fit_to_first, fit_to_mean};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct SuperpositionResult {
    pub members: Vec<Member>,
    /// The motion applied to each member, in member order.
    pub displacements: Vec<Displacement>,
    /// Mean RMSD to the ensemble mean over the fitted atoms, before and after.
    pub rmsd_before: f64,
    pub rmsd_after: f64,
}

/// The atoms a member's displacement is applied to.
fn displaced_atoms(
    structure: &Structure,
    member: &Member,
    displace: Option<&IndexSelection>,
) -> Result<Option<IndexSelection>, StructureError> {
    let Some(name) = member.molecule.as_deref() else {
        return Ok(displace.cloned());
    };
    let model = match member.model {
        Some(n) => structure.model(n).ok_or(StructureError::ModelNotFound(n))?,
        None => structure.first_model().ok_or(StructureError::NoModels)?,
    };
    let mol_index = model
        .molecule_index(Some(name))
        .ok_or_else(|| StructureError::MoleculeNotFound(name.to_string()))?;

    let mut selection = IndexSelection::new();
    for atom_index in 0..model.molecules()[mol_index].len() {
        if displace.is_none_or(|d| d.contains(mol_index, atom_index)) {
            selection.insert(mol_index, atom_index);
        }
    }
    Ok(Some(selection))
}

/// Superimposes the members of an ensemble and moves their atoms in place.
///
/// The fit is computed on the atoms matched by `selection`. The resulting motion is
/// applied to every atom of each member, or only to those matched by `displace`.
#[instrument(skip_all, name = "superimpose_workflow")]
pub fn run(
    structure: &mut Structure,
    source: &EnsembleSource,
    selection: &AtomSelection,
    displace: Option<&AtomSelection>,
    config: &SuperpositionConfig,
    reporter: &ProgressReporter,
) -> Result<SuperpositionResult, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Assembling coordinates",
    });
    let set = assemble(structure, source, selection)?;
    reporter.report(Progress::PhaseFinish);
    info!(
        members = set.num_members(),
        atoms = set.num_atoms(),
        method = ?config.method,
        "Superimposing ensemble."
    );

    reporter.report(Progress::PhaseStart { name: "Fitting" });
    let centroid = config.centroid.as_ref();
    let displacements = match config.method {
        FitMethod::First => fit_to_first(&set.coords, centroid)?,
        FitMethod::Mean => fit_to_mean(
            &set.coords,
            centroid,
            config.tolerance,
            config.max_iterations,
            reporter,
        )?,
    };
    reporter.report(Progress::PhaseFinish);

    let fitted: Vec<_> = set
        .coords
        .iter()
        .zip(&displacements)
        .map(|(coords, fit)| fit.apply_all(coords))
        .collect();
    let rmsd_before = atomic_rmsd(&set.coords)?;
    let rmsd_after = atomic_rmsd(&fitted)?;

    reporter.report(Progress::PhaseStart {
        name: "Applying transformations",
    });
    let displace = displace.map(|d| structure.select_with(d)).transpose()?;
    for (member, fit) in set.members.iter().zip(&displacements) {
        let atoms = displaced_atoms(structure, member, displace.as_ref())?;
        structure.translate(&fit.translation, member.model, atoms.as_ref())?;
        structure.rotate(&fit.rotation, &fit.pivot, member.model, atoms.as_ref())?;
    }
    reporter.report(Progress::PhaseFinish);

    info!(rmsd_before, rmsd_after, "Superposition complete.");
    Ok(SuperpositionResult {
        members: set.members,
        displacements,
        rmsd_before,
        rmsd_after,
    })
}
