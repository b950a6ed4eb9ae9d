use crate::core::io::report::{AtomRmsdRow, DisplacementRow, PcaValueRow};
use crate::core::models::structure::Structure;
use crate::core::selection::AtomSelection;
use crate::engine::config::{PcaConfig, PivotConfig};
use crate::engine::coordinates::{AtomIdentity, EnsembleSource, Member, assemble};
use crate::engine::displacement::{PairDisplacement, pairwise_displacements};
use crate::engine::error::EngineError;
use crate::engine::pca::{PcaResult, pca};
use crate::engine::pivot::{PivotResult, find_pivot};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::statistics::{atomic_rmsd, per_atom_rmsd};
use nalgebra::Point3;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct RmsdReport {
    pub members: Vec<Member>,
    pub atoms: Vec<AtomIdentity>,
    /// Member RMSD to the mean structure, averaged over members.
    pub rmsd: f64,
    pub per_atom: Vec<f64>,
}

impl RmsdReport {
    pub fn rows(&self) -> Vec<AtomRmsdRow> {
        self.atoms
            .iter()
            .zip(&self.per_atom)
            .map(|(atom, &rmsd)| AtomRmsdRow {
                molecule: atom.molecule.clone(),
                res_num: atom.res_num,
                res_name: atom.res_name.clone(),
                atom_name: atom.atom_name.clone(),
                rmsd,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct DisplacementReport {
    pub members: Vec<Member>,
    pub pairs: Vec<PairDisplacement>,
}

impl DisplacementReport {
    pub fn rows(&self) -> Vec<DisplacementRow> {
        self.pairs
            .iter()
            .map(|pair| {
                let d = &pair.displacement;
                DisplacementRow {
                    from: self.members[pair.from].label.clone(),
                    to: self.members[pair.to].label.clone(),
                    translation_x: d.translation.x,
                    translation_y: d.translation.y,
                    translation_z: d.translation.z,
                    distance: d.distance,
                    axis_x: d.axis.x,
                    axis_y: d.axis.y,
                    axis_z: d.axis.z,
                    angle_deg: d.angle.to_degrees(),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct PcaReport {
    pub members: Vec<Member>,
    pub observers: Vec<bool>,
    pub result: PcaResult,
}

impl PcaReport {
    pub fn value_rows(&self) -> Vec<PcaValueRow> {
        self.result
            .values
            .iter()
            .enumerate()
            .map(|(i, &value)| PcaValueRow { mode: i + 1, value })
            .collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.members.iter().map(|m| m.label.clone()).collect()
    }
}

/// Global and per-atom RMSD of an ensemble about its mean structure.
#[instrument(skip_all, name = "rmsd_workflow")]
pub fn rmsd(
    structure: &Structure,
    source: &EnsembleSource,
    selection: &AtomSelection,
) -> Result<RmsdReport, EngineError> {
    let set = assemble(structure, source, selection)?;
    let rmsd = atomic_rmsd(&set.coords)?;
    let per_atom = per_atom_rmsd(&set.coords)?;
    info!(members = set.num_members(), atoms = set.num_atoms(), rmsd, "Computed ensemble RMSD.");
    Ok(RmsdReport {
        members: set.members,
        atoms: set.atoms,
        rmsd,
        per_atom,
    })
}

/// Rigid-body displacements between every ordered pair of ensemble members.
#[instrument(skip_all, name = "displacement_workflow")]
pub fn displacements(
    structure: &Structure,
    source: &EnsembleSource,
    selection: &AtomSelection,
    centroid: Option<&Point3<f64>>,
    reporter: &ProgressReporter,
) -> Result<DisplacementReport, EngineError> {
    let set = assemble(structure, source, selection)?;
    reporter.report(Progress::PhaseStart {
        name: "Pairwise displacements",
    });
    let pairs = pairwise_displacements(&set.coords, centroid, reporter)?;
    reporter.report(Progress::PhaseFinish);
    info!(pairs = pairs.len(), "Computed ensemble displacements.");
    Ok(DisplacementReport {
        members: set.members,
        pairs,
    })
}

/// Principal component analysis of an ensemble.
///
/// Members from the `observers` models are projected onto the modes without taking
/// part in their calculation.
#[instrument(skip_all, name = "pca_workflow")]
pub fn principal_components(
    structure: &Structure,
    source: &EnsembleSource,
    selection: &AtomSelection,
    observers: &[u32],
    config: &PcaConfig,
    reporter: &ProgressReporter,
) -> Result<PcaReport, EngineError> {
    let set = assemble(structure, source, selection)?;
    let flags: Vec<bool> = set
        .members
        .iter()
        .map(|m| m.model.is_some_and(|n| observers.contains(&n)))
        .collect();
    let weights: Vec<f64> = flags.iter().map(|&o| if o { 0.0 } else { 1.0 }).collect();

    reporter.report(Progress::PhaseStart {
        name: "Principal component analysis",
    });
    let result = pca(&set.coords, &weights, config)?;
    reporter.report(Progress::PhaseFinish);

    info!(
        modes = result.values.len(),
        observers = flags.iter().filter(|&&o| o).count(),
        algorithm = ?config.algorithm,
        "Computed principal modes."
    );
    Ok(PcaReport {
        members: set.members,
        observers: flags,
        result,
    })
}

/// Locates the motional pivot of an ensemble.
#[instrument(skip_all, name = "pivot_workflow")]
pub fn pivot(
    structure: &Structure,
    source: &EnsembleSource,
    selection: &AtomSelection,
    config: &PivotConfig,
    reporter: &ProgressReporter,
) -> Result<PivotResult, EngineError> {
    let set = assemble(structure, source, selection)?;
    reporter.report(Progress::PhaseStart {
        name: "Pivot search",
    });
    let result = find_pivot(&set.coords, config, reporter)?;
    reporter.report(Progress::PhaseFinish);
    Ok(result)
}
