use super::coordinates::check_shape;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::superimpose::{Displacement, kabsch};
use itertools::iproduct;
use nalgebra::Point3;
use rayon::prelude::*;

/// The displacement taking member `from` onto member `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairDisplacement {
    pub from: usize,
    pub to: usize,
    pub displacement: Displacement,
}

/// Computes the rigid-body displacement between every ordered pair of members,
/// including each member with itself.
pub fn pairwise_displacements(
    coords: &[Vec<Point3<f64>>],
    fixed_centroid: Option<&Point3<f64>>,
    reporter: &ProgressReporter,
) -> Result<Vec<PairDisplacement>, EngineError> {
    check_shape(coords)?;
    let n = coords.len();
    let pairs: Vec<(usize, usize)> = iproduct!(0..n, 0..n).collect();

    reporter.report(Progress::TaskStart {
        total_steps: pairs.len() as u64,
    });
    let result = pairs
        .par_iter()
        .map(|&(from, to)| -> Result<PairDisplacement, EngineError> {
            let displacement = kabsch(&coords[from], &coords[to], fixed_centroid)?;
            reporter.report(Progress::TaskIncrement);
            Ok(PairDisplacement {
                from,
                to,
                displacement,
            })
        })
        .collect();
    reporter.report(Progress::TaskFinish);
    result
}
