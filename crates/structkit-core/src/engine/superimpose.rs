use super::coordinates::check_shape;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::statistics::calc_mean_structure;
use crate::core::utils::geometry::{centroid, rotate_about, rotation_axis_angle};
use nalgebra::{Matrix3, Point3, Rotation3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info};

/// A rigid-body motion: translate by `translation`, then rotate about `pivot`.
#[derive(Debug, Clone, PartialEq)]
pub struct Displacement {
    pub translation: Vector3<f64>,
    pub distance: f64,
    pub rotation: Rotation3<f64>,
    pub axis: Vector3<f64>,
    /// Rotation angle in radians.
    pub angle: f64,
    pub pivot: Point3<f64>,
}

impl Displacement {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            distance: 0.0,
            rotation: Rotation3::identity(),
            axis: Vector3::zeros(),
            angle: 0.0,
            pivot: Point3::origin(),
        }
    }

    /// Maps `x` to `R·(x + T − pivot) + pivot`.
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        rotate_about(&(point + self.translation), &self.rotation, &self.pivot)
    }

    pub fn apply_all(&self, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        points.iter().map(|p| self.apply(p)).collect()
    }
}

/// Finds the displacement that best superimposes `from` onto `to` in the least-squares
/// sense.
///
/// Both sets are centred on their own centroids, or on `fixed_centroid` when one is
/// given. The rotation is the Kabsch solution about the target centroid.
///
/// # Errors
///
/// Returns an error if the point sets differ in length or are empty, or if the singular
/// value decomposition fails.
pub fn kabsch(
    from: &[Point3<f64>],
    to: &[Point3<f64>],
    fixed_centroid: Option<&Point3<f64>>,
) -> Result<Displacement, EngineError> {
    if from.len() != to.len() || from.is_empty() {
        return Err(EngineError::ShapeMismatch(format!(
            "cannot superimpose {} points onto {}",
            from.len(),
            to.len()
        )));
    }

    let (from_centroid, to_centroid) = match fixed_centroid {
        Some(c) => (*c, *c),
        None => (
            centroid(from).unwrap_or_else(Point3::origin),
            centroid(to).unwrap_or_else(Point3::origin),
        ),
    };

    let h = from
        .iter()
        .zip(to)
        .fold(Matrix3::zeros(), |acc, (f, t)| {
            acc + (t - to_centroid) * (f - from_centroid).transpose()
        });

    let svd = h.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(EngineError::Numerical(
            "singular value decomposition of the covariance matrix failed".to_string(),
        ));
    };

    let d = (u * v_t.transpose()).determinant();
    let mut correction = Matrix3::identity();
    if d < 0.0 {
        correction[(2, 2)] = -1.0;
    }

    let rotation = Rotation3::from_matrix(&(u * correction * v_t));
    let (axis, angle) = rotation_axis_angle(&rotation);
    let translation = to_centroid - from_centroid;

    Ok(Displacement {
        distance: translation.norm(),
        translation,
        rotation,
        axis,
        angle,
        pivot: to_centroid,
    })
}

/// Superimposes every member onto the first. The first member gets the identity.
pub fn fit_to_first(
    coords: &[Vec<Point3<f64>>],
    fixed_centroid: Option<&Point3<f64>>,
) -> Result<Vec<Displacement>, EngineError> {
    check_shape(coords)?;
    coords
        .par_iter()
        .enumerate()
        .map(|(i, member)| {
            if i == 0 {
                Ok(Displacement::identity())
            } else {
                kabsch(member, &coords[0], fixed_centroid)
            }
        })
        .collect()
}

fn fit_all(
    coords: &[Vec<Point3<f64>>],
    target: &[Point3<f64>],
    fixed_centroid: Option<&Point3<f64>>,
) -> Result<Vec<Displacement>, EngineError> {
    coords
        .par_iter()
        .map(|member| kabsch(member, target, fixed_centroid))
        .collect()
}

/// Superimposes every member onto the ensemble mean.
///
/// The mean is recomputed after each round of fitting until no member moves by more
/// than `tolerance` (Å for translations, radians for rotations). The returned
/// displacements take the original coordinates onto the converged mean.
///
/// # Errors
///
/// Returns [`EngineError::Convergence`] if the mean has not settled after
/// `max_iterations` rounds.
pub fn fit_to_mean(
    coords: &[Vec<Point3<f64>>],
    fixed_centroid: Option<&Point3<f64>>,
    tolerance: f64,
    max_iterations: usize,
    reporter: &ProgressReporter,
) -> Result<Vec<Displacement>, EngineError> {
    check_shape(coords)?;
    let mut working = coords.to_vec();
    let mut iteration = 0;

    let mean = loop {
        if iteration == max_iterations {
            return Err(EngineError::Convergence {
                iterations: iteration,
            });
        }
        iteration += 1;

        let mean = calc_mean_structure(&working)?;
        let fits = fit_all(&working, &mean, fixed_centroid)?;
        for (member, fit) in working.iter_mut().zip(&fits) {
            *member = fit.apply_all(member);
        }

        let converged = fits
            .iter()
            .all(|fit| fit.distance <= tolerance && fit.angle <= tolerance);
        debug!(iteration, converged, "Fitted ensemble to its mean structure.");
        reporter.report(Progress::StatusUpdate {
            text: format!("Iteration {iteration}"),
        });
        if converged {
            break mean;
        }
    };

    info!(iterations = iteration, "Mean structure converged.");
    fit_all(coords, &mean, fixed_centroid)
}
