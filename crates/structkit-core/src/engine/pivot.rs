use super::config::PivotConfig;
use super::coordinates::check_shape;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::simplex::{SimplexOptions, nelder_mead};
use super::superimpose::kabsch;
use crate::core::utils::geometry::calculate_rmsd;
use nalgebra::{DVector, Point3};
use tracing::{debug, info};

const INITIAL_BARRIER_WEIGHT: f64 = 1e-5;
const BARRIER_WEIGHT_SCALE: f64 = 0.1;
const INNER_MAX_ITERATIONS: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct PivotResult {
    pub pivot: Point3<f64>,
    /// Summed RMSD to the first member at the pivot, in Å.
    pub objective: f64,
    pub iterations: usize,
}

/// Sum of the RMSDs between the first member and every other member after rotating the
/// latter about `pivot` onto it.
pub fn pivot_objective(coords: &[Vec<Point3<f64>>], pivot: &Point3<f64>) -> Result<f64, EngineError> {
    let Some((reference, others)) = coords.split_first() else {
        return Err(EngineError::TooFewStructures {
            required: 2,
            found: 0,
        });
    };
    others.iter().try_fold(0.0, |total, member| {
        let fit = kabsch(member, reference, Some(pivot))?;
        let fitted = fit.apply_all(member);
        let rmsd = calculate_rmsd(&fitted, reference)
            .ok_or_else(|| EngineError::ShapeMismatch("structures differ in size".to_string()))?;
        Ok(total + rmsd)
    })
}

/// `f(p) − ε·Σ ln(c_k(p))` for the box constraints `L ± p_k > 0`; infinite outside.
fn barrier(coords: &[Vec<Point3<f64>>], x: &DVector<f64>, weight: f64, box_limit: f64) -> f64 {
    let mut penalty = 0.0;
    for &value in x.iter() {
        for c in [box_limit + value, box_limit - value] {
            if c <= 0.0 {
                return f64::INFINITY;
            }
            penalty -= weight * c.ln();
        }
    }
    let pivot = Point3::new(x[0], x[1], x[2]);
    match pivot_objective(coords, &pivot) {
        Ok(value) => value + penalty,
        Err(_) => f64::INFINITY,
    }
}

/// Finds the pivot about which the members of an ensemble rotate.
///
/// The objective is minimised with a Nelder–Mead simplex inside a logarithmic barrier
/// that confines the pivot to a box of `±box_limit` Å. The barrier weight shrinks after
/// every round until the barrier-augmented value changes by no more than `func_tol`.
///
/// # Errors
///
/// Returns an error if fewer than two structures are given, if their shapes differ, or if
/// the iteration budget runs out.
pub fn find_pivot(
    coords: &[Vec<Point3<f64>>],
    config: &PivotConfig,
    reporter: &ProgressReporter,
) -> Result<PivotResult, EngineError> {
    check_shape(coords)?;
    if coords.len() < 2 {
        return Err(EngineError::TooFewStructures {
            required: 2,
            found: coords.len(),
        });
    }

    let mut x = DVector::from_column_slice(config.init_pos.coords.as_slice());
    let mut weight = INITIAL_BARRIER_WEIGHT;
    let mut previous = barrier(coords, &x, weight, config.box_limit);
    if !previous.is_finite() {
        return Err(EngineError::Numerical(
            "the starting pivot lies outside the search box".to_string(),
        ));
    }

    let mut total_iterations = 0;
    let mut round = 0;
    loop {
        round += 1;
        let budget = config
            .max_iterations
            .saturating_sub(total_iterations)
            .min(INNER_MAX_ITERATIONS);
        let options = SimplexOptions {
            func_tol: config.func_tol,
            max_iterations: budget,
            ..SimplexOptions::default()
        };
        let result = nelder_mead(
            |p| barrier(coords, p, weight, config.box_limit),
            x.clone(),
            &options,
        );
        total_iterations += result.iterations;
        if !result.value.is_finite() {
            return Err(EngineError::Numerical(
                "the pivot search left the feasible region".to_string(),
            ));
        }

        let change = (result.value - previous).abs();
        debug!(round, weight, value = result.value, change, "Finished a barrier round.");
        reporter.report(Progress::StatusUpdate {
            text: format!("Round {round}: f = {:.6}", result.value),
        });

        x = result.x;
        if change <= config.func_tol {
            break;
        }
        if total_iterations >= config.max_iterations {
            return Err(EngineError::Convergence {
                iterations: total_iterations,
            });
        }
        previous = result.value;
        weight *= BARRIER_WEIGHT_SCALE;
    }

    let pivot = Point3::new(x[0], x[1], x[2]);
    let objective = pivot_objective(coords, &pivot)?;
    info!(
        x = pivot.x,
        y = pivot.y,
        z = pivot.z,
        objective,
        iterations = total_iterations,
        "Motional pivot found."
    );
    Ok(PivotResult {
        pivot,
        objective,
        iterations: total_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::geometry::rotate_about;
    use nalgebra::{Rotation3, Vector3};

    fn body() -> Vec<Point3<f64>> {
        vec![
            Point3::new(8.0, 1.0, 0.0),
            Point3::new(9.5, 0.0, 1.0),
            Point3::new(7.0, -1.0, 0.5),
            Point3::new(8.5, 2.0, -1.5),
            Point3::new(10.0, 1.5, 0.0),
        ]
    }

    fn hinged_ensemble(pivot: &Point3<f64>) -> Vec<Vec<Point3<f64>>> {
        let base = body();
        let turns = [
            Rotation3::from_axis_angle(&Vector3::z_axis(), 0.3),
            Rotation3::from_axis_angle(&Vector3::x_axis(), -0.4),
            Rotation3::from_axis_angle(&Vector3::y_axis(), 0.5),
        ];
        std::iter::once(base.clone())
            .chain(turns.iter().map(|r| base.iter().map(|p| rotate_about(p, r, pivot)).collect()))
            .collect()
    }

    #[test]
    fn objective_vanishes_at_the_true_pivot() {
        let pivot = Point3::new(1.0, -2.0, 0.5);
        let coords = hinged_ensemble(&pivot);
        assert!(pivot_objective(&coords, &pivot).unwrap() < 1e-9);
        assert!(pivot_objective(&coords, &Point3::new(5.0, 5.0, 5.0)).unwrap() > 0.1);
    }

    #[test]
    fn the_hinge_point_is_recovered() {
        let pivot = Point3::new(1.0, -2.0, 0.5);
        let coords = hinged_ensemble(&pivot);
        let config = PivotConfig {
            func_tol: 1e-10,
            ..PivotConfig::default()
        };

        let result = find_pivot(&coords, &config, &ProgressReporter::new()).unwrap();
        assert!((result.pivot - pivot).norm() < 1e-2, "found {:?}", result.pivot);
        assert!(result.objective < 1e-2);
        assert!(result.iterations > 0);
    }

    #[test]
    fn the_search_stays_inside_the_box() {
        let pivot = Point3::new(30.0, 0.0, 0.0);
        let coords = hinged_ensemble(&pivot);
        let config = PivotConfig {
            box_limit: 10.0,
            ..PivotConfig::default()
        };

        let result = find_pivot(&coords, &config, &ProgressReporter::new()).unwrap();
        assert!(result.pivot.iter().all(|c| c.abs() < 10.0));
    }

    #[test]
    fn a_single_structure_has_no_pivot() {
        assert!(matches!(
            find_pivot(&[body()], &PivotConfig::default(), &ProgressReporter::new()),
            Err(EngineError::TooFewStructures { required: 2, found: 1 })
        ));
    }
}
