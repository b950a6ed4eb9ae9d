use super::config::{PcaAlgorithm, PcaConfig};
use super::coordinates::check_shape;
use super::error::EngineError;
use nalgebra::{DMatrix, DVector, Point3, SymmetricEigen, Vector3};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct PcaResult {
    /// Variance along each mode in Å², largest first.
    pub values: Vec<f64>,
    /// Unit modes as one displacement vector per atom, indexed `[mode][atom]`.
    pub vectors: Vec<Vec<Vector3<f64>>>,
    /// Projection of each member onto each mode in Å, indexed `[member][mode]`.
    pub projections: Vec<Vec<f64>>,
}

fn flatten(member: &[Point3<f64>]) -> impl Iterator<Item = f64> + '_ {
    member.iter().flat_map(|p| [p.x, p.y, p.z])
}

/// Flips `vector` so that its largest-magnitude component is positive.
fn fix_sign(vector: &mut DVector<f64>) {
    let pivot = vector
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if pivot < 0.0 {
        vector.neg_mut();
    }
}

/// Principal component analysis of an ensemble.
///
/// Each member is weighted by `weights[i]`. Members with zero weight (observers) do not
/// shape the modes, but are still projected onto them. The covariance is normalised by
/// `Σw − Σw²/Σw`, which is `m − 1` for `m` members of unit weight.
///
/// # Errors
///
/// Returns an error if fewer than two members carry weight, if a weight is negative, or
/// if more modes are requested than the data can provide.
pub fn pca(
    coords: &[Vec<Point3<f64>>],
    weights: &[f64],
    config: &PcaConfig,
) -> Result<PcaResult, EngineError> {
    let num_atoms = check_shape(coords)?;
    let dim = 3 * num_atoms;
    let num_members = coords.len();

    if weights.len() != num_members {
        return Err(EngineError::ShapeMismatch(format!(
            "{} weights were given for {} structures",
            weights.len(),
            num_members
        )));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(EngineError::Numerical(
            "structure weights must be finite and non-negative".to_string(),
        ));
    }
    let active = weights.iter().filter(|&&w| w > 0.0).count();
    if active < 2 {
        return Err(EngineError::TooFewStructures {
            required: 2,
            found: active,
        });
    }
    let available = match config.algorithm {
        PcaAlgorithm::Eigen => dim,
        PcaAlgorithm::Svd => dim.min(num_members),
    };
    if config.num_modes > available {
        return Err(EngineError::TooManyModes {
            requested: config.num_modes,
            available,
        });
    }

    let data = DMatrix::from_row_iterator(num_members, dim, coords.iter().flat_map(|m| flatten(m)));
    let weight_sum: f64 = weights.iter().sum();
    let weight_sq_sum: f64 = weights.iter().map(|w| w * w).sum();
    let norm = weight_sum - weight_sq_sum / weight_sum;
    if norm <= 0.0 {
        return Err(EngineError::Numerical(
            "the structure weights give a degenerate covariance normalisation".to_string(),
        ));
    }

    let mean = weights
        .iter()
        .enumerate()
        .fold(DVector::zeros(dim), |acc: DVector<f64>, (i, w)| {
            acc + data.row(i).transpose() * *w
        })
        / weight_sum;
    let mut deviations = data;
    for mut row in deviations.row_iter_mut() {
        row -= mean.transpose();
    }

    let (values, mut modes): (Vec<f64>, Vec<DVector<f64>>) = match config.algorithm {
        PcaAlgorithm::Eigen => {
            let mut weighted = deviations.clone();
            for (mut row, w) in weighted.row_iter_mut().zip(weights) {
                row *= *w;
            }
            let covariance = deviations.transpose() * weighted / norm;
            let eigen = SymmetricEigen::new(covariance);
            let mut order: Vec<usize> = (0..dim).collect();
            order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
            order
                .into_iter()
                .take(config.num_modes)
                .map(|k| (eigen.eigenvalues[k], eigen.eigenvectors.column(k).into_owned()))
                .unzip()
        }
        PcaAlgorithm::Svd => {
            let mut scaled = deviations.clone();
            for (mut row, w) in scaled.row_iter_mut().zip(weights) {
                row *= (w / norm).sqrt();
            }
            let svd = scaled.svd(false, true);
            let Some(v_t) = svd.v_t else {
                return Err(EngineError::Numerical(
                    "singular value decomposition of the deviation matrix failed".to_string(),
                ));
            };
            let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
            order.sort_by(|&a, &b| svd.singular_values[b].total_cmp(&svd.singular_values[a]));
            order
                .into_iter()
                .take(config.num_modes)
                .map(|k| (svd.singular_values[k].powi(2), v_t.row(k).transpose()))
                .unzip()
        }
    };
    modes.iter_mut().for_each(fix_sign);

    let projections = deviations
        .row_iter()
        .map(|row| modes.iter().map(|mode| row.dot(&mode.transpose())).collect())
        .collect();
    let vectors = modes
        .iter()
        .map(|mode| {
            (0..num_atoms)
                .map(|j| Vector3::new(mode[3 * j], mode[3 * j + 1], mode[3 * j + 2]))
                .collect()
        })
        .collect();

    debug!(modes = values.len(), members = num_members, "Computed principal modes.");
    Ok(PcaResult {
        values,
        vectors,
        projections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    /// Two atoms, the first breathing along x, the second along y with a smaller amplitude.
    fn breathing() -> Vec<Vec<Point3<f64>>> {
        [(-2.0, -1.0), (2.0, 1.0), (-2.0, 1.0), (2.0, -1.0)]
            .iter()
            .map(|&(a, b)| vec![Point3::new(a, 0.0, 0.0), Point3::new(5.0, b, 0.0)])
            .collect()
    }

    fn config(algorithm: PcaAlgorithm, num_modes: usize) -> PcaConfig {
        PcaConfig {
            algorithm,
            num_modes,
        }
    }

    #[test]
    fn modes_follow_decreasing_variance() {
        let result = pca(&breathing(), &[1.0; 4], &config(PcaAlgorithm::Eigen, 2)).unwrap();

        // Variances with an m - 1 normalisation: 16/3 and 4/3.
        assert!((result.values[0] - 16.0 / 3.0).abs() < EPS);
        assert!((result.values[1] - 4.0 / 3.0).abs() < EPS);
        assert!((result.vectors[0][0] - Vector3::x()).norm() < EPS);
        assert!((result.vectors[1][1] - Vector3::y()).norm() < EPS);
        assert!((result.projections[0][0] + 2.0).abs() < EPS);
        assert!((result.projections[1][1] - 1.0).abs() < EPS);
    }

    #[test]
    fn eigen_and_svd_agree() {
        let coords = breathing();
        let eigen = pca(&coords, &[1.0; 4], &config(PcaAlgorithm::Eigen, 2)).unwrap();
        let svd = pca(&coords, &[1.0; 4], &config(PcaAlgorithm::Svd, 2)).unwrap();

        for (a, b) in eigen.values.iter().zip(&svd.values) {
            assert!((a - b).abs() < EPS);
        }
        for (a, b) in eigen.projections.iter().flatten().zip(svd.projections.iter().flatten()) {
            assert!((a - b).abs() < EPS);
        }
    }

    #[test]
    fn observers_are_projected_but_do_not_shape_modes() {
        let mut coords = breathing();
        coords.push(vec![Point3::new(0.0, 0.0, 9.0), Point3::new(5.0, 0.0, 0.0)]);
        let weights = [1.0, 1.0, 1.0, 1.0, 0.0];

        let result = pca(&coords, &weights, &config(PcaAlgorithm::Eigen, 1)).unwrap();
        assert!((result.values[0] - 16.0 / 3.0).abs() < EPS);
        assert_eq!(result.projections.len(), 5);
        assert!(result.projections[4][0].abs() < EPS);
    }

    #[test]
    fn dominant_component_is_positive() {
        let mut coords = breathing();
        coords.reverse();
        let result = pca(&coords, &[1.0; 4], &config(PcaAlgorithm::Svd, 1)).unwrap();
        assert!(result.vectors[0][0].x > 0.0);
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let coords = breathing();
        assert!(matches!(
            pca(&coords, &[1.0, 0.0, 0.0, 0.0], &config(PcaAlgorithm::Eigen, 1)),
            Err(EngineError::TooFewStructures { required: 2, found: 1 })
        ));
        assert!(matches!(
            pca(&coords, &[1.0; 4], &config(PcaAlgorithm::Eigen, 7)),
            Err(EngineError::TooManyModes { requested: 7, available: 6 })
        ));
        assert!(matches!(
            pca(&coords, &[1.0; 4], &config(PcaAlgorithm::Svd, 5)),
            Err(EngineError::TooManyModes { requested: 5, available: 4 })
        ));
        assert!(matches!(
            pca(&coords, &[1.0; 3], &config(PcaAlgorithm::Eigen, 1)),
            Err(EngineError::ShapeMismatch(_))
        ));
    }
}
