use super::coordinates::check_shape;
use super::error::EngineError;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

/// The atom-wise average of every member's coordinates.
pub fn calc_mean_structure(coords: &[Vec<Point3<f64>>]) -> Result<Vec<Point3<f64>>, EngineError> {
    let num_atoms = check_shape(coords)?;
    let scale = 1.0 / coords.len() as f64;
    Ok((0..num_atoms)
        .map(|j| {
            let sum = coords
                .iter()
                .fold(Vector3::zeros(), |acc, member| acc + member[j].coords);
            Point3::from(sum * scale)
        })
        .collect())
}

/// The RMSD of each member to the mean structure, averaged over the members.
pub fn atomic_rmsd(coords: &[Vec<Point3<f64>>]) -> Result<f64, EngineError> {
    let mean = calc_mean_structure(coords)?;
    let num_atoms = mean.len() as f64;
    let total: f64 = coords
        .par_iter()
        .map(|member| {
            let sum: f64 = member
                .iter()
                .zip(&mean)
                .map(|(p, m)| (p - m).norm_squared())
                .sum();
            (sum / num_atoms).sqrt()
        })
        .sum();
    Ok(total / coords.len() as f64)
}

/// The RMS fluctuation of every atom about its mean position.
pub fn per_atom_rmsd(coords: &[Vec<Point3<f64>>]) -> Result<Vec<f64>, EngineError> {
    let mean = calc_mean_structure(coords)?;
    let num_members = coords.len() as f64;
    Ok(mean
        .par_iter()
        .enumerate()
        .map(|(j, m)| {
            let sum: f64 = coords.iter().map(|member| (member[j] - m).norm_squared()).sum();
            (sum / num_members).sqrt()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn pair() -> Vec<Vec<Point3<f64>>> {
        vec![
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
            vec![Point3::new(2.0, 0.0, 0.0), Point3::new(1.0, 4.0, 0.0)],
        ]
    }

    #[test]
    fn mean_structure_averages_each_atom() {
        let mean = calc_mean_structure(&pair()).unwrap();
        assert_eq!(mean, vec![Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 2.0, 0.0)]);
    }

    #[test]
    fn atomic_rmsd_averages_member_deviations() {
        // Each member deviates by 1 Å on atom 1 and 2 Å on atom 2.
        let expected = ((1.0 + 4.0) / 2.0f64).sqrt();
        assert!((atomic_rmsd(&pair()).unwrap() - expected).abs() < EPS);
    }

    #[test]
    fn per_atom_rmsd_reports_fluctuations() {
        let values = per_atom_rmsd(&pair()).unwrap();
        assert!((values[0] - 1.0).abs() < EPS);
        assert!((values[1] - 2.0).abs() < EPS);
    }

    #[test]
    fn identical_members_have_zero_rmsd() {
        let member = vec![Point3::new(1.0, 2.0, 3.0), Point3::new(-1.0, 0.5, 2.0)];
        let coords = vec![member.clone(), member.clone(), member];
        assert_eq!(atomic_rmsd(&coords).unwrap(), 0.0);
        assert!(per_atom_rmsd(&coords).unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn ragged_input_is_rejected() {
        let coords = vec![vec![Point3::origin()], vec![]];
        assert!(matches!(calc_mean_structure(&coords), Err(EngineError::ShapeMismatch(_))));
    }
}
