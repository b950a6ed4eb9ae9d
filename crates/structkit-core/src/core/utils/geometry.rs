use nalgebra::{Matrix3, Point3, Rotation3, Vector3};
use rand::Rng;
use std::f64::consts::PI;

pub fn unit_vector(vector: &Vector3<f64>) -> Option<Vector3<f64>> {
    vector.try_normalize(f64::EPSILON)
}

/// Draws a direction uniformly distributed on the unit sphere.
///
/// The z component is sampled uniformly in `[-1, 1]` and the azimuth uniformly in
/// `[0, 2π)`, which by Archimedes' hat-box theorem yields a uniform surface density.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f64> {
    let z: f64 = rng.gen_range(-1.0..=1.0);
    let phi: f64 = rng.gen_range(0.0..(2.0 * PI));
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vector3::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn inter_point_vector(start: &Point3<f64>, end: &Point3<f64>, unit: bool) -> Vector3<f64> {
    let vector = end - start;
    if unit {
        unit_vector(&vector).unwrap_or_else(Vector3::zeros)
    } else {
        vector
    }
}

pub fn vector_angle_acos(a: &Vector3<f64>, b: &Vector3<f64>) -> Option<f64> {
    let a = unit_vector(a)?;
    let b = unit_vector(b)?;
    Some(a.dot(&b).clamp(-1.0, 1.0).acos())
}

pub fn vector_angle_atan2(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    a.cross(b).norm().atan2(a.dot(b))
}

/// Angle from `a` to `b` in `(-π, π]`, signed by the orientation of `a × b` relative to
/// `normal`.
pub fn vector_angle_signed(a: &Vector3<f64>, b: &Vector3<f64>, normal: &Vector3<f64>) -> f64 {
    let angle = vector_angle_atan2(a, b);
    if a.cross(b).dot(normal) < 0.0 {
        -angle
    } else {
        angle
    }
}

/// The axis and angle of a rotation, with the angle in `[0, π]`.
///
/// The angle is taken from `atan2` of the skew-symmetric part and the trace, which stays
/// accurate for rotations of a fraction of a nanoradian. The identity has a zero axis.
pub fn rotation_axis_angle(rotation: &Rotation3<f64>) -> (Vector3<f64>, f64) {
    let m = rotation.matrix();
    let skew = Vector3::new(
        m[(2, 1)] - m[(1, 2)],
        m[(0, 2)] - m[(2, 0)],
        m[(1, 0)] - m[(0, 1)],
    );
    let r = skew.norm();
    let angle = r.atan2(m.trace() - 1.0);

    // Near a half turn the skew part vanishes, so the axis is read from the symmetric
    // part, (1 - cos θ)·a·aᵀ, and only its sign from the skew part.
    if angle > PI / 2.0 {
        let cos = angle.cos();
        let sym = (m + m.transpose()) * 0.5 - Matrix3::identity() * cos;
        let k = (0..3)
            .max_by(|&a, &b| sym[(a, a)].total_cmp(&sym[(b, b)]))
            .unwrap_or(0);
        let mut axis: Vector3<f64> = sym.column(k).into_owned();
        if axis.dot(&skew) < 0.0 {
            axis = -axis;
        }
        if let Some(axis) = unit_vector(&axis) {
            return (axis, angle);
        }
    }
    if r > 0.0 {
        (skew / r, angle)
    } else {
        (Vector3::zeros(), angle)
    }
}

pub fn rotate_about(
    point: &Point3<f64>,
    rotation: &Rotation3<f64>,
    origin: &Point3<f64>,
) -> Point3<f64> {
    origin + rotation * (point - origin)
}

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Unit;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const EPS: f64 = 1e-9;

    #[test]
    fn unit_vector_normalizes_and_rejects_zero_length() {
        let v = unit_vector(&Vector3::new(3.0, 0.0, 4.0)).unwrap();
        assert!((v - Vector3::new(0.6, 0.0, 0.8)).norm() < EPS);
        assert!(unit_vector(&Vector3::zeros()).is_none());
    }

    #[test]
    fn random_unit_vectors_have_unit_length_and_cover_both_hemispheres() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples: Vec<_> = (0..200).map(|_| random_unit_vector(&mut rng)).collect();
        assert!(samples.iter().all(|v| (v.norm() - 1.0).abs() < 1e-12));
        assert!(samples.iter().any(|v| v.z > 0.5));
        assert!(samples.iter().any(|v| v.z < -0.5));
    }

    #[test]
    fn inter_point_vector_points_from_start_to_end() {
        let a = Point3::new(1.0, 1.0, 1.0);
        let b = Point3::new(1.0, 3.0, 1.0);
        assert_eq!(inter_point_vector(&a, &b, false), Vector3::new(0.0, 2.0, 0.0));
        assert_eq!(inter_point_vector(&a, &b, true), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(inter_point_vector(&a, &a, true), Vector3::zeros());
    }

    #[test]
    fn acos_and_atan2_angles_agree() {
        let a = Vector3::new(1.0, 0.0, 0.0);
        let b = Vector3::new(1.0, 1.0, 0.0);
        let acos = vector_angle_acos(&a, &b).unwrap();
        let atan2 = vector_angle_atan2(&a, &b);
        assert!((acos - PI / 4.0).abs() < EPS);
        assert!((atan2 - PI / 4.0).abs() < EPS);
    }

    #[test]
    fn acos_angle_is_stable_for_parallel_vectors() {
        let a = Vector3::new(0.3, 0.3, 0.3);
        assert!(vector_angle_acos(&a, &(a * 2.0)).unwrap().abs() < 1e-6);
    }

    #[test]
    fn signed_angle_follows_normal_orientation() {
        let a = Vector3::x();
        let b = Vector3::y();
        assert!((vector_angle_signed(&a, &b, &Vector3::z()) - PI / 2.0).abs() < EPS);
        assert!((vector_angle_signed(&a, &b, &-Vector3::z()) + PI / 2.0).abs() < EPS);
    }

    #[test]
    fn rotation_axis_angle_recovers_axis_and_handles_identity() {
        let axis = Unit::new_normalize(Vector3::new(0.0, 0.0, 1.0));
        let rotation = Rotation3::from_axis_angle(&axis, 0.5);
        let (recovered, angle) = rotation_axis_angle(&rotation);
        assert!((recovered - Vector3::z()).norm() < EPS);
        assert!((angle - 0.5).abs() < EPS);

        let (axis, angle) = rotation_axis_angle(&Rotation3::identity());
        assert_eq!(axis, Vector3::zeros());
        assert_eq!(angle, 0.0);
    }

    #[test]
    fn rotation_axis_angle_resolves_tiny_and_half_turns() {
        let tiny = Rotation3::from_axis_angle(&Vector3::x_axis(), 1e-11);
        let (axis, angle) = rotation_axis_angle(&tiny);
        assert!((angle - 1e-11).abs() < 1e-15);
        assert!((axis - Vector3::x()).norm() < 1e-6);

        let half = Rotation3::from_axis_angle(&Vector3::y_axis(), PI);
        let (axis, angle) = rotation_axis_angle(&half);
        assert!((angle - PI).abs() < EPS);
        assert!((axis.abs() - Vector3::y()).norm() < EPS);
    }

    #[test]
    fn rotate_about_keeps_origin_fixed() {
        let origin = Point3::new(1.0, 0.0, 0.0);
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
        let rotated = rotate_about(&Point3::new(2.0, 0.0, 0.0), &rotation, &origin);
        assert!((rotated - Point3::new(1.0, 1.0, 0.0)).norm() < EPS);
        assert!((rotate_about(&origin, &rotation, &origin) - origin).norm() < EPS);
    }

    #[test]
    fn centroid_is_arithmetic_mean() {
        let points = [Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 4.0, -2.0)];
        assert_eq!(centroid(&points).unwrap(), Point3::new(1.0, 2.0, -1.0));
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn calculate_rmsd_requires_matching_non_empty_sets() {
        let a = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let b = [Point3::new(0.0, 0.0, 1.0), Point3::new(1.0, 0.0, 1.0)];
        assert!((calculate_rmsd(&a, &b).unwrap() - 1.0).abs() < EPS);
        assert!(calculate_rmsd(&a, &b[..1]).is_none());
        assert!(calculate_rmsd(&[], &[]).is_none());
    }
}
