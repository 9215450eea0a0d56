//! Quaternion rotation helpers.
//!
//! Quaternions are scalar-first `(w, x, y, z)`. The rotation matrix is built
//! term by term rather than through `UnitQuaternion` so the handedness stays
//! fixed for downstream consumers of viewpoint rays.

use crate::error::{IcsError, Result};
use nalgebra::{Matrix3, Quaternion, Vector3};

/// Tolerance on `|q| - 1` before a quaternion is renormalized.
const UNIT_TOLERANCE: f64 = 1e-9;

pub fn quaternion(w: f64, x: f64, y: f64, z: f64) -> Quaternion<f64> {
    Quaternion::new(w, x, y, z)
}

/// Renormalize `q`, rejecting zero-length or non-finite input.
pub fn normalize_quaternion(q: &Quaternion<f64>) -> Result<Quaternion<f64>> {
    let norm = q.norm();
    if !norm.is_finite() || norm <= f64::EPSILON {
        return Err(IcsError::InvalidQuaternion(format!(
            "cannot normalize quaternion with norm {norm}"
        )));
    }
    if (norm - 1.0).abs() <= UNIT_TOLERANCE {
        return Ok(*q);
    }
    Ok(q.normalize())
}

/// Rotation matrix of a unit quaternion.
pub fn quat_to_rotation_matrix(q: &Quaternion<f64>) -> Matrix3<f64> {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);
    Matrix3::new(
        w * w + x * x - y * y - z * z,
        2.0 * x * y - 2.0 * w * z,
        2.0 * w * y + 2.0 * x * z,
        2.0 * w * z + 2.0 * x * y,
        w * w - x * x + y * y - z * z,
        2.0 * y * z - 2.0 * w * x,
        2.0 * x * z - 2.0 * w * y,
        2.0 * w * x + 2.0 * y * z,
        w * w - x * x - y * y + z * z,
    )
}

pub fn rotate_vector(q: &Quaternion<f64>, v: &Vector3<f64>) -> Vector3<f64> {
    quat_to_rotation_matrix(q) * v
}

/// Rotation of `yaw` radians about +z.
pub fn yaw_quaternion(yaw: f64) -> Quaternion<f64> {
    let half = 0.5 * yaw;
    Quaternion::new(half.cos(), 0.0, 0.0, half.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    #[test]
    fn identity_leaves_vectors_unchanged() {
        let v = Vector3::new(0.3, -1.2, 4.0);
        let rotated = rotate_vector(&quaternion(1.0, 0.0, 0.0, 0.0), &v);
        assert_relative_eq!(rotated, v);
    }

    #[test]
    fn yaw_quarter_turn_maps_east_to_north() {
        let q = yaw_quaternion(std::f64::consts::FRAC_PI_2);
        let rotated = rotate_vector(&q, &Vector3::x());
        assert_relative_eq!(rotated, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn conjugate_undoes_rotation() {
        let q = normalize_quaternion(&quaternion(0.9, 0.2, -0.3, 0.25)).unwrap();
        let v = Vector3::new(1.0, 2.0, -3.0);
        let back = rotate_vector(&q.conjugate(), &rotate_vector(&q, &v));
        assert_relative_eq!(back, v, epsilon = 1e-12);
    }

    #[test]
    fn matches_nalgebra_for_unit_quaternions() {
        let q = normalize_quaternion(&quaternion(0.5, -0.4, 0.7, 0.1)).unwrap();
        let reference = UnitQuaternion::from_quaternion(q).to_rotation_matrix();
        assert_relative_eq!(quat_to_rotation_matrix(&q), *reference.matrix(), epsilon = 1e-12);
    }

    #[test]
    fn normalization_rescales_or_rejects() {
        let q = normalize_quaternion(&quaternion(2.0, 0.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(q.w, 1.0);
        assert!(normalize_quaternion(&quaternion(0.0, 0.0, 0.0, 0.0)).is_err());
        assert!(normalize_quaternion(&quaternion(f64::NAN, 0.0, 0.0, 1.0)).is_err());
    }
}
