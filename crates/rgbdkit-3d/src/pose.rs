use serde::{Deserialize, Serialize};

use crate::linalg::{dot_product3, matmul33};
use crate::transforms::axis_angle_to_rotation_matrix;

/// A rigid body transform: a rotation followed by a translation.
///
/// The rotation matrix is row-major. Applying the transform maps a point `p`
/// to `R * p + t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    /// Row-major rotation matrix.
    pub rotation: [[f64; 3]; 3],
    /// Translation vector.
    pub translation: [f64; 3],
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    /// Create a transform from a rotation matrix and translation vector.
    pub fn new(rotation: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0, 0.0, 0.0],
        }
    }

    /// Create a transform from a rotation axis, angle and translation.
    pub fn from_axis_angle(
        axis: &[f64; 3],
        angle: f64,
        translation: [f64; 3],
    ) -> Result<Self, &'static str> {
        Ok(Self {
            rotation: axis_angle_to_rotation_matrix(axis, angle)?,
            translation,
        })
    }

    /// Apply the transform to a point.
    pub fn transform_point(&self, point: &[f64; 3]) -> [f64; 3] {
        [
            dot_product3(&self.rotation[0], point) + self.translation[0],
            dot_product3(&self.rotation[1], point) + self.translation[1],
            dot_product3(&self.rotation[2], point) + self.translation[2],
        ]
    }

    /// Apply only the rotational part to a vector (normals, directions).
    pub fn rotate_vector(&self, vector: &[f64; 3]) -> [f64; 3] {
        [
            dot_product3(&self.rotation[0], vector),
            dot_product3(&self.rotation[1], vector),
            dot_product3(&self.rotation[2], vector),
        ]
    }

    /// Compose two transforms: the returned transform applies `rhs` first,
    /// then `self`.
    pub fn compose(&self, rhs: &Self) -> Self {
        let mut rotation = [[0.0; 3]; 3];
        matmul33(&self.rotation, &rhs.rotation, &mut rotation);
        let translation = self.transform_point(&rhs.translation);
        Self {
            rotation,
            translation,
        }
    }

    /// The inverse transform: `R' = R^T`, `t' = -R^T * t`.
    pub fn inverse(&self) -> Self {
        let mut rotation = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                rotation[i][j] = self.rotation[j][i];
            }
        }
        let translation = [
            -dot_product3(&rotation[0], &self.translation),
            -dot_product3(&rotation[1], &self.translation),
            -dot_product3(&rotation[2], &self.translation),
        ];
        Self {
            rotation,
            translation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_transform_eq(a: &RigidTransform, b: &RigidTransform, epsilon: f64) {
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(a.rotation[i][j], b.rotation[i][j], epsilon = epsilon);
            }
            assert_relative_eq!(a.translation[i], b.translation[i], epsilon = epsilon);
        }
    }

    #[test]
    fn test_identity() {
        let pose = RigidTransform::identity();
        assert_eq!(pose.transform_point(&[1.0, 2.0, 3.0]), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_compose_with_inverse() -> Result<(), Box<dyn std::error::Error>> {
        let pose = RigidTransform::from_axis_angle(&[0.3, -1.0, 0.5], 0.7, [0.1, -0.2, 2.0])?;
        let composed = pose.compose(&pose.inverse());
        assert_transform_eq(&composed, &RigidTransform::identity(), 1e-12);
        Ok(())
    }

    #[test]
    fn test_inverse_roundtrip_point() -> Result<(), Box<dyn std::error::Error>> {
        let pose = RigidTransform::from_axis_angle(&[0.0, 0.0, 1.0], 1.2, [1.0, 2.0, 3.0])?;
        let p = [0.5, -0.3, 0.8];
        let q = pose.inverse().transform_point(&pose.transform_point(&p));
        for (a, b) in q.iter().zip(p.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_rotate_vector_ignores_translation() -> Result<(), Box<dyn std::error::Error>> {
        let pose = RigidTransform::from_axis_angle(&[0.0, 0.0, 1.0], 0.0, [10.0, 10.0, 10.0])?;
        assert_eq!(pose.rotate_vector(&[1.0, 0.0, 0.0]), [1.0, 0.0, 0.0]);
        Ok(())
    }
}
