use glam::{DMat3, DVec3};

/// Compute the rotation matrix from an axis and angle.
///
/// # Arguments
///
/// * `axis` - The axis of rotation. Does not need to be unit length.
/// * `angle` - The angle of rotation in radians.
///
/// # Returns
///
/// The row-major rotation matrix.
///
/// Example:
///
/// ```
/// use rgbdkit_3d::transforms::axis_angle_to_rotation_matrix;
///
/// let axis = [1.0, 0.0, 0.0];
/// let angle = std::f64::consts::PI / 2.0;
/// let rotation = axis_angle_to_rotation_matrix(&axis, angle).unwrap();
/// assert!((rotation[1][2] - -1.0).abs() < 1e-12);
/// ```
pub fn axis_angle_to_rotation_matrix(
    axis: &[f64; 3],
    angle: f64,
) -> Result<[[f64; 3]; 3], &'static str> {
    let axis = DVec3::from_array(*axis);
    if axis.length() < 1e-10 {
        return Err("cannot compute rotation matrix from a zero vector");
    }

    // glam matrices are column-major, emit row-major
    let m = DMat3::from_axis_angle(axis.normalize(), angle);
    Ok([
        [m.x_axis.x, m.y_axis.x, m.z_axis.x],
        [m.x_axis.y, m.y_axis.y, m.z_axis.y],
        [m.x_axis.z, m.y_axis.z, m.z_axis.z],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_axis_angle_to_rotation_matrix_x90() -> Result<(), Box<dyn std::error::Error>> {
        let axis = [1.0, 0.0, 0.0];
        let angle = std::f64::consts::PI / 2.0;
        let rotation = axis_angle_to_rotation_matrix(&axis, angle)?;
        let expected = [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]];
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(rotation[i][j], expected[i][j], epsilon = 1e-12);
            }
        }
        Ok(())
    }

    #[test]
    fn test_axis_angle_zero_axis() {
        assert!(axis_angle_to_rotation_matrix(&[0.0, 0.0, 0.0], 1.0).is_err());
    }

    #[test]
    fn test_axis_angle_non_unit_axis() -> Result<(), Box<dyn std::error::Error>> {
        // a scaled axis must produce the same rotation as the unit one
        let r1 = axis_angle_to_rotation_matrix(&[0.0, 2.0, 0.0], 0.3)?;
        let r2 = axis_angle_to_rotation_matrix(&[0.0, 1.0, 0.0], 0.3)?;
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(r1[i][j], r2[i][j], epsilon = 1e-12);
            }
        }
        Ok(())
    }
}
