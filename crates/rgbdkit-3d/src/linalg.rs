/// Error types for the linalg module.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum LinalgError {
    /// Source and destination buffers disagree in length.
    #[error("source and destination must have the same length ({0} != {1})")]
    LengthMismatch(usize, usize),
}

/// Convert a 3-vector to a faer column view.
pub fn array3_to_faer_col(array: &[f64; 3]) -> faer::ColRef<'_, f64> {
    faer::col::from_slice(array.as_slice())
}

/// Convert a row-major 3x3 array to a faer matrix view.
pub fn array33_to_faer_mat33(array: &[[f64; 3]; 3]) -> faer::MatRef<'_, f64> {
    let array_slice =
        unsafe { std::slice::from_raw_parts(array.as_ptr() as *const f64, array.len() * 3) };
    faer::mat::from_row_major_slice(array_slice, 3, 3)
}

/// Transform a set of 3d points using a rotation and translation.
///
/// # Arguments
///
/// * `src_points` - The points to be transformed.
/// * `dst_r_src` - The rotation matrix from the source to the destination frame.
/// * `dst_t_src` - The translation vector from the source to the destination frame.
/// * `dst_points` - Pre-allocated output buffer of the same length as `src_points`.
///
/// Example:
///
/// ```
/// use rgbdkit_3d::linalg::transform_points3d;
///
/// let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
/// let rotation = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
/// let translation = [0.0, 0.0, 0.0];
/// let mut dst_points = vec![[0.0; 3]; src_points.len()];
/// transform_points3d(&src_points, &rotation, &translation, &mut dst_points).unwrap();
/// ```
pub fn transform_points3d(
    src_points: &[[f64; 3]],
    dst_r_src: &[[f64; 3]; 3],
    dst_t_src: &[f64; 3],
    dst_points: &mut [[f64; 3]],
) -> Result<(), LinalgError> {
    if src_points.len() != dst_points.len() {
        return Err(LinalgError::LengthMismatch(
            src_points.len(),
            dst_points.len(),
        ));
    }

    let dst_r_src_mat = array33_to_faer_mat33(dst_r_src);
    let dst_t_src_col = array3_to_faer_col(dst_t_src);

    // view of the source points as a Nx3 row-major matrix
    let points_in_src = {
        let src_points_slice = unsafe {
            std::slice::from_raw_parts(src_points.as_ptr() as *const f64, src_points.len() * 3)
        };
        faer::mat::from_row_major_slice(src_points_slice, src_points.len(), 3)
    };

    // mutable view of the destination points as a 3xN column-major matrix,
    // so that each column is one output point
    let mut points_in_dst = {
        let dst_points_slice = unsafe {
            std::slice::from_raw_parts_mut(
                dst_points.as_mut_ptr() as *mut f64,
                dst_points.len() * 3,
            )
        };
        faer::mat::from_column_major_slice_mut(dst_points_slice, 3, dst_points.len())
    };

    faer::linalg::matmul::matmul(
        &mut points_in_dst,
        dst_r_src_mat,
        points_in_src.transpose(),
        None,
        1.0,
        faer::Parallelism::None,
    );

    // SAFETY: the translation column has exactly 3 entries and each destination
    // column has exactly 3 rows
    let (tx, ty, tz) = unsafe {
        (
            dst_t_src_col.read_unchecked(0),
            dst_t_src_col.read_unchecked(1),
            dst_t_src_col.read_unchecked(2),
        )
    };

    for mut col in points_in_dst.col_iter_mut() {
        unsafe {
            col.write_unchecked(0, col.read_unchecked(0) + tx);
            col.write_unchecked(1, col.read_unchecked(1) + ty);
            col.write_unchecked(2, col.read_unchecked(2) + tz);
        }
    }

    Ok(())
}

/// Multiply two row-major 3x3 matrices into `out`.
pub fn matmul33(lhs: &[[f64; 3]; 3], rhs: &[[f64; 3]; 3], out: &mut [[f64; 3]; 3]) {
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = lhs[i][0] * rhs[0][j] + lhs[i][1] * rhs[1][j] + lhs[i][2] * rhs[2][j];
        }
    }
}

/// Dot product of two 3-vectors.
#[inline]
pub fn dot_product3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product of two 3-vectors.
#[inline]
pub fn cross_product3(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Determinant of a row-major 3x3 matrix.
pub fn det33(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Normalize a 3-vector to unit length. A zero vector is returned unchanged.
pub fn normalize3(v: &[f64; 3]) -> [f64; 3] {
    let norm = dot_product3(v, v).sqrt();
    if norm < 1e-12 {
        return *v;
    }
    [v[0] / norm, v[1] / norm, v[2] / norm]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_points3d_identity() -> Result<(), LinalgError> {
        let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
        let rotation = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let translation = [0.0, 0.0, 0.0];
        let mut dst_points = vec![[0.0; 3]; src_points.len()];
        transform_points3d(&src_points, &rotation, &translation, &mut dst_points)?;

        assert_eq!(dst_points, src_points);
        Ok(())
    }

    #[test]
    fn test_transform_points3d_roundtrip() -> Result<(), LinalgError> {
        let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
        let rotation = [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]];
        let translation = [1.0, 2.0, 3.0];

        let mut dst_points = vec![[0.0; 3]; src_points.len()];
        transform_points3d(&src_points, &rotation, &translation, &mut dst_points)?;

        // invert the transformation: R' = R^T, t' = -R^T * t
        let mut rotation_inv = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                rotation_inv[i][j] = rotation[j][i];
            }
        }
        let mut translation_inv = [0.0; 3];
        for i in 0..3 {
            translation_inv[i] = -dot_product3(&rotation_inv[i], &translation);
        }

        let mut points_back = vec![[0.0; 3]; dst_points.len()];
        transform_points3d(
            &dst_points,
            &rotation_inv,
            &translation_inv,
            &mut points_back,
        )?;

        for (p, q) in points_back.iter().zip(src_points.iter()) {
            for (a, b) in p.iter().zip(q.iter()) {
                assert_relative_eq!(a, b, epsilon = 1e-12);
            }
        }
        Ok(())
    }

    #[test]
    fn test_transform_points3d_length_mismatch() {
        let src_points = vec![[0.0; 3]; 2];
        let mut dst_points = vec![[0.0; 3]; 3];
        let result = transform_points3d(
            &src_points,
            &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            &[0.0; 3],
            &mut dst_points,
        );
        assert_eq!(result, Err(LinalgError::LengthMismatch(2, 3)));
    }

    #[test]
    fn test_matmul33() {
        let a = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let b = [[9.0, 8.0, 7.0], [6.0, 5.0, 4.0], [3.0, 2.0, 1.0]];
        let mut m = [[0.0; 3]; 3];
        matmul33(&a, &b, &mut m);
        assert_eq!(m[0], [30.0, 24.0, 18.0]);
        assert_eq!(m[1], [84.0, 69.0, 54.0]);
        assert_eq!(m[2], [138.0, 114.0, 90.0]);
    }

    #[test]
    fn test_cross_product3() {
        let x = [1.0, 0.0, 0.0];
        let y = [0.0, 1.0, 0.0];
        assert_eq!(cross_product3(&x, &y), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_det33() {
        let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert_relative_eq!(det33(&identity), 1.0);

        let reflection = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]];
        assert_relative_eq!(det33(&reflection), -1.0);
    }

    #[test]
    fn test_normalize3() {
        let v = normalize3(&[3.0, 0.0, 4.0]);
        assert_relative_eq!(v[0], 0.6);
        assert_relative_eq!(v[2], 0.8);
        assert_eq!(normalize3(&[0.0; 3]), [0.0; 3]);
    }
}
