use glam::{DMat3, DVec3};
use kiddo::immutable::float::kdtree::ImmutableKdTree;

use rgbdkit_3d::linalg::{det33, matmul33};

/// Compute the centroids of two sets of points.
///
/// # Arguments
///
/// * `points1` - A set of points.
/// * `points2` - Another set of points.
///
/// # Returns
///
/// The centroids of the two sets of points.
pub fn compute_centroids(points1: &[[f64; 3]], points2: &[[f64; 3]]) -> (DVec3, DVec3) {
    let mut centroid1 = DVec3::ZERO;
    let mut centroid2 = DVec3::ZERO;

    for (p1, p2) in points1.iter().zip(points2.iter()) {
        centroid1 += DVec3::from_array(*p1);
        centroid2 += DVec3::from_array(*p2);
    }

    centroid1 /= points1.len() as f64;
    centroid2 /= points2.len() as f64;

    (centroid1, centroid2)
}

/// Fit the rigid transform between two sets of corresponding points.
///
/// Solves for the rotation and translation minimizing the squared distances
/// between the pairs: the covariance of the centered point sets is
/// decomposed with an SVD and the rotation recovered as `V * U^T`, with a
/// reflection correction when the determinant comes out negative.
///
/// PRECONDITION: both slices have the same length of at least 3.
pub fn fit_transformation(
    points_in_src: &[[f64; 3]],
    points_in_dst: &[[f64; 3]],
    dst_r_src: &mut [[f64; 3]; 3],
    dst_t_src: &mut [f64; 3],
) {
    assert_eq!(points_in_src.len(), points_in_dst.len());
    assert!(
        points_in_src.len() >= 3,
        "need at least 3 points for transformation estimation"
    );

    // identical point sets need no solve
    if points_in_src == points_in_dst {
        *dst_r_src = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        *dst_t_src = [0.0, 0.0, 0.0];
        return;
    }

    let (src_centroid, dst_centroid) = compute_centroids(points_in_src, points_in_dst);

    // covariance matrix H = sum[(src - src_mean) * (dst - dst_mean)^T]
    let mut h = DMat3::ZERO;
    for (p_in_src, p_in_dst) in points_in_src.iter().zip(points_in_dst.iter()) {
        let src_centered = DVec3::from_array(*p_in_src) - src_centroid;
        let dst_centered = DVec3::from_array(*p_in_dst) - dst_centroid;
        h += DMat3::from_cols(
            src_centered * dst_centered.x,
            src_centered * dst_centered.y,
            src_centered * dst_centered.z,
        );
    }

    let mut h_mat = faer::Mat::<f64>::zeros(3, 3);
    for j in 0..3 {
        for i in 0..3 {
            h_mat.write(i, j, h.col(j)[i]);
        }
    }

    let svd = h_mat.svd();
    let (u, v) = (svd.u(), svd.v());
    let mut u_arr = [[0.0; 3]; 3];
    let mut v_arr = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            u_arr[i][j] = u.read(i, j);
            v_arr[i][j] = v.read(i, j);
        }
    }

    // R = V * U^T
    let rotation_from = |v_arr: &[[f64; 3]; 3]| -> [[f64; 3]; 3] {
        let mut r = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                r[i][j] = v_arr[i][0] * u_arr[j][0] + v_arr[i][1] * u_arr[j][1] + v_arr[i][2] * u_arr[j][2];
            }
        }
        r
    };

    let mut r = rotation_from(&v_arr);

    // a negative determinant means a reflection snuck in; flip the last
    // column of V and recompute
    if det33(&r) < 0.0 {
        for row in &mut v_arr {
            row[2] = -row[2];
        }
        r = rotation_from(&v_arr);
    }

    // t = dst_centroid - R * src_centroid
    for i in 0..3 {
        dst_t_src[i] = dst_centroid[i]
            - (r[i][0] * src_centroid.x + r[i][1] * src_centroid.y + r[i][2] * src_centroid.z);
    }
    *dst_r_src = r;
}

pub(crate) fn find_correspondences(
    source: &[[f64; 3]],
    target: &[[f64; 3]],
    kdtree: &ImmutableKdTree<f64, u32, 3, 32>,
) -> (Vec<[f64; 3]>, Vec<[f64; 3]>, Vec<f64>) {
    // nearest neighbor in the target for each source point
    let nn_results = source
        .iter()
        .map(|p| kdtree.nearest_one::<kiddo::SquaredEuclidean>(p))
        .collect::<Vec<_>>();

    // median of the (squared) match distances
    let mut sorted_distances = nn_results.iter().map(|nn| nn.distance).collect::<Vec<_>>();
    sorted_distances.sort_by(|a, b| a.total_cmp(b));
    let median_dist = sorted_distances[sorted_distances.len() / 2];

    // median absolute deviation as a robust spread estimate
    let mut deviations = sorted_distances
        .iter()
        .map(|d| (d - median_dist).abs())
        .collect::<Vec<_>>();
    deviations.sort_by(|a, b| a.total_cmp(b));
    let mad = deviations[deviations.len() / 2];
    let sigma_d = 1.4826 * mad;

    // reject matches far beyond the typical distance
    let res = nn_results
        .iter()
        .enumerate()
        .filter(|(_, nn)| nn.distance <= median_dist + 3.0 * sigma_d)
        .map(|(i, nn)| (source[i], target[nn.item as usize], nn.distance))
        .collect::<Vec<_>>();

    let (points_in_src, tmp): (Vec<_>, Vec<_>) =
        res.into_iter().map(|(a, b, c)| (a, (b, c))).unzip();
    let (points_in_dst, distances) = tmp.into_iter().unzip();

    (points_in_src, points_in_dst, distances)
}

// Accumulate a delta transform on the left of the current estimate:
// R <- Rd * R, t <- Rd * t + td.
pub(crate) fn update_transformation(
    rr: &mut [[f64; 3]; 3],
    tt: &mut [f64; 3],
    rr_delta: &[[f64; 3]; 3],
    tt_delta: &[f64; 3],
) {
    let rr_prev = *rr;
    matmul33(rr_delta, &rr_prev, rr);

    let tt_prev = *tt;
    for i in 0..3 {
        tt[i] = rr_delta[i][0] * tt_prev[0]
            + rr_delta[i][1] * tt_prev[1]
            + rr_delta[i][2] * tt_prev[2]
            + tt_delta[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kiddo::immutable::float::kdtree::ImmutableKdTree;
    use rgbdkit_3d::{linalg::transform_points3d, transforms::axis_angle_to_rotation_matrix};

    fn create_random_points(num_points: usize) -> Vec<[f64; 3]> {
        (0..num_points)
            .map(|_| {
                [
                    rand::random::<f64>(),
                    rand::random::<f64>(),
                    rand::random::<f64>(),
                ]
            })
            .collect()
    }

    #[test]
    fn test_compute_centroids() {
        let points1 = vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let points2 = vec![[7.0, 8.0, 9.0], [10.0, 11.0, 12.0]];
        let (centroid1, centroid2) = compute_centroids(&points1, &points2);
        assert_relative_eq!(centroid1.x, 2.5, epsilon = 1e-6);
        assert_relative_eq!(centroid1.y, 3.5, epsilon = 1e-6);
        assert_relative_eq!(centroid1.z, 4.5, epsilon = 1e-6);
        assert_relative_eq!(centroid2.x, 8.5, epsilon = 1e-6);
        assert_relative_eq!(centroid2.y, 9.5, epsilon = 1e-6);
        assert_relative_eq!(centroid2.z, 10.5, epsilon = 1e-6);
    }

    #[test]
    fn test_fit_transformation_identity() {
        let points_src = create_random_points(30);
        let points_dst = points_src.clone();

        let mut rotation = [[0.0; 3]; 3];
        let mut translation = [0.0; 3];
        fit_transformation(&points_src, &points_dst, &mut rotation, &mut translation);

        let expected_rotation = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        for (res, exp) in rotation.iter().zip(expected_rotation.iter()) {
            for (r, e) in res.iter().zip(exp.iter()) {
                assert_relative_eq!(r, e, epsilon = 1e-6);
            }
        }
        for t in translation.iter() {
            assert_relative_eq!(t, &0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_fit_transformation_rotation() -> Result<(), Box<dyn std::error::Error>> {
        let points_src = create_random_points(30);

        let expected_rotation =
            axis_angle_to_rotation_matrix(&[1.0, 0.0, 0.0], std::f64::consts::PI / 2.0)?;
        let expected_translation = [0.0, 0.0, 0.0];

        let mut points_dst = vec![[0.0; 3]; points_src.len()];
        transform_points3d(
            &points_src,
            &expected_rotation,
            &expected_translation,
            &mut points_dst,
        )?;

        let mut rotation = [[0.0; 3]; 3];
        let mut translation = [0.0; 3];
        fit_transformation(&points_src, &points_dst, &mut rotation, &mut translation);

        for (res, exp) in rotation.iter().zip(expected_rotation.iter()) {
            for (r, e) in res.iter().zip(exp.iter()) {
                assert_relative_eq!(r, e, epsilon = 1e-6);
            }
        }
        for (res, exp) in translation.iter().zip(expected_translation.iter()) {
            assert_relative_eq!(res, exp, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_fit_transformation_random() -> Result<(), Box<dyn std::error::Error>> {
        let num_test = 10;
        let num_points = 30;

        let points_src = create_random_points(num_points);

        for _ in 0..num_test {
            let axis = [
                rand::random::<f64>() + 0.1,
                rand::random::<f64>(),
                rand::random::<f64>(),
            ];
            let expected_rotation =
                axis_angle_to_rotation_matrix(&axis, rand::random::<f64>() * 0.1)?;
            let expected_translation = [
                rand::random::<f64>() * 0.1,
                rand::random::<f64>() * 0.1,
                rand::random::<f64>() * 0.1,
            ];

            let mut points_dst = vec![[0.0; 3]; num_points];
            transform_points3d(
                &points_src,
                &expected_rotation,
                &expected_translation,
                &mut points_dst,
            )?;

            let mut rotation = [[0.0; 3]; 3];
            let mut translation = [0.0; 3];
            fit_transformation(&points_src, &points_dst, &mut rotation, &mut translation);

            // the fitted transform must map the source onto the destination
            let mut points_src_fit = vec![[0.0; 3]; num_points];
            transform_points3d(&points_src, &rotation, &translation, &mut points_src_fit)?;

            for (res, exp) in points_src_fit.iter().zip(points_dst.iter()) {
                for (r, e) in res.iter().zip(exp.iter()) {
                    assert_relative_eq!(r, e, epsilon = 1e-5);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_find_correspondences() {
        let points_src = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
        ];
        let points_dst = vec![[1.0, 0.0, 0.0], [1.0, 1.0, 0.0]];

        let kdtree = ImmutableKdTree::new_from_slice(&points_dst);

        let (points_in_src, points_in_dst, distances) =
            find_correspondences(&points_src, &points_dst, &kdtree);

        assert_eq!(points_in_src.len(), points_in_dst.len());
        assert_eq!(points_in_src.len(), 4);
        assert_eq!(distances[0], 1.0);
        assert_eq!(distances[1], 0.0);
        assert_eq!(distances[2], 1.0);
        assert_eq!(distances[3], 0.0);
    }

    #[test]
    fn test_update_transformation_accumulates_on_the_left()
    -> Result<(), Box<dyn std::error::Error>> {
        let r1 = axis_angle_to_rotation_matrix(&[0.0, 0.0, 1.0], 0.3)?;
        let t1 = [1.0, 0.0, 0.0];
        let r2 = axis_angle_to_rotation_matrix(&[0.0, 1.0, 0.0], -0.2)?;
        let t2 = [0.0, 2.0, 0.0];

        let mut rr = r1;
        let mut tt = t1;
        update_transformation(&mut rr, &mut tt, &r2, &t2);

        // applying the accumulated transform must equal applying r1/t1 then r2/t2
        let p = [0.4, -0.7, 1.3];
        let mut once = [[0.0; 3]];
        transform_points3d(&[p], &r1, &t1, &mut once)?;
        let mut twice = [[0.0; 3]];
        transform_points3d(&once.clone(), &r2, &t2, &mut twice)?;

        let mut accumulated = [[0.0; 3]];
        transform_points3d(&[p], &rr, &tt, &mut accumulated)?;

        for (a, b) in accumulated[0].iter().zip(twice[0].iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
        Ok(())
    }
}
