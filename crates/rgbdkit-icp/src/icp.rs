use kiddo::immutable::float::kdtree::ImmutableKdTree;

use crate::ops::{find_correspondences, fit_transformation, update_transformation};
use rgbdkit_3d::{linalg::transform_points3d, pointcloud::PointCloud};

/// Error types for the icp module.
#[derive(Debug, thiserror::Error)]
pub enum IcpError {
    /// Source or target point cloud has no points.
    #[error("source and target point clouds must not be empty")]
    EmptyPointCloud,

    /// Too few correspondences survived outlier rejection.
    #[error("not enough correspondences to fit a rigid transform (found {0}, need at least 3)")]
    NotEnoughCorrespondences(usize),

    /// The registration finished above the acceptance threshold.
    #[error("registration did not converge: rmse {rmse} above threshold {threshold} after {iterations} iterations")]
    NotConverged {
        /// Final root mean square correspondence error.
        rmse: f64,
        /// The configured acceptance threshold.
        threshold: f64,
        /// Iterations performed.
        iterations: usize,
    },

    /// A linear algebra failure.
    #[error(transparent)]
    Linalg(#[from] rgbdkit_3d::linalg::LinalgError),

    /// An RGB-D preprocessing failure.
    #[error(transparent)]
    Rgbd(#[from] rgbdkit_3d::rgbd::RgbdError),
}

/// Result of the ICP algorithm.
///
/// The transformation is from the source to the target frame.
#[derive(Debug, Clone)]
pub struct IcpResult {
    /// Estimated rotation matrix.
    pub rotation: [[f64; 3]; 3],
    /// Estimated translation vector.
    pub translation: [f64; 3],
    /// The total number of iterations performed until convergence.
    pub num_iterations: usize,
    /// Last computed RMSE.
    pub rmse: f64,
}

/// Convergence criteria for the ICP loop.
#[derive(Debug, Clone)]
pub struct IcpConvergenceCriteria {
    /// Maximum number of iterations to perform.
    pub max_iterations: usize,
    /// Convergence tolerance as the difference in RMSE between two
    /// consecutive iterations.
    pub tolerance: f64,
}

impl Default for IcpConvergenceCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-6,
        }
    }
}

/// Iterative Closest Point using point to point distances.
///
/// Each iteration matches every source point to its nearest target point
/// with a kd-tree, rejects outlier matches with a median absolute deviation
/// test, fits the rigid transform between the surviving pairs and applies
/// it. The loop stops when the RMSE change between two iterations drops
/// below the tolerance or the iteration budget is spent.
///
/// # Arguments
///
/// * `source` - Source point cloud.
/// * `target` - Target point cloud.
/// * `initial_rot` - Initial rotation from the source to the target frame.
/// * `initial_trans` - Initial translation from the source to the target frame.
/// * `criteria` - Convergence criteria.
pub fn icp_point_to_point(
    source: &PointCloud,
    target: &PointCloud,
    initial_rot: [[f64; 3]; 3],
    initial_trans: [f64; 3],
    criteria: IcpConvergenceCriteria,
) -> Result<IcpResult, IcpError> {
    if source.is_empty() || target.is_empty() {
        return Err(IcpError::EmptyPointCloud);
    }

    let mut result = IcpResult {
        rotation: initial_rot,
        translation: initial_trans,
        num_iterations: 0,
        rmse: f64::INFINITY,
    };

    // kd-tree over the target points to speed up the nearest neighbor search
    let kdtree: ImmutableKdTree<f64, u32, 3, 32> = ImmutableKdTree::new_from_slice(target.points());

    // apply the initial transformation
    let mut current_source = vec![[0.0; 3]; source.len()];
    transform_points3d(
        source.points(),
        &result.rotation,
        &result.translation,
        &mut current_source,
    )?;

    for i in 0..criteria.max_iterations {
        log::debug!("iteration: {}", i);

        let (matched_source, matched_target, squared_distances) =
            find_correspondences(&current_source, target.points(), &kdtree);

        log::debug!("num correspondences: {}", matched_source.len());

        if matched_source.len() < 3 {
            return Err(IcpError::NotEnoughCorrespondences(matched_source.len()));
        }

        // rigid transform between the matched pairs
        let mut rr_delta = [[0.0; 3]; 3];
        let mut tt_delta = [0.0; 3];
        fit_transformation(
            &matched_source,
            &matched_target,
            &mut rr_delta,
            &mut tt_delta,
        );

        let mut transformed_points = vec![[0.0; 3]; current_source.len()];
        transform_points3d(&current_source, &rr_delta, &tt_delta, &mut transformed_points)?;

        // accumulate the delta on the left: R <- Rd * R, t <- Rd * t + td
        update_transformation(
            &mut result.rotation,
            &mut result.translation,
            &rr_delta,
            &tt_delta,
        );

        let rmse =
            (squared_distances.iter().sum::<f64>() / squared_distances.len() as f64).sqrt();

        result.num_iterations += 1;

        if (result.rmse - rmse).abs() < criteria.tolerance {
            log::debug!(
                "converged after {} iterations with rmse {}",
                result.num_iterations,
                rmse
            );
            result.rmse = rmse;
            break;
        }

        result.rmse = rmse;
        current_source = transformed_points;
    }

    Ok(result)
}
