use rgbdkit_3d::pointcloud::PointCloud;
use rgbdkit_3d::pose::RigidTransform;
use rgbdkit_3d::rgbd::{
    depth_bilateral_filter, depth_to_pointcloud, PinholeIntrinsics, RgbdImage,
    DEFAULT_MAX_DELTA_DEPTH_PERCENT,
};

use crate::{icp_point_to_point, IcpConvergenceCriteria, IcpError};

// depth prefilter parameters, tuned for consumer RGB-D sensors at
// room-scale distances
const DEPTH_FILTER_RADIUS: usize = 2;
const DEPTH_FILTER_SIGMA_DEPTH: f64 = 0.03;
const DEPTH_FILTER_SIGMA_SPACE: f64 = 2.5;

/// An accepted registration: the relative pose and its fit statistics.
#[derive(Debug, Clone)]
pub struct PoseEstimate {
    /// Transform mapping source frame points into the target frame.
    pub pose: RigidTransform,
    /// Final root mean square correspondence error.
    pub rmse: f64,
    /// ICP iterations performed.
    pub num_iterations: usize,
}

/// Relative pose estimation between two point clouds or RGB-D frames.
///
/// A configured front-end over [`icp_point_to_point`]: it carries the
/// iteration budget, convergence tolerance and acceptance threshold, and for
/// RGB-D input also the preprocessing chain (depth bilateral filtering and
/// subsampled back-projection).
///
/// ```
/// use rgbdkit_icp::RelativePoseEstimatorIcp;
///
/// let estimator = RelativePoseEstimatorIcp::new()
///     .with_max_iterations(30)
///     .with_rmse_threshold(0.02);
/// ```
#[derive(Debug, Clone)]
pub struct RelativePoseEstimatorIcp {
    max_iterations: usize,
    tolerance: f64,
    rmse_threshold: f64,
    subsampling_stride: usize,
    filter_depth: bool,
}

impl Default for RelativePoseEstimatorIcp {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-6,
            rmse_threshold: 0.05,
            subsampling_stride: 2,
            filter_depth: true,
        }
    }
}

impl RelativePoseEstimatorIcp {
    /// Create an estimator with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of ICP iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance on the RMSE change between iterations.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the RMSE above which a registration is rejected.
    pub fn with_rmse_threshold(mut self, rmse_threshold: f64) -> Self {
        self.rmse_threshold = rmse_threshold;
        self
    }

    /// Set the pixel stride used when back-projecting RGB-D frames.
    pub fn with_subsampling_stride(mut self, stride: usize) -> Self {
        self.subsampling_stride = stride.max(1);
        self
    }

    /// Enable or disable bilateral filtering of the depth maps before
    /// back-projection.
    pub fn with_depth_filtering(mut self, enabled: bool) -> Self {
        self.filter_depth = enabled;
        self
    }

    /// Estimate the relative pose between two point clouds.
    ///
    /// Returns the transform mapping source points into the target frame, or
    /// [`IcpError::NotConverged`] when the final RMSE stays above the
    /// acceptance threshold.
    pub fn estimate_from_clouds(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        initial_guess: &RigidTransform,
    ) -> Result<PoseEstimate, IcpError> {
        let result = icp_point_to_point(
            source,
            target,
            initial_guess.rotation,
            initial_guess.translation,
            IcpConvergenceCriteria {
                max_iterations: self.max_iterations,
                tolerance: self.tolerance,
            },
        )?;

        if result.rmse > self.rmse_threshold {
            return Err(IcpError::NotConverged {
                rmse: result.rmse,
                threshold: self.rmse_threshold,
                iterations: result.num_iterations,
            });
        }

        Ok(PoseEstimate {
            pose: RigidTransform::new(result.rotation, result.translation),
            rmse: result.rmse,
            num_iterations: result.num_iterations,
        })
    }

    /// Estimate the relative pose between two RGB-D frames sharing the same
    /// camera intrinsics.
    ///
    /// Both depth maps are optionally bilateral filtered, back-projected
    /// into colored point clouds with the configured stride, and registered
    /// with [`estimate_from_clouds`](Self::estimate_from_clouds).
    pub fn estimate_from_rgbd(
        &self,
        source: &RgbdImage,
        target: &RgbdImage,
        intrinsics: &PinholeIntrinsics,
        initial_guess: &RigidTransform,
    ) -> Result<PoseEstimate, IcpError> {
        let source_cloud = self.project(source, intrinsics)?;
        let target_cloud = self.project(target, intrinsics)?;

        log::debug!(
            "back-projected rgbd frames to {} / {} points",
            source_cloud.len(),
            target_cloud.len()
        );

        self.estimate_from_clouds(&source_cloud, &target_cloud, initial_guess)
    }

    fn project(
        &self,
        image: &RgbdImage,
        intrinsics: &PinholeIntrinsics,
    ) -> Result<PointCloud, IcpError> {
        if self.filter_depth {
            let filtered = depth_bilateral_filter(
                image,
                DEPTH_FILTER_RADIUS,
                DEPTH_FILTER_SIGMA_DEPTH,
                DEPTH_FILTER_SIGMA_SPACE,
                DEFAULT_MAX_DELTA_DEPTH_PERCENT,
            );
            Ok(depth_to_pointcloud(
                &filtered,
                intrinsics,
                self.subsampling_stride,
            )?)
        } else {
            Ok(depth_to_pointcloud(
                image,
                intrinsics,
                self.subsampling_stride,
            )?)
        }
    }
}
