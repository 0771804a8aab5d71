use serde::{Deserialize, Serialize};

use crate::pointcloud::PointCloud;

/// Neighbors whose depth deviates from the window center by more than this
/// fraction of the center depth do not contribute to the bilateral filter.
/// The default corresponds to 5mm at one meter.
pub const DEFAULT_MAX_DELTA_DEPTH_PERCENT: f32 = 0.005;

/// Error types for the rgbd module.
#[derive(Debug, thiserror::Error)]
pub enum RgbdError {
    /// Pixel data length does not match the image dimensions.
    #[error("data length ({found}) does not match the image size ({expected})")]
    InvalidShape {
        /// Expected number of pixels.
        expected: usize,
        /// Actual buffer length.
        found: usize,
    },

    /// A zero subsampling stride.
    #[error("subsampling stride must be non-zero")]
    ZeroStride,
}

/// Intrinsic parameters of a pinhole camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinholeIntrinsics {
    /// Focal length along x, in pixels.
    pub fx: f64,
    /// Focal length along y, in pixels.
    pub fy: f64,
    /// Principal point x coordinate, in pixels.
    pub cx: f64,
    /// Principal point y coordinate, in pixels.
    pub cy: f64,
}

/// A registered color and depth frame.
///
/// Both buffers are row-major with one entry per pixel. Depth is in meters;
/// a depth of `0.0` or any non-finite value marks an invalid measurement.
#[derive(Debug, Clone)]
pub struct RgbdImage {
    /// The width of the image.
    pub width: usize,
    /// The height of the image.
    pub height: usize,
    /// The color image.
    pub rgb: Vec<[u8; 3]>,
    /// The depth image in meters.
    pub depth: Vec<f32>,
}

impl RgbdImage {
    /// Create a new RGB-D image from color and depth buffers.
    pub fn new(
        rgb: Vec<[u8; 3]>,
        depth: Vec<f32>,
        width: usize,
        height: usize,
    ) -> Result<Self, RgbdError> {
        let expected = width * height;
        if rgb.len() != expected {
            return Err(RgbdError::InvalidShape {
                expected,
                found: rgb.len(),
            });
        }
        if depth.len() != expected {
            return Err(RgbdError::InvalidShape {
                expected,
                found: depth.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgb,
            depth,
        })
    }

    /// The dimensions of the image as (width, height).
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Get the depth value at a specific pixel.
    #[inline]
    pub fn get_depth(&self, x: usize, y: usize) -> f32 {
        self.depth[y * self.width + x]
    }

    /// Get the color value at a specific pixel.
    #[inline]
    pub fn get_color(&self, x: usize, y: usize) -> [u8; 3] {
        self.rgb[y * self.width + x]
    }
}

#[inline]
fn is_valid_depth(d: f32) -> bool {
    d.is_finite() && d > 0.0
}

/// Back-project an RGB-D image into a colored point cloud.
///
/// Every `stride`-th pixel in both directions with a valid depth is projected
/// through the pinhole model into camera coordinates, carrying its color.
pub fn depth_to_pointcloud(
    image: &RgbdImage,
    intrinsics: &PinholeIntrinsics,
    stride: usize,
) -> Result<PointCloud, RgbdError> {
    if stride == 0 {
        return Err(RgbdError::ZeroStride);
    }

    let mut points = Vec::new();
    let mut colors = Vec::new();
    for y in (0..image.height).step_by(stride) {
        for x in (0..image.width).step_by(stride) {
            let d = image.get_depth(x, y);
            if !is_valid_depth(d) {
                continue;
            }
            let z = d as f64;
            points.push([
                (x as f64 - intrinsics.cx) * z / intrinsics.fx,
                (y as f64 - intrinsics.cy) * z / intrinsics.fy,
                z,
            ]);
            colors.push(image.get_color(x, y));
        }
    }

    Ok(PointCloud::new(points, Some(colors), None))
}

/// Edge-preserving smoothing of the depth channel of an RGB-D image.
///
/// A bilateral filter where the range weight operates on depth differences.
/// Neighbors deviating from the center depth by more than
/// `max_delta_depth_percent * center_depth` are excluded entirely, so depth
/// discontinuities at object boundaries are never blurred across. Invalid
/// pixels are passed through unchanged and never contribute to their
/// neighbors.
///
/// # Arguments
///
/// * `src` - The input frame. The color channel is copied as is.
/// * `radius` - Half width of the square filter window.
/// * `sigma_depth` - Standard deviation of the range kernel, in meters.
/// * `sigma_space` - Standard deviation of the spatial kernel, in pixels.
/// * `max_delta_depth_percent` - Relative depth gate, see
///   [`DEFAULT_MAX_DELTA_DEPTH_PERCENT`].
pub fn depth_bilateral_filter(
    src: &RgbdImage,
    radius: usize,
    sigma_depth: f64,
    sigma_space: f64,
    max_delta_depth_percent: f32,
) -> RgbdImage {
    let mut filtered = vec![0.0f32; src.depth.len()];
    let inv_sigma_depth2 = 1.0 / (2.0 * sigma_depth * sigma_depth);
    let inv_sigma_space2 = 1.0 / (2.0 * sigma_space * sigma_space);
    let r = radius as isize;

    for y in 0..src.height {
        for x in 0..src.width {
            let center = src.get_depth(x, y);
            if !is_valid_depth(center) {
                filtered[y * src.width + x] = center;
                continue;
            }
            let max_delta = max_delta_depth_percent * center;

            let mut weight_sum = 0.0f64;
            let mut value_sum = 0.0f64;
            for dy in -r..=r {
                let ny = y as isize + dy;
                if ny < 0 || ny >= src.height as isize {
                    continue;
                }
                for dx in -r..=r {
                    let nx = x as isize + dx;
                    if nx < 0 || nx >= src.width as isize {
                        continue;
                    }
                    let neighbor = src.get_depth(nx as usize, ny as usize);
                    if !is_valid_depth(neighbor) {
                        continue;
                    }
                    let delta = neighbor - center;
                    if delta.abs() > max_delta {
                        continue;
                    }
                    let delta = delta as f64;
                    let dist2 = (dx * dx + dy * dy) as f64;
                    let weight = (-delta * delta * inv_sigma_depth2).exp()
                        * (-dist2 * inv_sigma_space2).exp();
                    weight_sum += weight;
                    value_sum += weight * neighbor as f64;
                }
            }

            filtered[y * src.width + x] = if weight_sum > 0.0 {
                (value_sum / weight_sum) as f32
            } else {
                center
            };
        }
    }

    RgbdImage {
        width: src.width,
        height: src.height,
        rgb: src.rgb.clone(),
        depth: filtered,
    }
}
