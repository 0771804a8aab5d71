use glam::DVec3;

/// A point cloud with points, colors, and normals.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    // The points in the point cloud.
    points: Vec<[f64; 3]>,
    // The colors of the points.
    colors: Option<Vec<[u8; 3]>>,
    // The normals of the points.
    normals: Option<Vec<[f64; 3]>>,
}

impl PointCloud {
    /// Create a new point cloud from points, colors (optional), and normals (optional).
    ///
    /// The attribute channels, when present, must have one entry per point.
    pub fn new(
        points: Vec<[f64; 3]>,
        colors: Option<Vec<[u8; 3]>>,
        normals: Option<Vec<[f64; 3]>>,
    ) -> Self {
        if let Some(colors) = &colors {
            assert_eq!(points.len(), colors.len());
        }
        if let Some(normals) = &normals {
            assert_eq!(points.len(), normals.len());
        }
        Self {
            points,
            colors,
            normals,
        }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &Vec<[f64; 3]> {
        &self.points
    }

    /// Get as reference the colors of the points in the point cloud.
    pub fn colors(&self) -> Option<&Vec<[u8; 3]>> {
        self.colors.as_ref()
    }

    /// Get as reference the normals of the points in the point cloud.
    pub fn normals(&self) -> Option<&Vec<[f64; 3]>> {
        self.normals.as_ref()
    }

    /// Get the minimum bound of the point cloud.
    pub fn get_min_bound(&self) -> DVec3 {
        if self.points.is_empty() {
            return DVec3::ZERO;
        }
        let first = DVec3::from_array(self.points[0]);
        self.points
            .iter()
            .map(|&p| DVec3::from_array(p))
            .fold(first, |a, b| a.min(b))
    }

    /// Get the maximum bound of the point cloud.
    pub fn get_max_bound(&self) -> DVec3 {
        if self.points.is_empty() {
            return DVec3::ZERO;
        }
        let first = DVec3::from_array(self.points[0]);
        self.points
            .iter()
            .map(|&p| DVec3::from_array(p))
            .fold(first, |a, b| a.max(b))
    }

    /// Keep every `stride`-th point, preserving attribute channels.
    ///
    /// A stride of 1 returns a copy of the cloud.
    pub fn subsampled(&self, stride: usize) -> PointCloud {
        let stride = stride.max(1);
        let points = self.points.iter().step_by(stride).copied().collect();
        let colors = self
            .colors
            .as_ref()
            .map(|c| c.iter().step_by(stride).copied().collect());
        let normals = self
            .normals
            .as_ref()
            .map(|n| n.iter().step_by(stride).copied().collect());
        PointCloud::new(points, colors, normals)
    }
}
