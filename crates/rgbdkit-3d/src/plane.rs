use crate::linalg::{dot_product3, normalize3};

/// An infinite plane `a*x + b*y + c*z + d = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal x component.
    pub a: f64,
    /// Normal y component.
    pub b: f64,
    /// Normal z component.
    pub c: f64,
    /// Offset from the origin.
    pub d: f64,
}

impl Plane {
    /// Create a plane from its implicit coefficients.
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self { a, b, c, d }
    }

    /// Create a plane from a normal vector and a point lying on the plane.
    pub fn from_normal_and_point(normal: &[f64; 3], point: &[f64; 3]) -> Self {
        Self {
            a: normal[0],
            b: normal[1],
            c: normal[2],
            d: -dot_product3(normal, point),
        }
    }

    /// The (unit) normal of the plane.
    pub fn normal(&self) -> [f64; 3] {
        normalize3(&[self.a, self.b, self.c])
    }

    /// Signed distance from a point to the plane, positive on the normal side.
    pub fn signed_distance(&self, point: &[f64; 3]) -> f64 {
        let norm = (self.a * self.a + self.b * self.b + self.c * self.c).sqrt();
        (self.a * point[0] + self.b * point[1] + self.c * point[2] + self.d) / norm
    }

    /// Intersection of the plane with the infinite line through `p0` and `p1`.
    ///
    /// Returns an error when the line is parallel to the plane.
    pub fn intersection_with_line(
        &self,
        p0: &[f64; 3],
        p1: &[f64; 3],
    ) -> Result<[f64; 3], &'static str> {
        let dir = [p1[0] - p0[0], p1[1] - p0[1], p1[2] - p0[2]];
        let n = [self.a, self.b, self.c];
        let denom = dot_product3(&n, &dir);
        if denom.abs() < 1e-15 {
            return Err("line is parallel to the plane");
        }
        let t = -(dot_product3(&n, p0) + self.d) / denom;
        Ok([p0[0] + t * dir[0], p0[1] + t * dir[1], p0[2] + t * dir[2]])
    }
}
