use glam::DVec3;

/// An oriented surface element: a colored disc sample of a surface.
#[derive(Debug, Clone, Copy)]
pub struct Surfel {
    /// Center of the surfel.
    pub location: [f64; 3],
    /// Unit surface normal at the center.
    pub normal: [f64; 3],
    /// Color of the surfel.
    pub color: [u8; 3],
    /// Disc radius.
    pub radius: f64,
}

/// Compute two unit tangent vectors spanning the plane orthogonal to `normal`.
///
/// The returned pair `(v1, v2)` together with the normal forms a right-handed
/// orthonormal basis.
pub fn orthogonal_basis(normal: &[f64; 3]) -> ([f64; 3], [f64; 3]) {
    let n = DVec3::from_array(*normal);

    // pick the world axis least aligned with the normal to avoid degeneracy
    let axis = if n.x.abs() <= n.y.abs() && n.x.abs() <= n.z.abs() {
        DVec3::X
    } else if n.y.abs() <= n.z.abs() {
        DVec3::Y
    } else {
        DVec3::Z
    };

    let v1 = n.cross(axis).normalize();
    let v2 = n.cross(v1);
    (v1.to_array(), v2.to_array())
}
