use crate::mesh::TriangleMesh;
use crate::plane::Plane;

/// Build a standalone axis-aligned cuboid mesh.
pub fn cuboid_mesh(center: &[f64; 3], sizes: &[f64; 3]) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    mesh.add_cube(center, sizes, &[0, 0, 0]);
    mesh
}

/// Build a two-triangle quad approximating `plane` inside the axis-aligned
/// cube of half extent `half_extent` around `center`.
///
/// The quad corners are found by intersecting the plane with the four
/// vertical edges of the probe cube, so a plane parallel to the y axis is an
/// error.
pub fn plane_patch_mesh(
    plane: &Plane,
    center: &[f64; 3],
    half_extent: f64,
) -> Result<TriangleMesh, &'static str> {
    let s = half_extent;
    let edges = [
        [
            [center[0] - s, center[1] - s, center[2] - s],
            [center[0] - s, center[1] + s, center[2] - s],
        ],
        [
            [center[0] + s, center[1] - s, center[2] - s],
            [center[0] + s, center[1] + s, center[2] - s],
        ],
        [
            [center[0] - s, center[1] - s, center[2] + s],
            [center[0] - s, center[1] + s, center[2] + s],
        ],
        [
            [center[0] + s, center[1] - s, center[2] + s],
            [center[0] + s, center[1] + s, center[2] + s],
        ],
    ];

    let mut mesh = TriangleMesh::new();
    for edge in &edges {
        mesh.vertices
            .push(plane.intersection_with_line(&edge[0], &edge[1])?);
    }
    mesh.faces.push([0, 1, 2]);
    mesh.faces.push([2, 1, 3]);
    Ok(mesh)
}
