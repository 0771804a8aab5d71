use std::collections::HashMap;

use glam::DVec3;

use crate::linalg::{cross_product3, normalize3};
use crate::pointcloud::PointCloud;
use crate::pose::RigidTransform;
use crate::surfel::{orthogonal_basis, Surfel};

/// Error types for mesh operations.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// Two meshes carry different attribute channels.
    #[error("cannot merge meshes with different attribute channels")]
    IncompatibleChannels,

    /// The surfel normal is not unit length.
    #[error("surfel normal must be unit length (norm was {0})")]
    InvalidSurfelNormal(f64),
}

// Corner connectivity of an axis-aligned cuboid. Corners are enumerated with
// z varying fastest, then y, then x, each over {min, max}.
const CUBOID_LINKS: [[u32; 3]; 12] = [
    [0, 1, 3],
    [0, 3, 2],
    [0, 5, 1],
    [0, 4, 5],
    [3, 1, 5],
    [3, 5, 7],
    [2, 3, 7],
    [2, 7, 6],
    [6, 5, 4],
    [6, 7, 5],
    [0, 2, 6],
    [0, 6, 4],
];

/// A triangle mesh stored as parallel attribute arrays.
///
/// The `colors`, `normals` and `texcoords` channels are optional; when
/// present they hold exactly one entry per vertex. Faces index into the
/// vertex array.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<[f64; 3]>,
    /// Per-vertex colors.
    pub colors: Option<Vec<[u8; 3]>>,
    /// Per-vertex normals.
    pub normals: Option<Vec<[f64; 3]>>,
    /// Per-vertex texture coordinates.
    pub texcoords: Option<Vec<[f64; 2]>>,
    /// Triangle faces as vertex indices.
    pub faces: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Check if the mesh has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Check if the mesh carries per-vertex colors.
    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Check if the mesh carries per-vertex normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Check if the mesh carries per-vertex texture coordinates.
    pub fn has_texcoords(&self) -> bool {
        self.texcoords.is_some()
    }

    /// Check if the mesh has faces.
    pub fn has_faces(&self) -> bool {
        !self.faces.is_empty()
    }

    /// Remove all vertices, attributes and faces.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.colors = None;
        self.normals = None;
        self.texcoords = None;
        self.faces.clear();
    }

    /// Centroid of the vertices. The zero vector for an empty mesh.
    pub fn center(&self) -> [f64; 3] {
        if self.vertices.is_empty() {
            return [0.0; 3];
        }
        let sum = self
            .vertices
            .iter()
            .fold(DVec3::ZERO, |acc, &v| acc + DVec3::from_array(v));
        (sum / self.vertices.len() as f64).to_array()
    }

    /// Translate the mesh so its centroid lands on the origin.
    ///
    /// Returns the centroid that was removed.
    pub fn centerize(&mut self) -> [f64; 3] {
        let center = self.center();
        for v in &mut self.vertices {
            v[0] -= center[0];
            v[1] -= center[1];
            v[2] -= center[2];
        }
        center
    }

    /// Apply a rigid transform to the mesh.
    ///
    /// Vertices get the full transform, normals only its rotational part.
    pub fn apply_transform(&mut self, pose: &RigidTransform) {
        for v in &mut self.vertices {
            *v = pose.transform_point(v);
        }
        if let Some(normals) = &mut self.normals {
            for n in normals {
                *n = pose.rotate_vector(n);
            }
        }
    }

    /// Scale the mesh per axis.
    pub fn apply_scale(&mut self, x_scale: f64, y_scale: f64, z_scale: f64) {
        for v in &mut self.vertices {
            v[0] *= x_scale;
            v[1] *= y_scale;
            v[2] *= z_scale;
        }
    }

    /// Append another mesh, offsetting its face indices.
    ///
    /// Attribute channels of `rhs` that this mesh does not carry are dropped.
    /// If this mesh carries a channel that `rhs` lacks, the meshes cannot be
    /// merged. Merging into an empty mesh copies `rhs` wholesale.
    pub fn merge(&mut self, rhs: &TriangleMesh) -> Result<(), MeshError> {
        if self.vertices.is_empty() {
            *self = rhs.clone();
            return Ok(());
        }

        // check compatibility before mutating anything
        if (self.has_colors() && !rhs.has_colors())
            || (self.has_normals() && !rhs.has_normals())
            || (self.has_texcoords() && !rhs.has_texcoords())
        {
            return Err(MeshError::IncompatibleChannels);
        }

        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&rhs.vertices);
        if let (Some(colors), Some(rhs_colors)) = (&mut self.colors, &rhs.colors) {
            colors.extend_from_slice(rhs_colors);
        }
        if let (Some(normals), Some(rhs_normals)) = (&mut self.normals, &rhs.normals) {
            normals.extend_from_slice(rhs_normals);
        }
        if let (Some(texcoords), Some(rhs_texcoords)) = (&mut self.texcoords, &rhs.texcoords) {
            texcoords.extend_from_slice(rhs_texcoords);
        }
        for face in &rhs.faces {
            self.faces
                .push([face[0] + offset, face[1] + offset, face[2] + offset]);
        }
        Ok(())
    }

    /// Append an axis-aligned cuboid centered at `center` with the given
    /// extents. A color entry is pushed per corner only when the mesh
    /// already carries colors.
    pub fn add_cube(&mut self, center: &[f64; 3], sizes: &[f64; 3], color: &[u8; 3]) {
        let xvals = [center[0] - sizes[0] / 2.0, center[0] + sizes[0] / 2.0];
        let yvals = [center[1] - sizes[1] / 2.0, center[1] + sizes[1] / 2.0];
        let zvals = [center[2] - sizes[2] / 2.0, center[2] + sizes[2] / 2.0];

        let first_vertex_index = self.vertices.len() as u32;
        for &x in &xvals {
            for &y in &yvals {
                for &z in &zvals {
                    self.vertices.push([x, y, z]);
                    if let Some(colors) = &mut self.colors {
                        colors.push(*color);
                    }
                }
            }
        }

        for links in &CUBOID_LINKS {
            self.faces.push([
                first_vertex_index + links[0],
                first_vertex_index + links[1],
                first_vertex_index + links[2],
            ]);
        }
    }

    /// Append a surfel as a hexagonal disc: six vertices in the tangent
    /// plane of the normal and four triangles, with per-vertex color and
    /// normal.
    pub fn add_surfel(&mut self, surfel: &Surfel) -> Result<(), MeshError> {
        let norm = DVec3::from_array(surfel.normal).length();
        if (norm - 1.0).abs() > 0.1 {
            return Err(MeshError::InvalidSurfelNormal(norm));
        }
        self.ensure_surfel_channels()?;

        let idx = self.vertices.len() as u32;
        let (v1, v2) = orthogonal_basis(&surfel.normal);
        let (v1, v2) = (DVec3::from_array(v1), DVec3::from_array(v2));
        let location = DVec3::from_array(surfel.location);
        let r = surfel.radius;

        let corners = [
            location + v1 * r,
            location + v1 * (r / 2.0) + v2 * r,
            location + v1 * (-r / 2.0) + v2 * r,
            location - v1 * r,
            location + v1 * (-r / 2.0) - v2 * r,
            location + v1 * (r / 2.0) - v2 * r,
        ];
        for corner in corners {
            self.vertices.push(corner.to_array());
        }
        if let Some(colors) = &mut self.colors {
            colors.extend(std::iter::repeat(surfel.color).take(6));
        }
        if let Some(normals) = &mut self.normals {
            normals.extend(std::iter::repeat(surfel.normal).take(6));
        }

        self.faces.push([idx + 5, idx, idx + 1]);
        self.faces.push([idx + 5, idx + 1, idx + 2]);
        self.faces.push([idx + 4, idx + 5, idx + 2]);
        self.faces.push([idx + 4, idx + 2, idx + 3]);
        Ok(())
    }

    /// Append a surfel as a single colored, oriented point.
    pub fn add_point_from_surfel(&mut self, surfel: &Surfel) -> Result<(), MeshError> {
        self.ensure_surfel_channels()?;
        self.vertices.push(surfel.location);
        if let Some(colors) = &mut self.colors {
            colors.push(surfel.color);
        }
        if let Some(normals) = &mut self.normals {
            normals.push(surfel.normal);
        }
        Ok(())
    }

    fn ensure_surfel_channels(&mut self) -> Result<(), MeshError> {
        if self.vertices.is_empty() {
            self.colors.get_or_insert_with(Vec::new);
            self.normals.get_or_insert_with(Vec::new);
        }
        if self.colors.is_none() || self.normals.is_none() {
            return Err(MeshError::IncompatibleChannels);
        }
        Ok(())
    }

    /// Recompute per-vertex normals by accumulating face cross products.
    ///
    /// The accumulation is area weighted. Vertices not referenced by any
    /// face end up with a zero normal.
    pub fn compute_normals_from_faces(&mut self) {
        let mut normals = vec![[0.0; 3]; self.vertices.len()];
        for face in &self.faces {
            let p0 = self.vertices[face[0] as usize];
            let p1 = self.vertices[face[1] as usize];
            let p2 = self.vertices[face[2] as usize];
            let v01 = [p1[0] - p0[0], p1[1] - p0[1], p1[2] - p0[2]];
            let v02 = [p2[0] - p0[0], p2[1] - p0[1], p2[2] - p0[2]];
            let n = cross_product3(&v01, &v02);
            for &idx in face {
                let acc = &mut normals[idx as usize];
                acc[0] += n[0];
                acc[1] += n[1];
                acc[2] += n[2];
            }
        }
        for n in &mut normals {
            *n = normalize3(n);
        }
        self.normals = Some(normals);
    }

    /// For each vertex, the indices of the faces referencing it.
    pub fn vertex_face_map(&self) -> Vec<Vec<usize>> {
        let mut faces_per_vertex = vec![Vec::new(); self.vertices.len()];
        for (face_idx, face) in self.faces.iter().enumerate() {
            for &v in face {
                faces_per_vertex[v as usize].push(face_idx);
            }
        }
        faces_per_vertex
    }

    /// Alias duplicated vertices to a single canonical copy.
    ///
    /// Vertices with exactly equal coordinates are detected by sorting;
    /// face indices are rewritten to the canonical vertex and the duplicate
    /// slots are invalidated with NaN coordinates. Call
    /// [`remove_isolated_vertices`](Self::remove_isolated_vertices) afterwards
    /// to compact the arrays.
    pub fn remove_duplicated_vertices(&mut self) {
        if self.vertices.is_empty() {
            return;
        }

        let mut ordered_indices: Vec<u32> = (0..self.vertices.len() as u32).collect();
        let vertices = &self.vertices;
        ordered_indices.sort_by(|&i, &j| {
            let a = &vertices[i as usize];
            let b = &vertices[j as usize];
            a[0].total_cmp(&b[0])
                .then(a[1].total_cmp(&b[1]))
                .then(a[2].total_cmp(&b[2]))
        });

        let mut vertex_alias: HashMap<u32, u32> = HashMap::new();
        let mut i = 0;
        while i < ordered_indices.len() {
            let mut j = i + 1;
            while j < ordered_indices.len()
                && self.vertices[ordered_indices[i] as usize]
                    == self.vertices[ordered_indices[j] as usize]
            {
                vertex_alias.insert(ordered_indices[j], ordered_indices[i]);
                j += 1;
            }
            i = j;
        }

        for &duplicate in vertex_alias.keys() {
            self.vertices[duplicate as usize] = [f64::NAN; 3];
        }
        for face in &mut self.faces {
            for v in face.iter_mut() {
                if let Some(&canonical) = vertex_alias.get(v) {
                    *v = canonical;
                }
            }
        }
    }

    /// Drop vertices with non-finite coordinates, compacting all attribute
    /// channels and remapping face indices. Faces still referencing a
    /// dropped vertex are removed.
    pub fn remove_isolated_vertices(&mut self) {
        let mut new_indices: Vec<Option<u32>> = Vec::with_capacity(self.vertices.len());
        let mut cur_index = 0u32;
        for v in &self.vertices {
            if v.iter().all(|c| c.is_finite()) {
                new_indices.push(Some(cur_index));
                cur_index += 1;
            } else {
                new_indices.push(None);
            }
        }

        let kept = cur_index as usize;
        let mut vertices = Vec::with_capacity(kept);
        let mut colors = self.colors.as_ref().map(|_| Vec::with_capacity(kept));
        let mut normals = self.normals.as_ref().map(|_| Vec::with_capacity(kept));
        let mut texcoords = self.texcoords.as_ref().map(|_| Vec::with_capacity(kept));

        for (i, index) in new_indices.iter().enumerate() {
            if index.is_none() {
                continue;
            }
            vertices.push(self.vertices[i]);
            if let (Some(dst), Some(src)) = (&mut colors, &self.colors) {
                dst.push(src[i]);
            }
            if let (Some(dst), Some(src)) = (&mut normals, &self.normals) {
                dst.push(src[i]);
            }
            if let (Some(dst), Some(src)) = (&mut texcoords, &self.texcoords) {
                dst.push(src[i]);
            }
        }

        let mut faces = Vec::with_capacity(self.faces.len());
        for face in &self.faces {
            let mapped = [
                new_indices[face[0] as usize],
                new_indices[face[1] as usize],
                new_indices[face[2] as usize],
            ];
            if let [Some(a), Some(b), Some(c)] = mapped {
                faces.push([a, b, c]);
            }
        }

        self.vertices = vertices;
        self.colors = colors;
        self.normals = normals;
        self.texcoords = texcoords;
        self.faces = faces;
    }

    /// View the mesh vertices and attributes as a point cloud, dropping
    /// faces and texture coordinates.
    pub fn to_pointcloud(&self) -> PointCloud {
        PointCloud::new(
            self.vertices.clone(),
            self.colors.clone(),
            self.normals.clone(),
        )
    }

    /// Build a face-less mesh from a point cloud.
    pub fn from_pointcloud(cloud: &PointCloud) -> Self {
        Self {
            vertices: cloud.points().clone(),
            colors: cloud.colors().cloned(),
            normals: cloud.normals().cloned(),
            texcoords: None,
            faces: Vec::new(),
        }
    }
}
