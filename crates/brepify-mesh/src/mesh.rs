//! The indexed triangle mesh model.

use brepify_math::{signed_tet_volume, triangle_area, triangle_normal, Aabb3, Point3, Transform, Vec3};

use crate::error::{MeshError, Result};

/// An indexed triangle mesh.
///
/// Triangles are wound counter-clockwise seen from outside. Per-triangle
/// normals are optional; when present they are kept aligned with
/// `triangles`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Vertex index triples.
    pub triangles: Vec<[u32; 3]>,
    /// Optional per-triangle normals.
    pub normals: Option<Vec<Vec3>>,
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertices and triangles, without normals.
    pub fn from_parts(vertices: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
            normals: None,
        }
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// True if the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Corner positions of triangle `i`.
    pub fn triangle_points(&self, i: usize) -> [Point3; 3] {
        let [a, b, c] = self.triangles[i];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Normal of triangle `i`: the stored normal when present and non-zero,
    /// otherwise the normal implied by the winding.
    pub fn triangle_normal(&self, i: usize) -> Option<Vec3> {
        if let Some(n) = self.normals.as_ref().and_then(|ns| ns.get(i)) {
            let len = n.norm();
            if len > 1e-12 {
                return Some(n / len);
            }
        }
        let [a, b, c] = self.triangle_points(i);
        triangle_normal(&a, &b, &c)
    }

    /// Check that every triangle index is in range.
    pub fn validate(&self) -> Result<()> {
        let n = self.vertices.len();
        for (t, tri) in self.triangles.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= n) {
                return Err(MeshError::IndexOutOfRange {
                    triangle: t,
                    index,
                    vertices: n,
                });
            }
        }
        if let Some(normals) = &self.normals {
            if normals.len() != self.triangles.len() {
                return Err(MeshError::invalid_content(format!(
                    "{} normals for {} triangles",
                    normals.len(),
                    self.triangles.len()
                )));
            }
        }
        Ok(())
    }

    /// Bounding box of all vertices.
    pub fn bounds(&self) -> Aabb3 {
        Aabb3::from_points(self.vertices.iter())
    }

    /// Total triangle area.
    pub fn surface_area(&self) -> f64 {
        (0..self.triangles.len())
            .map(|i| {
                let [a, b, c] = self.triangle_points(i);
                triangle_area(&a, &b, &c)
            })
            .sum()
    }

    /// Signed enclosed volume; positive for a closed outward-wound mesh.
    pub fn signed_volume(&self) -> f64 {
        (0..self.triangles.len())
            .map(|i| {
                let [a, b, c] = self.triangle_points(i);
                signed_tet_volume(&a, &b, &c)
            })
            .sum()
    }

    /// A copy of the mesh with `t` applied to every vertex (and normal).
    pub fn transformed(&self, t: &Transform) -> Self {
        Self {
            vertices: self.vertices.iter().map(|p| t.apply_point(p)).collect(),
            triangles: self.triangles.clone(),
            normals: self
                .normals
                .as_ref()
                .map(|ns| ns.iter().map(|n| t.apply_vec(n)).collect()),
        }
    }
}
