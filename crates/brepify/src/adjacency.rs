//! Mesh welding and triangle adjacency.

use std::collections::HashMap;

use brepify_math::{triangle_area, triangle_normal, Point3, Vec3};
use brepify_mesh::Mesh;
use tracing::debug;

use crate::pool::VertexKey;

/// A mesh with vertices merged by [`VertexKey`] and degenerate triangles
/// removed, plus the per-triangle data the pipeline needs.
#[derive(Debug, Clone)]
pub struct WeldedMesh {
    /// Canonical vertex positions (first occurrence of each key).
    pub points: Vec<Point3>,
    /// Surviving triangles as canonical vertex indices, in mesh order.
    pub triangles: Vec<[u32; 3]>,
    /// Unit normal per surviving triangle.
    pub normals: Vec<Vec3>,
    /// Area per surviving triangle.
    pub areas: Vec<f64>,
    /// Index of each surviving triangle in the input mesh.
    pub source: Vec<usize>,
    /// Triangles dropped because corners collapsed or the area vanished.
    pub degenerate: usize,
    edge_uses: HashMap<(u32, u32), usize>,
    neighbors: Vec<Vec<usize>>,
}

fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl WeldedMesh {
    /// Weld `mesh` at `precision`.
    pub fn new(mesh: &Mesh, precision: f64) -> Self {
        let mut by_key: HashMap<VertexKey, u32> = HashMap::new();
        let mut points = Vec::new();
        let canonical: Vec<u32> = mesh
            .vertices
            .iter()
            .map(|p| {
                *by_key.entry(VertexKey::new(p, precision)).or_insert_with(|| {
                    points.push(*p);
                    (points.len() - 1) as u32
                })
            })
            .collect();

        let mut triangles = Vec::with_capacity(mesh.triangle_count());
        let mut normals = Vec::with_capacity(mesh.triangle_count());
        let mut areas = Vec::with_capacity(mesh.triangle_count());
        let mut source = Vec::with_capacity(mesh.triangle_count());
        let mut degenerate = 0;
        for (t, tri) in mesh.triangles.iter().enumerate() {
            let [a, b, c] = tri.map(|i| canonical[i as usize]);
            if a == b || b == c || a == c {
                degenerate += 1;
                continue;
            }
            let (pa, pb, pc) = (&points[a as usize], &points[b as usize], &points[c as usize]);
            let Some(winding) = triangle_normal(pa, pb, pc) else {
                degenerate += 1;
                continue;
            };
            let normal = mesh
                .normals
                .as_ref()
                .and_then(|ns| ns.get(t))
                .filter(|n| n.norm() > 1e-12)
                .map(|n| n.normalize())
                .unwrap_or(winding);
            triangles.push([a, b, c]);
            normals.push(normal);
            areas.push(triangle_area(pa, pb, pc));
            source.push(t);
        }

        let mut edge_uses: HashMap<(u32, u32), usize> = HashMap::new();
        let mut edge_triangles: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
        for (t, &[a, b, c]) in triangles.iter().enumerate() {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                let key = edge_key(u, v);
                *edge_uses.entry(key).or_insert(0) += 1;
                edge_triangles.entry(key).or_default().push(t);
            }
        }
        let mut neighbors = vec![Vec::new(); triangles.len()];
        for (t, &[a, b, c]) in triangles.iter().enumerate() {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                let users = &edge_triangles[&edge_key(u, v)];
                if users.len() != 2 {
                    continue;
                }
                let other = if users[0] == t { users[1] } else { users[0] };
                if other != t && !neighbors[t].contains(&other) {
                    neighbors[t].push(other);
                }
            }
        }

        debug!(
            vertices = points.len(),
            triangles = triangles.len(),
            degenerate,
            "mesh welded"
        );
        Self {
            points,
            triangles,
            normals,
            areas,
            source,
            degenerate,
            edge_uses,
            neighbors,
        }
    }

    /// Number of surviving triangles.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// True if no triangle survived welding.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Corner positions of triangle `t`.
    pub fn corners(&self, t: usize) -> [Point3; 3] {
        self.triangles[t].map(|i| self.points[i as usize])
    }

    /// Triangle centroid.
    pub fn centroid(&self, t: usize) -> Point3 {
        let [a, b, c] = self.corners(t);
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// Triangles sharing a manifold edge with `t`.
    pub fn neighbors(&self, t: usize) -> &[usize] {
        &self.neighbors[t]
    }

    /// Number of triangles using the edge between canonical vertices `a` and `b`.
    pub fn edge_use_count(&self, a: u32, b: u32) -> usize {
        self.edge_uses.get(&edge_key(a, b)).copied().unwrap_or(0)
    }

    /// Edges used by exactly one triangle.
    pub fn open_edge_count(&self) -> usize {
        self.edge_uses.values().filter(|&&n| n == 1).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brepify_mesh::shapes::make_box;

    #[test]
    fn test_box_adjacency() {
        let welded = WeldedMesh::new(&make_box(1.0, 1.0, 1.0), 1e-4);
        assert_eq!(welded.len(), 12);
        assert_eq!(welded.points.len(), 8);
        assert!((0..12).all(|t| welded.neighbors(t).len() == 3));
        assert_eq!(welded.open_edge_count(), 0);
        assert_eq!(welded.edge_use_count(0, 2), 2);
    }

    #[test]
    fn test_collapsed_triangle_dropped() {
        let mut mesh = make_box(1.0, 1.0, 1.0);
        mesh.vertices.push(Point3::new(1.0 + 1e-6, 0.0, 0.0));
        mesh.triangles.push([0, 1, 8]);
        let welded = WeldedMesh::new(&mesh, 1e-4);
        assert_eq!(welded.degenerate, 1);
        assert_eq!(welded.len(), 12);
        assert_eq!(welded.source[11], 11);
    }

    #[test]
    fn test_open_edges_counted() {
        let mut mesh = make_box(1.0, 1.0, 1.0);
        mesh.triangles.truncate(10);
        let welded = WeldedMesh::new(&mesh, 1e-4);
        assert_eq!(welded.open_edge_count(), 4);
    }
}
