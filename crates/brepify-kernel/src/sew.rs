//! Sewing: merge coincident vertices and duplicate edges into a shell.
//!
//! Vertices closer than the sewing tolerance are clustered (union-find over
//! a uniform grid, so each vertex only meets candidates in its own and the
//! 26 surrounding cells). Each cluster keeps its first-seen vertex. Edges
//! whose endpoints collapse onto the same pair of survivors become one
//! edge, and faces referring to merged entities are re-emitted with
//! remapped loops. Faces that already use canonical entities are reused
//! as-is, so sewing a pool-built face set is cheap and never moves geometry.

use std::collections::{HashMap, HashSet};

use brepify_math::Point3;
use brepify_topo::{EdgeId, Face, FaceId, Orientation, OrientedEdge, ShellId, VertexId, Wire};
use tracing::debug;

use crate::BRepKernel;

/// Outcome of a sewing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SewResult {
    /// The sewn shell.
    pub shell: ShellId,
    /// Edges used by exactly one face.
    pub free_edges: usize,
    /// Edges used by more than two faces.
    pub nonmanifold_edges: usize,
    /// Vertices merged into another vertex.
    pub merged_vertices: usize,
    /// Faces dropped because a loop collapsed.
    pub dropped_faces: usize,
}

/// Grid cell of a point at the given cell size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellKey {
    x: i64,
    y: i64,
    z: i64,
}

impl CellKey {
    fn from_point(p: &Point3, cell: f64) -> Self {
        Self {
            x: (p.x / cell).floor() as i64,
            y: (p.y / cell).floor() as i64,
            z: (p.z / cell).floor() as i64,
        }
    }
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Union keeping the smaller index as root, so the first-seen vertex survives.
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = (ra.min(rb), ra.max(rb));
            self.parent[hi] = lo;
        }
    }
}

impl BRepKernel {
    /// Sew `faces` into a shell, merging vertices within `tolerance`.
    pub fn sew(&mut self, faces: &[FaceId], tolerance: f64) -> SewResult {
        let survivor = self.cluster_vertices(faces, tolerance);
        let merged_vertices = survivor.iter().filter(|(k, v)| k != v).count();

        let rep = |v: VertexId| survivor.get(&v).copied().unwrap_or(v);
        let mut canonical: HashMap<(VertexId, VertexId), EdgeId> = HashMap::new();
        let mut shell_faces = Vec::with_capacity(faces.len());
        let mut dropped_faces = 0;

        for &face_id in faces {
            let mut loops = Vec::with_capacity(self.topo.faces[face_id].loops.len());
            let mut collapsed_outer = false;
            for (i, wire) in self.topo.faces[face_id].loops.clone().iter().enumerate() {
                let mut edges = Vec::with_capacity(wire.len());
                for oe in &wire.edges {
                    let (s, e) = (
                        rep(self.topo.oriented_start(oe)),
                        rep(self.topo.oriented_end(oe)),
                    );
                    if s == e {
                        continue;
                    }
                    let key = (s.min(e), s.max(e));
                    let edge_id = match canonical.get(&key) {
                        Some(&id) => id,
                        None => {
                            let own = self.topo.edges[oe.edge];
                            let id = if rep(own.start) == own.start && rep(own.end) == own.end {
                                oe.edge
                            } else {
                                self.topo.add_edge(key.0, key.1)
                            };
                            canonical.insert(key, id);
                            id
                        }
                    };
                    let orientation = if self.topo.edges[edge_id].start == s {
                        Orientation::Forward
                    } else {
                        Orientation::Reversed
                    };
                    edges.push(OrientedEdge {
                        edge: edge_id,
                        orientation,
                    });
                }
                if edges.len() < 3 {
                    if i == 0 {
                        collapsed_outer = true;
                        break;
                    }
                    continue;
                }
                loops.push(Wire::new(edges));
            }
            if collapsed_outer {
                dropped_faces += 1;
                continue;
            }
            let face = &self.topo.faces[face_id];
            if loops == face.loops {
                shell_faces.push(face_id);
            } else {
                let remapped = Face {
                    surface: face.surface.clone(),
                    loops,
                    orientation: face.orientation,
                    support: face.support.clone(),
                };
                shell_faces.push(self.topo.add_face(remapped));
            }
        }

        let (free_edges, nonmanifold_edges) = self.edge_counts(&shell_faces);
        let closed = free_edges == 0 && nonmanifold_edges == 0 && !shell_faces.is_empty();
        let shell = self.topo.add_shell(shell_faces, closed);
        debug!(
            tolerance,
            merged_vertices, free_edges, nonmanifold_edges, dropped_faces, "sewing pass"
        );
        SewResult {
            shell,
            free_edges,
            nonmanifold_edges,
            merged_vertices,
            dropped_faces,
        }
    }

    /// Count `(free, non-manifold)` edges over a face set.
    pub(crate) fn edge_counts(&self, faces: &[FaceId]) -> (usize, usize) {
        let uses = self.topo.edge_uses(faces);
        let free = uses.values().filter(|u| u.len() == 1).count();
        let nonmanifold = uses.values().filter(|u| u.len() > 2).count();
        (free, nonmanifold)
    }

    /// Map every vertex used by `faces` to the survivor of its cluster.
    fn cluster_vertices(&self, faces: &[FaceId], tolerance: f64) -> HashMap<VertexId, VertexId> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        for &f in faces {
            for oe in self.topo.faces[f].oriented_edges() {
                let e = self.topo.edges[oe.edge];
                for v in [e.start, e.end] {
                    if seen.insert(v) {
                        order.push(v);
                    }
                }
            }
        }

        let mut uf = UnionFind::new(order.len());
        if tolerance > 0.0 {
            let tol2 = tolerance * tolerance;
            let mut grid: HashMap<CellKey, Vec<usize>> = HashMap::new();
            for (i, &v) in order.iter().enumerate() {
                let p = self.topo.point(v);
                let cell = CellKey::from_point(&p, tolerance);
                for dx in -1..=1 {
                    for dy in -1..=1 {
                        for dz in -1..=1 {
                            let key = CellKey {
                                x: cell.x + dx,
                                y: cell.y + dy,
                                z: cell.z + dz,
                            };
                            if let Some(bucket) = grid.get(&key) {
                                for &j in bucket {
                                    if (self.topo.point(order[j]) - p).norm_squared() <= tol2 {
                                        uf.union(i, j);
                                    }
                                }
                            }
                        }
                    }
                }
                grid.entry(cell).or_default().push(i);
            }
        }

        order
            .iter()
            .enumerate()
            .map(|(i, &v)| (v, order[uf.find(i)]))
            .collect()
    }
}
