//! Topology queries and surface introspection.

use std::collections::HashMap;

use brepify_geom::SurfaceParams;
use brepify_topo::{EdgeId, Face, FaceId, Shape};

use crate::{BRepKernel, KernelError, Result};

impl BRepKernel {
    /// Faces of a shape, in shell order.
    pub fn faces(&self, shape: Shape) -> Vec<FaceId> {
        self.topo.shape_faces(shape)
    }

    /// Number of faces of a shape.
    pub fn face_count(&self, shape: Shape) -> usize {
        self.faces(shape).len()
    }

    /// Face data.
    pub fn face(&self, face: FaceId) -> &Face {
        &self.topo.faces[face]
    }

    /// Distinct edges bounding a face, in loop order.
    pub fn edges_of_face(&self, face: FaceId) -> Vec<EdgeId> {
        let mut edges: Vec<EdgeId> = Vec::new();
        for oe in self.topo.faces[face].oriented_edges() {
            if !edges.contains(&oe.edge) {
                edges.push(oe.edge);
            }
        }
        edges
    }

    /// Faces of `shape` that use `edge`.
    pub fn faces_of_edge(&self, shape: Shape, edge: EdgeId) -> Vec<FaceId> {
        self.faces(shape)
            .into_iter()
            .filter(|&f| self.topo.faces[f].oriented_edges().any(|oe| oe.edge == edge))
            .collect()
    }

    /// Number of edges used by exactly one face of `shape`.
    pub fn free_edge_count(&self, shape: Shape) -> usize {
        self.edge_counts(&self.faces(shape)).0
    }

    /// Surface kind and defining parameters of a face.
    pub fn surface_type_of(&self, face: FaceId) -> Result<SurfaceParams> {
        SurfaceParams::from_surface(self.topo.faces[face].surface.as_ref())
            .ok_or(KernelError::UnsupportedSurface)
    }

    /// Pairs of distinct faces sharing a two-use edge, as `(earlier, later)`
    /// in `faces` order. Each pair appears once per shared edge.
    pub fn face_neighbors(&self, faces: &[FaceId]) -> Vec<(FaceId, FaceId)> {
        let position: HashMap<FaceId, usize> =
            faces.iter().enumerate().map(|(i, &f)| (f, i)).collect();
        let uses = self.topo.edge_uses(faces);
        let mut pairs = Vec::new();
        for (i, &f) in faces.iter().enumerate() {
            for oe in self.topo.faces[f].oriented_edges() {
                if let Some(u) = uses.get(&oe.edge) {
                    if u.len() != 2 || u[0].0 == u[1].0 {
                        continue;
                    }
                    let other = if u[0].0 == f { u[1].0 } else { u[0].0 };
                    if position[&other] > i {
                        pairs.push((f, other));
                    }
                }
            }
        }
        pairs
    }
}
