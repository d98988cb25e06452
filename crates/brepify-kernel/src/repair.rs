//! Shape repair.
//!
//! Repairs are conservative and operate on faces only:
//! - drop faces that enclose no area
//! - drop exact duplicate faces (same edge set)
//! - propagate a consistent orientation across shared edges
//!
//! The repaired face set is re-sewn and, if it closes, turned into a solid.

use std::collections::{HashMap, HashSet, VecDeque};

use brepify_topo::{EdgeId, FaceId, Shape};
use tracing::{debug, warn};

use crate::{BRepKernel, KernelError, Result};

impl BRepKernel {
    /// Attempt to turn `shape` into a valid solid, or at least a clean shell.
    pub fn repair(&mut self, shape: Shape) -> Result<Shape> {
        if let Shape::Face(_) = shape {
            return Ok(shape);
        }
        let faces = self.topo.shape_faces(shape);
        let area_eps = self.settings.tolerance.linear.powi(2);

        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(faces.len());
        let mut dropped = 0usize;
        for f in faces {
            let mut key: Vec<EdgeId> = self.topo.faces[f].oriented_edges().map(|oe| oe.edge).collect();
            key.sort();
            if self.face_area(f) <= area_eps || !seen.insert(key) {
                dropped += 1;
                continue;
            }
            kept.push(f);
        }
        if kept.is_empty() {
            return Err(KernelError::EmptyShape);
        }

        let flips = self.orientation_flips(&kept);
        let flipped = flips.iter().filter(|&&b| b).count();
        let repaired: Vec<FaceId> = kept
            .iter()
            .zip(&flips)
            .map(|(&f, &flip)| {
                if flip {
                    let face = self.topo.flipped_face(f);
                    self.topo.add_face(face)
                } else {
                    f
                }
            })
            .collect();
        debug!(dropped, flipped, faces = repaired.len(), "repair");

        let sew = self.sew(&repaired, self.settings.tolerance.linear);
        match self.shell_to_solid(sew.shell) {
            Ok(solid) => Ok(Shape::Solid(solid)),
            Err(err) => {
                warn!(%err, "repair could not close the shell");
                Ok(Shape::Shell(sew.shell))
            }
        }
    }

    /// Breadth-first orientation propagation; `true` marks faces to flip.
    ///
    /// Each connected component keeps the orientation of its first face.
    fn orientation_flips(&self, faces: &[FaceId]) -> Vec<bool> {
        let index: HashMap<FaceId, usize> = faces.iter().enumerate().map(|(i, &f)| (f, i)).collect();
        let uses = self.topo.edge_uses(faces);
        let mut flip = vec![false; faces.len()];
        let mut visited = vec![false; faces.len()];

        for start in 0..faces.len() {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut queue = VecDeque::from([start]);
            while let Some(i) = queue.pop_front() {
                for oe in self.topo.faces[faces[i]].oriented_edges() {
                    let Some(pair) = uses.get(&oe.edge) else {
                        continue;
                    };
                    if pair.len() != 2 {
                        continue;
                    }
                    let effective = if flip[i] {
                        oe.orientation.flipped()
                    } else {
                        oe.orientation
                    };
                    for &(g, o) in pair {
                        let j = index[&g];
                        if j == i || visited[j] {
                            continue;
                        }
                        visited[j] = true;
                        // The neighbour must traverse the edge opposite to us.
                        flip[j] = o == effective;
                        queue.push_back(j);
                    }
                }
            }
        }
        flip
    }
}
