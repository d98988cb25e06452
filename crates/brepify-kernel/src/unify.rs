//! Same-domain face unification.
//!
//! Adjacent faces lying on the same analytic surface, with the same side
//! facing outward, are merged into one face whose boundary is the
//! symmetric difference of their loops. Every merge builds a new solid and
//! leaves the old one untouched, so a failed or invalid merge is rolled
//! back by keeping the previous handle.

use std::collections::HashMap;

use brepify_geom::{Surface, SurfaceKind, SurfaceParams};
use brepify_math::{newell_normal, Point3, Tolerance};
use brepify_topo::{EdgeId, Face, FaceId, OrientedEdge, Shape, SolidId, VertexId, Wire};
use tracing::{debug, warn};

use crate::build::sense_to_orientation;
use crate::measure::support_sense;
use crate::{BRepKernel, KernelError, Result};

/// Outcome of [`BRepKernel::unify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnifyReport {
    /// The unified shape, or the input if nothing could be merged.
    pub shape: Shape,
    /// Merges kept.
    pub merges_applied: usize,
    /// Clusters left unmerged because every attempt failed or was invalid.
    pub merges_rolled_back: usize,
    /// Clustering rounds run, including the final one that merged nothing.
    pub rounds: usize,
}

struct Dsu {
    parent: Vec<usize>,
}

impl Dsu {
    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

impl BRepKernel {
    /// Groups of adjacent faces of `shape` that share a surface within `tol`
    /// and agree on orientation. Singletons are omitted; groups and their
    /// members follow shell order.
    pub fn same_domain_clusters(&self, shape: Shape, tol: &Tolerance) -> Vec<Vec<FaceId>> {
        let faces = self.faces(shape);
        let params: Vec<Option<SurfaceParams>> = faces
            .iter()
            .map(|&f| self.surface_type_of(f).ok())
            .collect();
        let position: HashMap<FaceId, usize> =
            faces.iter().enumerate().map(|(i, &f)| (f, i)).collect();
        let mut dsu = Dsu {
            parent: (0..faces.len()).collect(),
        };
        for (a, b) in self.face_neighbors(&faces) {
            let (i, j) = (position[&a], position[&b]);
            let (Some(pa), Some(pb)) = (&params[i], &params[j]) else {
                continue;
            };
            if !pa.same_domain(pb, tol) {
                continue;
            }
            let surface = self.topo.faces[a].surface.as_ref();
            let own = self.face_sense(a, surface);
            let other = self.face_sense(b, surface);
            if own * other < 0.0 {
                continue;
            }
            dsu.union(i, j);
        }

        let mut groups: Vec<Vec<FaceId>> = Vec::new();
        let mut group_of_root: HashMap<usize, usize> = HashMap::new();
        for (i, &f) in faces.iter().enumerate() {
            let root = dsu.find(i);
            let g = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[g].push(f);
        }
        groups.retain(|g| g.len() > 1);
        groups
    }

    /// Replace `faces` of `solid` with a single face on the first face's surface.
    ///
    /// Edges shared by two faces of the cluster are removed and the
    /// remaining boundary is re-chained into loops. Fails without touching
    /// the solid if the faces leave the surface, disagree on orientation,
    /// or the merged boundary pinches or vanishes.
    pub fn merge_faces(&mut self, solid: SolidId, faces: &[FaceId]) -> Result<SolidId> {
        let shell = self.topo.solids[solid].shell;
        let shell_faces = self.topo.shells[shell].faces.clone();
        if faces.iter().any(|f| !shell_faces.contains(f)) {
            return Err(KernelError::ForeignFace);
        }
        if faces.len() < 2 {
            return Ok(solid);
        }

        let base = self.topo.faces[faces[0]].surface.clone();
        let limit = self.settings.max_trim_deviation + self.settings.tolerance.linear;
        let base_sense = self.face_sense(faces[0], base.as_ref());
        for &f in &faces[1..] {
            if self.face_sense(f, base.as_ref()) * base_sense < 0.0 {
                return Err(KernelError::MixedOrientation);
            }
            let off = self.topo.faces[f]
                .loops
                .iter()
                .flat_map(|w| self.topo.wire_points(w))
                .any(|p| base.distance(&p) > limit);
            if off {
                return Err(KernelError::DifferentDomain);
            }
        }

        let loops = self.merged_boundary(faces)?;
        let loops = self.order_loops(base.as_ref(), loops);
        for (loop_index, w) in loops.iter().enumerate() {
            if w.len() < 3 {
                return Err(KernelError::DegenerateWire {
                    loop_index,
                    edges: w.len(),
                });
            }
        }

        let support: Vec<[Point3; 3]> = faces
            .iter()
            .flat_map(|&f| self.topo.faces[f].support.iter().copied())
            .collect();
        let orientation = sense_to_orientation(support_sense(base.as_ref(), &support));
        let merged = self.topo.add_face(Face {
            surface: base,
            loops,
            orientation,
            support,
        });

        let new_faces: Vec<FaceId> = shell_faces
            .iter()
            .filter_map(|&f| {
                if f == faces[0] {
                    Some(merged)
                } else if faces.contains(&f) {
                    None
                } else {
                    Some(f)
                }
            })
            .collect();
        let closed = self.topo.shells[shell].closed;
        let new_shell = self.topo.add_shell(new_faces, closed);
        Ok(self.topo.add_solid(new_shell))
    }

    /// Merge every same-domain cluster of a solid, validating each merge.
    ///
    /// Shells and faces are returned unchanged.
    pub fn unify_same_domain(&mut self, shape: Shape, linear: f64, angular: f64) -> Result<Shape> {
        Ok(self.unify(shape, &Tolerance { linear, angular }).shape)
    }

    /// Merge same-domain clusters round after round until a round merges
    /// nothing. Each merge is validated; an invalid result is rolled back.
    ///
    /// A cluster covering a whole closed surface has no boundary of its own,
    /// so it is merged minus one face, or failing that one adjacent pair at
    /// a time. Every applied merge removes at least one face, so the loop
    /// terminates.
    pub fn unify(&mut self, shape: Shape, tol: &Tolerance) -> UnifyReport {
        let mut report = UnifyReport {
            shape,
            merges_applied: 0,
            merges_rolled_back: 0,
            rounds: 0,
        };
        let Shape::Solid(mut solid) = shape else {
            return report;
        };
        loop {
            let clusters = self.same_domain_clusters(Shape::Solid(solid), tol);
            let mut applied = 0;
            for cluster in clusters {
                match self.merge_cluster(solid, &cluster) {
                    Some(merged) => {
                        solid = merged;
                        applied += 1;
                    }
                    None => report.merges_rolled_back += 1,
                }
            }
            report.rounds += 1;
            report.merges_applied += applied;
            if applied == 0 {
                break;
            }
            debug!(round = report.rounds, applied, "unification round");
        }
        report.shape = Shape::Solid(solid);
        report
    }

    fn merge_cluster(&mut self, solid: SolidId, cluster: &[FaceId]) -> Option<SolidId> {
        match self.merge_faces(solid, cluster) {
            Ok(merged) if self.is_valid(Shape::Solid(merged)) => return Some(merged),
            Ok(_) => {
                warn!(faces = cluster.len(), "merge produced an invalid solid; rolled back");
                return None;
            }
            Err(KernelError::NoBoundary) => {}
            Err(err) => {
                debug!(%err, faces = cluster.len(), "merge skipped");
                return None;
            }
        }

        debug!(faces = cluster.len(), "cluster covers a closed surface");
        for skip in (0..cluster.len()).rev() {
            let rest: Vec<FaceId> = cluster
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != skip)
                .map(|(_, &f)| f)
                .collect();
            if rest.len() < 2 || !self.connected(&rest) {
                continue;
            }
            if let Some(merged) = self.try_merge(solid, &rest) {
                return Some(merged);
            }
        }
        self.face_neighbors(cluster)
            .into_iter()
            .find_map(|(a, b)| self.try_merge(solid, &[a, b]))
    }

    fn try_merge(&mut self, solid: SolidId, faces: &[FaceId]) -> Option<SolidId> {
        match self.merge_faces(solid, faces) {
            Ok(merged) if self.is_valid(Shape::Solid(merged)) => Some(merged),
            _ => None,
        }
    }

    /// Whether `faces` form one edge-connected patch.
    fn connected(&self, faces: &[FaceId]) -> bool {
        let position: HashMap<FaceId, usize> =
            faces.iter().enumerate().map(|(i, &f)| (f, i)).collect();
        let mut dsu = Dsu {
            parent: (0..faces.len()).collect(),
        };
        for (a, b) in self.face_neighbors(faces) {
            dsu.union(position[&a], position[&b]);
        }
        (0..faces.len()).all(|i| dsu.find(i) == 0)
    }

    /// Boundary edges of a face cluster, chained into closed loops.
    fn merged_boundary(&self, faces: &[FaceId]) -> Result<Vec<Wire>> {
        let mut count: HashMap<EdgeId, usize> = HashMap::new();
        for &f in faces {
            for oe in self.topo.faces[f].oriented_edges() {
                *count.entry(oe.edge).or_insert(0) += 1;
            }
        }
        let boundary: Vec<OrientedEdge> = faces
            .iter()
            .flat_map(|&f| self.topo.faces[f].oriented_edges().copied())
            .filter(|oe| count[&oe.edge] == 1)
            .collect();
        if boundary.is_empty() {
            return Err(KernelError::NoBoundary);
        }

        let mut outgoing: HashMap<VertexId, usize> = HashMap::new();
        for (i, oe) in boundary.iter().enumerate() {
            if outgoing.insert(self.topo.oriented_start(oe), i).is_some() {
                return Err(KernelError::Pinch);
            }
        }

        let mut used = vec![false; boundary.len()];
        let mut loops = Vec::new();
        for start in 0..boundary.len() {
            if used[start] {
                continue;
            }
            let mut edges = Vec::new();
            let mut i = start;
            loop {
                used[i] = true;
                edges.push(boundary[i]);
                let end = self.topo.oriented_end(&boundary[i]);
                match outgoing.get(&end) {
                    Some(&next) if next == start => break,
                    Some(&next) if !used[next] => i = next,
                    _ => {
                        return Err(KernelError::OpenWire {
                            loop_index: loops.len(),
                            edge_index: edges.len() - 1,
                        })
                    }
                }
            }
            loops.push(Wire::new(edges));
        }
        Ok(loops)
    }

    /// Put the outer loop first: largest area on planes, longest perimeter otherwise.
    fn order_loops(&self, surface: &dyn Surface, mut loops: Vec<Wire>) -> Vec<Wire> {
        let measure = |w: &Wire| -> f64 {
            let pts = self.topo.wire_points(w);
            if surface.surface_type() == SurfaceKind::Plane {
                newell_normal(&pts).norm()
            } else {
                (0..pts.len())
                    .map(|i| (pts[(i + 1) % pts.len()] - pts[i]).norm())
                    .sum()
            }
        };
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (i, w) in loops.iter().enumerate() {
            let v = measure(w);
            if v > best_value {
                best = i;
                best_value = v;
            }
        }
        let outer = loops.remove(best);
        loops.insert(0, outer);
        loops
    }
}
