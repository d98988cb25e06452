//! Face construction.

use brepify_geom::{ConeSurface, CylinderSurface, Plane, SphereSurface, Surface};
use brepify_math::{newell_normal, triangle_normal, Point2, Point3};
use brepify_topo::{EdgeId, Face, FaceId, Orientation, OrientedEdge, Wire};
use tracing::trace;

use crate::measure::support_sense;
use crate::{BRepKernel, KernelError, Result};

impl BRepKernel {
    /// Build a face on `plane` trimmed by `loops` (outer loop first).
    ///
    /// Besides the common loop checks, the outer loop must not cross itself
    /// and must enclose a non-zero area.
    pub fn make_planar_face(
        &mut self,
        plane: Plane,
        loops: Vec<Wire>,
        support: Vec<[Point3; 3]>,
    ) -> Result<FaceId> {
        self.check_loops(&plane, &loops)?;
        let outer: Vec<Point2> = self
            .topo
            .wire_points(&loops[0])
            .iter()
            .map(|p| plane.project(p))
            .collect();
        if polygon_self_intersects(&outer) {
            return Err(KernelError::SelfIntersecting);
        }
        if polygon_area_2d(&outer).abs() <= self.settings.tolerance.linear.powi(2) {
            return Err(KernelError::DegenerateFace);
        }
        let orientation = if support.is_empty() {
            let n = newell_normal(&self.topo.wire_points(&loops[0]));
            sense_to_orientation(n.dot(plane.normal_dir.as_ref()))
        } else {
            sense_to_orientation(support_sense(&plane, &support))
        };
        Ok(self.insert_face(Box::new(plane), loops, orientation, support))
    }

    /// Build a face on a cylinder trimmed by `loops`.
    pub fn make_cylindrical_face(
        &mut self,
        cylinder: CylinderSurface,
        loops: Vec<Wire>,
        support: Vec<[Point3; 3]>,
    ) -> Result<FaceId> {
        self.make_curved_face(Box::new(cylinder), loops, support)
    }

    /// Build a face on a sphere trimmed by `loops`.
    pub fn make_spherical_face(
        &mut self,
        sphere: SphereSurface,
        loops: Vec<Wire>,
        support: Vec<[Point3; 3]>,
    ) -> Result<FaceId> {
        self.make_curved_face(Box::new(sphere), loops, support)
    }

    /// Build a face on a cone trimmed by `loops`.
    pub fn make_conical_face(
        &mut self,
        cone: ConeSurface,
        loops: Vec<Wire>,
        support: Vec<[Point3; 3]>,
    ) -> Result<FaceId> {
        self.make_curved_face(Box::new(cone), loops, support)
    }

    /// Build a planar triangular face from three edges that chain end to end.
    ///
    /// The triangle is traversed so that `e0` ends at the vertex it shares
    /// with `e1`; the face normal follows that winding.
    pub fn make_triangle_face(&mut self, e0: EdgeId, e1: EdgeId, e2: EdgeId) -> Result<FaceId> {
        let (a, b) = (self.topo.edges[e0], self.topo.edges[e1]);
        let first = if a.end == b.start || a.end == b.end {
            OrientedEdge::forward(e0)
        } else if a.start == b.start || a.start == b.end {
            OrientedEdge::reversed(e0)
        } else {
            return Err(KernelError::DisconnectedEdges);
        };
        let mut edges = vec![first];
        for e in [e1, e2] {
            let prev_end = self.topo.oriented_end(&edges[edges.len() - 1]);
            let edge = self.topo.edges[e];
            if edge.start == prev_end {
                edges.push(OrientedEdge::forward(e));
            } else if edge.end == prev_end {
                edges.push(OrientedEdge::reversed(e));
            } else {
                return Err(KernelError::DisconnectedEdges);
            }
        }
        let wire = Wire::new(edges);
        if self.topo.wire_gap(&wire).is_some() {
            return Err(KernelError::DisconnectedEdges);
        }
        let pts = self.topo.wire_points(&wire);
        let normal = triangle_normal(&pts[0], &pts[1], &pts[2]).ok_or(KernelError::DegenerateFace)?;
        let plane = Plane::from_normal(pts[0], normal);
        let support = vec![[pts[0], pts[1], pts[2]]];
        Ok(self.insert_face(Box::new(plane), vec![wire], Orientation::Forward, support))
    }

    fn make_curved_face(
        &mut self,
        surface: Box<dyn Surface>,
        loops: Vec<Wire>,
        support: Vec<[Point3; 3]>,
    ) -> Result<FaceId> {
        self.check_loops(surface.as_ref(), &loops)?;
        let orientation = if support.is_empty() {
            Orientation::Forward
        } else {
            sense_to_orientation(support_sense(surface.as_ref(), &support))
        };
        Ok(self.insert_face(surface, loops, orientation, support))
    }

    fn insert_face(
        &mut self,
        surface: Box<dyn Surface>,
        loops: Vec<Wire>,
        orientation: Orientation,
        support: Vec<[Point3; 3]>,
    ) -> FaceId {
        trace!(
            kind = %surface.surface_type(),
            loops = loops.len(),
            support = support.len(),
            "face created"
        );
        self.topo.add_face(Face {
            surface,
            loops,
            orientation,
            support,
        })
    }

    /// Loop closure, edge count and trim deviation checks shared by all faces.
    fn check_loops(&self, surface: &dyn Surface, loops: &[Wire]) -> Result<()> {
        if loops.is_empty() {
            return Err(KernelError::NoLoops);
        }
        let limit = self.settings.max_trim_deviation;
        let mut worst: f64 = 0.0;
        for (loop_index, wire) in loops.iter().enumerate() {
            if wire.len() < 3 {
                return Err(KernelError::DegenerateWire {
                    loop_index,
                    edges: wire.len(),
                });
            }
            if let Some(edge_index) = self.topo.wire_gap(wire) {
                return Err(KernelError::OpenWire {
                    loop_index,
                    edge_index,
                });
            }
            for p in self.topo.wire_points(wire) {
                worst = worst.max(surface.distance(&p));
            }
        }
        if worst > limit {
            return Err(KernelError::TrimDeviation {
                deviation: worst,
                limit,
            });
        }
        Ok(())
    }
}

pub(crate) fn sense_to_orientation(sense: f64) -> Orientation {
    if sense >= 0.0 {
        Orientation::Forward
    } else {
        Orientation::Reversed
    }
}

/// Signed area of a closed 2D polygon (shoelace formula).
pub(crate) fn polygon_area_2d(pts: &[Point2]) -> f64 {
    let n = pts.len();
    let mut sum = 0.0;
    for i in 0..n {
        let (p, q) = (pts[i], pts[(i + 1) % n]);
        sum += p.x * q.y - q.x * p.y;
    }
    0.5 * sum
}

fn orient_2d(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn segments_cross(a: &Point2, b: &Point2, c: &Point2, d: &Point2) -> bool {
    let d1 = orient_2d(c, d, a);
    let d2 = orient_2d(c, d, b);
    let d3 = orient_2d(a, b, c);
    let d4 = orient_2d(a, b, d);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

/// True if two non-adjacent edges of the closed polygon properly cross.
pub(crate) fn polygon_self_intersects(pts: &[Point2]) -> bool {
    let n = pts.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        let (a, b) = (&pts[i], &pts[(i + 1) % n]);
        for j in (i + 2)..n {
            // The last edge is adjacent to the first.
            if i == 0 && j == n - 1 {
                continue;
            }
            let (c, d) = (&pts[j], &pts[(j + 1) % n]);
            if segments_cross(a, b, c, d) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::triangle_box;
    use brepify_math::Vec3;

    fn square_loop(kernel: &mut BRepKernel, pts: &[Point3]) -> Wire {
        let verts: Vec<_> = pts.iter().map(|p| kernel.add_vertex(*p)).collect();
        let n = verts.len();
        Wire::new(
            (0..n)
                .map(|i| OrientedEdge::forward(kernel.add_edge(verts[i], verts[(i + 1) % n]).unwrap()))
                .collect(),
        )
    }

    #[test]
    fn test_planar_face_orientation_from_winding() {
        let mut kernel = BRepKernel::new();
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        let wire = square_loop(&mut kernel, &pts);
        // Clockwise seen from +Z, so the face points down.
        let face = kernel
            .make_planar_face(Plane::xy(), vec![wire], Vec::new())
            .unwrap();
        assert_eq!(kernel.topology().faces[face].orientation, Orientation::Reversed);
    }

    #[test]
    fn test_planar_face_rejects_bowtie() {
        let mut kernel = BRepKernel::new();
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let wire = square_loop(&mut kernel, &pts);
        let err = kernel
            .make_planar_face(Plane::xy(), vec![wire], Vec::new())
            .unwrap_err();
        assert_eq!(err, KernelError::SelfIntersecting);
    }

    #[test]
    fn test_trim_deviation_rejected() {
        let mut kernel = BRepKernel::new();
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let wire = square_loop(&mut kernel, &pts);
        let err = kernel
            .make_planar_face(Plane::xy(), vec![wire], Vec::new())
            .unwrap_err();
        assert!(matches!(err, KernelError::TrimDeviation { .. }));
    }

    #[test]
    fn test_open_wire_rejected() {
        let mut kernel = BRepKernel::new();
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut wire = square_loop(&mut kernel, &pts);
        wire.edges.swap(1, 2);
        let err = kernel
            .make_planar_face(Plane::xy(), vec![wire], Vec::new())
            .unwrap_err();
        assert!(matches!(err, KernelError::OpenWire { loop_index: 0, .. }));
    }

    #[test]
    fn test_cylindrical_face_orientation_from_support() {
        let mut kernel = BRepKernel::new();
        let cyl = CylinderSurface::with_axis(Point3::origin(), Vec3::z(), 1.0);
        let pts = [
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
        ];
        let wire = square_loop(&mut kernel, &pts);
        // Outward-facing support triangles.
        let support = vec![[pts[0], pts[1], pts[2]], [pts[0], pts[2], pts[3]]];
        let face = kernel
            .make_cylindrical_face(cyl, vec![wire], support)
            .unwrap();
        assert_eq!(kernel.topology().faces[face].orientation, Orientation::Forward);
    }

    #[test]
    fn test_triangle_face_follows_first_edge() {
        let mut kernel = BRepKernel::new();
        let faces = triangle_box(&mut kernel, [1.0, 1.0, 1.0]);
        assert_eq!(faces.len(), 12);
        for f in faces {
            let face = &kernel.topology().faces[f];
            let pts = kernel.topology().wire_points(&face.loops[0]);
            let n = triangle_normal(&pts[0], &pts[1], &pts[2]).unwrap();
            let centroid = Point3::from((pts[0].coords + pts[1].coords + pts[2].coords) / 3.0);
            // Outward normals point away from the box center.
            let out = centroid - Point3::new(0.5, 0.5, 0.5);
            assert!(n.dot(&out) > 0.0);
        }
    }

    #[test]
    fn test_triangle_face_rejects_disconnected_edges() {
        let mut kernel = BRepKernel::new();
        let v: Vec<_> = (0..6)
            .map(|i| kernel.add_vertex(Point3::new(i as f64, (i * i) as f64, 0.0)))
            .collect();
        let e0 = kernel.add_edge(v[0], v[1]).unwrap();
        let e1 = kernel.add_edge(v[2], v[3]).unwrap();
        let e2 = kernel.add_edge(v[4], v[5]).unwrap();
        assert_eq!(
            kernel.make_triangle_face(e0, e1, e2),
            Err(KernelError::DisconnectedEdges)
        );
    }

    #[test]
    fn test_polygon_helpers() {
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        assert!((polygon_area_2d(&square) - 4.0).abs() < 1e-12);
        assert!(!polygon_self_intersects(&square));
    }
}
