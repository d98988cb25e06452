//! Area, volume and orientation measures computed from support tessellations.

use brepify_geom::Surface;
use brepify_math::{newell_normal, signed_tet_volume, triangle_area, triangle_cross, Point3};
use brepify_topo::{FaceId, Shape};

use crate::BRepKernel;

/// Area-weighted agreement between support triangles and the surface normal.
///
/// Positive when the triangles face the same way as the surface normal.
pub(crate) fn support_sense(surface: &dyn Surface, support: &[[Point3; 3]]) -> f64 {
    support
        .iter()
        .map(|t| {
            let centroid = Point3::from((t[0].coords + t[1].coords + t[2].coords) / 3.0);
            triangle_cross(&t[0], &t[1], &t[2]).dot(surface.normal_at(&centroid).as_ref())
        })
        .sum()
}

impl BRepKernel {
    /// Area of a single face.
    ///
    /// Uses the support tessellation; faces without one fall back to the
    /// polygon area of their loops (outer minus holes).
    pub fn face_area(&self, face: FaceId) -> f64 {
        let f = &self.topo.faces[face];
        if !f.support.is_empty() {
            return f
                .support
                .iter()
                .map(|t| triangle_area(&t[0], &t[1], &t[2]))
                .sum();
        }
        let mut area = 0.0;
        for (i, wire) in f.loops.iter().enumerate() {
            let a = 0.5 * newell_normal(&self.topo.wire_points(wire)).norm();
            area += if i == 0 { a } else { -a };
        }
        area.max(0.0)
    }

    /// Total face area of a shape.
    pub fn area(&self, shape: Shape) -> f64 {
        self.topo
            .shape_faces(shape)
            .into_iter()
            .map(|f| self.face_area(f))
            .sum()
    }

    /// Signed enclosed volume (divergence theorem over support triangles).
    ///
    /// Positive for a closed, outward-oriented shell.
    pub fn volume(&self, shape: Shape) -> f64 {
        self.topo
            .shape_faces(shape)
            .into_iter()
            .flat_map(|f| self.topo.faces[f].support.iter())
            .map(|t| signed_tet_volume(&t[0], &t[1], &t[2]))
            .sum()
    }

    /// Agreement of `face`'s outward side with the normal of `surface`.
    pub fn face_sense(&self, face: FaceId, surface: &dyn Surface) -> f64 {
        support_sense(surface, &self.topo.faces[face].support)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::triangle_box;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_area_and_volume() {
        let mut kernel = BRepKernel::new();
        let faces = triangle_box(&mut kernel, [1.0, 2.0, 3.0]);
        let sew = kernel.sew(&faces, 1e-6);
        let shape = Shape::Shell(sew.shell);
        assert_relative_eq!(kernel.area(shape), 2.0 * (2.0 + 3.0 + 6.0), epsilon = 1e-9);
        assert_relative_eq!(kernel.volume(shape), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_face_sense_sign() {
        let mut kernel = BRepKernel::new();
        let faces = triangle_box(&mut kernel, [1.0, 1.0, 1.0]);
        // faces[2] is on the top (z = 1) with an outward +Z normal.
        let up = brepify_geom::Plane::xy();
        assert!(kernel.face_sense(faces[2], &up) > 0.0);
        assert!(kernel.face_sense(faces[0], &up) < 0.0);
    }
}
