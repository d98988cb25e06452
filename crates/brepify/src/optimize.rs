//! Face unification.
//!
//! After assembly a solid typically carries many faces that lie on one
//! surface: coplanar fallback triangles, or several analytic faces cut
//! from the same cylinder. The optimizer clusters adjacent same-domain
//! faces through kernel introspection and merges each cluster into one
//! face. Every merge produces a new solid; a merge that fails or leaves an
//! invalid solid is discarded and the previous solid kept. Rounds repeat
//! until nothing merges, so a second pass is a no-op.

use brepify_kernel::{BRepKernel, Shape, Tolerance};
use tracing::{debug, info};

use crate::config::ConversionConfig;
use crate::stats::{OptimizationStats, SurfaceCounts};

/// Merges co-planar, co-axial, co-centric and co-apex adjacent faces.
#[derive(Debug, Clone, Copy)]
pub struct FaceUnificationOptimizer<'a> {
    config: &'a ConversionConfig,
}

impl<'a> FaceUnificationOptimizer<'a> {
    /// Create an optimizer.
    pub fn new(config: &'a ConversionConfig) -> Self {
        Self { config }
    }

    /// Tolerance for a shape with the given face types. Curved faces make
    /// coaxial matches fragile, so their presence tightens the tolerance.
    pub fn tolerance(&self, counts: &SurfaceCounts) -> Tolerance {
        let unify = &self.config.heuristics.unify;
        let scale = if counts.curved() > 0 {
            unify.curved_tolerance_scale
        } else {
            unify.planar_tolerance_scale
        };
        self.config.unify_tolerance().scaled(scale)
    }

    /// Unify `shape`. Shells and faces are returned unchanged.
    pub fn optimize(&self, kernel: &mut BRepKernel, shape: Shape) -> (Shape, OptimizationStats) {
        let faces = kernel.faces(shape);
        let before = SurfaceCounts::of_faces(kernel, &faces);
        let tol = self.tolerance(&before);
        let mut stats = OptimizationStats {
            faces_before: before,
            faces_after: before,
            linear_tolerance: tol.linear,
            angular_tolerance: tol.angular,
            area_before: kernel.area(shape),
            volume_before: kernel.volume(shape),
            ..Default::default()
        };

        let report = kernel.unify(shape, &tol);
        stats.merges_applied = report.merges_applied;
        stats.merges_rolled_back = report.merges_rolled_back;
        if report.merges_rolled_back > 0 {
            debug!(
                clusters = report.merges_rolled_back,
                "clusters left unmerged after validation"
            );
        }

        let result = report.shape;
        stats.faces_after = SurfaceCounts::of_faces(kernel, &kernel.faces(result));
        stats.area_after = kernel.area(result);
        stats.volume_after = kernel.volume(result);
        info!(
            before = stats.faces_before.total(),
            after = stats.faces_after.total(),
            merges = stats.merges_applied,
            rolled_back = stats.merges_rolled_back,
            "faces unified"
        );
        (result, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::WeldedMesh;
    use crate::assemble::{ConversionStatus, SolidAssembler};
    use crate::pool::GeometryPool;
    use crate::triangulate::triangle_faces;
    use approx::assert_relative_eq;
    use brepify_mesh::shapes::{make_box, make_cylinder};
    use brepify_mesh::Mesh;

    fn triangulated_solid(mesh: &Mesh, config: &ConversionConfig) -> (BRepKernel, Shape) {
        let welded = WeldedMesh::new(mesh, config.vertex_precision);
        let mut kernel = BRepKernel::with_settings(config.kernel_settings());
        let mut pool = GeometryPool::new(config.vertex_precision);
        let (faces, _) = triangle_faces(&mut kernel, &mut pool, &welded, 0..welded.len());
        let assembly = SolidAssembler::new(config).assemble(&mut kernel, &faces);
        assert_eq!(assembly.status, ConversionStatus::Success);
        (kernel, assembly.shape.unwrap())
    }

    #[test]
    fn test_adaptive_tolerance() {
        let config = ConversionConfig::default();
        let optimizer = FaceUnificationOptimizer::new(&config);
        let planar = SurfaceCounts {
            plane: 6,
            ..Default::default()
        };
        let curved = SurfaceCounts {
            plane: 2,
            cylinder: 1,
            ..Default::default()
        };
        assert_relative_eq!(optimizer.tolerance(&planar).linear, 2e-4);
        assert_relative_eq!(optimizer.tolerance(&curved).linear, 5e-5);
    }

    #[test]
    fn test_box_unifies_to_six_planes() {
        let config = ConversionConfig::default();
        let (mut kernel, shape) = triangulated_solid(&make_box(1.0, 2.0, 3.0), &config);
        let optimizer = FaceUnificationOptimizer::new(&config);
        let (unified, stats) = optimizer.optimize(&mut kernel, shape);
        assert_eq!(stats.faces_before.plane, 12);
        assert_eq!(stats.faces_after.plane, 6);
        assert_eq!(stats.merges_applied, 6);
        assert_eq!(stats.merges_rolled_back, 0);
        assert!(kernel.is_valid(unified));
        assert_relative_eq!(stats.area_after, 22.0, epsilon = 1e-9);
        assert_relative_eq!(stats.volume_after, stats.volume_before, epsilon = 1e-9);
    }

    #[test]
    fn test_second_pass_changes_nothing() {
        let config = ConversionConfig::default();
        let (mut kernel, shape) = triangulated_solid(&make_cylinder(1.0, 2.0, 24, true), &config);
        let optimizer = FaceUnificationOptimizer::new(&config);
        let (once, first) = optimizer.optimize(&mut kernel, shape);
        let (twice, second) = optimizer.optimize(&mut kernel, once);
        assert!(first.faces_after.total() < first.faces_before.total());
        assert_eq!(second.merges_applied, 0);
        assert_eq!(kernel.face_count(twice), kernel.face_count(once));
    }

    #[test]
    fn test_shell_passes_through() {
        let config = ConversionConfig::default();
        let mut kernel = BRepKernel::new();
        let welded = WeldedMesh::new(&make_box(1.0, 1.0, 1.0), 1e-4);
        let mut pool = GeometryPool::new(1e-4);
        let (faces, _) = triangle_faces(&mut kernel, &mut pool, &welded, 0..6);
        let shell = Shape::Shell(kernel.sew(&faces, 1e-6).shell);
        let (out, stats) = FaceUnificationOptimizer::new(&config).optimize(&mut kernel, shell);
        assert_eq!(out, shell);
        assert_eq!(stats.merges_applied, 0);
        assert_eq!(stats.faces_after, stats.faces_before);
    }
}
