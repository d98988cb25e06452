//! Conversion statistics.

use brepify_kernel::{BRepKernel, FaceId, SurfaceKind};
use serde::Serialize;

use crate::assemble::ConversionStatus;

/// Face or primitive counts per surface type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SurfaceCounts {
    /// Planes.
    pub plane: usize,
    /// Cylinders.
    pub cylinder: usize,
    /// Spheres.
    pub sphere: usize,
    /// Cones.
    pub cone: usize,
}

impl SurfaceCounts {
    /// Count the surface types of `faces`.
    pub fn of_faces(kernel: &BRepKernel, faces: &[FaceId]) -> Self {
        let mut counts = Self::default();
        for &f in faces {
            counts.add(kernel.face(f).surface.surface_type());
        }
        counts
    }

    /// Increment the count for `kind`.
    pub fn add(&mut self, kind: SurfaceKind) {
        *self.get_mut(kind) += 1;
    }

    /// Count for `kind`.
    pub fn get(&self, kind: SurfaceKind) -> usize {
        match kind {
            SurfaceKind::Plane => self.plane,
            SurfaceKind::Cylinder => self.cylinder,
            SurfaceKind::Sphere => self.sphere,
            SurfaceKind::Cone => self.cone,
        }
    }

    fn get_mut(&mut self, kind: SurfaceKind) -> &mut usize {
        match kind {
            SurfaceKind::Plane => &mut self.plane,
            SurfaceKind::Cylinder => &mut self.cylinder,
            SurfaceKind::Sphere => &mut self.sphere,
            SurfaceKind::Cone => &mut self.cone,
        }
    }

    /// Sum over all kinds.
    pub fn total(&self) -> usize {
        self.plane + self.cylinder + self.sphere + self.cone
    }

    /// Sum over the curved kinds.
    pub fn curved(&self) -> usize {
        self.total() - self.plane
    }
}

/// What the unification pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OptimizationStats {
    /// Face types before unification.
    pub faces_before: SurfaceCounts,
    /// Face types after unification.
    pub faces_after: SurfaceCounts,
    /// Cluster merges kept.
    pub merges_applied: usize,
    /// Cluster merges undone because the solid became invalid.
    pub merges_rolled_back: usize,
    /// Linear tolerance after adaptive scaling.
    pub linear_tolerance: f64,
    /// Angular tolerance after adaptive scaling (radians).
    pub angular_tolerance: f64,
    /// Total face area before.
    pub area_before: f64,
    /// Total face area after.
    pub area_after: f64,
    /// Enclosed volume before.
    pub volume_before: f64,
    /// Enclosed volume after.
    pub volume_after: f64,
}

/// Counters gathered over one conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionStats {
    /// Final status.
    pub status: Option<ConversionStatus>,
    /// Triangles in the input mesh.
    pub input_triangles: usize,
    /// Triangles dropped while welding.
    pub degenerate_triangles: usize,
    /// Regions found by segmentation.
    pub regions: usize,
    /// Regions too small to fit.
    pub small_regions: usize,
    /// Accepted primitives per kind.
    pub primitives_detected: SurfaceCounts,
    /// Primitives that became analytic faces.
    pub primitives_replaced: SurfaceCounts,
    /// Regions emitted as triangles after an accepted fit failed downstream.
    pub fallback_regions: usize,
    /// Triangles the kernel refused as faces.
    pub rejected_triangles: usize,
    /// Faces handed to the assembler.
    pub faces_built: usize,
    /// Faces of the assembled shape.
    pub faces_before_optimization: usize,
    /// Faces of the final shape.
    pub faces_after_optimization: usize,
    /// Free edges left by sewing.
    pub free_edges: usize,
    /// Sewing attempts.
    pub sewing_passes: usize,
    /// Sewing tolerance that was kept.
    pub sewing_tolerance: f64,
    /// True if the repair attempt was used.
    pub repaired: bool,
    /// Unification details, when it ran.
    pub optimization: Option<OptimizationStats>,
    /// Surface area of the assembled shape.
    pub area_before: f64,
    /// Surface area of the final shape.
    pub area_after: f64,
    /// Volume of the assembled shape.
    pub volume_before: f64,
    /// Volume of the final shape.
    pub volume_after: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut counts = SurfaceCounts::default();
        counts.add(SurfaceKind::Plane);
        counts.add(SurfaceKind::Plane);
        counts.add(SurfaceKind::Cone);
        assert_eq!(counts.get(SurfaceKind::Plane), 2);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.curved(), 1);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = ConversionStats {
            status: Some(ConversionStatus::ShellOnly),
            regions: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["status"], "shell_only");
        assert_eq!(json["regions"], 3);
        assert_eq!(json["primitives_detected"]["cylinder"], 0);
        assert!(json["optimization"].is_null());
    }
}
