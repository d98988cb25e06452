//! Analytic face synthesis.
//!
//! A face is built on the fitted surface and trimmed by the region's real
//! mesh boundary. Trim edges come from the [`GeometryPool`], so the face
//! shares every boundary edge with whatever lies on the other side, be it
//! another analytic face or fallback triangles.

use brepify_kernel::{
    BRepKernel, ConeSurface, CylinderSurface, FaceId, Plane, SphereSurface, Wire,
};
use brepify_math::Point3;

use crate::adjacency::WeldedMesh;
use crate::boundary::{extract_boundary, RegionBoundary};
use crate::error::SynthesisError;
use crate::fit::PrimitiveCandidate;
use crate::pool::GeometryPool;
use crate::segment::Region;

/// Build the wire for one boundary loop out of pooled edges.
fn pooled_wire(
    kernel: &mut BRepKernel,
    pool: &mut GeometryPool,
    mesh: &WeldedMesh,
    chain: &[u32],
) -> Result<Wire, SynthesisError> {
    let n = chain.len();
    let mut edges = Vec::with_capacity(n);
    for i in 0..n {
        let a = mesh.points[chain[i] as usize];
        let b = mesh.points[chain[(i + 1) % n] as usize];
        edges.push(pool.oriented_edge(kernel, &a, &b)?);
    }
    Ok(Wire::new(edges))
}

/// Trim wires for `boundary`, outer first.
pub fn boundary_wires(
    kernel: &mut BRepKernel,
    pool: &mut GeometryPool,
    mesh: &WeldedMesh,
    boundary: &RegionBoundary,
) -> Result<Vec<Wire>, SynthesisError> {
    boundary
        .loops
        .iter()
        .map(|chain| pooled_wire(kernel, pool, mesh, chain))
        .collect()
}

/// Build the analytic face for `region` on `candidate`.
///
/// On error nothing the caller depends on has changed: pooled vertices and
/// edges created along the way are reused by the triangulated fallback.
pub fn synthesize_face(
    kernel: &mut BRepKernel,
    pool: &mut GeometryPool,
    mesh: &WeldedMesh,
    region: &Region,
    candidate: &PrimitiveCandidate,
) -> Result<FaceId, SynthesisError> {
    if *candidate == PrimitiveCandidate::None {
        return Err(SynthesisError::NoPrimitive);
    }
    let boundary = extract_boundary(mesh, region, candidate)?;
    let loops = boundary_wires(kernel, pool, mesh, &boundary)?;
    let support: Vec<[Point3; 3]> = region.triangles.iter().map(|&t| mesh.corners(t)).collect();

    let face = match *candidate {
        PrimitiveCandidate::Plane { origin, normal } => {
            kernel.make_planar_face(Plane::from_normal(origin, normal), loops, support)
        }
        PrimitiveCandidate::Cylinder {
            center,
            axis,
            radius,
            ..
        } => kernel.make_cylindrical_face(
            CylinderSurface::with_axis(center, axis, radius),
            loops,
            support,
        ),
        PrimitiveCandidate::Sphere { center, radius } => {
            kernel.make_spherical_face(SphereSurface::with_center(center, radius), loops, support)
        }
        PrimitiveCandidate::Cone {
            apex,
            axis,
            half_angle,
            ..
        } => kernel.make_conical_face(ConeSurface::with_apex(apex, axis, half_angle), loops, support),
        PrimitiveCandidate::None => return Err(SynthesisError::NoPrimitive),
    }?;
    Ok(face)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionConfig;
    use crate::fit::PrimitiveFitter;
    use crate::segment::segment;
    use brepify_kernel::{Surface, SurfaceKind, SurfaceParams};
    use brepify_mesh::shapes::{make_box, make_cylinder};

    #[test]
    fn test_box_face_is_trimmed_plane() {
        let welded = WeldedMesh::new(&make_box(2.0, 2.0, 2.0), 1e-4);
        let seg = segment(&welded, &ConversionConfig::default());
        let region = &seg.regions[0];
        let mut kernel = BRepKernel::new();
        let mut pool = GeometryPool::new(1e-4);
        let normal = region.normal;
        let candidate = PrimitiveCandidate::Plane {
            origin: welded.centroid(region.triangles[0]),
            normal,
        };
        let face = synthesize_face(&mut kernel, &mut pool, &welded, region, &candidate).unwrap();
        assert_eq!(kernel.edges_of_face(face).len(), 4);
        assert!((kernel.face_area(face) - 4.0).abs() < 1e-9);
        match kernel.surface_type_of(face).unwrap() {
            SurfaceParams::Plane { normal: n, .. } => assert!(n.dot(&normal).abs() > 0.999),
            other => panic!("expected plane, got {other:?}"),
        }
    }

    #[test]
    fn test_cylinder_band_shares_rim_edges_with_caps() {
        let config = ConversionConfig::default();
        let welded = WeldedMesh::new(&make_cylinder(3.0, 4.0, 48, true), 1e-4);
        let seg = segment(&welded, &config);
        let fits = PrimitiveFitter::new(&config).fit_all(&welded, &seg.regions);
        let mut kernel = BRepKernel::new();
        let mut pool = GeometryPool::new(1e-4);
        let mut faces = Vec::new();
        for (region, fit) in seg.regions.iter().zip(&fits) {
            faces.push(
                synthesize_face(&mut kernel, &mut pool, &welded, region, &fit.candidate).unwrap(),
            );
        }
        let kinds: Vec<SurfaceKind> = faces
            .iter()
            .map(|&f| kernel.face(f).surface.surface_type())
            .collect();
        assert_eq!(kinds.iter().filter(|&&k| k == SurfaceKind::Plane).count(), 2);
        assert_eq!(kinds.iter().filter(|&&k| k == SurfaceKind::Cylinder).count(), 1);
        // Rims are pooled: 48 edges each, shared by band and cap.
        assert_eq!(pool.edge_count(), 96);
        let sewn = kernel.sew(&faces, 0.0);
        assert_eq!(sewn.free_edges, 0);
    }

    #[test]
    fn test_no_primitive() {
        let welded = WeldedMesh::new(&make_box(1.0, 1.0, 1.0), 1e-4);
        let seg = segment(&welded, &ConversionConfig::default());
        let mut kernel = BRepKernel::new();
        let mut pool = GeometryPool::new(1e-4);
        let err = synthesize_face(
            &mut kernel,
            &mut pool,
            &welded,
            &seg.regions[0],
            &PrimitiveCandidate::None,
        )
        .unwrap_err();
        assert_eq!(err, SynthesisError::NoPrimitive);
    }
}
