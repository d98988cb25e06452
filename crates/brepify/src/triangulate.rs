//! Triangulated fallback faces.

use brepify_kernel::{BRepKernel, FaceId, KernelError};
use brepify_math::Point3;
use tracing::debug;

use crate::adjacency::WeldedMesh;
use crate::pool::GeometryPool;

/// One planar face for the triangle `[a, b, c]`, keeping its winding.
pub fn triangle_face(
    kernel: &mut BRepKernel,
    pool: &mut GeometryPool,
    [a, b, c]: [Point3; 3],
) -> Result<FaceId, KernelError> {
    let e0 = pool.edge(kernel, &a, &b)?;
    let e1 = pool.edge(kernel, &b, &c)?;
    let e2 = pool.edge(kernel, &c, &a)?;
    kernel.make_triangle_face(e0, e1, e2)
}

/// Faces for `triangles` of `mesh`, in the given order. Triangles the
/// kernel rejects are skipped and counted.
pub fn triangle_faces(
    kernel: &mut BRepKernel,
    pool: &mut GeometryPool,
    mesh: &WeldedMesh,
    triangles: impl IntoIterator<Item = usize>,
) -> (Vec<FaceId>, usize) {
    let mut faces = Vec::new();
    let mut rejected = 0;
    for t in triangles {
        match triangle_face(kernel, pool, mesh.corners(t)) {
            Ok(face) => faces.push(face),
            Err(err) => {
                debug!(triangle = t, %err, "triangle face rejected");
                rejected += 1;
            }
        }
    }
    (faces, rejected)
}
