#![warn(missing_docs)]

//! A small B-rep kernel tailored to mesh conversion.
//!
//! [`BRepKernel`] owns a [`Topology`] arena and offers exactly the operations
//! the conversion pipeline needs:
//!
//! - face construction on planes, cylinders, spheres and cones, trimmed by
//!   loops of shared straight edges ([`BRepKernel::make_planar_face`] and
//!   friends), plus single-triangle faces
//! - tolerance-based sewing into shells ([`BRepKernel::sew`])
//! - solid construction, validity checking and repair
//! - same-domain face unification
//! - introspection (surface parameters, adjacency, area, volume)
//!
//! Every operation that produces new topology leaves the inputs untouched,
//! so callers can roll back simply by discarding a returned handle.

mod build;
mod check;
mod error;
mod measure;
mod query;
mod repair;
mod sew;
mod solid;
mod unify;

pub use check::ValidityIssue;
pub use error::{KernelError, Result};
pub use sew::SewResult;
pub use unify::UnifyReport;

pub use brepify_geom::{
    ConeSurface, CylinderSurface, Plane, SphereSurface, Surface, SurfaceKind, SurfaceParams,
};
pub use brepify_math::Tolerance;
pub use brepify_topo::{
    Edge, EdgeId, Face, FaceId, Orientation, OrientedEdge, Shape, ShellId, SolidId, Topology,
    VertexId, Wire,
};

use brepify_math::Point3;

/// Tolerances applied by kernel operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelSettings {
    /// Modelling tolerance (coincidence, parallelism).
    pub tolerance: Tolerance,
    /// Largest allowed distance between a trim vertex and its face's surface.
    pub max_trim_deviation: f64,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::from_degrees(1e-7, 1e-4),
            max_trim_deviation: 0.05,
        }
    }
}

/// The B-rep kernel: topology arena plus operations.
#[derive(Debug, Default, Clone)]
pub struct BRepKernel {
    topo: Topology,
    settings: KernelSettings,
}

impl BRepKernel {
    /// Create an empty kernel with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty kernel with the given settings.
    pub fn with_settings(settings: KernelSettings) -> Self {
        Self {
            topo: Topology::new(),
            settings,
        }
    }

    /// Kernel settings.
    pub fn settings(&self) -> &KernelSettings {
        &self.settings
    }

    /// Read access to the topology arena.
    pub fn topology(&self) -> &Topology {
        &self.topo
    }

    /// Add a vertex.
    pub fn add_vertex(&mut self, point: Point3) -> VertexId {
        self.topo.add_vertex(point)
    }

    /// Add a straight edge between two distinct, non-coincident vertices.
    pub fn add_edge(&mut self, start: VertexId, end: VertexId) -> Result<EdgeId> {
        if start == end
            || self
                .settings
                .tolerance
                .points_equal(&self.topo.point(start), &self.topo.point(end))
        {
            return Err(KernelError::DegenerateEdge);
        }
        Ok(self.topo.add_edge(start, end))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Build an axis-aligned box from 12 triangle faces sharing edges.
    pub fn triangle_box(kernel: &mut BRepKernel, size: [f64; 3]) -> Vec<FaceId> {
        let [sx, sy, sz] = size;
        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(sx, 0.0, 0.0),
            Point3::new(sx, sy, 0.0),
            Point3::new(0.0, sy, 0.0),
            Point3::new(0.0, 0.0, sz),
            Point3::new(sx, 0.0, sz),
            Point3::new(sx, sy, sz),
            Point3::new(0.0, sy, sz),
        ];
        let tris: [[usize; 3]; 12] = [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [1, 2, 6],
            [1, 6, 5],
            [2, 3, 7],
            [2, 7, 6],
            [3, 0, 4],
            [3, 4, 7],
        ];
        let verts: Vec<VertexId> = corners.iter().map(|p| kernel.add_vertex(*p)).collect();
        let mut edges = std::collections::HashMap::new();
        let mut edge = |kernel: &mut BRepKernel, a: usize, b: usize| -> EdgeId {
            let key = (a.min(b), a.max(b));
            *edges
                .entry(key)
                .or_insert_with(|| kernel.add_edge(verts[key.0], verts[key.1]).unwrap())
        };
        tris.iter()
            .map(|t| {
                let e0 = edge(kernel, t[0], t[1]);
                let e1 = edge(kernel, t[1], t[2]);
                let e2 = edge(kernel, t[2], t[0]);
                kernel.make_triangle_face(e0, e1, e2).unwrap()
            })
            .collect()
    }
}
