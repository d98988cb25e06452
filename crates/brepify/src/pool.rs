//! Shared vertices and edges.
//!
//! Every face the pipeline builds, analytic or triangulated, takes its
//! vertices and edges from one [`GeometryPool`]. Two faces that touch along
//! a mesh edge therefore reference the same kernel edge, and sewing never
//! has to reconcile coordinates.

use std::collections::HashMap;

use brepify_kernel::{BRepKernel, EdgeId, KernelError, OrientedEdge, VertexId};
use brepify_math::Point3;

/// A coordinate rounded to the pool precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexKey(pub i64, pub i64, pub i64);

impl VertexKey {
    /// Round `p` to a grid of spacing `precision`.
    pub fn new(p: &Point3, precision: f64) -> Self {
        let q = |x: f64| (x / precision).round() as i64;
        Self(q(p.x), q(p.y), q(p.z))
    }
}

/// An unordered pair of vertex keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeKey(VertexKey, VertexKey);

impl EdgeKey {
    /// Key for the edge between `a` and `b`, in either direction.
    pub fn new(a: VertexKey, b: VertexKey) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }
}

/// Deduplicating map from mesh coordinates to kernel vertices and edges.
#[derive(Debug)]
pub struct GeometryPool {
    precision: f64,
    vertices: HashMap<VertexKey, VertexId>,
    edges: HashMap<EdgeKey, EdgeId>,
}

impl GeometryPool {
    /// Create an empty pool rounding at `precision`.
    pub fn new(precision: f64) -> Self {
        Self {
            precision,
            vertices: HashMap::new(),
            edges: HashMap::new(),
        }
    }

    /// Rounding precision.
    pub fn precision(&self) -> f64 {
        self.precision
    }

    /// Key of `p` at the pool precision.
    pub fn key(&self, p: &Point3) -> VertexKey {
        VertexKey::new(p, self.precision)
    }

    /// Kernel vertex for `p`, created on first use.
    pub fn vertex(&mut self, kernel: &mut BRepKernel, p: &Point3) -> VertexId {
        let key = self.key(p);
        *self
            .vertices
            .entry(key)
            .or_insert_with(|| kernel.add_vertex(*p))
    }

    /// Kernel edge between `a` and `b`, created once per unordered pair.
    pub fn edge(
        &mut self,
        kernel: &mut BRepKernel,
        a: &Point3,
        b: &Point3,
    ) -> Result<EdgeId, KernelError> {
        let key = EdgeKey::new(self.key(a), self.key(b));
        if let Some(&edge) = self.edges.get(&key) {
            return Ok(edge);
        }
        let start = self.vertex(kernel, a);
        let end = self.vertex(kernel, b);
        let edge = kernel.add_edge(start, end)?;
        self.edges.insert(key, edge);
        Ok(edge)
    }

    /// The pooled edge from `a` to `b`, oriented to run in that direction.
    pub fn oriented_edge(
        &mut self,
        kernel: &mut BRepKernel,
        a: &Point3,
        b: &Point3,
    ) -> Result<OrientedEdge, KernelError> {
        let edge = self.edge(kernel, a, b)?;
        let start = self.vertex(kernel, a);
        if kernel.topology().edges[edge].start == start {
            Ok(OrientedEdge::forward(edge))
        } else {
            Ok(OrientedEdge::reversed(edge))
        }
    }

    /// Number of pooled vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of pooled edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
