#![warn(missing_docs)]

//! Boundary-representation topology for the brepify kernel.
//!
//! Entities live in [`slotmap`] arenas owned by a single [`Topology`] and
//! refer to each other by key. Edges are straight segments between two
//! vertices; a face is bounded by one or more closed [`Wire`]s of oriented
//! edges lying on an analytic surface. Faces additionally carry a
//! *support* tessellation: the mesh triangles the face was built from,
//! wound in the face's outward direction, used for orientation, area and
//! volume.

use std::collections::HashMap;

use brepify_geom::Surface;
use brepify_math::Point3;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Unique identifier for a vertex.
    pub struct VertexId;
    /// Unique identifier for an edge.
    pub struct EdgeId;
    /// Unique identifier for a face.
    pub struct FaceId;
    /// Unique identifier for a shell.
    pub struct ShellId;
    /// Unique identifier for a solid.
    pub struct SolidId;
}

/// A topological vertex.
#[derive(Debug, Clone)]
pub struct Vertex {
    /// Position.
    pub point: Point3,
}

/// A straight edge between two distinct vertices.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    /// Start vertex.
    pub start: VertexId,
    /// End vertex.
    pub end: VertexId,
}

/// Orientation of a use of an entity relative to its natural direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Same direction.
    Forward,
    /// Opposite direction.
    Reversed,
}

impl Orientation {
    /// The opposite orientation.
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reversed,
            Orientation::Reversed => Orientation::Forward,
        }
    }

    /// `true` for [`Orientation::Forward`].
    pub fn is_forward(self) -> bool {
        self == Orientation::Forward
    }
}

/// A use of an edge in a wire, with traversal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrientedEdge {
    /// The underlying edge.
    pub edge: EdgeId,
    /// Whether the wire traverses the edge start → end.
    pub orientation: Orientation,
}

impl OrientedEdge {
    /// Forward use of `edge`.
    pub fn forward(edge: EdgeId) -> Self {
        Self {
            edge,
            orientation: Orientation::Forward,
        }
    }

    /// Reversed use of `edge`.
    pub fn reversed(edge: EdgeId) -> Self {
        Self {
            edge,
            orientation: Orientation::Reversed,
        }
    }

    /// The same edge traversed the other way.
    pub fn flipped(self) -> Self {
        Self {
            edge: self.edge,
            orientation: self.orientation.flipped(),
        }
    }
}

/// A closed chain of oriented edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wire {
    /// Edges in traversal order.
    pub edges: Vec<OrientedEdge>,
}

impl Wire {
    /// Wrap a list of oriented edges.
    pub fn new(edges: Vec<OrientedEdge>) -> Self {
        Self { edges }
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// True if the wire has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// The same loop traversed in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            edges: self.edges.iter().rev().map(|oe| oe.flipped()).collect(),
        }
    }
}

/// A bounded region of an analytic surface.
#[derive(Debug, Clone)]
pub struct Face {
    /// Underlying surface.
    pub surface: Box<dyn Surface>,
    /// Boundary loops; the first is the outer loop.
    pub loops: Vec<Wire>,
    /// Forward if the outward normal agrees with the surface normal.
    pub orientation: Orientation,
    /// Triangles covering the face, wound outward.
    pub support: Vec<[Point3; 3]>,
}

impl Face {
    /// The outer boundary loop.
    pub fn outer_loop(&self) -> Option<&Wire> {
        self.loops.first()
    }

    /// Inner (hole) loops.
    pub fn inner_loops(&self) -> &[Wire] {
        self.loops.get(1..).unwrap_or(&[])
    }

    /// All oriented edge uses across every loop.
    pub fn oriented_edges(&self) -> impl Iterator<Item = &OrientedEdge> {
        self.loops.iter().flat_map(|w| w.edges.iter())
    }
}

/// A connected set of faces.
#[derive(Debug, Clone)]
pub struct Shell {
    /// Faces of the shell.
    pub faces: Vec<FaceId>,
    /// True when every edge is shared by exactly two faces.
    pub closed: bool,
}

/// A volume bounded by a closed shell.
#[derive(Debug, Clone, Copy)]
pub struct Solid {
    /// The outer shell.
    pub shell: ShellId,
}

/// Handle to any shape the kernel can hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// A single face.
    Face(FaceId),
    /// A shell.
    Shell(ShellId),
    /// A solid.
    Solid(SolidId),
}

/// Arena storage for all topological entities of one kernel.
#[derive(Debug, Default, Clone)]
pub struct Topology {
    /// Vertices.
    pub vertices: SlotMap<VertexId, Vertex>,
    /// Edges.
    pub edges: SlotMap<EdgeId, Edge>,
    /// Faces.
    pub faces: SlotMap<FaceId, Face>,
    /// Shells.
    pub shells: SlotMap<ShellId, Shell>,
    /// Solids.
    pub solids: SlotMap<SolidId, Solid>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex at `point`.
    pub fn add_vertex(&mut self, point: Point3) -> VertexId {
        self.vertices.insert(Vertex { point })
    }

    /// Add an edge between two vertices.
    pub fn add_edge(&mut self, start: VertexId, end: VertexId) -> EdgeId {
        self.edges.insert(Edge { start, end })
    }

    /// Add a face.
    pub fn add_face(&mut self, face: Face) -> FaceId {
        self.faces.insert(face)
    }

    /// Add a shell.
    pub fn add_shell(&mut self, faces: Vec<FaceId>, closed: bool) -> ShellId {
        self.shells.insert(Shell { faces, closed })
    }

    /// Add a solid bounded by `shell`.
    pub fn add_solid(&mut self, shell: ShellId) -> SolidId {
        self.solids.insert(Solid { shell })
    }

    /// Position of a vertex.
    pub fn point(&self, v: VertexId) -> Point3 {
        self.vertices[v].point
    }

    /// Start vertex of an oriented edge use.
    pub fn oriented_start(&self, oe: &OrientedEdge) -> VertexId {
        let e = &self.edges[oe.edge];
        match oe.orientation {
            Orientation::Forward => e.start,
            Orientation::Reversed => e.end,
        }
    }

    /// End vertex of an oriented edge use.
    pub fn oriented_end(&self, oe: &OrientedEdge) -> VertexId {
        let e = &self.edges[oe.edge];
        match oe.orientation {
            Orientation::Forward => e.end,
            Orientation::Reversed => e.start,
        }
    }

    /// Vertices of a wire in traversal order (one per edge).
    pub fn wire_vertices(&self, wire: &Wire) -> Vec<VertexId> {
        wire.edges.iter().map(|oe| self.oriented_start(oe)).collect()
    }

    /// Vertex positions of a wire in traversal order.
    pub fn wire_points(&self, wire: &Wire) -> Vec<Point3> {
        wire.edges
            .iter()
            .map(|oe| self.point(self.oriented_start(oe)))
            .collect()
    }

    /// Index of the first edge whose end is not the next edge's start, if any.
    pub fn wire_gap(&self, wire: &Wire) -> Option<usize> {
        let n = wire.edges.len();
        (0..n).find(|&i| {
            self.oriented_end(&wire.edges[i]) != self.oriented_start(&wire.edges[(i + 1) % n])
        })
    }

    /// Faces of a shape.
    pub fn shape_faces(&self, shape: Shape) -> Vec<FaceId> {
        match shape {
            Shape::Face(f) => vec![f],
            Shape::Shell(s) => self.shells[s].faces.clone(),
            Shape::Solid(s) => self.shells[self.solids[s].shell].faces.clone(),
        }
    }

    /// Map from edge to every `(face, orientation)` use among `faces`.
    pub fn edge_uses(&self, faces: &[FaceId]) -> HashMap<EdgeId, Vec<(FaceId, Orientation)>> {
        let mut uses: HashMap<EdgeId, Vec<(FaceId, Orientation)>> = HashMap::new();
        for &f in faces {
            for oe in self.faces[f].oriented_edges() {
                uses.entry(oe.edge).or_default().push((f, oe.orientation));
            }
        }
        uses
    }

    /// A copy of `face` with its outward side flipped.
    pub fn flipped_face(&self, face: FaceId) -> Face {
        let src = &self.faces[face];
        Face {
            surface: src.surface.clone(),
            loops: src.loops.iter().map(Wire::reversed).collect(),
            orientation: src.orientation.flipped(),
            support: src.support.iter().map(|t| [t[0], t[2], t[1]]).collect(),
        }
    }
}
