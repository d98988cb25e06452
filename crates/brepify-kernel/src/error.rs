//! Error types for kernel operations.

use thiserror::Error;

/// Errors raised while constructing or modifying topology.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// A face was requested without any boundary loop.
    #[error("face has no boundary loop")]
    NoLoops,

    /// A boundary loop has too few edges to enclose an area.
    #[error("loop {loop_index} has only {edges} edges")]
    DegenerateWire {
        /// Index of the loop in the face's loop list.
        loop_index: usize,
        /// Number of edges in the loop.
        edges: usize,
    },

    /// Consecutive edges of a loop do not share a vertex.
    #[error("loop {loop_index} is open after edge {edge_index}")]
    OpenWire {
        /// Index of the loop in the face's loop list.
        loop_index: usize,
        /// Index of the edge whose end does not meet the next start.
        edge_index: usize,
    },

    /// A trim vertex lies too far from the underlying surface.
    #[error("trim vertex deviates {deviation:.3e} from the surface (limit {limit:.3e})")]
    TrimDeviation {
        /// Largest observed distance.
        deviation: f64,
        /// Configured limit.
        limit: f64,
    },

    /// The outer loop of a planar face crosses itself.
    #[error("outer loop of planar face is self-intersecting")]
    SelfIntersecting,

    /// The face encloses no area.
    #[error("face is degenerate (zero area)")]
    DegenerateFace,

    /// An edge was requested between coincident vertices.
    #[error("edge endpoints coincide")]
    DegenerateEdge,

    /// Triangle edges do not form a chain.
    #[error("triangle edges do not share vertices")]
    DisconnectedEdges,

    /// A shell has boundary edges where a closed shell is required.
    #[error("shell is open ({free_edges} free edges)")]
    OpenShell {
        /// Number of edges used by a single face.
        free_edges: usize,
    },

    /// A shell has edges shared by more than two faces.
    #[error("shell is non-manifold ({edges} edges)")]
    NonManifold {
        /// Number of edges used by more than two faces.
        edges: usize,
    },

    /// Adjacent faces traverse a shared edge in the same direction.
    #[error("face orientations are inconsistent ({edges} edges)")]
    InconsistentOrientation {
        /// Number of offending edges.
        edges: usize,
    },

    /// An operation received a shape with no faces.
    #[error("shape has no faces")]
    EmptyShape,

    /// A merge would leave a vertex with more than one outgoing boundary edge.
    #[error("merged boundary is pinched at a vertex")]
    Pinch,

    /// A merge removed every boundary edge.
    #[error("merged face has no boundary")]
    NoBoundary,

    /// Faces of a merge cluster disagree on which side is outward.
    #[error("faces disagree on orientation")]
    MixedOrientation,

    /// A face is not part of the shape it was used with.
    #[error("face does not belong to the shape")]
    ForeignFace,

    /// Faces of a merge cluster do not share a surface.
    #[error("faces do not lie on the same surface")]
    DifferentDomain,

    /// A face references a surface the kernel cannot introspect.
    #[error("unsupported surface")]
    UnsupportedSurface,
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
