//! Error types for the conversion pipeline.
//!
//! Only [`ConfigError`] ever reaches a caller. The other types describe
//! expected, per-region failures that the pipeline recovers from by
//! falling back to triangulated faces.

use brepify_kernel::KernelError;
use thiserror::Error;

/// Invalid or unreadable conversion configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A setting is out of range or unsupported.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// TOML syntax or type error.
    #[error("cannot parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a primitive kind was rejected for a region.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitRejection {
    /// Not enough distinct points for this kind.
    #[error("too few points: need {needed}, got {got}")]
    TooFewPoints {
        /// Minimum point count.
        needed: usize,
        /// Points available.
        got: usize,
    },

    /// A linear system or direction estimate was singular.
    #[error("degenerate estimate: {0}")]
    Degenerate(&'static str),

    /// Region normals are too uniform for a curved surface.
    #[error("normals do not spread ({spread:.2e} < {min:.2e})")]
    NoNormalSpread {
        /// Measured spread.
        spread: f64,
        /// Required spread.
        min: f64,
    },

    /// A fitted parameter fails a plausibility check.
    #[error("implausible {parameter}: {value}")]
    Implausible {
        /// Parameter name.
        parameter: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Triangle normals disagree with the fitted surface's normals.
    #[error("normals deviate {degrees:.1} degrees from the surface")]
    NormalMismatch {
        /// Area-weighted mean deviation.
        degrees: f64,
    },

    /// Points lie on the far side of a cone apex.
    #[error("points behind cone apex")]
    BehindApex,

    /// RMS error exceeds the tolerance.
    #[error("fit error {error:.3e} exceeds tolerance {tolerance:.3e}")]
    HighError {
        /// RMS distance.
        error: f64,
        /// Tolerance for this kind.
        tolerance: f64,
    },

    /// Too many points are outliers.
    #[error("inlier ratio {ratio:.3} below {min:.3}")]
    LowInliers {
        /// Fraction of points within tolerance.
        ratio: f64,
        /// Required fraction.
        min: f64,
    },
}

/// Why a region's boundary could not be turned into trim loops.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoundaryError {
    /// The region has no boundary edges (a closed surface).
    #[error("region has no boundary")]
    Closed,

    /// A loop has fewer than three edges.
    #[error("boundary loop with {0} edges")]
    TooFewEdges(usize),

    /// A vertex starts more than one boundary edge.
    #[error("boundary pinches at a vertex")]
    Pinch,

    /// A chain of boundary edges does not close.
    #[error("boundary chain does not close")]
    OpenChain,

    /// A boundary edge is shared by more than two mesh triangles.
    #[error("boundary edge is non-manifold")]
    NonManifoldEdge,

    /// No loop qualifies as the outer boundary.
    #[error("no admissible outer loop")]
    NoOuterLoop,
}

/// Why an analytic face could not be built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    /// Region has no accepted primitive.
    #[error("region has no accepted primitive")]
    NoPrimitive,

    /// Boundary extraction failed.
    #[error(transparent)]
    Boundary(#[from] BoundaryError),

    /// The kernel rejected the face.
    #[error("kernel rejected face: {0}")]
    Kernel(#[from] KernelError),
}
