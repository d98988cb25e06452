#![warn(missing_docs)]

//! Mesh to B-rep conversion.
//!
//! Turns triangle meshes (typically STL exports of machined or printed
//! parts) into B-rep solids whose flat, cylindrical, spherical and conical
//! patches are exact analytic faces:
//!
//! 1. weld the mesh and grow regions of continuous normals ([`segment`])
//! 2. fit a plane, cylinder, sphere or cone to each region ([`fit`])
//! 3. trim each fitted surface by the region's own mesh boundary
//!    ([`boundary`], [`synth`]), falling back to triangles where that fails
//! 4. sew everything into a shell and close it into a solid ([`assemble`])
//! 5. merge adjacent faces that share a surface ([`optimize`])
//!
//! All vertices and edges come from one [`GeometryPool`], so analytic faces
//! and fallback triangles meet edge for edge.
//!
//! # Example
//!
//! ```
//! use brepify::{ConversionConfig, ConversionPipeline, ConversionStatus};
//! use brepify_mesh::shapes::make_cylinder;
//!
//! let pipeline = ConversionPipeline::new(ConversionConfig::default()).unwrap();
//! let result = pipeline.convert(&make_cylinder(5.0, 10.0, 64, true));
//! assert_eq!(result.status, ConversionStatus::Success);
//! assert_eq!(result.surface_counts().cylinder, 1);
//! ```

pub mod adjacency;
pub mod assemble;
pub mod boundary;
pub mod config;
pub mod error;
pub mod fit;
pub mod optimize;
pub mod pipeline;
pub mod pool;
pub mod segment;
pub mod stats;
pub mod synth;
pub mod triangulate;

pub use assemble::{Assembly, AssemblyState, ConversionStatus, SewingReport, SolidAssembler};
pub use config::{
    ConversionConfig, FitHeuristics, Heuristics, PrimitiveReplacementStrategy, UnifyHeuristics,
};
pub use error::{BoundaryError, ConfigError, FitRejection, SynthesisError};
pub use fit::{Fit, PrimitiveCandidate, PrimitiveFitter};
pub use optimize::FaceUnificationOptimizer;
pub use pipeline::{
    ConversionPipeline, ConversionResult, Phase, ProgressCallback, RegionOutcome, RegionReport,
};
pub use pool::GeometryPool;
pub use segment::{Region, Segmentation};
pub use stats::{ConversionStats, OptimizationStats, SurfaceCounts};

pub use brepify_kernel;
pub use brepify_mesh;
pub use brepify_step;
