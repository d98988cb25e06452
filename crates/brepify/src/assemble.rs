//! Shell and solid assembly.
//!
//! The assembler walks `Collecting -> Sewing -> Solidifying -> Validating`,
//! with one `Repairing` detour, and ends in `Done`. It never fails: every
//! setback lowers the [`ConversionStatus`] and the best shape obtained so
//! far is returned.

use brepify_kernel::{BRepKernel, FaceId, SewResult, Shape};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ConversionConfig;

/// Outcome of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    /// A valid, closed solid.
    Success,
    /// A solid that failed validation even after repair.
    Partial,
    /// The faces did not close into a solid; the sewn shell is returned.
    ShellOnly,
    /// Empty input, or no face could be built.
    Failed,
    /// Stopped by the caller's cancellation flag.
    Cancelled,
}

impl ConversionStatus {
    /// Lowercase name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            ConversionStatus::Success => "success",
            ConversionStatus::Partial => "partial",
            ConversionStatus::ShellOnly => "shell_only",
            ConversionStatus::Failed => "failed",
            ConversionStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the assembler is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    /// Gathering faces.
    Collecting,
    /// Running the tolerance ladder.
    Sewing,
    /// Closing the shell into a solid.
    Solidifying,
    /// Running the kernel validator.
    Validating,
    /// The single repair attempt.
    Repairing,
    /// Finished.
    Done,
}

/// What the tolerance ladder achieved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SewingReport {
    /// Sewing attempts made.
    pub passes: usize,
    /// Tolerance of the kept pass.
    pub tolerance: f64,
    /// Free edges of the kept pass.
    pub free_edges: usize,
    /// Non-manifold edges of the kept pass.
    pub nonmanifold_edges: usize,
    /// Vertices merged by the kept pass.
    pub merged_vertices: usize,
}

/// Result of [`SolidAssembler::assemble`].
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    /// Best shape obtained, if any.
    pub shape: Option<Shape>,
    /// Resulting status.
    pub status: ConversionStatus,
    /// Sewing outcome; `None` when there was nothing to sew.
    pub sewing: Option<SewingReport>,
    /// True if the repair attempt was used.
    pub repaired: bool,
}

/// Sews faces into a shell and closes it into a solid.
#[derive(Debug)]
pub struct SolidAssembler<'a> {
    config: &'a ConversionConfig,
    state: AssemblyState,
}

impl<'a> SolidAssembler<'a> {
    /// Create an assembler in the `Collecting` state.
    pub fn new(config: &'a ConversionConfig) -> Self {
        Self {
            config,
            state: AssemblyState::Collecting,
        }
    }

    /// Current state.
    pub fn state(&self) -> AssemblyState {
        self.state
    }

    fn enter(&mut self, state: AssemblyState) {
        debug!(from = ?self.state, to = ?state, "assembler state");
        self.state = state;
    }

    fn finish(&mut self, assembly: Assembly) -> Assembly {
        self.enter(AssemblyState::Done);
        info!(
            status = %assembly.status,
            repaired = assembly.repaired,
            free_edges = assembly.sewing.map_or(0, |s| s.free_edges),
            "assembly complete"
        );
        assembly
    }

    /// Sew on a doubling tolerance ladder and keep the pass with the fewest
    /// free edges (the earliest on ties).
    fn sew_ladder(&mut self, kernel: &mut BRepKernel, faces: &[FaceId]) -> (SewResult, SewingReport) {
        let c = self.config;
        let acceptable = (c.acceptable_free_edge_ratio * faces.len() as f64).floor() as usize;
        let mut tolerance = c.sewing_tolerance;
        let mut last = kernel.sew(faces, tolerance);
        let mut best = (last, tolerance);
        let mut passes = 1;
        while last.free_edges > acceptable && tolerance * 2.0 <= c.max_sewing_tolerance {
            tolerance *= 2.0;
            last = kernel.sew(faces, tolerance);
            passes += 1;
            if last.free_edges < best.0.free_edges {
                best = (last, tolerance);
            }
        }
        let (sewn, tolerance) = best;
        if sewn.free_edges > 0 {
            warn!(
                free_edges = sewn.free_edges,
                tolerance, passes, "sewing left free edges"
            );
        }
        let report = SewingReport {
            passes,
            tolerance,
            free_edges: sewn.free_edges,
            nonmanifold_edges: sewn.nonmanifold_edges,
            merged_vertices: sewn.merged_vertices,
        };
        (sewn, report)
    }

    /// Sew `faces`, build a solid and validate it.
    pub fn assemble(&mut self, kernel: &mut BRepKernel, faces: &[FaceId]) -> Assembly {
        self.enter(AssemblyState::Collecting);
        if faces.is_empty() {
            return self.finish(Assembly {
                shape: None,
                status: ConversionStatus::Failed,
                sewing: None,
                repaired: false,
            });
        }

        self.enter(AssemblyState::Sewing);
        let (sewn, report) = self.sew_ladder(kernel, faces);
        let shell = Shape::Shell(sewn.shell);
        let mut repaired = false;

        self.enter(AssemblyState::Solidifying);
        let solid = match kernel.shell_to_solid(sewn.shell) {
            Ok(solid) => Shape::Solid(solid),
            Err(err) => {
                warn!(%err, "solid construction failed");
                self.enter(AssemblyState::Repairing);
                repaired = true;
                match kernel.repair(shell) {
                    Ok(shape @ Shape::Solid(_)) => shape,
                    Ok(_) | Err(_) => {
                        warn!("repair could not close the shell");
                        return self.finish(Assembly {
                            shape: Some(shell),
                            status: ConversionStatus::ShellOnly,
                            sewing: Some(report),
                            repaired,
                        });
                    }
                }
            }
        };

        self.enter(AssemblyState::Validating);
        if kernel.is_valid(solid) {
            return self.finish(Assembly {
                shape: Some(solid),
                status: ConversionStatus::Success,
                sewing: Some(report),
                repaired,
            });
        }
        let mut shape = solid;
        let mut status = ConversionStatus::Partial;
        if !repaired {
            self.enter(AssemblyState::Repairing);
            repaired = true;
            match kernel.repair(solid) {
                Ok(fixed @ Shape::Solid(_)) => {
                    self.enter(AssemblyState::Validating);
                    if kernel.is_valid(fixed) {
                        shape = fixed;
                        status = ConversionStatus::Success;
                    }
                }
                Ok(_) => {}
                Err(err) => warn!(%err, "repair failed"),
            }
        }
        if status == ConversionStatus::Partial {
            warn!(issues = ?kernel.check(shape), "solid is invalid");
        }
        self.finish(Assembly {
            shape: Some(shape),
            status,
            sewing: Some(report),
            repaired,
        })
    }
}
