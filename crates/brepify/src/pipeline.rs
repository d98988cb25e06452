//! The conversion pipeline.
//!
//! `Welding -> Segmentation -> Fitting -> FaceConstruction -> Assembly ->
//! Optimization`. Each call to [`ConversionPipeline::convert`] owns a fresh
//! kernel and geometry pool, which end up in the [`ConversionResult`].

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use brepify_kernel::{BRepKernel, FaceId, Shape, SurfaceKind};
use brepify_mesh::Mesh;
use brepify_step::StepError;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::adjacency::WeldedMesh;
use crate::assemble::{ConversionStatus, SolidAssembler};
use crate::config::ConversionConfig;
use crate::error::ConfigError;
use crate::fit::{Fit, PrimitiveFitter};
use crate::optimize::FaceUnificationOptimizer;
use crate::pool::GeometryPool;
use crate::segment::{segment, Region};
use crate::stats::{ConversionStats, SurfaceCounts};
use crate::synth::synthesize_face;
use crate::triangulate::triangle_faces;

/// Pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Vertex deduplication and adjacency.
    Welding,
    /// Region growing.
    Segmentation,
    /// Primitive fitting.
    Fitting,
    /// Analytic and triangulated face construction.
    FaceConstruction,
    /// Sewing, solid construction and validation.
    Assembly,
    /// Face unification.
    Optimization,
    /// Finished.
    Done,
}

impl Phase {
    const COUNT: f32 = 6.0;

    /// Fraction of the run completed when this phase starts.
    pub fn fraction(self) -> f32 {
        let index = match self {
            Phase::Welding => 0.0,
            Phase::Segmentation => 1.0,
            Phase::Fitting => 2.0,
            Phase::FaceConstruction => 3.0,
            Phase::Assembly => 4.0,
            Phase::Optimization => 5.0,
            Phase::Done => Self::COUNT,
        };
        index / Self::COUNT
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Welding => "welding",
            Phase::Segmentation => "segmentation",
            Phase::Fitting => "fitting",
            Phase::FaceConstruction => "face construction",
            Phase::Assembly => "assembly",
            Phase::Optimization => "optimization",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Progress callback: the phase being entered and the completed fraction.
pub type ProgressCallback = Arc<dyn Fn(Phase, f32) + Send + Sync>;

/// How a region ended up in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionOutcome {
    /// A primitive was accepted (inspection only; no faces were built).
    Fitted,
    /// Emitted as one analytic face.
    Analytic,
    /// A primitive was accepted but face construction failed; emitted as
    /// triangles.
    Fallback,
    /// No primitive was accepted; emitted as triangles.
    Triangulated,
}

/// Per-region summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionReport {
    /// Region id.
    pub id: usize,
    /// Triangle count.
    pub triangles: usize,
    /// Total area.
    pub area: f64,
    /// Accepted surface type.
    pub surface: Option<&'static str>,
    /// RMS fit error of the accepted primitive.
    pub fit_error: Option<f64>,
    /// Inlier ratio of the accepted primitive.
    pub inlier_ratio: Option<f64>,
    /// What happened to the region.
    pub outcome: RegionOutcome,
    /// Why an accepted primitive fell back to triangles.
    pub reason: Option<String>,
}

impl RegionReport {
    fn new(region: &Region, fit: &Fit, outcome: RegionOutcome) -> Self {
        let accepted = fit.is_accepted();
        Self {
            id: region.id,
            triangles: region.len(),
            area: region.area,
            surface: fit.candidate.kind().map(SurfaceKind::name),
            fit_error: accepted.then_some(fit.fit_error),
            inlier_ratio: accepted.then_some(fit.inlier_ratio),
            outcome,
            reason: None,
        }
    }
}

/// Output of one conversion. Owns the kernel holding the shape.
#[derive(Debug)]
pub struct ConversionResult {
    /// Kernel owning every entity of `shape`.
    pub kernel: BRepKernel,
    /// Final shape, if any was assembled.
    pub shape: Option<Shape>,
    /// Outcome.
    pub status: ConversionStatus,
    /// Counters.
    pub stats: ConversionStats,
    /// One entry per segmented region; empty when replacement is disabled.
    pub regions: Vec<RegionReport>,
}

impl ConversionResult {
    /// Serialize the shape as STEP.
    pub fn to_step_bytes(&self) -> Result<Vec<u8>, StepError> {
        let shape = self.shape.ok_or(StepError::EmptyShape)?;
        brepify_step::write_step_to_buffer(&self.kernel, shape)
    }

    /// Write the shape as a STEP file.
    pub fn write_step(&self, path: impl AsRef<Path>) -> Result<(), StepError> {
        let shape = self.shape.ok_or(StepError::EmptyShape)?;
        brepify_step::write_step(&self.kernel, shape, path)
    }

    /// Faces of the final shape.
    pub fn faces(&self) -> Vec<FaceId> {
        self.shape.map_or_else(Vec::new, |s| self.kernel.faces(s))
    }

    /// Face types of the final shape.
    pub fn surface_counts(&self) -> SurfaceCounts {
        SurfaceCounts::of_faces(&self.kernel, &self.faces())
    }
}

/// Mesh to B-rep converter.
#[derive(Clone)]
pub struct ConversionPipeline {
    config: ConversionConfig,
    progress: Option<ProgressCallback>,
    cancel: Option<Arc<AtomicBool>>,
}

impl fmt::Debug for ConversionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionPipeline")
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Phase-boundary bookkeeping shared by one run.
struct Run<'p> {
    pipeline: &'p ConversionPipeline,
    kernel: BRepKernel,
    stats: ConversionStats,
    regions: Vec<RegionReport>,
}

impl<'p> Run<'p> {
    /// Report `phase`; false if the run was cancelled.
    fn enter(&self, phase: Phase) -> bool {
        if let Some(progress) = &self.pipeline.progress {
            progress(phase, phase.fraction());
        }
        if self.pipeline.is_cancelled() {
            warn!(%phase, "conversion cancelled");
            return false;
        }
        debug!(%phase, "phase");
        true
    }

    fn finish(mut self, shape: Option<Shape>, status: ConversionStatus) -> ConversionResult {
        self.stats.status = Some(status);
        info!(
            %status,
            faces = self.stats.faces_after_optimization,
            free_edges = self.stats.free_edges,
            "conversion finished"
        );
        ConversionResult {
            kernel: self.kernel,
            shape,
            status,
            stats: self.stats,
            regions: self.regions,
        }
    }
}

impl ConversionPipeline {
    /// Create a pipeline; the configuration is validated here.
    pub fn new(config: ConversionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            progress: None,
            cancel: None,
        })
    }

    /// Receive a callback at every phase boundary.
    pub fn with_progress(mut self, progress: impl Fn(Phase, f32) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Stop at the next phase boundary once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// The validated configuration.
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Convert `mesh` to a B-rep shape.
    pub fn convert(&self, mesh: &Mesh) -> ConversionResult {
        self.run(mesh, self.config.analytic_replacement())
    }

    /// Convert `mesh` keeping every triangle as a planar face, in mesh
    /// order. A conversion with analytic replacement disabled produces the
    /// same result.
    pub fn triangulated_baseline(&self, mesh: &Mesh) -> ConversionResult {
        self.run(mesh, false)
    }

    /// Segment and fit `mesh` without building any faces.
    pub fn inspect(&self, mesh: &Mesh) -> Vec<RegionReport> {
        let welded = WeldedMesh::new(mesh, self.config.vertex_precision);
        let segmentation = segment(&welded, &self.config);
        let fits = PrimitiveFitter::new(&self.config).fit_all(&welded, &segmentation.regions);
        segmentation
            .regions
            .iter()
            .zip(&fits)
            .map(|(region, fit)| {
                let outcome = if fit.is_accepted() {
                    RegionOutcome::Fitted
                } else {
                    RegionOutcome::Triangulated
                };
                RegionReport::new(region, fit, outcome)
            })
            .collect()
    }

    fn run(&self, mesh: &Mesh, analytic: bool) -> ConversionResult {
        let config = &self.config;
        let mut run = Run {
            pipeline: self,
            kernel: BRepKernel::with_settings(config.kernel_settings()),
            stats: ConversionStats {
                input_triangles: mesh.triangle_count(),
                ..Default::default()
            },
            regions: Vec::new(),
        };
        info!(
            triangles = mesh.triangle_count(),
            analytic, "conversion started"
        );
        if mesh.is_empty() {
            warn!("empty mesh");
            return run.finish(None, ConversionStatus::Failed);
        }

        if !run.enter(Phase::Welding) {
            return run.finish(None, ConversionStatus::Cancelled);
        }
        let welded = WeldedMesh::new(mesh, config.vertex_precision);
        run.stats.degenerate_triangles = welded.degenerate;
        if welded.is_empty() {
            warn!(degenerate = welded.degenerate, "no usable triangles");
            return run.finish(None, ConversionStatus::Failed);
        }
        let mut pool = GeometryPool::new(config.vertex_precision);

        let faces = if analytic {
            match self.analytic_faces(&mut run, &welded, &mut pool) {
                Some(faces) => faces,
                None => return run.finish(None, ConversionStatus::Cancelled),
            }
        } else {
            if !run.enter(Phase::FaceConstruction) {
                return run.finish(None, ConversionStatus::Cancelled);
            }
            let (faces, rejected) =
                triangle_faces(&mut run.kernel, &mut pool, &welded, 0..welded.len());
            run.stats.rejected_triangles = rejected;
            faces
        };
        run.stats.faces_built = faces.len();
        info!(
            faces = faces.len(),
            vertices = pool.vertex_count(),
            edges = pool.edge_count(),
            "faces built"
        );

        if !run.enter(Phase::Assembly) {
            return run.finish(None, ConversionStatus::Cancelled);
        }
        let assembly = SolidAssembler::new(config).assemble(&mut run.kernel, &faces);
        if let Some(report) = assembly.sewing {
            run.stats.free_edges = report.free_edges;
            run.stats.sewing_passes = report.passes;
            run.stats.sewing_tolerance = report.tolerance;
        }
        run.stats.repaired = assembly.repaired;
        let Some(mut shape) = assembly.shape else {
            return run.finish(None, assembly.status);
        };
        run.stats.faces_before_optimization = run.kernel.face_count(shape);
        run.stats.area_before = run.kernel.area(shape);
        run.stats.volume_before = run.kernel.volume(shape);

        if analytic && config.optimize {
            if !run.enter(Phase::Optimization) {
                return run.finish(Some(shape), ConversionStatus::Cancelled);
            }
            let (optimized, stats) =
                FaceUnificationOptimizer::new(config).optimize(&mut run.kernel, shape);
            shape = optimized;
            run.stats.optimization = Some(stats);
        }
        run.stats.faces_after_optimization = run.kernel.face_count(shape);
        run.stats.area_after = run.kernel.area(shape);
        run.stats.volume_after = run.kernel.volume(shape);

        if let Some(progress) = &self.progress {
            progress(Phase::Done, Phase::Done.fraction());
        }
        run.finish(Some(shape), assembly.status)
    }

    /// Segmentation, fitting and face construction. `None` if cancelled.
    fn analytic_faces(
        &self,
        run: &mut Run<'_>,
        welded: &WeldedMesh,
        pool: &mut GeometryPool,
    ) -> Option<Vec<FaceId>> {
        if !run.enter(Phase::Segmentation) {
            return None;
        }
        let segmentation = segment(welded, &self.config);
        run.stats.regions = segmentation.regions.len();
        run.stats.small_regions = segmentation.small_regions;
        info!(
            regions = segmentation.regions.len(),
            small = segmentation.small_regions,
            "mesh segmented"
        );

        if !run.enter(Phase::Fitting) {
            return None;
        }
        let fits = PrimitiveFitter::new(&self.config).fit_all(welded, &segmentation.regions);
        for kind in fits.iter().filter_map(|f| f.candidate.kind()) {
            run.stats.primitives_detected.add(kind);
        }
        info!(
            detected = run.stats.primitives_detected.total(),
            "primitives fitted"
        );

        if !run.enter(Phase::FaceConstruction) {
            return None;
        }
        let mut faces = Vec::new();
        for (region, fit) in segmentation.regions.iter().zip(&fits) {
            let mut report = RegionReport::new(region, fit, RegionOutcome::Triangulated);
            if let Some(kind) = fit.candidate.kind() {
                match synthesize_face(&mut run.kernel, pool, welded, region, &fit.candidate) {
                    Ok(face) => {
                        faces.push(face);
                        run.stats.primitives_replaced.add(kind);
                        report.outcome = RegionOutcome::Analytic;
                        run.regions.push(report);
                        continue;
                    }
                    Err(err) => {
                        debug!(region = region.id, %kind, %err, "analytic face failed; using triangles");
                        run.stats.fallback_regions += 1;
                        report.outcome = RegionOutcome::Fallback;
                        report.reason = Some(err.to_string());
                    }
                }
            }
            let (triangles, rejected) = triangle_faces(
                &mut run.kernel,
                pool,
                welded,
                region.triangles.iter().copied(),
            );
            faces.extend(triangles);
            run.stats.rejected_triangles += rejected;
            run.regions.push(report);
        }
        Some(faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrimitiveReplacementStrategy;
    use brepify_mesh::shapes::make_box;
    use std::sync::Mutex;

    #[test]
    fn test_invalid_config_rejected() {
        let config = ConversionConfig {
            replacement_strategy: PrimitiveReplacementStrategy::BooleanCutFuse,
            ..Default::default()
        };
        assert!(ConversionPipeline::new(config).is_err());
    }

    #[test]
    fn test_empty_mesh_fails() {
        let pipeline = ConversionPipeline::new(ConversionConfig::default()).unwrap();
        let result = pipeline.convert(&Mesh::new());
        assert_eq!(result.status, ConversionStatus::Failed);
        assert!(result.shape.is_none());
        assert!(result.to_step_bytes().is_err());
    }

    #[test]
    fn test_progress_visits_every_phase() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let pipeline = ConversionPipeline::new(ConversionConfig::default())
            .unwrap()
            .with_progress(move |phase, fraction| sink.lock().unwrap().push((phase, fraction)));
        let result = pipeline.convert(&make_box(1.0, 1.0, 1.0));
        assert_eq!(result.status, ConversionStatus::Success);
        let seen = seen.lock().unwrap();
        let phases: Vec<Phase> = seen.iter().map(|(p, _)| *p).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Welding,
                Phase::Segmentation,
                Phase::Fitting,
                Phase::FaceConstruction,
                Phase::Assembly,
                Phase::Optimization,
                Phase::Done,
            ]
        );
        assert!(seen.windows(2).all(|w| w[0].1 < w[1].1));
        assert_eq!(seen.last().map(|(_, f)| *f), Some(1.0));
    }

    #[test]
    fn test_cancel_before_start() {
        let flag = Arc::new(AtomicBool::new(true));
        let pipeline = ConversionPipeline::new(ConversionConfig::default())
            .unwrap()
            .with_cancel_flag(flag);
        let result = pipeline.convert(&make_box(1.0, 1.0, 1.0));
        assert_eq!(result.status, ConversionStatus::Cancelled);
        assert!(result.shape.is_none());
    }

    fn cancel_on(phase: Phase) -> ConversionResult {
        let flag = Arc::new(AtomicBool::new(false));
        let trigger = Arc::clone(&flag);
        let pipeline = ConversionPipeline::new(ConversionConfig::default())
            .unwrap()
            .with_cancel_flag(flag)
            .with_progress(move |p, _| {
                if p == phase {
                    trigger.store(true, Ordering::Relaxed);
                }
            });
        pipeline.convert(&make_box(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_cancel_before_assembly_has_no_shape() {
        let result = cancel_on(Phase::Assembly);
        assert_eq!(result.status, ConversionStatus::Cancelled);
        assert!(result.shape.is_none());
        assert_eq!(result.stats.regions, 6);
    }

    #[test]
    fn test_cancel_before_optimization_keeps_assembled_shape() {
        let result = cancel_on(Phase::Optimization);
        assert_eq!(result.status, ConversionStatus::Cancelled);
        let shape = result.shape.unwrap();
        assert_eq!(result.kernel.face_count(shape), 6);
        assert!(result.stats.optimization.is_none());
    }

    #[test]
    fn test_region_reports() {
        let pipeline = ConversionPipeline::new(ConversionConfig::default()).unwrap();
        let result = pipeline.convert(&make_box(1.0, 1.0, 1.0));
        assert_eq!(result.regions.len(), 6);
        assert!(result
            .regions
            .iter()
            .all(|r| r.outcome == RegionOutcome::Analytic && r.surface == Some("plane")));
        let inspected = pipeline.inspect(&make_box(1.0, 1.0, 1.0));
        assert!(inspected.iter().all(|r| r.outcome == RegionOutcome::Fitted));
    }
}
