//! Primitive fitting.
//!
//! [`PrimitiveFitter`] tries plane, cylinder, sphere and cone, in that
//! order, on the distinct vertices of a region. Each attempt either yields
//! a candidate or a [`FitRejection`]; candidates are scored by RMS distance
//! and inlier ratio at the kind's tolerance, and the lowest-error admissible
//! one wins. Rejections are logged and never escape.

mod cone;
mod cylinder;
pub(crate) mod linalg;
mod plane;
mod sphere;

use brepify_geom::{ConeSurface, CylinderSurface, Plane, SphereSurface, Surface, SurfaceKind};
use brepify_math::{Aabb3, Point3, Vec3};
use rayon::prelude::*;
use tracing::debug;

use crate::adjacency::WeldedMesh;
use crate::config::{ConversionConfig, FitHeuristics};
use crate::error::FitRejection;
use crate::segment::Region;

/// A fitted primitive, or `None` when nothing was admissible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimitiveCandidate {
    /// Plane through `origin`, `normal` agreeing with the region normal.
    Plane {
        /// Point on the plane (the region's vertex centroid).
        origin: Point3,
        /// Unit normal.
        normal: Vec3,
    },
    /// Finite cylinder.
    Cylinder {
        /// Axis point at the lowest axial position of the region.
        center: Point3,
        /// Unit axis.
        axis: Vec3,
        /// Radius.
        radius: f64,
        /// Axial extent of the region.
        height: f64,
    },
    /// Sphere.
    Sphere {
        /// Centre.
        center: Point3,
        /// Radius.
        radius: f64,
    },
    /// Cone opening from `apex` along `axis`.
    Cone {
        /// Apex.
        apex: Point3,
        /// Unit axis, apex toward base.
        axis: Vec3,
        /// Half-angle in radians.
        half_angle: f64,
        /// Axial extent of the region.
        height: f64,
    },
    /// No primitive.
    None,
}

impl PrimitiveCandidate {
    /// Surface kind, if any.
    pub fn kind(&self) -> Option<SurfaceKind> {
        match self {
            PrimitiveCandidate::Plane { .. } => Some(SurfaceKind::Plane),
            PrimitiveCandidate::Cylinder { .. } => Some(SurfaceKind::Cylinder),
            PrimitiveCandidate::Sphere { .. } => Some(SurfaceKind::Sphere),
            PrimitiveCandidate::Cone { .. } => Some(SurfaceKind::Cone),
            PrimitiveCandidate::None => None,
        }
    }

    /// The unbounded analytic surface.
    pub fn surface(&self) -> Option<Box<dyn Surface>> {
        match *self {
            PrimitiveCandidate::Plane { origin, normal } => {
                Some(Box::new(Plane::from_normal(origin, normal)))
            }
            PrimitiveCandidate::Cylinder {
                center,
                axis,
                radius,
                ..
            } => Some(Box::new(CylinderSurface::with_axis(center, axis, radius))),
            PrimitiveCandidate::Sphere { center, radius } => {
                Some(Box::new(SphereSurface::with_center(center, radius)))
            }
            PrimitiveCandidate::Cone {
                apex,
                axis,
                half_angle,
                ..
            } => Some(Box::new(ConeSurface::with_apex(apex, axis, half_angle))),
            PrimitiveCandidate::None => None,
        }
    }
}

/// A candidate with its quality measures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    /// The primitive.
    pub candidate: PrimitiveCandidate,
    /// RMS distance of the region's vertices to the surface.
    pub fit_error: f64,
    /// Mean absolute distance.
    pub mean_error: f64,
    /// Fraction of vertices within `tolerance`.
    pub inlier_ratio: f64,
    /// Tolerance the fit was scored against.
    pub tolerance: f64,
}

impl Fit {
    /// The empty result.
    pub fn none() -> Self {
        Self {
            candidate: PrimitiveCandidate::None,
            fit_error: f64::INFINITY,
            mean_error: f64::INFINITY,
            inlier_ratio: 0.0,
            tolerance: 0.0,
        }
    }

    /// True unless the candidate is `None`.
    pub fn is_accepted(&self) -> bool {
        self.candidate != PrimitiveCandidate::None
    }

    pub(super) fn measure(candidate: PrimitiveCandidate, points: &[Point3], tolerance: f64) -> Self {
        let Some(surface) = candidate.surface() else {
            return Self::none();
        };
        let distances: Vec<f64> = points.iter().map(|p| surface.distance(p)).collect();
        let n = distances.len().max(1) as f64;
        Self {
            candidate,
            fit_error: linalg::rms(distances.iter().copied()),
            mean_error: distances.iter().sum::<f64>() / n,
            inlier_ratio: distances.iter().filter(|&&d| d <= tolerance).count() as f64 / n,
            tolerance,
        }
    }

    fn admit(self, min_inlier_ratio: f64) -> Result<Self, FitRejection> {
        if self.fit_error > self.tolerance {
            return Err(FitRejection::HighError {
                error: self.fit_error,
                tolerance: self.tolerance,
            });
        }
        if self.inlier_ratio < min_inlier_ratio {
            return Err(FitRejection::LowInliers {
                ratio: self.inlier_ratio,
                min: min_inlier_ratio,
            });
        }
        Ok(self)
    }
}

/// Curved kinds need normals that actually turn.
pub(super) fn require_spread(sample: &RegionSample, min: f64) -> Result<(), FitRejection> {
    let spread = linalg::normal_spread(&sample.normals, &sample.weights);
    if spread < min {
        return Err(FitRejection::NoNormalSpread { spread, min });
    }
    Ok(())
}

/// The long principal axis of the points, when the cloud is elongated
/// enough for it to be a plausible cylinder or cone axis.
pub(super) fn elongated_axis(points: &[Point3], min_elongation: f64) -> Option<Vec3> {
    let center = linalg::centroid(points);
    let (values, vectors) = linalg::sorted_eigen(linalg::scatter(points, &center));
    if values[1] <= 0.0 {
        return None;
    }
    ((values[2] / values[1]).sqrt() >= min_elongation).then_some(vectors[2])
}

pub(super) fn check_radius(radius: f64, extent: f64, h: &FitHeuristics) -> Result<(), FitRejection> {
    let implausible = Err(FitRejection::Implausible {
        parameter: "radius",
        value: radius,
    });
    if !radius.is_finite() || radius < h.min_radius || radius > h.max_radius {
        return implausible;
    }
    if radius > h.max_radius_to_extent * extent {
        return implausible;
    }
    Ok(())
}

/// Reject `candidate` when triangle normals disagree with the surface
/// normal at the triangle centroids by more than `max_degrees` on average.
/// Orientation is ignored, so concave regions pass.
fn check_normals(
    candidate: PrimitiveCandidate,
    sample: &RegionSample,
    max_degrees: f64,
) -> Result<PrimitiveCandidate, FitRejection> {
    let Some(surface) = candidate.surface() else {
        return Ok(candidate);
    };
    let total: f64 = sample.weights.iter().sum();
    if total <= 0.0 {
        return Ok(candidate);
    }
    let deviation = sample
        .normals
        .iter()
        .zip(&sample.centroids)
        .zip(&sample.weights)
        .map(|((n, c), w)| {
            let expected = surface.normal_at(c);
            n.dot(expected.as_ref()).abs().clamp(0.0, 1.0).acos() * w
        })
        .sum::<f64>()
        / total;
    let degrees = deviation.to_degrees();
    if degrees > max_degrees {
        return Err(FitRejection::NormalMismatch { degrees });
    }
    Ok(candidate)
}

/// The geometry of one region, gathered once for all fitters.
#[derive(Debug, Clone)]
pub struct RegionSample {
    /// Distinct vertices.
    pub points: Vec<Point3>,
    /// Triangle normals.
    pub normals: Vec<Vec3>,
    /// Triangle areas, used as normal weights.
    pub weights: Vec<f64>,
    /// Triangle centroids.
    pub centroids: Vec<Point3>,
    /// Area-weighted region normal (may be zero).
    pub region_normal: Vec3,
    /// Bounding-box diagonal of the points.
    pub extent: f64,
}

impl RegionSample {
    /// Gather the sample for `region`.
    pub fn new(mesh: &WeldedMesh, region: &Region) -> Self {
        let points: Vec<Point3> = region
            .vertex_indices(mesh)
            .into_iter()
            .map(|i| mesh.points[i as usize])
            .collect();
        let extent = Aabb3::from_points(points.iter()).diagonal();
        Self {
            normals: region.triangles.iter().map(|&t| mesh.normals[t]).collect(),
            weights: region.triangles.iter().map(|&t| mesh.areas[t]).collect(),
            centroids: region.triangles.iter().map(|&t| mesh.centroid(t)).collect(),
            region_normal: region.normal,
            extent,
            points,
        }
    }
}

/// Fits primitives to regions according to a [`ConversionConfig`].
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveFitter<'a> {
    config: &'a ConversionConfig,
}

impl<'a> PrimitiveFitter<'a> {
    /// Create a fitter.
    pub fn new(config: &'a ConversionConfig) -> Self {
        Self { config }
    }

    /// Best admissible fit for `sample`, or [`Fit::none`].
    pub fn fit(&self, sample: &RegionSample) -> Fit {
        let c = self.config;
        let h = &c.heuristics.fit;
        let mut best: Option<Fit> = None;
        for kind in SurfaceKind::ALL {
            let (candidate, tolerance) = match kind {
                SurfaceKind::Plane => (plane::fit_plane(sample), c.plane_tolerance),
                SurfaceKind::Cylinder => (cylinder::fit_cylinder(sample, h), c.cylinder_tolerance),
                SurfaceKind::Sphere => (sphere::fit_sphere(sample, h), c.sphere_tolerance),
                SurfaceKind::Cone => (cone::fit_cone(sample, h, c.cone_tolerance), c.cone_tolerance),
            };
            let attempt = candidate
                .and_then(|p| check_normals(p, sample, h.max_normal_deviation))
                .map(|p| Fit::measure(p, &sample.points, tolerance))
                .and_then(|f| f.admit(c.min_inlier_ratio))
                .map(|f| {
                    if kind == SurfaceKind::Cylinder && c.refine_cylinders {
                        cylinder::refine(f, sample, h)
                    } else {
                        f
                    }
                });
            match attempt {
                Ok(fit) => {
                    if kind == SurfaceKind::Plane
                        && fit.fit_error < h.plane_early_exit * c.plane_tolerance
                    {
                        return fit;
                    }
                    let better = best.map_or(true, |b| {
                        let margin = h.error_tie_fraction * b.tolerance.max(fit.tolerance);
                        fit.fit_error < b.fit_error - margin
                    });
                    if better {
                        best = Some(fit);
                    }
                }
                Err(reason) => debug!(kind = kind.name(), %reason, "fit rejected"),
            }
        }
        best.unwrap_or_else(Fit::none)
    }

    /// Fit one region; regions below `min_region_faces` are not attempted.
    pub fn fit_region(&self, mesh: &WeldedMesh, region: &Region) -> Fit {
        if region.len() < self.config.min_region_faces {
            return Fit::none();
        }
        let fit = self.fit(&RegionSample::new(mesh, region));
        debug!(
            region = region.id,
            kind = fit.candidate.kind().map_or("none", SurfaceKind::name),
            error = fit.fit_error,
            inliers = fit.inlier_ratio,
            "region fitted"
        );
        fit
    }

    /// Fit every region, in parallel when configured. Output follows
    /// region order either way.
    pub fn fit_all(&self, mesh: &WeldedMesh, regions: &[Region]) -> Vec<Fit> {
        if self.config.parallel {
            regions
                .par_iter()
                .map(|r| self.fit_region(mesh, r))
                .collect()
        } else {
            regions.iter().map(|r| self.fit_region(mesh, r)).collect()
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use brepify_mesh::Mesh;

    /// Sample built from every triangle of `mesh` as one region.
    pub(crate) fn whole_mesh_sample(mesh: &Mesh) -> (WeldedMesh, RegionSample) {
        whole_mesh_sample_filtered(mesh, |_| true)
    }

    /// Sample from the triangles whose normal passes `keep`.
    pub(crate) fn whole_mesh_sample_filtered(
        mesh: &Mesh,
        keep: impl Fn(&Vec3) -> bool,
    ) -> (WeldedMesh, RegionSample) {
        let welded = WeldedMesh::new(mesh, 1e-6);
        let triangles: Vec<usize> = (0..welded.len()).filter(|&t| keep(&welded.normals[t])).collect();
        let weighted = triangles
            .iter()
            .fold(Vec3::zeros(), |acc, &t| acc + welded.normals[t] * welded.areas[t]);
        let region = Region {
            id: 0,
            area: triangles.iter().map(|&t| welded.areas[t]).sum(),
            normal: if weighted.norm() > 1e-9 {
                weighted.normalize()
            } else {
                Vec3::zeros()
            },
            centroid: Point3::origin(),
            flat_locked: false,
            triangles,
        };
        let sample = RegionSample::new(&welded, &region);
        (welded, sample)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use brepify_mesh::shapes::{make_box, make_cylinder, make_frustum, make_sphere};

    fn lateral(n: &Vec3) -> bool {
        n.z.abs() < 0.99
    }

    #[test]
    fn test_plane_wins_on_flat_region() {
        let config = ConversionConfig::default();
        let (_, sample) = whole_mesh_sample_filtered(&make_box(1.0, 1.0, 1.0), |n| n.z > 0.5);
        let fit = PrimitiveFitter::new(&config).fit(&sample);
        assert_eq!(fit.candidate.kind(), Some(SurfaceKind::Plane));
        assert!(fit.fit_error < 1e-12);
        assert_eq!(fit.inlier_ratio, 1.0);
    }

    #[test]
    fn test_cylinder_wins_on_lateral_band() {
        let config = ConversionConfig::default();
        let (_, sample) = whole_mesh_sample_filtered(&make_cylinder(5.0, 10.0, 48, true), lateral);
        let fit = PrimitiveFitter::new(&config).fit(&sample);
        match fit.candidate {
            PrimitiveCandidate::Cylinder { radius, height, axis, .. } => {
                assert!((radius - 5.0).abs() < 1e-6);
                assert!((height - 10.0).abs() < 1e-6);
                assert!(axis.z.abs() > 1.0 - 1e-9);
            }
            other => panic!("expected cylinder, got {other:?}"),
        }
    }

    #[test]
    fn test_sphere_wins_on_sphere() {
        let config = ConversionConfig::default();
        let (_, sample) = whole_mesh_sample(&make_sphere(3.0, 32, 16));
        let fit = PrimitiveFitter::new(&config).fit(&sample);
        assert_eq!(fit.candidate.kind(), Some(SurfaceKind::Sphere));
    }

    #[test]
    fn test_cone_wins_on_frustum_side() {
        let config = ConversionConfig::default();
        let (_, sample) = whole_mesh_sample_filtered(&make_frustum(2.0, 1.0, 3.0, 64), lateral);
        let fit = PrimitiveFitter::new(&config).fit(&sample);
        assert_eq!(fit.candidate.kind(), Some(SurfaceKind::Cone));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mesh = make_cylinder(2.0, 3.0, 48, true);
        let welded = WeldedMesh::new(&mesh, 1e-4);
        let mut config = ConversionConfig::default();
        let seg = crate::segment::segment(&welded, &config);
        let parallel = PrimitiveFitter::new(&config).fit_all(&welded, &seg.regions);
        config.parallel = false;
        let sequential = PrimitiveFitter::new(&config).fit_all(&welded, &seg.regions);
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_small_region_not_fitted() {
        let config = ConversionConfig {
            min_region_faces: 10,
            ..ConversionConfig::default()
        };
        let mesh = make_box(1.0, 1.0, 1.0);
        let welded = WeldedMesh::new(&mesh, 1e-4);
        let seg = crate::segment::segment(&welded, &config);
        let fits = PrimitiveFitter::new(&config).fit_all(&welded, &seg.regions);
        assert!(fits.iter().all(|f| !f.is_accepted()));
    }
}
