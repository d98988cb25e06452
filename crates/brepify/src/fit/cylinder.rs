//! Cylinder fitting.
//!
//! The axis direction is the direction most perpendicular to every
//! triangle normal (smallest eigenvector of the normal scatter); for
//! elongated regions the long principal axis of the points is tried too.
//! Given an axis, the points are projected onto the perpendicular plane
//! and a circle fit yields the axis position. [`refine`] then polishes all
//! five degrees of freedom with Gauss-Newton on the geometric residual.

use brepify_math::{orthonormal_basis, Point2, Point3, Vec3};
use nalgebra::{DMatrix, DVector};

use super::{
    check_radius, elongated_axis, linalg, require_spread, Fit, PrimitiveCandidate, RegionSample,
};
use crate::config::FitHeuristics;
use crate::error::FitRejection;

pub(super) fn fit_cylinder(
    sample: &RegionSample,
    h: &FitHeuristics,
) -> Result<PrimitiveCandidate, FitRejection> {
    if sample.points.len() < 6 {
        return Err(FitRejection::TooFewPoints {
            needed: 6,
            got: sample.points.len(),
        });
    }
    require_spread(sample, h.min_normal_spread)?;

    let normal_scatter = linalg::direction_scatter(&sample.normals, &sample.weights, false);
    let mut axes = vec![linalg::sorted_eigen(normal_scatter).1[0]];
    axes.extend(elongated_axis(&sample.points, h.min_elongation));

    let mut best: Option<(f64, PrimitiveCandidate)> = None;
    let mut last = FitRejection::Degenerate("cylinder axis");
    for axis in axes {
        match about_axis(sample, axis, h) {
            Ok((error, candidate)) => {
                if best.map_or(true, |(e, _)| error < e) {
                    best = Some((error, candidate));
                }
            }
            Err(reason) => last = reason,
        }
    }
    best.map(|(_, c)| c).ok_or(last)
}

fn radial_distance(p: &Point3, origin: &Point3, axis: &Vec3) -> f64 {
    let d = p - origin;
    (d - axis * d.dot(axis)).norm()
}

/// Axis point at the lowest axial position and the axial extent.
fn axial_span(points: &[Point3], origin: &Point3, axis: &Vec3) -> (Point3, f64) {
    let (lo, hi) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        let t = (p - origin).dot(axis);
        (lo.min(t), hi.max(t))
    });
    (origin + axis * lo, hi - lo)
}

fn about_axis(
    sample: &RegionSample,
    axis: Vec3,
    h: &FitHeuristics,
) -> Result<(f64, PrimitiveCandidate), FitRejection> {
    let points = &sample.points;
    let center = linalg::centroid(points);
    let (u, v) = orthonormal_basis(&axis);
    let projected: Vec<Point2> = points
        .iter()
        .map(|p| {
            let d = p - center;
            Point2::new(d.dot(&u), d.dot(&v))
        })
        .collect();
    let (c, _) = linalg::fit_circle(&projected).ok_or(FitRejection::Degenerate("circle fit"))?;
    let origin = center + u * c.x + v * c.y;

    let radii: Vec<f64> = points.iter().map(|p| radial_distance(p, &origin, &axis)).collect();
    let radius = linalg::median(&radii);
    check_radius(radius, sample.extent, h)?;
    let mean = radii.iter().sum::<f64>() / radii.len() as f64;
    let std = linalg::rms(radii.iter().map(|r| r - mean));
    if std / radius > h.max_radius_rel_std {
        return Err(FitRejection::Implausible {
            parameter: "radius spread",
            value: std / radius,
        });
    }

    let (base, height) = axial_span(points, &origin, &axis);
    if height < h.min_height {
        return Err(FitRejection::Implausible {
            parameter: "height",
            value: height,
        });
    }
    let error = linalg::rms(radii.iter().map(|r| r - radius));
    Ok((
        error,
        PrimitiveCandidate::Cylinder {
            center: base,
            axis,
            radius,
            height,
        },
    ))
}

/// Gauss-Newton refinement of an accepted cylinder. The refined fit is
/// returned only if it lowers the error without losing inliers.
pub(super) fn refine(fit: Fit, sample: &RegionSample, h: &FitHeuristics) -> Fit {
    let PrimitiveCandidate::Cylinder {
        center,
        axis,
        radius,
        ..
    } = fit.candidate
    else {
        return fit;
    };
    let points = &sample.points;
    let (mut origin, mut axis, mut radius) = (center, axis, radius);
    let step = 1e-7 * radius.max(1.0);

    for _ in 0..h.refine_iterations {
        let (u, v) = orthonormal_basis(&axis);
        // Parameters: origin shift along u and v, axis tilt along u and v, radius.
        let residuals = |x: &[f64; 5]| -> DVector<f64> {
            let o = origin + u * x[0] + v * x[1];
            let a = (axis + u * x[2] + v * x[3]).normalize();
            DVector::from_iterator(
                points.len(),
                points.iter().map(|p| radial_distance(p, &o, &a) - (radius + x[4])),
            )
        };
        let r0 = residuals(&[0.0; 5]);
        let mut jacobian = DMatrix::zeros(points.len(), 5);
        for k in 0..5 {
            let mut x = [0.0; 5];
            x[k] = step;
            let column = (residuals(&x) - &r0) / step;
            jacobian.set_column(k, &column);
        }
        let Some(delta) = linalg::least_squares(jacobian, &(-&r0)) else {
            break;
        };
        origin += u * delta[0] + v * delta[1];
        axis = (axis + u * delta[2] + v * delta[3]).normalize();
        radius += delta[4];
        if delta.norm() < 1e-12 {
            break;
        }
    }

    if !radius.is_finite() || radius <= 0.0 {
        return fit;
    }
    let (base, height) = axial_span(points, &origin, &axis);
    let candidate = PrimitiveCandidate::Cylinder {
        center: base,
        axis,
        radius,
        height,
    };
    let refined = Fit::measure(candidate, points, fit.tolerance);
    if refined.fit_error < fit.fit_error && refined.inlier_ratio >= fit.inlier_ratio {
        refined
    } else {
        fit
    }
}
