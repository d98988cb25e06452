//! Cone fitting.
//!
//! A cone's normals all make the same angle with its axis, so the axis is
//! the direction of least variance of the centred normal scatter. Seen
//! along that axis every normal line passes through the axis, which fixes
//! its position; the radius-versus-height profile of the vertices is then
//! a straight line whose slope is the half-angle and whose root is the
//! apex. The axis is re-estimated from the triangles that agree with the
//! current cone until the inlier set stops changing.

use brepify_math::{orthonormal_basis, Point2, Vec3};
use nalgebra::Vector2;

use super::{
    check_radius, elongated_axis, linalg, require_spread, PrimitiveCandidate, RegionSample,
};
use crate::config::FitHeuristics;
use crate::error::FitRejection;

pub(super) fn fit_cone(
    sample: &RegionSample,
    h: &FitHeuristics,
    tolerance: f64,
) -> Result<PrimitiveCandidate, FitRejection> {
    if sample.points.len() < 6 {
        return Err(FitRejection::TooFewPoints {
            needed: 6,
            got: sample.points.len(),
        });
    }
    require_spread(sample, h.min_normal_spread)?;

    let all: Vec<usize> = (0..sample.normals.len()).collect();
    let mut axes = vec![normal_axis(sample, &all)];
    axes.extend(elongated_axis(&sample.points, h.min_elongation));

    let mut best: Option<(f64, PrimitiveCandidate)> = None;
    let mut last = FitRejection::Degenerate("cone axis");
    for axis in axes {
        match iterate(sample, axis, h, tolerance) {
            Ok(candidate) => {
                let error = match candidate.surface() {
                    Some(s) => linalg::rms(sample.points.iter().map(|p| s.distance(p))),
                    None => f64::INFINITY,
                };
                if best.map_or(true, |(e, _)| error < e) {
                    best = Some((error, candidate));
                }
            }
            Err(reason) => last = reason,
        }
    }
    best.map(|(_, c)| c).ok_or(last)
}

fn normal_axis(sample: &RegionSample, triangles: &[usize]) -> Vec3 {
    let normals: Vec<Vec3> = triangles.iter().map(|&t| sample.normals[t]).collect();
    let weights: Vec<f64> = triangles.iter().map(|&t| sample.weights[t]).collect();
    linalg::sorted_eigen(linalg::direction_scatter(&normals, &weights, true)).1[0]
}

fn iterate(
    sample: &RegionSample,
    mut axis: Vec3,
    h: &FitHeuristics,
    tolerance: f64,
) -> Result<PrimitiveCandidate, FitRejection> {
    let mut active: Vec<usize> = (0..sample.normals.len()).collect();
    let mut candidate = estimate(sample, &active, axis, h, tolerance)?;
    for _ in 1..h.cone_iterations.max(1) {
        let Some(surface) = candidate.surface() else {
            break;
        };
        let inliers: Vec<usize> = (0..sample.centroids.len())
            .filter(|&t| surface.distance(&sample.centroids[t]) <= tolerance)
            .collect();
        if inliers.len() < 6 || inliers == active {
            break;
        }
        axis = normal_axis(sample, &inliers);
        active = inliers;
        match estimate(sample, &active, axis, h, tolerance) {
            Ok(next) => candidate = next,
            Err(_) => break,
        }
    }
    Ok(candidate)
}

/// One cone estimate for a fixed axis direction.
fn estimate(
    sample: &RegionSample,
    active: &[usize],
    axis: Vec3,
    h: &FitHeuristics,
    tolerance: f64,
) -> Result<PrimitiveCandidate, FitRejection> {
    let origin = linalg::centroid(&sample.points);
    let (u, v) = orthonormal_basis(&axis);

    let lines: Vec<(Point2, Vector2<f64>)> = active
        .iter()
        .filter_map(|&t| {
            let d = sample.centroids[t] - origin;
            let n = sample.normals[t];
            let dir = Vector2::new(n.dot(&u), n.dot(&v));
            let len = dir.norm();
            (len > 1e-9).then(|| (Point2::new(d.dot(&u), d.dot(&v)), dir / len))
        })
        .collect();
    let q = linalg::intersect_lines_2d(&lines).ok_or(FitRejection::Degenerate("cone axis point"))?;
    let axis_point = origin + u * q.x + v * q.y;

    let profile: Vec<(f64, f64)> = sample
        .points
        .iter()
        .map(|p| {
            let d = p - axis_point;
            let t = d.dot(&axis);
            (t, (d - axis * t).norm())
        })
        .collect();
    let (slope, intercept) =
        linalg::linear_regression(&profile).ok_or(FitRejection::Degenerate("cone profile"))?;
    let half_angle = slope.abs().atan();
    let degrees = half_angle.to_degrees();
    if degrees < h.min_cone_half_angle || degrees > h.max_cone_half_angle {
        return Err(FitRejection::Implausible {
            parameter: "half angle",
            value: degrees,
        });
    }

    // The radius reaches zero at the apex; orient the axis so radius grows along it.
    let apex = axis_point + axis * (-intercept / slope);
    let axis = if slope < 0.0 { -axis } else { axis };
    let (lo, hi) = sample
        .points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            let t = (p - apex).dot(&axis);
            (lo.min(t), hi.max(t))
        });
    if lo < -tolerance {
        return Err(FitRejection::BehindApex);
    }
    let height = hi - lo.max(0.0);
    if height < h.min_height {
        return Err(FitRejection::Implausible {
            parameter: "height",
            value: height,
        });
    }
    check_radius(hi * slope.abs(), sample.extent, h)?;
    Ok(PrimitiveCandidate::Cone {
        apex,
        axis,
        half_angle,
        height,
    })
}
