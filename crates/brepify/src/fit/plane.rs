//! Total least-squares plane.

use brepify_math::Vec3;

use super::{linalg, PrimitiveCandidate, RegionSample};
use crate::error::FitRejection;

/// Plane through the vertex centroid, normal along the smallest principal
/// direction and oriented to agree with the region's triangles.
pub(super) fn fit_plane(sample: &RegionSample) -> Result<PrimitiveCandidate, FitRejection> {
    let points = &sample.points;
    if points.len() < 3 {
        return Err(FitRejection::TooFewPoints {
            needed: 3,
            got: points.len(),
        });
    }
    let origin = linalg::centroid(points);
    let (values, vectors) = linalg::sorted_eigen(linalg::scatter(points, &origin));
    if values[1] <= 1e-12 * values[2].max(f64::MIN_POSITIVE) {
        return Err(FitRejection::Degenerate("collinear points"));
    }

    let reference = if sample.region_normal.norm() > 0.0 {
        sample.region_normal
    } else {
        sample
            .normals
            .iter()
            .zip(&sample.weights)
            .fold(Vec3::zeros(), |acc, (n, w)| acc + n * *w)
    };
    let normal = if vectors[0].dot(&reference) < 0.0 {
        -vectors[0]
    } else {
        vectors[0]
    };
    Ok(PrimitiveCandidate::Plane { origin, normal })
}
