//! Algebraic sphere fit.

use brepify_math::Vec3;
use nalgebra::{DMatrix, DVector};

use super::{check_radius, linalg, require_spread, PrimitiveCandidate, RegionSample};
use crate::config::FitHeuristics;
use crate::error::FitRejection;

/// Solves `|p|^2 = 2 c.p + d` in the least-squares sense, relative to the
/// vertex centroid for conditioning; `r^2 = d + |c|^2`.
pub(super) fn fit_sphere(
    sample: &RegionSample,
    h: &FitHeuristics,
) -> Result<PrimitiveCandidate, FitRejection> {
    let points = &sample.points;
    if points.len() < 4 {
        return Err(FitRejection::TooFewPoints {
            needed: 4,
            got: points.len(),
        });
    }
    require_spread(sample, h.min_normal_spread)?;

    let origin = linalg::centroid(points);
    let mut a = DMatrix::zeros(points.len(), 4);
    let mut b = DVector::zeros(points.len());
    for (i, p) in points.iter().enumerate() {
        let d = p - origin;
        a[(i, 0)] = 2.0 * d.x;
        a[(i, 1)] = 2.0 * d.y;
        a[(i, 2)] = 2.0 * d.z;
        a[(i, 3)] = 1.0;
        b[i] = d.norm_squared();
    }
    let x = linalg::least_squares(a, &b).ok_or(FitRejection::Degenerate("sphere system"))?;
    let c = Vec3::new(x[0], x[1], x[2]);
    let r2 = x[3] + c.norm_squared();
    if r2 <= 0.0 {
        return Err(FitRejection::Degenerate("imaginary radius"));
    }
    let radius = r2.sqrt();
    check_radius(radius, sample.extent, h)?;
    Ok(PrimitiveCandidate::Sphere {
        center: origin + c,
        radius,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::test_support::whole_mesh_sample;
    use brepify_math::{Point3, Transform};
    use brepify_mesh::shapes::make_sphere;

    #[test]
    fn test_offset_sphere() {
        let mesh = make_sphere(2.5, 24, 12).transformed(&Transform::translation(4.0, -1.0, 7.0));
        let (_, sample) = whole_mesh_sample(&mesh);
        match fit_sphere(&sample, &FitHeuristics::default()).unwrap() {
            PrimitiveCandidate::Sphere { center, radius } => {
                assert!((radius - 2.5).abs() < 1e-9);
                assert!((center - Point3::new(4.0, -1.0, 7.0)).norm() < 1e-9);
            }
            other => panic!("expected sphere, got {other:?}"),
        }
    }

    #[test]
    fn test_huge_radius_rejected() {
        let (_, mut sample) = whole_mesh_sample(&make_sphere(2.5, 24, 12));
        sample.extent = 0.1;
        assert!(matches!(
            fit_sphere(&sample, &FitHeuristics::default()),
            Err(FitRejection::Implausible {
                parameter: "radius",
                ..
            })
        ));
    }
}
