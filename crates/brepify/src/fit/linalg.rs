//! Small least-squares helpers shared by the fitters.

use std::cmp::Ordering;

use brepify_math::{Point2, Point3, Vec3};
use nalgebra::{DMatrix, DVector, Matrix2, Matrix3, SymmetricEigen, Vector2};

pub(crate) fn centroid(points: &[Point3]) -> Point3 {
    let sum = points.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len().max(1) as f64)
}

/// Scatter matrix of `points` about `center`.
pub(crate) fn scatter(points: &[Point3], center: &Point3) -> Matrix3<f64> {
    points.iter().fold(Matrix3::zeros(), |acc, p| {
        let d = p - center;
        acc + d * d.transpose()
    })
}

/// Weighted second moment of `dirs`, optionally about their weighted mean.
pub(crate) fn direction_scatter(dirs: &[Vec3], weights: &[f64], centered: bool) -> Matrix3<f64> {
    let total: f64 = weights.iter().sum::<f64>().max(f64::MIN_POSITIVE);
    let mean = if centered {
        dirs.iter()
            .zip(weights)
            .fold(Vec3::zeros(), |acc, (d, w)| acc + d * *w)
            / total
    } else {
        Vec3::zeros()
    };
    dirs.iter().zip(weights).fold(Matrix3::zeros(), |acc, (d, w)| {
        let c = d - mean;
        acc + c * c.transpose() * *w
    })
}

/// Eigenvalues ascending, with matching unit eigenvectors.
pub(crate) fn sorted_eigen(m: Matrix3<f64>) -> ([f64; 3], [Vec3; 3]) {
    let eigen = SymmetricEigen::new(m);
    let mut idx = [0usize, 1, 2];
    idx.sort_by(|&a, &b| {
        eigen.eigenvalues[a]
            .partial_cmp(&eigen.eigenvalues[b])
            .unwrap_or(Ordering::Equal)
    });
    let values = idx.map(|i| eigen.eigenvalues[i]);
    let vectors = idx.map(|i| {
        let v: Vec3 = eigen.eigenvectors.column(i).into_owned();
        v.normalize()
    });
    (values, vectors)
}

/// `1 - |weighted mean of unit normals|`: zero when all normals agree.
pub(crate) fn normal_spread(normals: &[Vec3], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let sum = normals
        .iter()
        .zip(weights)
        .fold(Vec3::zeros(), |acc, (n, w)| acc + n * *w);
    1.0 - sum.norm() / total
}

/// Solve the over-determined system `a x = b` in the least-squares sense.
pub(crate) fn least_squares(a: DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.svd(true, true);
    let max = svd.singular_values.max();
    if max <= 0.0 {
        return None;
    }
    let min = svd.singular_values.min();
    if min / max < 1e-12 {
        return None;
    }
    svd.solve(b, 1e-14).ok()
}

/// Algebraic (Kåsa) circle fit: centre and radius.
pub(crate) fn fit_circle(points: &[Point2]) -> Option<(Point2, f64)> {
    if points.len() < 3 {
        return None;
    }
    let mut a = DMatrix::zeros(points.len(), 3);
    let mut b = DVector::zeros(points.len());
    for (i, p) in points.iter().enumerate() {
        a[(i, 0)] = 2.0 * p.x;
        a[(i, 1)] = 2.0 * p.y;
        a[(i, 2)] = 1.0;
        b[i] = p.x * p.x + p.y * p.y;
    }
    let x = least_squares(a, &b)?;
    let r2 = x[2] + x[0] * x[0] + x[1] * x[1];
    (r2 > 0.0).then(|| (Point2::new(x[0], x[1]), r2.sqrt()))
}

/// Point closest, in the least-squares sense, to a set of 2D lines given
/// as `(point, unit direction)`.
pub(crate) fn intersect_lines_2d(lines: &[(Point2, Vector2<f64>)]) -> Option<Point2> {
    let mut m = Matrix2::zeros();
    let mut rhs = Vector2::zeros();
    for (p, d) in lines {
        let proj = Matrix2::identity() - d * d.transpose();
        m += proj;
        rhs += proj * p.coords;
    }
    if m.determinant().abs() < 1e-12 * m.norm_squared().max(1e-300) {
        return None;
    }
    m.try_inverse().map(|inv| Point2::from(inv * rhs))
}

/// Median of a slice (sorted copy).
pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        0.5 * (v[mid - 1] + v[mid])
    } else {
        v[mid]
    }
}

/// Root mean square.
pub(crate) fn rms(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v * v, n + 1));
    if n == 0 {
        0.0
    } else {
        (sum / n as f64).sqrt()
    }
}

/// Ordinary least-squares line `y = slope * x + intercept`.
pub(crate) fn linear_regression(samples: &[(f64, f64)]) -> Option<(f64, f64)> {
    let n = samples.len() as f64;
    if samples.len() < 2 {
        return None;
    }
    let (sx, sy) = samples
        .iter()
        .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
    let (mx, my) = (sx / n, sy / n);
    let (sxx, sxy) = samples.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
        (sxx + (x - mx) * (x - mx), sxy + (x - mx) * (y - my))
    });
    if sxx <= 1e-18 {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}
