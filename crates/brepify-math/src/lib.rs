#![warn(missing_docs)]

//! Math types for the brepify converter.
//!
//! Thin wrappers around nalgebra providing the point, vector and direction
//! aliases shared by every crate in the workspace, plus the handful of
//! geometric helpers (frames, triangle measures, bounding boxes, rigid
//! transforms) that the segmentation, fitting and kernel code lean on.

use nalgebra::{Matrix4, Unit, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// Tolerance pair used for geometric comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Linear distance tolerance in model units (mm for STL input).
    pub linear: f64,
    /// Angular tolerance in radians.
    pub angular: f64,
}

impl Tolerance {
    /// Default modelling tolerances (1e-6 linear, 1e-9 rad angular).
    pub const DEFAULT: Self = Self {
        linear: 1e-6,
        angular: 1e-9,
    };

    /// Build a tolerance from a linear value and an angle in degrees.
    pub fn from_degrees(linear: f64, angular_deg: f64) -> Self {
        Self {
            linear,
            angular: angular_deg.to_radians(),
        }
    }

    /// Scale both components by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            linear: self.linear * factor,
            angular: self.angular * factor,
        }
    }

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() <= self.linear
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() <= self.linear
    }

    /// Check if two directions are parallel (same sense) within tolerance.
    pub fn directions_equal(&self, a: &Vec3, b: &Vec3) -> bool {
        angle_between(a, b) <= self.angular
    }

    /// Check if two directions are parallel or anti-parallel within tolerance.
    pub fn directions_collinear(&self, a: &Vec3, b: &Vec3) -> bool {
        let angle = angle_between(a, b);
        angle <= self.angular || (std::f64::consts::PI - angle) <= self.angular
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Angle in radians between two (not necessarily unit) vectors.
///
/// Returns `PI / 2` when either vector has zero length, so a degenerate
/// normal never counts as aligned with anything.
pub fn angle_between(a: &Vec3, b: &Vec3) -> f64 {
    let na = a.norm();
    let nb = b.norm();
    if na < 1e-15 || nb < 1e-15 {
        return std::f64::consts::FRAC_PI_2;
    }
    (a.dot(b) / (na * nb)).clamp(-1.0, 1.0).acos()
}

/// Two unit vectors `(x, y)` such that `(x, y, n)` is a right-handed
/// orthonormal frame.
pub fn orthonormal_basis(n: &Vec3) -> (Vec3, Vec3) {
    let n = n.normalize();
    let arbitrary = if n.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    let x = (arbitrary - arbitrary.dot(&n) * n).normalize();
    let y = n.cross(&x);
    (x, y)
}

/// Non-normalized normal of triangle `(a, b, c)`; its length is twice the area.
pub fn triangle_cross(a: &Point3, b: &Point3, c: &Point3) -> Vec3 {
    (b - a).cross(&(c - a))
}

/// Unit normal of triangle `(a, b, c)`, or `None` for a degenerate triangle.
pub fn triangle_normal(a: &Point3, b: &Point3, c: &Point3) -> Option<Vec3> {
    let n = triangle_cross(a, b, c);
    let len = n.norm();
    if len < 1e-14 {
        None
    } else {
        Some(n / len)
    }
}

/// Area of triangle `(a, b, c)`.
pub fn triangle_area(a: &Point3, b: &Point3, c: &Point3) -> f64 {
    0.5 * triangle_cross(a, b, c).norm()
}

/// Signed volume of the tetrahedron spanned by the origin and triangle `(a, b, c)`.
pub fn signed_tet_volume(a: &Point3, b: &Point3, c: &Point3) -> f64 {
    a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
}

/// Newell normal of a closed polygon; its length is twice the enclosed area.
pub fn newell_normal(points: &[Point3]) -> Vec3 {
    let mut n = Vec3::zeros();
    for i in 0..points.len() {
        let p = &points[i];
        let q = &points[(i + 1) % points.len()];
        n.x += (p.y - q.y) * (p.z + q.z);
        n.y += (p.z - q.z) * (p.x + q.x);
        n.z += (p.x - q.x) * (p.y + q.y);
    }
    n
}

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Create an empty (inverted) box suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Bounding box of a point set.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.include_point(p);
        }
        aabb
    }

    /// Expand this box to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// True if no point has been included.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Length of the box diagonal, `0.0` for an empty box.
    pub fn diagonal(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            (self.max - self.min).norm()
        }
    }

    /// Center of the box.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }
}

/// A 4x4 affine transformation matrix.
///
/// Used to place synthetic test shapes off-axis so that fitting is not
/// accidentally helped by axis alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Rotation about an arbitrary axis through the origin by `angle` radians.
    ///
    /// Uses Rodrigues' rotation formula.
    pub fn rotation_about_axis(axis: &Dir3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.as_ref().x, axis.as_ref().y, axis.as_ref().z);
        let mut m = Matrix4::identity();
        m[(0, 0)] = t * x * x + c;
        m[(0, 1)] = t * x * y - s * z;
        m[(0, 2)] = t * x * z + s * y;
        m[(1, 0)] = t * x * y + s * z;
        m[(1, 1)] = t * y * y + c;
        m[(1, 2)] = t * y * z - s * x;
        m[(2, 0)] = t * x * z - s * y;
        m[(2, 1)] = t * y * z + s * x;
        m[(2, 2)] = t * z * z + c;
        Self { matrix: m }
    }

    /// Compose: `self` then `other` (self * other), i.e. `other` is applied first.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
