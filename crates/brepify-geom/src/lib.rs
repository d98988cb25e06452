#![warn(missing_docs)]

//! Analytic surface types for the brepify kernel.
//!
//! The converter only ever emits four surface kinds: planes, cylinders,
//! cones and spheres. Each implements the [`Surface`] trait, which besides
//! parametric evaluation exposes closest-point projection and distance so
//! that trimming boundaries taken from a mesh can be checked against the
//! fitted surface.

use std::any::Any;
use std::f64::consts::PI;

use brepify_math::{orthonormal_basis, Dir3, Point2, Point3, Tolerance, Transform, Vec3};

// =============================================================================
// Surface trait
// =============================================================================

/// The kind of a surface (for match-based dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SurfaceKind {
    /// Infinite plane.
    Plane,
    /// Cylindrical surface (infinite extent along axis).
    Cylinder,
    /// Conical surface (one nappe, opening along the axis).
    Cone,
    /// Spherical surface.
    Sphere,
}

impl SurfaceKind {
    /// All kinds, in fitting cost order.
    pub const ALL: [SurfaceKind; 4] = [
        SurfaceKind::Plane,
        SurfaceKind::Cylinder,
        SurfaceKind::Sphere,
        SurfaceKind::Cone,
    ];

    /// True for every kind except [`SurfaceKind::Plane`].
    pub fn is_curved(self) -> bool {
        !matches!(self, SurfaceKind::Plane)
    }

    /// Lowercase name used in reports and statistics.
    pub fn name(self) -> &'static str {
        match self {
            SurfaceKind::Plane => "plane",
            SurfaceKind::Cylinder => "cylinder",
            SurfaceKind::Cone => "cone",
            SurfaceKind::Sphere => "sphere",
        }
    }
}

impl std::fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A parametric surface in 3D space.
pub trait Surface: Send + Sync + std::fmt::Debug {
    /// Evaluate the surface at parameter `(u, v)` to get a 3D point.
    fn evaluate(&self, uv: Point2) -> Point3;

    /// Surface normal at parameter `(u, v)`.
    fn normal(&self, uv: Point2) -> Dir3;

    /// Parameters of the point on the surface closest to `p`.
    fn project(&self, p: &Point3) -> Point2;

    /// Unsigned distance from `p` to the surface.
    fn distance(&self, p: &Point3) -> f64;

    /// Surface normal at the point closest to `p`.
    fn normal_at(&self, p: &Point3) -> Dir3 {
        self.normal(self.project(p))
    }

    /// The kind of this surface.
    fn surface_type(&self) -> SurfaceKind;

    /// Clone this surface into a boxed trait object.
    fn clone_box(&self) -> Box<dyn Surface>;

    /// Downcast to a concrete type via `Any`.
    fn as_any(&self) -> &dyn Any;

    /// Apply a rigid transform to this surface, returning a new surface.
    fn transform(&self, t: &Transform) -> Box<dyn Surface>;
}

impl Clone for Box<dyn Surface> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

fn wrap_angle(a: f64) -> f64 {
    a.rem_euclid(2.0 * PI)
}

fn ref_dir_for(axis: &Dir3) -> Dir3 {
    let (x, _) = orthonormal_basis(axis.as_ref());
    Dir3::new_normalize(x)
}

// =============================================================================
// Plane
// =============================================================================

/// An infinite plane defined by an origin point and a coordinate frame.
///
/// Parameterization: `P(u, v) = origin + u * x_dir + v * y_dir`
#[derive(Debug, Clone)]
pub struct Plane {
    /// Origin point on the plane.
    pub origin: Point3,
    /// Unit vector along the u direction.
    pub x_dir: Dir3,
    /// Unit vector along the v direction.
    pub y_dir: Dir3,
    /// Unit normal (x_dir × y_dir).
    pub normal_dir: Dir3,
}

impl Plane {
    /// Create a plane from origin and two orthogonal direction vectors.
    pub fn new(origin: Point3, x_dir: Vec3, y_dir: Vec3) -> Self {
        Self {
            origin,
            x_dir: Dir3::new_normalize(x_dir),
            y_dir: Dir3::new_normalize(y_dir),
            normal_dir: Dir3::new_normalize(x_dir.cross(&y_dir)),
        }
    }

    /// Create a plane from origin and normal. X/Y directions are chosen arbitrarily.
    pub fn from_normal(origin: Point3, normal: Vec3) -> Self {
        let n = Dir3::new_normalize(normal);
        let (x, y) = orthonormal_basis(n.as_ref());
        Self {
            origin,
            x_dir: Dir3::new_normalize(x),
            y_dir: Dir3::new_normalize(y),
            normal_dir: n,
        }
    }

    /// XY plane at the origin.
    pub fn xy() -> Self {
        Self::new(Point3::origin(), Vec3::x(), Vec3::y())
    }

    /// Signed distance from a point to this plane.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(self.normal_dir.as_ref())
    }
}

impl Surface for Plane {
    fn evaluate(&self, uv: Point2) -> Point3 {
        self.origin + uv.x * self.x_dir.as_ref() + uv.y * self.y_dir.as_ref()
    }

    fn normal(&self, _uv: Point2) -> Dir3 {
        self.normal_dir
    }

    fn project(&self, p: &Point3) -> Point2 {
        let d = p - self.origin;
        Point2::new(d.dot(self.x_dir.as_ref()), d.dot(self.y_dir.as_ref()))
    }

    fn distance(&self, p: &Point3) -> f64 {
        self.signed_distance(p).abs()
    }

    fn normal_at(&self, _p: &Point3) -> Dir3 {
        self.normal_dir
    }

    fn surface_type(&self) -> SurfaceKind {
        SurfaceKind::Plane
    }

    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn transform(&self, t: &Transform) -> Box<dyn Surface> {
        Box::new(Plane::new(
            t.apply_point(&self.origin),
            t.apply_vec(self.x_dir.as_ref()),
            t.apply_vec(self.y_dir.as_ref()),
        ))
    }
}

// =============================================================================
// Cylinder
// =============================================================================

/// A cylindrical surface defined by an axis line and radius.
///
/// Parameterization: `P(u, v) = center + radius * (cos(u) * ref_dir + sin(u) * y_dir) + v * axis`
///
/// Where `u ∈ [0, 2π)` is the angular parameter and `v` is the height along the axis.
#[derive(Debug, Clone)]
pub struct CylinderSurface {
    /// Point on the axis (base of the fitted patch).
    pub center: Point3,
    /// Unit direction along the cylinder axis.
    pub axis: Dir3,
    /// Reference direction for u=0 (perpendicular to axis).
    pub ref_dir: Dir3,
    /// Radius of the cylinder.
    pub radius: f64,
}

impl CylinderSurface {
    /// Create a cylinder with axis along Z, centered at origin.
    pub fn new(radius: f64) -> Self {
        Self::with_axis(Point3::origin(), Vec3::z(), radius)
    }

    /// Create a cylinder with a custom center and axis.
    pub fn with_axis(center: Point3, axis: Vec3, radius: f64) -> Self {
        let axis = Dir3::new_normalize(axis);
        Self {
            center,
            ref_dir: ref_dir_for(&axis),
            axis,
            radius,
        }
    }

    fn y_dir(&self) -> Vec3 {
        self.axis.as_ref().cross(self.ref_dir.as_ref())
    }

    /// Axial coordinate of `p` measured from `center`.
    pub fn axial(&self, p: &Point3) -> f64 {
        (p - self.center).dot(self.axis.as_ref())
    }

    /// Distance from `p` to the axis line.
    pub fn radial_distance(&self, p: &Point3) -> f64 {
        let d = p - self.center;
        (d - d.dot(self.axis.as_ref()) * self.axis.as_ref()).norm()
    }
}

impl Surface for CylinderSurface {
    fn evaluate(&self, uv: Point2) -> Point3 {
        let (sin_u, cos_u) = uv.x.sin_cos();
        self.center
            + self.radius * (cos_u * self.ref_dir.as_ref() + sin_u * self.y_dir())
            + uv.y * self.axis.as_ref()
    }

    fn normal(&self, uv: Point2) -> Dir3 {
        let (sin_u, cos_u) = uv.x.sin_cos();
        Dir3::new_normalize(cos_u * self.ref_dir.as_ref() + sin_u * self.y_dir())
    }

    fn project(&self, p: &Point3) -> Point2 {
        let d = p - self.center;
        let v = d.dot(self.axis.as_ref());
        let u = d.dot(&self.y_dir()).atan2(d.dot(self.ref_dir.as_ref()));
        Point2::new(wrap_angle(u), v)
    }

    fn distance(&self, p: &Point3) -> f64 {
        (self.radial_distance(p) - self.radius).abs()
    }

    fn surface_type(&self) -> SurfaceKind {
        SurfaceKind::Cylinder
    }

    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn transform(&self, t: &Transform) -> Box<dyn Surface> {
        let new_ref = t.apply_vec(self.ref_dir.as_ref());
        Box::new(CylinderSurface {
            center: t.apply_point(&self.center),
            axis: Dir3::new_normalize(t.apply_vec(self.axis.as_ref())),
            radius: self.radius * new_ref.norm(),
            ref_dir: Dir3::new_normalize(new_ref),
        })
    }
}

// =============================================================================
// Cone
// =============================================================================

/// A conical surface defined by an apex, axis, and half-angle.
///
/// Parameterization: `P(u, v) = apex + v * (cos(half_angle) * axis + sin(half_angle) * (cos(u) * x + sin(u) * y))`
///
/// Where `u ∈ [0, 2π)` is the angular parameter and `v ≥ 0` is the distance from apex along the cone.
#[derive(Debug, Clone)]
pub struct ConeSurface {
    /// Apex (tip) of the cone.
    pub apex: Point3,
    /// Unit direction along the cone axis (from apex toward base).
    pub axis: Dir3,
    /// Reference direction for u=0 (perpendicular to axis).
    pub ref_dir: Dir3,
    /// Half-angle of the cone in radians.
    pub half_angle: f64,
}

impl ConeSurface {
    /// Create a cone from apex, axis (apex toward base) and half-angle.
    pub fn with_apex(apex: Point3, axis: Vec3, half_angle: f64) -> Self {
        let axis = Dir3::new_normalize(axis);
        Self {
            apex,
            ref_dir: ref_dir_for(&axis),
            axis,
            half_angle,
        }
    }

    fn y_dir(&self) -> Vec3 {
        self.axis.as_ref().cross(self.ref_dir.as_ref())
    }

    /// Axial and radial coordinates of `p` relative to the apex.
    pub fn meridian(&self, p: &Point3) -> (f64, f64) {
        let d = p - self.apex;
        let h = d.dot(self.axis.as_ref());
        let r = (d - h * self.axis.as_ref()).norm();
        (h, r)
    }
}

impl Surface for ConeSurface {
    fn evaluate(&self, uv: Point2) -> Point3 {
        let (sin_u, cos_u) = uv.x.sin_cos();
        let (sa, ca) = self.half_angle.sin_cos();
        self.apex
            + uv.y
                * (ca * self.axis.as_ref()
                    + sa * (cos_u * self.ref_dir.as_ref() + sin_u * self.y_dir()))
    }

    fn normal(&self, uv: Point2) -> Dir3 {
        let (sin_u, cos_u) = uv.x.sin_cos();
        let (sa, ca) = self.half_angle.sin_cos();
        let radial = cos_u * self.ref_dir.as_ref() + sin_u * self.y_dir();
        Dir3::new_normalize(ca * radial - sa * self.axis.as_ref())
    }

    fn project(&self, p: &Point3) -> Point2 {
        let d = p - self.apex;
        let u = d.dot(&self.y_dir()).atan2(d.dot(self.ref_dir.as_ref()));
        let (h, r) = self.meridian(p);
        let (sa, ca) = self.half_angle.sin_cos();
        Point2::new(wrap_angle(u), (h * ca + r * sa).max(0.0))
    }

    fn distance(&self, p: &Point3) -> f64 {
        let (h, r) = self.meridian(p);
        let (sa, ca) = self.half_angle.sin_cos();
        // Beyond the apex the closest point is the apex itself.
        if h * ca + r * sa < 0.0 {
            (h * h + r * r).sqrt()
        } else {
            (r * ca - h * sa).abs()
        }
    }

    fn surface_type(&self) -> SurfaceKind {
        SurfaceKind::Cone
    }

    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn transform(&self, t: &Transform) -> Box<dyn Surface> {
        Box::new(ConeSurface {
            apex: t.apply_point(&self.apex),
            axis: Dir3::new_normalize(t.apply_vec(self.axis.as_ref())),
            ref_dir: Dir3::new_normalize(t.apply_vec(self.ref_dir.as_ref())),
            half_angle: self.half_angle,
        })
    }
}

// =============================================================================
// Sphere
// =============================================================================

/// A spherical surface defined by center and radius.
///
/// Parameterization: `P(u, v) = center + radius * (cos(v) * (cos(u) * x + sin(u) * y) + sin(v) * z)`
///
/// Where `u ∈ [0, 2π)` is longitude and `v ∈ [-π/2, π/2]` is latitude.
#[derive(Debug, Clone)]
pub struct SphereSurface {
    /// Center of the sphere.
    pub center: Point3,
    /// Radius of the sphere.
    pub radius: f64,
    /// Reference direction for u=0 (perpendicular to axis).
    pub ref_dir: Dir3,
    /// Axis direction (north pole).
    pub axis: Dir3,
}

impl SphereSurface {
    /// Create a sphere with a custom center.
    pub fn with_center(center: Point3, radius: f64) -> Self {
        Self {
            center,
            radius,
            ref_dir: Dir3::new_normalize(Vec3::x()),
            axis: Dir3::new_normalize(Vec3::z()),
        }
    }

    fn y_dir(&self) -> Vec3 {
        self.axis.as_ref().cross(self.ref_dir.as_ref())
    }
}

impl Surface for SphereSurface {
    fn evaluate(&self, uv: Point2) -> Point3 {
        let (sin_u, cos_u) = uv.x.sin_cos();
        let (sin_v, cos_v) = uv.y.sin_cos();
        self.center
            + self.radius
                * (cos_v * (cos_u * self.ref_dir.as_ref() + sin_u * self.y_dir())
                    + sin_v * self.axis.as_ref())
    }

    fn normal(&self, uv: Point2) -> Dir3 {
        let (sin_u, cos_u) = uv.x.sin_cos();
        let (sin_v, cos_v) = uv.y.sin_cos();
        Dir3::new_normalize(
            cos_v * (cos_u * self.ref_dir.as_ref() + sin_u * self.y_dir())
                + sin_v * self.axis.as_ref(),
        )
    }

    fn project(&self, p: &Point3) -> Point2 {
        let d = p - self.center;
        let len = d.norm();
        if len < 1e-15 {
            return Point2::origin();
        }
        let u = d.dot(&self.y_dir()).atan2(d.dot(self.ref_dir.as_ref()));
        let v = (d.dot(self.axis.as_ref()) / len).clamp(-1.0, 1.0).asin();
        Point2::new(wrap_angle(u), v)
    }

    fn distance(&self, p: &Point3) -> f64 {
        ((p - self.center).norm() - self.radius).abs()
    }

    fn normal_at(&self, p: &Point3) -> Dir3 {
        let d = p - self.center;
        if d.norm() < 1e-15 {
            self.axis
        } else {
            Dir3::new_normalize(d)
        }
    }

    fn surface_type(&self) -> SurfaceKind {
        SurfaceKind::Sphere
    }

    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn transform(&self, t: &Transform) -> Box<dyn Surface> {
        let new_ref = t.apply_vec(self.ref_dir.as_ref());
        Box::new(SphereSurface {
            center: t.apply_point(&self.center),
            radius: self.radius * new_ref.norm(),
            ref_dir: Dir3::new_normalize(new_ref),
            axis: Dir3::new_normalize(t.apply_vec(self.axis.as_ref())),
        })
    }
}

// =============================================================================
// Surface parameters (introspection)
// =============================================================================

/// Defining parameters of an analytic surface, detached from any face.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceParams {
    /// Plane through `origin` with unit `normal`.
    Plane {
        /// A point on the plane.
        origin: Point3,
        /// Unit normal.
        normal: Dir3,
    },
    /// Cylinder around the line `center + t * axis`.
    Cylinder {
        /// A point on the axis.
        center: Point3,
        /// Unit axis direction.
        axis: Dir3,
        /// Radius.
        radius: f64,
    },
    /// Cone with tip at `apex` opening along `axis`.
    Cone {
        /// Apex.
        apex: Point3,
        /// Unit axis, apex toward base.
        axis: Dir3,
        /// Half-angle in radians.
        half_angle: f64,
    },
    /// Sphere.
    Sphere {
        /// Center.
        center: Point3,
        /// Radius.
        radius: f64,
    },
}

impl SurfaceParams {
    /// Extract parameters from a boxed surface of one of the four known kinds.
    pub fn from_surface(surface: &dyn Surface) -> Option<Self> {
        let any = surface.as_any();
        if let Some(p) = any.downcast_ref::<Plane>() {
            return Some(SurfaceParams::Plane {
                origin: p.origin,
                normal: p.normal_dir,
            });
        }
        if let Some(c) = any.downcast_ref::<CylinderSurface>() {
            return Some(SurfaceParams::Cylinder {
                center: c.center,
                axis: c.axis,
                radius: c.radius,
            });
        }
        if let Some(c) = any.downcast_ref::<ConeSurface>() {
            return Some(SurfaceParams::Cone {
                apex: c.apex,
                axis: c.axis,
                half_angle: c.half_angle,
            });
        }
        any.downcast_ref::<SphereSurface>()
            .map(|s| SurfaceParams::Sphere {
                center: s.center,
                radius: s.radius,
            })
    }

    /// The surface kind.
    pub fn kind(&self) -> SurfaceKind {
        match self {
            SurfaceParams::Plane { .. } => SurfaceKind::Plane,
            SurfaceParams::Cylinder { .. } => SurfaceKind::Cylinder,
            SurfaceParams::Cone { .. } => SurfaceKind::Cone,
            SurfaceParams::Sphere { .. } => SurfaceKind::Sphere,
        }
    }

    /// Build a concrete surface with these parameters.
    pub fn to_surface(&self) -> Box<dyn Surface> {
        match *self {
            SurfaceParams::Plane { origin, normal } => {
                Box::new(Plane::from_normal(origin, *normal.as_ref()))
            }
            SurfaceParams::Cylinder {
                center,
                axis,
                radius,
            } => Box::new(CylinderSurface::with_axis(center, *axis.as_ref(), radius)),
            SurfaceParams::Cone {
                apex,
                axis,
                half_angle,
            } => Box::new(ConeSurface::with_apex(apex, *axis.as_ref(), half_angle)),
            SurfaceParams::Sphere { center, radius } => {
                Box::new(SphereSurface::with_center(center, radius))
            }
        }
    }

    /// True if both parameter sets describe the same point set within `tol`.
    ///
    /// Orientation is ignored for planes and cylinders (an anti-parallel
    /// normal or axis is the same locus); a cone axis must agree in sense
    /// because the opposite sense is the other nappe.
    pub fn same_domain(&self, other: &SurfaceParams, tol: &Tolerance) -> bool {
        match (self, other) {
            (
                SurfaceParams::Plane {
                    origin: o1,
                    normal: n1,
                },
                SurfaceParams::Plane {
                    origin: o2,
                    normal: n2,
                },
            ) => {
                tol.directions_collinear(n1.as_ref(), n2.as_ref())
                    && (o2 - o1).dot(n1.as_ref()).abs() <= tol.linear
                    && (o1 - o2).dot(n2.as_ref()).abs() <= tol.linear
            }
            (
                SurfaceParams::Cylinder {
                    center: c1,
                    axis: a1,
                    radius: r1,
                },
                SurfaceParams::Cylinder {
                    center: c2,
                    axis: a2,
                    radius: r2,
                },
            ) => {
                let d = c2 - c1;
                let off_axis = (d - d.dot(a1.as_ref()) * a1.as_ref()).norm();
                tol.directions_collinear(a1.as_ref(), a2.as_ref())
                    && (r1 - r2).abs() <= tol.linear
                    && off_axis <= tol.linear
            }
            (
                SurfaceParams::Cone {
                    apex: p1,
                    axis: a1,
                    half_angle: h1,
                },
                SurfaceParams::Cone {
                    apex: p2,
                    axis: a2,
                    half_angle: h2,
                },
            ) => {
                tol.points_equal(p1, p2)
                    && tol.directions_equal(a1.as_ref(), a2.as_ref())
                    && (h1 - h2).abs() <= tol.angular
            }
            (
                SurfaceParams::Sphere {
                    center: c1,
                    radius: r1,
                },
                SurfaceParams::Sphere {
                    center: c2,
                    radius: r2,
                },
            ) => tol.points_equal(c1, c2) && (r1 - r2).abs() <= tol.linear,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_project_and_distance() {
        let p = Plane::xy();
        let pt = Point3::new(5.0, 7.0, -2.0);
        let uv = p.project(&pt);
        assert_relative_eq!(uv.x, 5.0);
        assert_relative_eq!(uv.y, 7.0);
        assert_relative_eq!(p.distance(&pt), 2.0);
        assert_relative_eq!(p.signed_distance(&pt), -2.0);
    }

    #[test]
    fn test_cylinder_project_roundtrip() {
        let c = CylinderSurface::with_axis(Point3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 1.0, 0.0), 4.0);
        let uv = Point2::new(1.3, 2.5);
        let pt = c.evaluate(uv);
        let back = c.project(&pt);
        assert_relative_eq!(back.x, uv.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, uv.y, epsilon = 1e-9);
        assert!(c.distance(&pt) < 1e-9);
        let outside = pt + 0.5 * c.normal(uv).as_ref();
        assert_relative_eq!(c.distance(&outside), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_cone_distance() {
        let cone = ConeSurface::with_apex(Point3::origin(), Vec3::z(), PI / 4.0);
        // (1, 0, 1) lies on a 45° cone.
        assert!(cone.distance(&Point3::new(1.0, 0.0, 1.0)) < 1e-12);
        // Behind the apex, distance is to the tip.
        assert_relative_eq!(cone.distance(&Point3::new(0.0, 0.0, -2.0)), 2.0, epsilon = 1e-12);
        let uv = Point2::new(0.7, 3.0);
        let pt = cone.evaluate(uv);
        let back = cone.project(&pt);
        assert_relative_eq!(back.y, 3.0, epsilon = 1e-9);
        let n = cone.normal_at(&pt);
        assert_relative_eq!(n.as_ref().dot(&cone.normal(uv)), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sphere_normal_at() {
        let s = SphereSurface::with_center(Point3::new(0.0, 0.0, 1.0), 2.0);
        let n = s.normal_at(&Point3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(n.as_ref().z, 1.0);
        assert_relative_eq!(s.distance(&Point3::new(0.0, 0.0, 5.0)), 2.0);
    }

    #[test]
    fn test_params_roundtrip_through_surface() {
        let params = SurfaceParams::Cylinder {
            center: Point3::new(0.0, 0.0, 0.0),
            axis: Dir3::new_normalize(Vec3::z()),
            radius: 2.0,
        };
        let surface = params.to_surface();
        assert_eq!(surface.surface_type(), SurfaceKind::Cylinder);
        let back = SurfaceParams::from_surface(surface.as_ref()).unwrap();
        assert!(back.same_domain(&params, &Tolerance::DEFAULT));
    }

    #[test]
    fn test_same_domain_plane() {
        let tol = Tolerance::from_degrees(1e-3, 0.5);
        let a = SurfaceParams::Plane {
            origin: Point3::new(0.0, 0.0, 1.0),
            normal: Dir3::new_normalize(Vec3::z()),
        };
        let b = SurfaceParams::Plane {
            origin: Point3::new(5.0, -3.0, 1.0),
            normal: Dir3::new_normalize(-Vec3::z()),
        };
        let c = SurfaceParams::Plane {
            origin: Point3::new(0.0, 0.0, 1.1),
            normal: Dir3::new_normalize(Vec3::z()),
        };
        assert!(a.same_domain(&b, &tol));
        assert!(!a.same_domain(&c, &tol));
    }

    #[test]
    fn test_same_domain_cylinder_shifted_along_axis() {
        let tol = Tolerance::from_degrees(1e-3, 0.5);
        let a = SurfaceParams::Cylinder {
            center: Point3::origin(),
            axis: Dir3::new_normalize(Vec3::z()),
            radius: 3.0,
        };
        let b = SurfaceParams::Cylinder {
            center: Point3::new(0.0, 0.0, 10.0),
            axis: Dir3::new_normalize(-Vec3::z()),
            radius: 3.0,
        };
        let c = SurfaceParams::Cylinder {
            center: Point3::new(0.5, 0.0, 0.0),
            axis: Dir3::new_normalize(Vec3::z()),
            radius: 3.0,
        };
        assert!(a.same_domain(&b, &tol));
        assert!(!a.same_domain(&c, &tol));
    }

    #[test]
    fn test_same_domain_cone_nappe() {
        let tol = Tolerance::from_degrees(1e-3, 0.5);
        let a = SurfaceParams::Cone {
            apex: Point3::origin(),
            axis: Dir3::new_normalize(Vec3::z()),
            half_angle: 0.3,
        };
        let b = SurfaceParams::Cone {
            apex: Point3::origin(),
            axis: Dir3::new_normalize(-Vec3::z()),
            half_angle: 0.3,
        };
        assert!(a.same_domain(&a.clone(), &tol));
        assert!(!a.same_domain(&b, &tol));
    }
}
