//! Synthetic closed meshes for tests, benchmarks and demos.
//!
//! All shapes are indexed (corners shared between triangles) and wound
//! counter-clockwise seen from outside. Round shapes have their axis along
//! +Z with the base at `z = 0`.

use std::f64::consts::{PI, TAU};

use brepify_math::Point3;

use crate::Mesh;

/// Axis-aligned box with one corner at the origin. 12 triangles.
pub fn make_box(sx: f64, sy: f64, sz: f64) -> Mesh {
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(sx, 0.0, 0.0),
        Point3::new(sx, sy, 0.0),
        Point3::new(0.0, sy, 0.0),
        Point3::new(0.0, 0.0, sz),
        Point3::new(sx, 0.0, sz),
        Point3::new(sx, sy, sz),
        Point3::new(0.0, sy, sz),
    ];
    let triangles = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [1, 2, 6],
        [1, 6, 5],
        [2, 3, 7],
        [2, 7, 6],
        [3, 0, 4],
        [3, 4, 7],
    ];
    Mesh::from_parts(vertices, triangles)
}

fn ring(radius: f64, z: f64, segments: u32) -> impl Iterator<Item = Point3> {
    (0..segments).map(move |i| {
        let t = TAU * f64::from(i) / f64::from(segments);
        Point3::new(radius * t.cos(), radius * t.sin(), z)
    })
}

/// Faceted cylinder. With `caps == false` only the lateral band is built
/// and the mesh is open.
pub fn make_cylinder(radius: f64, height: f64, segments: u32, caps: bool) -> Mesh {
    make_cone(radius, radius, height, segments, caps)
}

/// Faceted cone frustum. `r_top == 0` closes the top at an apex.
pub fn make_frustum(r_bottom: f64, r_top: f64, height: f64, segments: u32) -> Mesh {
    make_cone(r_bottom, r_top, height, segments, true)
}

fn make_cone(r_bottom: f64, r_top: f64, height: f64, segments: u32, caps: bool) -> Mesh {
    let n = segments.max(3);
    let mut vertices: Vec<Point3> = ring(r_bottom, 0.0, n).collect();
    let apex = r_top <= 0.0;
    if apex {
        vertices.push(Point3::new(0.0, 0.0, height));
    } else {
        vertices.extend(ring(r_top, height, n));
    }
    let mut triangles = Vec::new();
    for i in 0..n {
        let j = (i + 1) % n;
        if apex {
            triangles.push([i, j, n]);
        } else {
            triangles.push([i, j, n + j]);
            triangles.push([i, n + j, n + i]);
        }
    }
    if caps {
        let bottom = vertices.len() as u32;
        vertices.push(Point3::origin());
        for i in 0..n {
            triangles.push([bottom, (i + 1) % n, i]);
        }
        if !apex {
            let top = vertices.len() as u32;
            vertices.push(Point3::new(0.0, 0.0, height));
            for i in 0..n {
                triangles.push([top, n + i, n + (i + 1) % n]);
            }
        }
    }
    Mesh::from_parts(vertices, triangles)
}

/// UV sphere centred at the origin with `rings` latitude bands.
pub fn make_sphere(radius: f64, segments: u32, rings: u32) -> Mesh {
    let n = segments.max(3);
    let rings = rings.max(2);
    let mut vertices = vec![Point3::new(0.0, 0.0, radius)];
    for k in 1..rings {
        let phi = PI * f64::from(k) / f64::from(rings);
        vertices.extend(ring(radius * phi.sin(), radius * phi.cos(), n));
    }
    let bottom = vertices.len() as u32;
    vertices.push(Point3::new(0.0, 0.0, -radius));

    let at = |k: u32, i: u32| 1 + (k - 1) * n + i % n;
    let mut triangles = Vec::new();
    for i in 0..n {
        triangles.push([0, at(1, i), at(1, i + 1)]);
    }
    for k in 1..rings - 1 {
        for i in 0..n {
            let (u0, u1) = (at(k, i), at(k, i + 1));
            let (l0, l1) = (at(k + 1, i), at(k + 1, i + 1));
            triangles.push([u0, l0, l1]);
            triangles.push([u0, l1, u1]);
        }
    }
    for i in 0..n {
        triangles.push([bottom, at(rings - 1, i + 1), at(rings - 1, i)]);
    }
    Mesh::from_parts(vertices, triangles)
}

/// Thick-walled tube: outer and inner cylinders joined by annular caps.
pub fn make_tube(r_outer: f64, r_inner: f64, height: f64, segments: u32) -> Mesh {
    let n = segments.max(3);
    let mut vertices: Vec<Point3> = ring(r_outer, 0.0, n).collect();
    vertices.extend(ring(r_inner, 0.0, n));
    vertices.extend(ring(r_outer, height, n));
    vertices.extend(ring(r_inner, height, n));
    let (ob, ib, ot, it) = (0, n, 2 * n, 3 * n);

    let mut triangles = Vec::new();
    for i in 0..n {
        let j = (i + 1) % n;
        // outer wall
        triangles.push([ob + i, ob + j, ot + j]);
        triangles.push([ob + i, ot + j, ot + i]);
        // inner wall faces the axis
        triangles.push([ib + i, it + j, ib + j]);
        triangles.push([ib + i, it + i, it + j]);
        // bottom annulus
        triangles.push([ob + i, ib + i, ib + j]);
        triangles.push([ob + i, ib + j, ob + j]);
        // top annulus
        triangles.push([ot + i, it + j, it + i]);
        triangles.push([ot + i, ot + j, it + j]);
    }
    Mesh::from_parts(vertices, triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn polygon_area(r: f64, n: u32) -> f64 {
        0.5 * f64::from(n) * r * r * (TAU / f64::from(n)).sin()
    }

    #[test]
    fn test_box() {
        let m = make_box(1.0, 2.0, 3.0);
        assert_eq!(m.triangle_count(), 12);
        assert_relative_eq!(m.signed_volume(), 6.0, epsilon = 1e-12);
        assert_relative_eq!(m.surface_area(), 22.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cylinder_volume_is_prism() {
        let m = make_cylinder(2.0, 5.0, 32, true);
        assert_eq!(m.triangle_count(), 4 * 32);
        assert_relative_eq!(m.signed_volume(), polygon_area(2.0, 32) * 5.0, epsilon = 1e-9);
        let open = make_cylinder(2.0, 5.0, 32, false);
        assert_eq!(open.triangle_count(), 64);
    }

    #[test]
    fn test_cone_with_apex() {
        let m = make_frustum(1.0, 0.0, 3.0, 24);
        assert_eq!(m.triangle_count(), 48);
        assert_relative_eq!(m.signed_volume(), polygon_area(1.0, 24) * 3.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sphere_positive_volume() {
        let m = make_sphere(1.0, 32, 16);
        assert_eq!(m.vertex_count(), 2 + 15 * 32);
        let v = m.signed_volume();
        assert!(v > 0.9 * 4.0 / 3.0 * PI && v < 4.0 / 3.0 * PI);
    }

    #[test]
    fn test_tube_volume() {
        let m = make_tube(2.0, 1.0, 4.0, 48);
        let expected = (polygon_area(2.0, 48) - polygon_area(1.0, 48)) * 4.0;
        assert_relative_eq!(m.signed_volume(), expected, epsilon = 1e-9);
    }
}
