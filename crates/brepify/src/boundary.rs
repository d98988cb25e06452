//! Region boundaries.
//!
//! An edge used by exactly one triangle of a region lies on the region's
//! boundary. Kept in the direction its triangle traverses it, the boundary
//! edges chain into closed loops that inherit the triangles' winding, which
//! is what lets the face builder orient the result. The loop that encloses
//! the others is moved to the front.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::f64::consts::TAU;

use brepify_math::{orthonormal_basis, Point3, Vec3};

use crate::adjacency::WeldedMesh;
use crate::error::BoundaryError;
use crate::fit::PrimitiveCandidate;
use crate::segment::Region;

/// Closed loops of welded vertex indices, outer loop first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionBoundary {
    /// Every loop; `loops[0]` is the outer one.
    pub loops: Vec<Vec<u32>>,
}

impl RegionBoundary {
    /// The outer loop.
    pub fn outer(&self) -> &[u32] {
        &self.loops[0]
    }

    /// Holes and further rims.
    pub fn inner(&self) -> &[Vec<u32>] {
        &self.loops[1..]
    }

    /// Total number of boundary edges.
    pub fn edge_count(&self) -> usize {
        self.loops.iter().map(Vec::len).sum()
    }
}

/// Directed boundary edges of `triangles`, in first-seen order.
pub fn boundary_edges(
    mesh: &WeldedMesh,
    triangles: &[usize],
) -> Result<Vec<(u32, u32)>, BoundaryError> {
    let mut uses: HashMap<(u32, u32), Vec<(u32, u32)>> = HashMap::new();
    let mut order = Vec::new();
    for &t in triangles {
        let [a, b, c] = mesh.triangles[t];
        for (u, v) in [(a, b), (b, c), (c, a)] {
            let key = (u.min(v), u.max(v));
            let entry = uses.entry(key).or_default();
            if entry.is_empty() {
                order.push(key);
            }
            entry.push((u, v));
        }
    }
    let mut edges = Vec::new();
    for key in order {
        if mesh.edge_use_count(key.0, key.1) > 2 {
            return Err(BoundaryError::NonManifoldEdge);
        }
        if let [single] = uses[&key].as_slice() {
            edges.push(*single);
        }
    }
    Ok(edges)
}

/// Chain directed edges into closed loops. Each loop starts at its
/// smallest vertex index, and loops are ordered by that index.
pub fn chain_loops(edges: &[(u32, u32)]) -> Result<Vec<Vec<u32>>, BoundaryError> {
    if edges.is_empty() {
        return Err(BoundaryError::Closed);
    }
    let mut next: BTreeMap<u32, u32> = BTreeMap::new();
    let mut ends = HashSet::new();
    for &(a, b) in edges {
        if next.insert(a, b).is_some() || !ends.insert(b) {
            return Err(BoundaryError::Pinch);
        }
    }

    let mut loops = Vec::new();
    while let Some(&start) = next.keys().next() {
        let mut chain = Vec::new();
        let mut v = start;
        loop {
            chain.push(v);
            let Some(w) = next.remove(&v) else {
                return Err(BoundaryError::OpenChain);
            };
            if w == start {
                break;
            }
            v = w;
        }
        if chain.len() < 3 {
            return Err(BoundaryError::TooFewEdges(chain.len()));
        }
        loops.push(chain);
    }
    Ok(loops)
}

fn loop_points(mesh: &WeldedMesh, chain: &[u32]) -> Vec<Point3> {
    chain.iter().map(|&i| mesh.points[i as usize]).collect()
}

fn shoelace(points: &[(f64, f64)]) -> f64 {
    let n = points.len();
    0.5 * (0..n)
        .map(|i| {
            let (p, q) = (points[i], points[(i + 1) % n]);
            p.0 * q.1 - q.0 * p.1
        })
        .sum::<f64>()
}

fn perimeter(points: &[Point3]) -> f64 {
    let n = points.len();
    (0..n).map(|i| (points[(i + 1) % n] - points[i]).norm()).sum()
}

/// Loop coordinates around an axis: unwrapped angle times `scale`, and
/// axial position. Also returns the number of turns.
fn around_axis(
    points: &[Point3],
    origin: &Point3,
    axis: &Vec3,
    scale: f64,
) -> (Vec<(f64, f64)>, f64) {
    let (u, v) = orthonormal_basis(axis);
    let mut out = Vec::with_capacity(points.len());
    let mut angle = 0.0;
    let mut prev: Option<f64> = None;
    let mut turned = 0.0;
    for p in points {
        let d = p - origin;
        let a = d.dot(&v).atan2(d.dot(&u));
        if let Some(pa) = prev {
            let mut delta = a - pa;
            if delta > TAU / 2.0 {
                delta -= TAU;
            } else if delta < -TAU / 2.0 {
                delta += TAU;
            }
            angle += delta;
            turned += delta;
        } else {
            angle = a;
        }
        prev = Some(a);
        out.push((angle * scale, d.dot(axis)));
    }
    // Close the loop.
    if let (Some(first), Some(last)) = (points.first(), prev) {
        let d = first - origin;
        let mut delta = d.dot(&v).atan2(d.dot(&u)) - last;
        if delta > TAU / 2.0 {
            delta -= TAU;
        } else if delta < -TAU / 2.0 {
            delta += TAU;
        }
        turned += delta;
    }
    (out, turned / TAU)
}

fn index_of_max(values: impl Iterator<Item = f64>) -> usize {
    values
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, v)| {
            if v > bv {
                (i, v)
            } else {
                (bi, bv)
            }
        })
        .0
}

/// On a surface of revolution, loops that wind around the axis are rims and
/// the lowest one is outer. Without rims the largest loop in the unrolled
/// parameter plane is outer.
fn rim_outer(points: &[Vec<Point3>], origin: &Point3, axis: &Vec3, scale: f64) -> usize {
    let measured: Vec<(Vec<(f64, f64)>, f64)> = points
        .iter()
        .map(|pts| around_axis(pts, origin, axis, scale))
        .collect();
    let rims: Vec<usize> = (0..measured.len())
        .filter(|&i| measured[i].1.abs() >= 0.5)
        .collect();
    if rims.is_empty() {
        return index_of_max(measured.iter().map(|(flat, _)| shoelace(flat).abs()));
    }
    let mean_axial = |i: usize| {
        let flat = &measured[i].0;
        flat.iter().map(|(_, t)| t).sum::<f64>() / flat.len() as f64
    };
    let lowest = index_of_max(rims.iter().map(|&i| -mean_axial(i)));
    rims[lowest]
}

/// Index of the loop that bounds the face from outside.
fn outer_index(
    mesh: &WeldedMesh,
    loops: &[Vec<u32>],
    candidate: &PrimitiveCandidate,
) -> Result<usize, BoundaryError> {
    let points: Vec<Vec<Point3>> = loops.iter().map(|l| loop_points(mesh, l)).collect();
    match *candidate {
        PrimitiveCandidate::Plane { origin, normal } => {
            let (u, v) = orthonormal_basis(&normal);
            let areas: Vec<f64> = points
                .iter()
                .map(|pts| {
                    let flat: Vec<(f64, f64)> = pts
                        .iter()
                        .map(|p| ((p - origin).dot(&u), (p - origin).dot(&v)))
                        .collect();
                    shoelace(&flat)
                })
                .collect();
            // Counter-clockwise about the normal encloses; clockwise loops are holes.
            if areas.iter().filter(|&&a| a > 0.0).count() != 1 {
                return Err(BoundaryError::NoOuterLoop);
            }
            Ok(index_of_max(areas.into_iter()))
        }
        PrimitiveCandidate::Cylinder {
            center,
            axis,
            radius,
            ..
        } => Ok(rim_outer(&points, &center, &axis, radius)),
        PrimitiveCandidate::Cone { apex, axis, .. } => Ok(rim_outer(&points, &apex, &axis, 1.0)),
        PrimitiveCandidate::Sphere { .. } | PrimitiveCandidate::None => {
            Ok(index_of_max(points.iter().map(|pts| perimeter(pts))))
        }
    }
}

/// Boundary loops of `region`, outer loop first, classified against the
/// region's fitted primitive.
pub fn extract_boundary(
    mesh: &WeldedMesh,
    region: &Region,
    candidate: &PrimitiveCandidate,
) -> Result<RegionBoundary, BoundaryError> {
    let edges = boundary_edges(mesh, &region.triangles)?;
    let mut loops = chain_loops(&edges)?;
    let outer = outer_index(mesh, &loops, candidate)?;
    let first = loops.remove(outer);
    loops.insert(0, first);
    Ok(RegionBoundary { loops })
}

#[cfg(test)]
mod tests {
    use super::*;
    use brepify_mesh::shapes::{make_box, make_cylinder, make_sphere, make_tube};
    use brepify_mesh::Mesh;

    fn region_where(mesh: &WeldedMesh, keep: impl Fn(&Vec3, &Point3) -> bool) -> Region {
        let triangles: Vec<usize> = (0..mesh.len())
            .filter(|&t| keep(&mesh.normals[t], &mesh.centroid(t)))
            .collect();
        Region {
            id: 0,
            area: triangles.iter().map(|&t| mesh.areas[t]).sum(),
            normal: Vec3::zeros(),
            centroid: Point3::origin(),
            flat_locked: false,
            triangles,
        }
    }

    fn loop_z(mesh: &WeldedMesh, chain: &[u32]) -> f64 {
        mesh.points[chain[0] as usize].z
    }

    #[test]
    fn test_box_face_single_loop() {
        let mesh = WeldedMesh::new(&make_box(1.0, 2.0, 3.0), 1e-6);
        let region = region_where(&mesh, |n, _| n.z > 0.5);
        let plane = PrimitiveCandidate::Plane {
            origin: Point3::new(0.0, 0.0, 3.0),
            normal: Vec3::z(),
        };
        let boundary = extract_boundary(&mesh, &region, &plane).unwrap();
        assert_eq!(boundary.loops.len(), 1);
        assert_eq!(boundary.edge_count(), 4);
    }

    #[test]
    fn test_tube_cap_has_hole() {
        let mesh = WeldedMesh::new(&make_tube(2.0, 1.0, 1.0, 24), 1e-6);
        let region = region_where(&mesh, |n, c| n.z > 0.5 && c.z > 0.5);
        let plane = PrimitiveCandidate::Plane {
            origin: Point3::new(0.0, 0.0, 1.0),
            normal: Vec3::z(),
        };
        let boundary = extract_boundary(&mesh, &region, &plane).unwrap();
        assert_eq!(boundary.loops.len(), 2);
        let outer = mesh.points[boundary.outer()[0] as usize];
        assert!(((outer.x.powi(2) + outer.y.powi(2)).sqrt() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_flipped_plane_has_no_outer_loop() {
        let mesh = WeldedMesh::new(&make_box(1.0, 1.0, 1.0), 1e-6);
        let region = region_where(&mesh, |n, _| n.z > 0.5);
        let plane = PrimitiveCandidate::Plane {
            origin: Point3::new(0.0, 0.0, 1.0),
            normal: -Vec3::z(),
        };
        assert_eq!(
            extract_boundary(&mesh, &region, &plane),
            Err(BoundaryError::NoOuterLoop)
        );
    }

    #[test]
    fn test_cylinder_band_bottom_rim_is_outer() {
        let mesh = WeldedMesh::new(&make_cylinder(1.0, 2.0, 32, true), 1e-6);
        let region = region_where(&mesh, |n, _| n.z.abs() < 0.5);
        let cylinder = PrimitiveCandidate::Cylinder {
            center: Point3::origin(),
            axis: Vec3::z(),
            radius: 1.0,
            height: 2.0,
        };
        let boundary = extract_boundary(&mesh, &region, &cylinder).unwrap();
        assert_eq!(boundary.loops.len(), 2);
        assert!(loop_z(&mesh, boundary.outer()).abs() < 1e-9);
        assert!((loop_z(&mesh, &boundary.inner()[0]) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_closed_sphere() {
        let mesh = WeldedMesh::new(&make_sphere(1.0, 16, 8), 1e-6);
        let region = region_where(&mesh, |_, _| true);
        let sphere = PrimitiveCandidate::Sphere {
            center: Point3::origin(),
            radius: 1.0,
        };
        assert_eq!(
            extract_boundary(&mesh, &region, &sphere),
            Err(BoundaryError::Closed)
        );
    }

    #[test]
    fn test_bowtie_pinches() {
        let mesh = Mesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(-1.0, 0.0, 0.0),
                Point3::new(0.0, -1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 3, 4]],
        );
        let welded = WeldedMesh::new(&mesh, 1e-6);
        let edges = boundary_edges(&welded, &[0, 1]).unwrap();
        assert_eq!(chain_loops(&edges), Err(BoundaryError::Pinch));
    }

    #[test]
    fn test_fin_is_non_manifold() {
        let mesh = Mesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.5, 1.0, 0.0),
                Point3::new(0.5, -1.0, 0.0),
                Point3::new(0.5, 0.0, 1.0),
            ],
            vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]],
        );
        let welded = WeldedMesh::new(&mesh, 1e-6);
        assert_eq!(
            boundary_edges(&welded, &[0, 1]),
            Err(BoundaryError::NonManifoldEdge)
        );
    }

    #[test]
    fn test_chain_errors() {
        assert_eq!(chain_loops(&[]), Err(BoundaryError::Closed));
        assert_eq!(
            chain_loops(&[(0, 1), (1, 2)]),
            Err(BoundaryError::OpenChain)
        );
        assert_eq!(
            chain_loops(&[(0, 1), (1, 0)]),
            Err(BoundaryError::TooFewEdges(2))
        );
        assert_eq!(
            chain_loops(&[(3, 4), (4, 5), (5, 3), (0, 1), (1, 2), (2, 0)]).unwrap(),
            vec![vec![0, 1, 2], vec![3, 4, 5]]
        );
    }
}
