//! Mesh cleanup: vertex welding and removal of degenerate and duplicate
//! triangles.

use std::collections::{HashMap, HashSet};

use brepify_math::Point3;
use tracing::debug;

use crate::Mesh;

/// Parameters for [`repair_mesh`].
#[derive(Debug, Clone, Copy)]
pub struct RepairParams {
    /// Vertices closer than this (per axis, after quantization) are welded.
    pub weld_tolerance: f64,
    /// Triangles with less area than this are dropped.
    pub min_area: f64,
}

impl Default for RepairParams {
    fn default() -> Self {
        Self {
            weld_tolerance: 1e-6,
            min_area: 1e-12,
        }
    }
}

/// What [`repair_mesh`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Vertices removed by welding.
    pub welded_vertices: usize,
    /// Triangles dropped for repeated corners or zero area.
    pub degenerate_triangles: usize,
    /// Triangles dropped because another triangle uses the same corners.
    pub duplicate_triangles: usize,
}

fn quantize(p: &Point3, tol: f64) -> (i64, i64, i64) {
    let q = |x: f64| (x / tol).round() as i64;
    (q(p.x), q(p.y), q(p.z))
}

/// Weld, then drop degenerate and duplicate triangles.
///
/// Vertex order follows first use; triangle order and per-triangle normals
/// are preserved for the survivors.
pub fn repair_mesh(mesh: &Mesh, params: &RepairParams) -> (Mesh, RepairReport) {
    let tol = params.weld_tolerance.max(f64::MIN_POSITIVE);
    let mut report = RepairReport::default();

    let mut by_key: HashMap<(i64, i64, i64), u32> = HashMap::new();
    let mut vertices: Vec<Point3> = Vec::new();
    let mut remap: Vec<u32> = Vec::with_capacity(mesh.vertices.len());
    for p in &mesh.vertices {
        let id = *by_key.entry(quantize(p, tol)).or_insert_with(|| {
            vertices.push(*p);
            (vertices.len() - 1) as u32
        });
        remap.push(id);
    }

    let mut seen: HashSet<[u32; 3]> = HashSet::new();
    let mut triangles = Vec::with_capacity(mesh.triangles.len());
    let mut normals = mesh.normals.as_ref().map(|_| Vec::new());
    for (t, tri) in mesh.triangles.iter().enumerate() {
        let [a, b, c] = tri.map(|i| remap[i as usize]);
        if a == b || b == c || a == c {
            report.degenerate_triangles += 1;
            continue;
        }
        let area = brepify_math::triangle_area(
            &vertices[a as usize],
            &vertices[b as usize],
            &vertices[c as usize],
        );
        if area < params.min_area {
            report.degenerate_triangles += 1;
            continue;
        }
        let mut key = [a, b, c];
        key.sort_unstable();
        if !seen.insert(key) {
            report.duplicate_triangles += 1;
            continue;
        }
        triangles.push([a, b, c]);
        if let (Some(out), Some(src)) = (normals.as_mut(), mesh.normals.as_ref()) {
            out.push(src[t]);
        }
    }

    report.welded_vertices = mesh.vertices.len() - vertices.len();
    debug!(
        welded = report.welded_vertices,
        degenerate = report.degenerate_triangles,
        duplicate = report.duplicate_triangles,
        "mesh repaired"
    );
    (
        Mesh {
            vertices,
            triangles,
            normals,
        },
        report,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::make_box;

    #[test]
    fn test_weld_unindexed_box() {
        let indexed = make_box(1.0, 1.0, 1.0);
        let mut soup = Mesh::new();
        for i in 0..indexed.triangle_count() {
            let base = soup.vertices.len() as u32;
            soup.vertices.extend(indexed.triangle_points(i));
            soup.triangles.push([base, base + 1, base + 2]);
        }
        let (welded, report) = repair_mesh(&soup, &RepairParams::default());
        assert_eq!(welded.vertex_count(), 8);
        assert_eq!(welded.triangle_count(), 12);
        assert_eq!(report.welded_vertices, 36 - 8);
        assert!((welded.signed_volume() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_drop_degenerate_and_duplicate() {
        let mut mesh = make_box(1.0, 1.0, 1.0);
        mesh.triangles.push([0, 0, 1]);
        mesh.triangles.push([2, 1, 0]);
        mesh.normals = Some(vec![brepify_math::Vec3::z(); mesh.triangle_count()]);
        let (fixed, report) = repair_mesh(&mesh, &RepairParams::default());
        assert_eq!(report.degenerate_triangles, 1);
        assert_eq!(report.duplicate_triangles, 1);
        assert_eq!(fixed.triangle_count(), 12);
        assert_eq!(fixed.normals.as_ref().map(Vec::len), Some(12));
    }
}
