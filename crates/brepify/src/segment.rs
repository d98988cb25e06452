//! Region growing over triangle normals.
//!
//! Seeds are taken flattest-first. Each region grows in two breadth-first
//! phases: a strict coplanar phase, then a growth phase that follows gradual
//! curvature unless the coplanar phase already found a sizeable flat patch
//! (the region is then *flat-locked* and may not drift from its average
//! normal).

use std::cmp::Ordering;
use std::collections::VecDeque;

use brepify_math::{angle_between, Point3, Vec3};
use tracing::{debug, info};

use crate::adjacency::WeldedMesh;
use crate::config::ConversionConfig;

/// A connected set of triangles with similar normals.
#[derive(Debug, Clone)]
pub struct Region {
    /// Position in the segmentation output.
    pub id: usize,
    /// Triangle indices into the welded mesh, in admission order.
    pub triangles: Vec<usize>,
    /// Area-weighted average normal; zero when normals cancel out.
    pub normal: Vec3,
    /// Area-weighted centroid.
    pub centroid: Point3,
    /// Total area.
    pub area: f64,
    /// True when the coplanar phase reached `flat_lock_faces` triangles.
    pub flat_locked: bool,
}

impl Region {
    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// True if the region has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Distinct canonical vertex indices, in first-use order.
    pub fn vertex_indices(&self, mesh: &WeldedMesh) -> Vec<u32> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for &t in &self.triangles {
            for i in mesh.triangles[t] {
                if seen.insert(i) {
                    out.push(i);
                }
            }
        }
        out
    }
}

/// Output of [`segment`].
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    /// Regions in creation order.
    pub regions: Vec<Region>,
    /// Region index of every welded triangle.
    pub region_of: Vec<usize>,
    /// Regions below `min_region_faces`.
    pub small_regions: usize,
}

/// Mean dot product between a triangle's normal and its neighbours'.
fn flatness(mesh: &WeldedMesh, t: usize) -> f64 {
    let neighbors = mesh.neighbors(t);
    if neighbors.is_empty() {
        return -1.0;
    }
    let sum: f64 = neighbors
        .iter()
        .map(|&n| mesh.normals[t].dot(&mesh.normals[n]))
        .sum();
    sum / neighbors.len() as f64
}

struct Grower<'a> {
    mesh: &'a WeldedMesh,
    region_of: &'a mut [Option<usize>],
    id: usize,
    members: Vec<usize>,
    weighted_normal: Vec3,
}

impl Grower<'_> {
    fn admit(&mut self, t: usize) {
        self.region_of[t] = Some(self.id);
        self.members.push(t);
        self.weighted_normal += self.mesh.normals[t] * self.mesh.areas[t];
    }

    fn average(&self) -> Vec3 {
        self.weighted_normal
    }

    /// Breadth-first pass admitting neighbours for which `accept(from, to)` holds.
    fn grow(&mut self, start: &[usize], accept: impl Fn(&Self, usize, usize) -> bool) {
        let mesh = self.mesh;
        let mut queue: VecDeque<usize> = start.iter().copied().collect();
        while let Some(t) = queue.pop_front() {
            for &n in mesh.neighbors(t) {
                if self.region_of[n].is_some() || !accept(self, t, n) {
                    continue;
                }
                self.admit(n);
                queue.push_back(n);
            }
        }
    }
}

/// Partition every welded triangle into regions.
pub fn segment(mesh: &WeldedMesh, config: &ConversionConfig) -> Segmentation {
    let coplanar = config.coplanar_angle.to_radians();
    let threshold = config.angle_threshold.to_radians();

    let scores: Vec<f64> = (0..mesh.len()).map(|t| flatness(mesh, t)).collect();
    let mut order: Vec<usize> = (0..mesh.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut region_of: Vec<Option<usize>> = vec![None; mesh.len()];
    let mut regions = Vec::new();
    for seed in order {
        if region_of[seed].is_some() {
            continue;
        }
        let mut grower = Grower {
            mesh,
            region_of: &mut region_of,
            id: regions.len(),
            members: Vec::new(),
            weighted_normal: Vec3::zeros(),
        };
        grower.admit(seed);

        grower.grow(&[seed], |g, from, to| {
            let n = &mesh.normals[to];
            angle_between(n, &mesh.normals[from]) <= coplanar
                && angle_between(n, &g.average()) <= coplanar
        });
        let flat_locked = grower.members.len() >= config.flat_lock_faces;

        let start = grower.members.clone();
        grower.grow(&start, |g, from, to| {
            let n = &mesh.normals[to];
            angle_between(n, &mesh.normals[from]) < threshold
                && (!flat_locked || angle_between(n, &g.average()) < threshold)
        });

        let members = grower.members;
        let area: f64 = members.iter().map(|&t| mesh.areas[t]).sum();
        let weighted = grower.weighted_normal;
        let normal = if weighted.norm() > 1e-12 * area.max(1e-300) {
            weighted.normalize()
        } else {
            Vec3::zeros()
        };
        let centroid = if area > 0.0 {
            let sum = members
                .iter()
                .fold(Vec3::zeros(), |acc, &t| acc + mesh.centroid(t).coords * mesh.areas[t]);
            Point3::from(sum / area)
        } else {
            Point3::origin()
        };
        regions.push(Region {
            id: regions.len(),
            triangles: members,
            normal,
            centroid,
            area,
            flat_locked,
        });
    }

    let small_regions = regions
        .iter()
        .filter(|r| r.len() < config.min_region_faces)
        .count();
    let region_of: Vec<usize> = region_of.into_iter().map(|r| r.unwrap_or(0)).collect();
    for r in &regions {
        debug!(
            region = r.id,
            triangles = r.len(),
            flat_locked = r.flat_locked,
            "region grown"
        );
    }
    info!(
        regions = regions.len(),
        small = small_regions,
        "segmentation complete"
    );
    Segmentation {
        regions,
        region_of,
        small_regions,
    }
}
