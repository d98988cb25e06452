//! Shape validation.

use brepify_topo::{FaceId, Shape};

use crate::solid::orientation_conflicts;
use crate::BRepKernel;

/// A single problem found by [`BRepKernel::check`].
#[derive(Debug, Clone, PartialEq)]
pub enum ValidityIssue {
    /// Shape has no faces.
    Empty,
    /// A face has a loop with fewer than three edges.
    ShortLoop {
        /// Offending face.
        face: FaceId,
    },
    /// A face loop is not closed.
    OpenLoop {
        /// Offending face.
        face: FaceId,
    },
    /// A trim vertex lies off the face's surface.
    TrimDeviation {
        /// Offending face.
        face: FaceId,
        /// Distance from the surface.
        deviation: f64,
    },
    /// Edges used by exactly one face (solids and closed shells only).
    FreeEdges(usize),
    /// Edges used by more than two faces.
    NonManifoldEdges(usize),
    /// Shared edges traversed the same way by both faces.
    InconsistentOrientation(usize),
    /// A solid with zero or negative enclosed volume.
    NonPositiveVolume(f64),
}

impl BRepKernel {
    /// Run every validity check on `shape` and collect the problems.
    pub fn check(&self, shape: Shape) -> Vec<ValidityIssue> {
        let faces = self.topo.shape_faces(shape);
        if faces.is_empty() {
            return vec![ValidityIssue::Empty];
        }
        let mut issues = Vec::new();
        let limit = self.settings.max_trim_deviation + self.settings.tolerance.linear;
        for &f in &faces {
            let face = &self.topo.faces[f];
            for wire in &face.loops {
                if wire.len() < 3 {
                    issues.push(ValidityIssue::ShortLoop { face: f });
                } else if self.topo.wire_gap(wire).is_some() {
                    issues.push(ValidityIssue::OpenLoop { face: f });
                }
            }
            let deviation = face
                .loops
                .iter()
                .flat_map(|w| self.topo.wire_points(w))
                .map(|p| face.surface.distance(&p))
                .fold(0.0, f64::max);
            if deviation > limit {
                issues.push(ValidityIssue::TrimDeviation { face: f, deviation });
            }
        }

        if matches!(shape, Shape::Face(_)) {
            return issues;
        }
        let uses = self.topo.edge_uses(&faces);
        let nonmanifold = uses.values().filter(|u| u.len() > 2).count();
        if nonmanifold > 0 {
            issues.push(ValidityIssue::NonManifoldEdges(nonmanifold));
        }
        let conflicts = orientation_conflicts(&uses);
        if conflicts > 0 {
            issues.push(ValidityIssue::InconsistentOrientation(conflicts));
        }
        let must_close = match shape {
            Shape::Solid(_) => true,
            Shape::Shell(s) => self.topo.shells[s].closed,
            Shape::Face(_) => false,
        };
        if must_close {
            let free = uses.values().filter(|u| u.len() == 1).count();
            if free > 0 {
                issues.push(ValidityIssue::FreeEdges(free));
            }
        }
        if let Shape::Solid(_) = shape {
            let volume = self.volume(shape);
            if volume <= 0.0 {
                issues.push(ValidityIssue::NonPositiveVolume(volume));
            }
        }
        issues
    }

    /// True if [`check`](Self::check) finds no problems.
    pub fn is_valid(&self, shape: Shape) -> bool {
        self.check(shape).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::triangle_box;

    #[test]
    fn test_box_solid_is_valid() {
        let mut kernel = BRepKernel::new();
        let faces = triangle_box(&mut kernel, [1.0, 1.0, 1.0]);
        let sew = kernel.sew(&faces, 1e-6);
        let solid = kernel.shell_to_solid(sew.shell).unwrap();
        assert!(kernel.is_valid(Shape::Solid(solid)));
    }

    #[test]
    fn test_open_shell_is_valid() {
        let mut kernel = BRepKernel::new();
        let faces = triangle_box(&mut kernel, [1.0, 1.0, 1.0]);
        let sew = kernel.sew(&faces[..6], 1e-6);
        assert!(!kernel.topology().shells[sew.shell].closed);
        assert!(kernel.is_valid(Shape::Shell(sew.shell)));
    }

    #[test]
    fn test_inconsistent_shell_reported() {
        let mut kernel = BRepKernel::new();
        let mut faces = triangle_box(&mut kernel, [1.0, 1.0, 1.0]);
        let face = kernel.topo.flipped_face(faces[3]);
        faces[3] = kernel.topo.add_face(face);
        let sew = kernel.sew(&faces, 1e-6);
        let issues = kernel.check(Shape::Shell(sew.shell));
        assert!(issues.contains(&ValidityIssue::InconsistentOrientation(3)));
    }
}
