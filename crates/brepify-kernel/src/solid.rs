//! Shell → solid conversion.

use std::collections::HashMap;

use brepify_topo::{EdgeId, FaceId, Orientation, Shape, ShellId, SolidId};
use tracing::debug;

use crate::{BRepKernel, KernelError, Result};

/// Number of two-use edges whose uses traverse the edge the same way.
pub(crate) fn orientation_conflicts(uses: &HashMap<EdgeId, Vec<(FaceId, Orientation)>>) -> usize {
    uses.values()
        .filter(|u| u.len() == 2 && u[0].1 == u[1].1)
        .count()
}

impl BRepKernel {
    /// Close a shell into a solid.
    ///
    /// The shell must be closed, manifold and consistently oriented. If it
    /// encloses negative volume every face is flipped so the result points
    /// outward.
    pub fn shell_to_solid(&mut self, shell: ShellId) -> Result<SolidId> {
        let faces = self.topo.shells[shell].faces.clone();
        if faces.is_empty() {
            return Err(KernelError::EmptyShape);
        }
        let uses = self.topo.edge_uses(&faces);
        let free_edges = uses.values().filter(|u| u.len() == 1).count();
        if free_edges > 0 {
            return Err(KernelError::OpenShell { free_edges });
        }
        let nonmanifold = uses.values().filter(|u| u.len() > 2).count();
        if nonmanifold > 0 {
            return Err(KernelError::NonManifold { edges: nonmanifold });
        }
        let conflicts = orientation_conflicts(&uses);
        if conflicts > 0 {
            return Err(KernelError::InconsistentOrientation { edges: conflicts });
        }

        let volume = self.volume(Shape::Shell(shell));
        let shell = if volume < 0.0 {
            debug!(volume, "shell encloses negative volume; flipping faces");
            let flipped: Vec<FaceId> = faces
                .iter()
                .map(|&f| {
                    let face = self.topo.flipped_face(f);
                    self.topo.add_face(face)
                })
                .collect();
            self.topo.add_shell(flipped, true)
        } else {
            self.topo.shells[shell].closed = true;
            shell
        };
        Ok(self.topo.add_solid(shell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::triangle_box;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_becomes_solid() {
        let mut kernel = BRepKernel::new();
        let faces = triangle_box(&mut kernel, [2.0, 2.0, 2.0]);
        let sew = kernel.sew(&faces, 1e-6);
        let solid = kernel.shell_to_solid(sew.shell).unwrap();
        assert_relative_eq!(kernel.volume(Shape::Solid(solid)), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inside_out_shell_is_flipped() {
        let mut kernel = BRepKernel::new();
        let faces = triangle_box(&mut kernel, [1.0, 1.0, 1.0]);
        let inverted: Vec<FaceId> = faces
            .iter()
            .map(|&f| {
                let face = kernel.topo.flipped_face(f);
                kernel.topo.add_face(face)
            })
            .collect();
        let sew = kernel.sew(&inverted, 1e-6);
        assert!(kernel.volume(Shape::Shell(sew.shell)) < 0.0);
        let solid = kernel.shell_to_solid(sew.shell).unwrap();
        assert_relative_eq!(kernel.volume(Shape::Solid(solid)), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_open_shell_rejected() {
        let mut kernel = BRepKernel::new();
        let faces = triangle_box(&mut kernel, [1.0, 1.0, 1.0]);
        let sew = kernel.sew(&faces[..10], 1e-6);
        assert!(matches!(
            kernel.shell_to_solid(sew.shell),
            Err(KernelError::OpenShell { free_edges: 4 })
        ));
    }

    #[test]
    fn test_inconsistent_orientation_rejected() {
        let mut kernel = BRepKernel::new();
        let mut faces = triangle_box(&mut kernel, [1.0, 1.0, 1.0]);
        let face = kernel.topo.flipped_face(faces[0]);
        faces[0] = kernel.topo.add_face(face);
        let sew = kernel.sew(&faces, 1e-6);
        assert!(matches!(
            kernel.shell_to_solid(sew.shell),
            Err(KernelError::InconsistentOrientation { edges: 3 })
        ));
    }
}
