#![warn(missing_docs)]

//! Triangle meshes for brepify.
//!
//! This crate holds the input side of mesh-to-B-Rep conversion:
//!
//! - [`Mesh`]: indexed triangles with optional per-triangle normals
//! - [`load_mesh`]: STL (ASCII or binary) and Wavefront OBJ loading
//! - [`repair_mesh`]: vertex welding and triangle cleanup
//! - [`shapes`]: synthetic closed meshes (box, cylinder, sphere, frustum, tube)
//!
//! # Example
//!
//! ```no_run
//! use brepify_mesh::load_mesh;
//!
//! let mesh = load_mesh("part.stl", true).unwrap();
//! println!("{} triangles", mesh.triangle_count());
//! ```

mod error;
mod mesh;
mod obj;
mod repair;
pub mod shapes;
mod stl;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::info;

pub use error::{MeshError, Result};
pub use mesh::Mesh;
pub use obj::read_obj;
pub use repair::{repair_mesh, RepairParams, RepairReport};
pub use stl::{read_stl, save_stl, write_stl_binary};

fn io_error(path: &Path, e: std::io::Error) -> MeshError {
    if e.kind() == std::io::ErrorKind::NotFound {
        MeshError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        MeshError::Io(e)
    }
}

/// Load a mesh from `path`, choosing the reader by extension.
///
/// With `repair` set the mesh is welded and cleaned with default
/// [`RepairParams`] before it is returned.
pub fn load_mesh(path: impl AsRef<Path>, repair: bool) -> Result<Mesh> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mesh = match extension.as_str() {
        "stl" => read_stl(&std::fs::read(path).map_err(|e| io_error(path, e))?)?,
        "obj" => {
            let file = File::open(path).map_err(|e| io_error(path, e))?;
            read_obj(BufReader::new(file))?
        }
        _ => return Err(MeshError::UnknownFormat { extension }),
    };
    mesh.validate()?;
    info!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "mesh loaded"
    );
    if !repair {
        return Ok(mesh);
    }
    let (repaired, _) = repair_mesh(&mesh, &RepairParams::default());
    Ok(repaired)
}
