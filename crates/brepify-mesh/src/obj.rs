//! Wavefront OBJ reading.
//!
//! Only `v` and `f` records are used. Face tokens may carry texture and
//! normal indices (`7/2/3`, `7//3`); only the vertex index is kept. Negative
//! indices count back from the latest vertex. Polygons are split into
//! triangle fans.

use std::io::BufRead;

use brepify_math::Point3;

use crate::error::{MeshError, Result};
use crate::Mesh;

/// Parse an OBJ stream.
pub fn read_obj<R: BufRead>(reader: R) -> Result<Mesh> {
    let mut mesh = Mesh::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => {
                let coords: Vec<f64> = parts
                    .take(3)
                    .map(str::parse)
                    .collect::<std::result::Result<_, _>>()?;
                if coords.len() != 3 {
                    return Err(MeshError::invalid_content(format!(
                        "line {}: vertex needs three coordinates",
                        i + 1
                    )));
                }
                mesh.vertices.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let count = mesh.vertices.len() as i64;
                let mut polygon = Vec::new();
                for token in parts {
                    polygon.push(resolve_index(token, count, i + 1)?);
                }
                if polygon.len() < 3 {
                    return Err(MeshError::invalid_content(format!(
                        "line {}: face needs at least three vertices",
                        i + 1
                    )));
                }
                for k in 1..polygon.len() - 1 {
                    mesh.triangles.push([polygon[0], polygon[k], polygon[k + 1]]);
                }
            }
            _ => {}
        }
    }
    mesh.validate()?;
    Ok(mesh)
}

fn resolve_index(token: &str, count: i64, line: usize) -> Result<u32> {
    let raw: i64 = token.split('/').next().unwrap_or(token).parse()?;
    let index = match raw {
        r if r > 0 => r - 1,
        r if r < 0 => count + r,
        _ => -1,
    };
    if index < 0 || index >= count {
        return Err(MeshError::invalid_content(format!(
            "line {line}: face index {raw} out of range"
        )));
    }
    Ok(index as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_fan() {
        let text = "# quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1/1/1 2/2/1 3/3/1 4/4/1\n";
        let mesh = read_obj(text.as_bytes()).unwrap();
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert!((mesh.surface_area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_indices() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3//1 -2//1 -1//1\n";
        let mesh = read_obj(text.as_bytes()).unwrap();
        assert_eq!(mesh.triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_index_out_of_range() {
        let text = "v 0 0 0\nv 1 0 0\nf 1 2 3\n";
        assert!(matches!(
            read_obj(text.as_bytes()),
            Err(MeshError::InvalidContent { .. })
        ));
    }

    #[test]
    fn test_bad_float() {
        let text = "v 0 zero 0\n";
        assert!(matches!(read_obj(text.as_bytes()), Err(MeshError::ParseFloat(_))));
    }
}
