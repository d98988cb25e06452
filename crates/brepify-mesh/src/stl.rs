//! STL reading and writing.
//!
//! Both encodings are read. A buffer is treated as ASCII when it starts
//! with `solid` and its 80-byte header holds no NUL byte; everything else is
//! parsed as binary:
//!
//! ```text
//! UINT8[80]    header
//! UINT32       triangle count
//! foreach triangle
//!     REAL32[3] normal
//!     REAL32[3] vertex 1..3
//!     UINT16    attribute byte count
//! end
//! ```
//!
//! STL stores unindexed triangles, so every corner becomes its own vertex.
//! Weld with [`repair_mesh`](crate::repair_mesh) to share them.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use brepify_math::{Point3, Vec3};

use crate::error::{MeshError, Result};
use crate::Mesh;

const HEADER_SIZE: usize = 80;
const TRIANGLE_SIZE: usize = 50;

/// Parse an STL buffer, detecting the encoding.
pub fn read_stl(bytes: &[u8]) -> Result<Mesh> {
    if bytes.len() < 6 {
        return Err(MeshError::invalid_content("file too small to be valid STL"));
    }
    let head = &bytes[..bytes.len().min(HEADER_SIZE)];
    let looks_ascii = String::from_utf8_lossy(head).trim_start().starts_with("solid");
    if looks_ascii && !head.contains(&0) {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| MeshError::invalid_content(format!("ASCII STL is not UTF-8: {e}")))?;
        read_stl_ascii(text)
    } else {
        read_stl_binary(bytes)
    }
}

fn read_stl_binary(bytes: &[u8]) -> Result<Mesh> {
    if bytes.len() < HEADER_SIZE + 4 {
        return Err(MeshError::invalid_content(format!(
            "binary STL needs {} header bytes, got {}",
            HEADER_SIZE + 4,
            bytes.len()
        )));
    }
    let count = u32::from_le_bytes([
        bytes[HEADER_SIZE],
        bytes[HEADER_SIZE + 1],
        bytes[HEADER_SIZE + 2],
        bytes[HEADER_SIZE + 3],
    ]);
    let body = &bytes[HEADER_SIZE + 4..];
    let present = (body.len() / TRIANGLE_SIZE) as u32;
    if present < count {
        return Err(MeshError::Truncated {
            expected: count,
            got: present,
        });
    }

    let n = count as usize;
    let mut mesh = Mesh {
        vertices: Vec::with_capacity(n * 3),
        triangles: Vec::with_capacity(n),
        normals: Some(Vec::with_capacity(n)),
    };
    for chunk in body.chunks_exact(TRIANGLE_SIZE).take(n) {
        let normal = read_vec(&chunk[0..12]);
        let base = mesh.vertices.len() as u32;
        for k in 0..3 {
            let v = read_vec(&chunk[12 + 12 * k..24 + 12 * k]);
            mesh.vertices.push(Point3::from(v));
        }
        mesh.triangles.push([base, base + 1, base + 2]);
        if let Some(normals) = mesh.normals.as_mut() {
            normals.push(normal);
        }
    }
    Ok(mesh)
}

fn read_vec(buf: &[u8]) -> Vec3 {
    let f = |i: usize| f64::from(f32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]));
    Vec3::new(f(0), f(4), f(8))
}

fn parse_triple(parts: &[&str], line: usize) -> Result<Vec3> {
    if parts.len() < 3 {
        return Err(MeshError::invalid_content(format!(
            "line {line}: expected three coordinates"
        )));
    }
    Ok(Vec3::new(
        parts[0].parse()?,
        parts[1].parse()?,
        parts[2].parse()?,
    ))
}

fn read_stl_ascii(text: &str) -> Result<Mesh> {
    let mut mesh = Mesh {
        normals: Some(Vec::new()),
        ..Mesh::default()
    };
    let mut normal = Vec3::zeros();
    let mut corners: Vec<Point3> = Vec::with_capacity(3);

    for (i, line) in text.lines().enumerate() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.first().copied() {
            Some("facet") => {
                normal = if parts.get(1) == Some(&"normal") {
                    parse_triple(&parts[2..], i + 1)?
                } else {
                    Vec3::zeros()
                };
                corners.clear();
            }
            Some("vertex") => {
                corners.push(Point3::from(parse_triple(&parts[1..], i + 1)?));
            }
            Some("endfacet") => {
                if corners.len() != 3 {
                    return Err(MeshError::invalid_content(format!(
                        "line {}: facet has {} vertices",
                        i + 1,
                        corners.len()
                    )));
                }
                let base = mesh.vertices.len() as u32;
                mesh.vertices.append(&mut corners);
                mesh.triangles.push([base, base + 1, base + 2]);
                if let Some(normals) = mesh.normals.as_mut() {
                    normals.push(normal);
                }
            }
            _ => {}
        }
    }
    Ok(mesh)
}

/// Write `mesh` as binary STL. Normals are recomputed from the winding.
pub fn write_stl_binary<W: Write>(mesh: &Mesh, mut out: W) -> Result<()> {
    let mut header = [0u8; HEADER_SIZE];
    let tag = b"brepify binary STL";
    header[..tag.len()].copy_from_slice(tag);
    out.write_all(&header)?;
    out.write_all(&(mesh.triangle_count() as u32).to_le_bytes())?;
    for i in 0..mesh.triangle_count() {
        let n = mesh.triangle_normal(i).unwrap_or_else(Vec3::zeros);
        let [a, b, c] = mesh.triangle_points(i);
        for v in [n, a.coords, b.coords, c.coords] {
            for x in v.iter() {
                out.write_all(&(*x as f32).to_le_bytes())?;
            }
        }
        out.write_all(&0u16.to_le_bytes())?;
    }
    Ok(())
}

/// Save `mesh` to `path` as binary STL.
pub fn save_stl(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    write_stl_binary(mesh, &mut out)?;
    out.flush()?;
    Ok(())
}
