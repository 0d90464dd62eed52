//! STL import and binary STL export.

use std::fs;
use std::path::Path;

use cobuild_kernel_math::{Point3, Vec3};

use crate::error::{MeshError, Result};
use crate::mesh::TriangleMesh;
use crate::triangle::Triangle;

const HEADER: &[u8; 80] =
    b"cobuild STL export                                                              ";

/// Read a binary or ASCII STL file.
pub fn read_stl(path: impl AsRef<Path>) -> Result<TriangleMesh> {
    let bytes = fs::read(path.as_ref())?;
    let mesh = parse_stl(&bytes)?;
    tracing::info!(
        path = %path.as_ref().display(),
        triangles = mesh.triangle_count(),
        "loaded STL"
    );
    Ok(mesh)
}

/// Parse STL bytes, detecting the ASCII variant by its size and keyword.
pub fn parse_stl(bytes: &[u8]) -> Result<TriangleMesh> {
    if is_binary(bytes) {
        parse_binary(bytes)
    } else {
        parse_ascii(bytes)
    }
}

/// Write `mesh` as binary STL.
pub fn write_stl(path: impl AsRef<Path>, mesh: &TriangleMesh) -> Result<()> {
    fs::write(path.as_ref(), stl_bytes(mesh))?;
    Ok(())
}

/// Binary STL encoding of `mesh`.
pub fn stl_bytes(mesh: &TriangleMesh) -> Vec<u8> {
    let mut data = Vec::with_capacity(84 + mesh.triangle_count() * 50);
    data.extend_from_slice(HEADER);
    data.extend_from_slice(&(mesh.triangle_count() as u32).to_le_bytes());

    for tri in mesh.triangles() {
        let n = tri.normal;
        for c in [n.x, n.y, n.z] {
            data.extend_from_slice(&(c as f32).to_le_bytes());
        }
        for v in &tri.vertices {
            for c in [v.x, v.y, v.z] {
                data.extend_from_slice(&(c as f32).to_le_bytes());
            }
        }
        // Attribute byte count
        data.extend_from_slice(&0u16.to_le_bytes());
    }
    data
}

fn is_binary(bytes: &[u8]) -> bool {
    if bytes.len() < 84 {
        return false;
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    let sized = count
        .checked_mul(50)
        .and_then(|b| b.checked_add(84))
        .is_some_and(|expected| expected == bytes.len());
    sized || !bytes.trim_ascii_start().starts_with(b"solid")
}

fn parse_binary(bytes: &[u8]) -> Result<TriangleMesh> {
    if bytes.len() < 84 {
        return Err(MeshError::MalformedStl("file shorter than header".into()));
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    let body = &bytes[84..];
    if body.len() < count * 50 {
        return Err(MeshError::MalformedStl(format!(
            "expected {count} triangles, found {} bytes of data",
            body.len()
        )));
    }

    let read_f32 = |rec: &[u8], at: usize| -> f64 {
        f32::from_le_bytes([rec[at], rec[at + 1], rec[at + 2], rec[at + 3]]) as f64
    };
    let read_vec = |rec: &[u8], at: usize| {
        Vec3::new(read_f32(rec, at), read_f32(rec, at + 4), read_f32(rec, at + 8))
    };

    let mut mesh = TriangleMesh::new();
    for rec in body.chunks_exact(50).take(count) {
        let normal = read_vec(rec, 0);
        let vertices = [
            Point3::from(read_vec(rec, 12)),
            Point3::from(read_vec(rec, 24)),
            Point3::from(read_vec(rec, 36)),
        ];
        mesh.push(with_stored_normal(vertices, normal));
    }
    Ok(mesh)
}

fn parse_ascii(bytes: &[u8]) -> Result<TriangleMesh> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| MeshError::MalformedStl(format!("not UTF-8: {e}")))?;

    let mut mesh = TriangleMesh::new();
    let mut normal = Vec3::zeros();
    let mut corners: Vec<Point3> = Vec::with_capacity(3);

    for (line_no, line) in text.lines().enumerate() {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("facet") => {
                words.next();
                normal = parse_triple(&mut words, line_no)?;
                corners.clear();
            }
            Some("vertex") => {
                corners.push(Point3::from(parse_triple(&mut words, line_no)?));
            }
            Some("endfacet") => {
                let [a, b, c] = corners.as_slice() else {
                    return Err(MeshError::MalformedStl(format!(
                        "facet ending on line {} has {} vertices",
                        line_no + 1,
                        corners.len()
                    )));
                };
                mesh.push(with_stored_normal([*a, *b, *c], normal));
            }
            _ => {}
        }
    }
    Ok(mesh)
}

fn parse_triple<'a>(words: &mut impl Iterator<Item = &'a str>, line_no: usize) -> Result<Vec3> {
    let mut out = [0.0; 3];
    for slot in &mut out {
        let word = words.next().ok_or_else(|| {
            MeshError::MalformedStl(format!("missing coordinate on line {}", line_no + 1))
        })?;
        *slot = word.parse().map_err(|_| {
            MeshError::MalformedStl(format!("bad number {word:?} on line {}", line_no + 1))
        })?;
    }
    Ok(Vec3::new(out[0], out[1], out[2]))
}

/// Keep a stored unit normal; recompute from the winding when it is zero.
fn with_stored_normal(vertices: [Point3; 3], normal: Vec3) -> Triangle {
    match normal.try_normalize(1e-9) {
        Some(n) => Triangle::with_normal(vertices, n),
        None => Triangle::new(vertices[0], vertices[1], vertices[2]),
    }
}
