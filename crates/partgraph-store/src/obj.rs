//! Minimal Wavefront OBJ reader.
//!
//! Only `v` and `f` records are read. Polygons are fan-triangulated, the
//! `v/vt/vn` index forms are accepted and negative indices count back from
//! the most recent vertex. Every other record is ignored.

use std::path::Path;

use partgraph_bbox::Mesh;
use partgraph_math::Point3;
use thiserror::Error;

/// Errors parsing an OBJ file.
#[derive(Error, Debug)]
pub enum ObjError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record is malformed.
    #[error("line {line}: {message}")]
    Syntax {
        /// 1-based line number.
        line: usize,
        /// What is wrong.
        message: String,
    },
}

fn syntax(line: usize, message: impl Into<String>) -> ObjError {
    ObjError::Syntax {
        line,
        message: message.into(),
    }
}

/// Resolve one face corner (`7`, `7/1`, `7//3`, `-2/1/1`) to a 0-based index.
fn vertex_index(token: &str, vertex_count: usize, line: usize) -> Result<u32, ObjError> {
    let head = token.split('/').next().unwrap_or(token);
    let raw: i64 = head
        .parse()
        .map_err(|_| syntax(line, format!("bad vertex index {token:?}")))?;
    let resolved = match raw {
        0 => return Err(syntax(line, "vertex index 0")),
        r if r > 0 => r - 1,
        r => vertex_count as i64 + r,
    };
    if resolved < 0 || resolved >= vertex_count as i64 {
        return Err(syntax(
            line,
            format!("vertex index {raw} out of range ({vertex_count} vertices so far)"),
        ));
    }
    Ok(resolved as u32)
}

/// Parse OBJ text into a triangle mesh.
pub fn parse_obj(text: &str) -> Result<Mesh, ObjError> {
    let mut mesh = Mesh::default();

    for (i, raw_line) in text.lines().enumerate() {
        let line = i + 1;
        let content = raw_line.split('#').next().unwrap_or("");
        let mut tokens = content.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let coords: Vec<f64> = tokens
                    .by_ref()
                    .take(3)
                    .map(|t| t.parse::<f64>())
                    .collect::<Result<_, _>>()
                    .map_err(|e| syntax(line, format!("bad vertex coordinate: {e}")))?;
                if coords.len() != 3 {
                    return Err(syntax(line, "vertex needs 3 coordinates"));
                }
                mesh.vertices.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let corners: Vec<u32> = tokens
                    .map(|t| vertex_index(t, mesh.vertices.len(), line))
                    .collect::<Result<_, _>>()?;
                if corners.len() < 3 {
                    return Err(syntax(line, "face needs at least 3 vertices"));
                }
                for k in 1..corners.len() - 1 {
                    mesh.faces.push([corners[0], corners[k], corners[k + 1]]);
                }
            }
            _ => {}
        }
    }

    Ok(mesh)
}

/// Read and parse an OBJ file.
pub fn read_obj(path: &Path) -> Result<Mesh, ObjError> {
    let text = std::fs::read_to_string(path)?;
    parse_obj(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_triangles_and_quads() {
        let text = "\
# a unit square and a triangle
o square
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
vt 0 0
f 1/1/1 2/1/1 3/1/1 4/1/1
v 0 0 1
f 1//1 2//1 5//1
";
        let mesh = parse_obj(text).unwrap();
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3], [0, 1, 4]]);
    }

    #[test]
    fn test_negative_indices() {
        let mesh = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n").unwrap();
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_errors_report_line() {
        let err = parse_obj("v 0 0 0\nv 1 0\n").unwrap_err();
        assert!(matches!(err, ObjError::Syntax { line: 2, .. }));

        let err = parse_obj("v 0 0 0\nf 1 2 3\n").unwrap_err();
        assert!(matches!(err, ObjError::Syntax { line: 2, .. }));

        let err = parse_obj("v 0 0 0\nv 1 x 0\n").unwrap_err();
        assert!(matches!(err, ObjError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_comments_and_unknown_records_ignored() {
        let mesh = parse_obj("mtllib x.mtl\nv 1 2 3 # trailing\nusemtl red\ns off\n").unwrap();
        assert_eq!(mesh.vertex_count(), 1);
        assert!(mesh.faces.is_empty());
    }
}
