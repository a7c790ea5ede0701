//! Indexed triangle meshes as delivered by the part store.

use partgraph_math::{Point3, Transform, Vec3};

use crate::error::{GeometryError, Result};

/// An indexed triangle mesh with `f64` vertex positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangles as vertex index triples.
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    /// Create a mesh from vertices and faces.
    pub fn new(vertices: Vec<Point3>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Create a mesh from flat arrays: `[x0, y0, z0, x1, ...]` and `[i0, i1, i2, ...]`.
    ///
    /// Trailing values that do not form a whole vertex or triangle are ignored.
    pub fn from_flat(vertices: &[f64], indices: &[u32]) -> Self {
        Self {
            vertices: vertices
                .chunks_exact(3)
                .map(|v| Point3::new(v[0], v[1], v[2]))
                .collect(),
            faces: indices.chunks_exact(3).map(|i| [i[0], i[1], i[2]]).collect(),
        }
    }

    /// Closed box mesh centered at `center` with the given half-extents.
    pub fn cuboid(center: Point3, half_extents: Vec3) -> Self {
        let (hx, hy, hz) = (half_extents.x, half_extents.y, half_extents.z);
        let vertices = vec![
            center + Vec3::new(-hx, -hy, -hz),
            center + Vec3::new(hx, -hy, -hz),
            center + Vec3::new(hx, hy, -hz),
            center + Vec3::new(-hx, hy, -hz),
            center + Vec3::new(-hx, -hy, hz),
            center + Vec3::new(hx, -hy, hz),
            center + Vec3::new(hx, hy, hz),
            center + Vec3::new(-hx, hy, hz),
        ];
        let faces = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [2, 3, 7],
            [2, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        Self { vertices, faces }
    }

    /// True if the mesh has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Concatenate several meshes into one, offsetting face indices.
    pub fn merge(meshes: &[Mesh]) -> Mesh {
        let vertex_total = meshes.iter().map(|m| m.vertices.len()).sum();
        let face_total = meshes.iter().map(|m| m.faces.len()).sum();
        let mut merged = Mesh {
            vertices: Vec::with_capacity(vertex_total),
            faces: Vec::with_capacity(face_total),
        };
        for mesh in meshes {
            let base = merged.vertices.len() as u32;
            merged.vertices.extend_from_slice(&mesh.vertices);
            merged
                .faces
                .extend(mesh.faces.iter().map(|f| [f[0] + base, f[1] + base, f[2] + base]));
        }
        merged
    }

    /// Drop vertices that no face references, remapping face indices.
    ///
    /// A mesh without faces is a point cloud and is returned unchanged.
    /// Faces with out-of-range indices are dropped.
    pub fn remove_isolated_vertices(&self) -> Mesh {
        if self.faces.is_empty() {
            return self.clone();
        }

        let mut remap = vec![u32::MAX; self.vertices.len()];
        let mut vertices = Vec::new();
        let mut faces = Vec::with_capacity(self.faces.len());

        for face in &self.faces {
            if face.iter().any(|&i| i as usize >= self.vertices.len()) {
                continue;
            }
            let mut mapped = [0u32; 3];
            for (slot, &i) in mapped.iter_mut().zip(face) {
                let entry = &mut remap[i as usize];
                if *entry == u32::MAX {
                    *entry = vertices.len() as u32;
                    vertices.push(self.vertices[i as usize]);
                }
                *slot = *entry;
            }
            faces.push(mapped);
        }

        Mesh { vertices, faces }
    }

    /// Check that the mesh is non-empty, finite and has valid face indices.
    pub fn validate(&self) -> Result<()> {
        if self.vertices.is_empty() {
            return Err(GeometryError::EmptyMesh);
        }
        if let Some(index) = self
            .vertices
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(GeometryError::NonFiniteVertex { index });
        }
        let vertex_count = self.vertices.len();
        for (face, tri) in self.faces.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(GeometryError::FaceIndexOutOfRange {
                    face,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }

    /// Points that contribute to the part's shape.
    ///
    /// With faces present only face-referenced vertices count; a face-less
    /// mesh is treated as a point cloud.
    pub fn shape_points(&self) -> Vec<Point3> {
        if self.faces.is_empty() {
            return self.vertices.clone();
        }
        let mut used = vec![false; self.vertices.len()];
        for &i in self.faces.iter().flatten() {
            if let Some(flag) = used.get_mut(i as usize) {
                *flag = true;
            }
        }
        self.vertices
            .iter()
            .zip(used)
            .filter_map(|(p, keep)| keep.then_some(*p))
            .collect()
    }

    /// Copy of this mesh with every vertex transformed.
    pub fn transformed(&self, transform: &Transform) -> Mesh {
        Mesh {
            vertices: self
                .vertices
                .iter()
                .map(|p| transform.apply_point(p))
                .collect(),
            faces: self.faces.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flat() {
        let mesh = Mesh::from_flat(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 9.0], &[0, 1, 2, 7]);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_merge_offsets_indices() {
        let a = Mesh::cuboid(Point3::origin(), Vec3::new(1.0, 1.0, 1.0));
        let b = Mesh::cuboid(Point3::new(5.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let merged = Mesh::merge(&[a.clone(), b]);
        assert_eq!(merged.vertex_count(), 16);
        assert_eq!(merged.face_count(), 24);
        assert_eq!(merged.faces[12], [a.faces[0][0] + 8, a.faces[0][1] + 8, a.faces[0][2] + 8]);
        assert!(merged.validate().is_ok());
    }

    #[test]
    fn test_remove_isolated_vertices() {
        let mut mesh = Mesh::cuboid(Point3::origin(), Vec3::new(1.0, 2.0, 3.0));
        mesh.vertices.insert(0, Point3::new(100.0, 100.0, 100.0));
        for face in &mut mesh.faces {
            for i in face.iter_mut() {
                *i += 1;
            }
        }
        let cleaned = mesh.remove_isolated_vertices();
        assert_eq!(cleaned.vertex_count(), 8);
        assert_eq!(cleaned.face_count(), 12);
        assert!(cleaned.vertices.iter().all(|p| p.x.abs() <= 1.0));
    }

    #[test]
    fn test_validate_errors() {
        assert_eq!(Mesh::default().validate(), Err(GeometryError::EmptyMesh));

        let nan = Mesh::new(vec![Point3::origin(), Point3::new(f64::NAN, 0.0, 0.0)], vec![]);
        assert_eq!(nan.validate(), Err(GeometryError::NonFiniteVertex { index: 1 }));

        let bad = Mesh::new(vec![Point3::origin()], vec![[0, 0, 3]]);
        assert!(matches!(
            bad.validate(),
            Err(GeometryError::FaceIndexOutOfRange { face: 0, index: 3, .. })
        ));
    }

    #[test]
    fn test_shape_points_ignores_unreferenced() {
        let mesh = Mesh::new(
            vec![
                Point3::origin(),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(50.0, 50.0, 50.0),
            ],
            vec![[0, 1, 2]],
        );
        assert_eq!(mesh.shape_points().len(), 3);

        let cloud = Mesh::new(mesh.vertices.clone(), vec![]);
        assert_eq!(cloud.shape_points().len(), 4);
    }
}
