//! Part store backed by a manifest and OBJ files on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use partgraph_adjacency::{InstanceId, PartId, PartStore, StoreError};
use partgraph_bbox::Mesh;

use crate::manifest::{Manifest, PartRecord};
use crate::mesh_cache::{CacheStats, MeshCache};
use crate::obj::{read_obj, ObjError};

/// Default number of part meshes kept in memory.
pub const DEFAULT_MESH_CACHE_CAPACITY: usize = 256;

/// Meshes and part lists of a dataset described by a [`Manifest`].
#[derive(Debug)]
pub struct DatasetStore {
    base: PathBuf,
    manifest: Manifest,
    parts: HashMap<PartId, PartRecord>,
    cache: MeshCache,
}

impl DatasetStore {
    /// Open the manifest at `path`; relative OBJ directories resolve against its directory.
    pub fn open(path: &Path, cache_capacity: usize) -> Result<Self, StoreError> {
        let manifest = Manifest::load(path)?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self::new(base, manifest, cache_capacity))
    }

    /// Wrap an already loaded manifest.
    pub fn new(base: PathBuf, manifest: Manifest, cache_capacity: usize) -> Self {
        let parts = manifest.part_index();
        Self {
            base,
            manifest,
            parts,
            cache: MeshCache::new(cache_capacity),
        }
    }

    /// The dataset table.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Mesh cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Load a part from disk: concatenate its OBJ pieces and drop unreferenced vertices.
    fn load_part(&self, record: &PartRecord) -> Result<Mesh, StoreError> {
        let mut pieces = Vec::with_capacity(record.objs.len());
        for path in record.obj_paths(&self.base) {
            let piece = read_obj(&path).map_err(|e| match e {
                ObjError::Io(io) => StoreError::Io(io),
                other => StoreError::Corrupt(format!("{}: {other}", path.display())),
            })?;
            pieces.push(piece);
        }
        let mesh = Mesh::merge(&pieces).remove_isolated_vertices();
        log::debug!(
            "part {}: loaded {} vertices, {} faces from {} files",
            record.global_id,
            mesh.vertex_count(),
            mesh.face_count(),
            pieces.len()
        );
        Ok(mesh)
    }
}

impl PartStore for DatasetStore {
    fn mesh(&self, part: PartId) -> Result<Arc<Mesh>, StoreError> {
        let record = self
            .parts
            .get(&part)
            .ok_or(StoreError::NotFound { kind: "part", id: part })?;
        self.cache
            .get_or_try_insert_with(part, || self.load_part(record))
    }

    fn leaf_parts(&self, instance: InstanceId) -> Result<Vec<PartId>, StoreError> {
        self.manifest
            .instances
            .iter()
            .find(|i| i.id == instance)
            .map(|i| i.parts.iter().map(|p| p.global_id).collect())
            .ok_or(StoreError::NotFound {
                kind: "instance",
                id: instance,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CUBE_HALF: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
v 50 50 50
f 1 3 2
f 1 4 3
f 5 6 7
f 5 7 8
";
    const CUBE_SIDES: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
f 1 2 6 5
f 3 4 8 7
f 1 5 8 4
f 2 3 7 6
";

    fn dataset() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let objs = dir.path().join("1").join("objs");
        fs::create_dir_all(&objs).unwrap();
        fs::write(objs.join("top.obj"), CUBE_HALF).unwrap();
        fs::write(objs.join("sides.obj"), CUBE_SIDES).unwrap();
        let manifest = r#"{ "instances": [
            { "id": 1, "category": "Box", "parts": [
                { "global_id": 100, "objs_dir": "1/objs", "objs": ["top", "sides"] },
                { "global_id": 101, "objs_dir": "1/objs", "objs": ["missing"] }
            ] }
        ] }"#;
        let path = dir.path().join("manifest.json");
        fs::write(&path, manifest).unwrap();
        (dir, path)
    }

    #[test]
    fn test_loads_and_merges_pieces() {
        let (_dir, path) = dataset();
        let store = DatasetStore::open(&path, 8).unwrap();
        assert_eq!(store.leaf_parts(1).unwrap(), vec![100, 101]);

        let mesh = store.mesh(100).unwrap();
        // The isolated far vertex is dropped, the two pieces concatenated
        assert_eq!(mesh.vertex_count(), 16);
        assert_eq!(mesh.face_count(), 12);
        assert!(mesh.vertices.iter().all(|p| p.x <= 1.0));

        store.mesh(100).unwrap();
        assert_eq!(store.cache_stats().hits, 1);
    }

    #[test]
    fn test_missing_records() {
        let (_dir, path) = dataset();
        let store = DatasetStore::open(&path, 8).unwrap();
        assert!(matches!(store.mesh(101), Err(StoreError::Io(_))));
        assert!(matches!(store.mesh(5), Err(StoreError::NotFound { kind: "part", .. })));
        assert!(matches!(store.leaf_parts(2), Err(StoreError::NotFound { kind: "instance", .. })));
    }
}
