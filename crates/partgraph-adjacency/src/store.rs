//! Store interfaces consumed by the builder, and an in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use partgraph_bbox::{BoundingBox, Mesh};

use crate::artifact::Artifact;
use crate::error::StoreError;

/// Global identifier of a part.
pub type PartId = u64;

/// Identifier of a shape instance.
pub type InstanceId = u64;

/// Source of part meshes and instance part lists.
pub trait PartStore: Send + Sync {
    /// Mesh of one part. Missing ids fail with [`StoreError::NotFound`].
    fn mesh(&self, part: PartId) -> Result<Arc<Mesh>, StoreError>;

    /// Leaf parts of an instance in a stable discovery order.
    fn leaf_parts(&self, instance: InstanceId) -> Result<Vec<PartId>, StoreError>;
}

/// Cache for derived boxes and per-instance artifacts.
///
/// Stores must make writes atomic: a reader never observes a partially
/// written record, and concurrent writes of the same key leave one complete
/// record behind.
pub trait ArtifactStore: Send + Sync {
    /// Cached box of a part, if any.
    fn load_box(&self, part: PartId) -> Result<Option<BoundingBox>, StoreError>;

    /// Cache the box of a part.
    fn store_box(&self, part: PartId, bbox: &BoundingBox) -> Result<(), StoreError>;

    /// Cached artifact of an instance, if any.
    fn load_artifact(&self, instance: InstanceId) -> Result<Option<Artifact>, StoreError>;

    /// Cache an instance artifact, replacing any previous one.
    fn store_artifact(&self, instance: InstanceId, artifact: &Artifact) -> Result<(), StoreError>;

    /// Drop the cached artifact of an instance. Missing records are not an error.
    fn invalidate(&self, instance: InstanceId) -> Result<(), StoreError>;
}

impl<T: PartStore + ?Sized> PartStore for &T {
    fn mesh(&self, part: PartId) -> Result<Arc<Mesh>, StoreError> {
        (**self).mesh(part)
    }

    fn leaf_parts(&self, instance: InstanceId) -> Result<Vec<PartId>, StoreError> {
        (**self).leaf_parts(instance)
    }
}

impl<T: ArtifactStore + ?Sized> ArtifactStore for &T {
    fn load_box(&self, part: PartId) -> Result<Option<BoundingBox>, StoreError> {
        (**self).load_box(part)
    }

    fn store_box(&self, part: PartId, bbox: &BoundingBox) -> Result<(), StoreError> {
        (**self).store_box(part, bbox)
    }

    fn load_artifact(&self, instance: InstanceId) -> Result<Option<Artifact>, StoreError> {
        (**self).load_artifact(instance)
    }

    fn store_artifact(&self, instance: InstanceId, artifact: &Artifact) -> Result<(), StoreError> {
        (**self).store_artifact(instance, artifact)
    }

    fn invalidate(&self, instance: InstanceId) -> Result<(), StoreError> {
        (**self).invalidate(instance)
    }
}

/// In-process part and artifact store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    meshes: RwLock<HashMap<PartId, Arc<Mesh>>>,
    instances: RwLock<HashMap<InstanceId, Vec<PartId>>>,
    boxes: RwLock<HashMap<PartId, BoundingBox>>,
    artifacts: RwLock<HashMap<InstanceId, Artifact>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a part mesh.
    pub fn insert_part(&self, part: PartId, mesh: Mesh) {
        self.meshes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(part, Arc::new(mesh));
    }

    /// Add or replace an instance's leaf part list.
    pub fn insert_instance(&self, instance: InstanceId, parts: Vec<PartId>) {
        self.instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(instance, parts);
    }

    /// Number of cached boxes.
    pub fn box_count(&self) -> usize {
        self.boxes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of cached artifacts.
    pub fn artifact_count(&self) -> usize {
        self.artifacts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl PartStore for MemoryStore {
    fn mesh(&self, part: PartId) -> Result<Arc<Mesh>, StoreError> {
        self.meshes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&part)
            .cloned()
            .ok_or(StoreError::NotFound { kind: "part", id: part })
    }

    fn leaf_parts(&self, instance: InstanceId) -> Result<Vec<PartId>, StoreError> {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&instance)
            .cloned()
            .ok_or(StoreError::NotFound {
                kind: "instance",
                id: instance,
            })
    }
}

impl ArtifactStore for MemoryStore {
    fn load_box(&self, part: PartId) -> Result<Option<BoundingBox>, StoreError> {
        Ok(self
            .boxes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&part)
            .cloned())
    }

    fn store_box(&self, part: PartId, bbox: &BoundingBox) -> Result<(), StoreError> {
        self.boxes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(part, bbox.clone());
        Ok(())
    }

    fn load_artifact(&self, instance: InstanceId) -> Result<Option<Artifact>, StoreError> {
        Ok(self
            .artifacts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&instance)
            .cloned())
    }

    fn store_artifact(&self, instance: InstanceId, artifact: &Artifact) -> Result<(), StoreError> {
        self.artifacts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(instance, artifact.clone());
        Ok(())
    }

    fn invalidate(&self, instance: InstanceId) -> Result<(), StoreError> {
        self.artifacts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&instance);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partgraph_math::{Point3, Vec3};

    #[test]
    fn test_missing_ids_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.mesh(3),
            Err(StoreError::NotFound { kind: "part", id: 3 })
        ));
        assert!(matches!(
            store.leaf_parts(9),
            Err(StoreError::NotFound { kind: "instance", id: 9 })
        ));
    }

    #[test]
    fn test_store_through_reference() {
        let store = MemoryStore::new();
        store.insert_part(1, Mesh::cuboid(Point3::origin(), Vec3::new(1.0, 1.0, 1.0)));
        store.insert_instance(7, vec![1]);

        fn leaves(parts: impl PartStore) -> Vec<PartId> {
            parts.leaf_parts(7).unwrap()
        }
        assert_eq!(leaves(&store), vec![1]);
        assert_eq!((&store).mesh(1).unwrap().vertex_count(), 8);
    }
}
