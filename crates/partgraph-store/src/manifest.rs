//! The flat part table describing a dataset.
//!
//! ```json
//! {
//!   "instances": [
//!     {
//!       "id": 178,
//!       "category": "Chair",
//!       "parts": [
//!         { "global_id": 4021, "objs_dir": "178/objs", "objs": ["new-0", "new-3"] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! `parts` lists the instance's leaf parts in discovery order. A part's mesh
//! is the concatenation of `<objs_dir>/<name>.obj` for every name in `objs`;
//! relative directories are resolved against the manifest's directory.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use partgraph_adjacency::{InstanceId, PartId, StoreError};
use serde::{Deserialize, Serialize};

/// One leaf part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartRecord {
    /// Dataset-wide part id.
    pub global_id: PartId,
    /// Directory holding the part's OBJ pieces.
    pub objs_dir: PathBuf,
    /// OBJ piece names without extension.
    pub objs: Vec<String>,
}

impl PartRecord {
    /// Paths of the part's OBJ files, resolved against `base`.
    pub fn obj_paths(&self, base: &Path) -> Vec<PathBuf> {
        let dir = base.join(&self.objs_dir);
        self.objs
            .iter()
            .map(|name| dir.join(format!("{name}.obj")))
            .collect()
    }
}

/// One shape instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Instance id.
    pub id: InstanceId,
    /// Object category, informational.
    #[serde(default)]
    pub category: String,
    /// Leaf parts in discovery order.
    pub parts: Vec<PartRecord>,
}

/// The whole dataset table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// All instances.
    pub instances: Vec<InstanceRecord>,
}

impl Manifest {
    /// Parse a manifest from JSON and check id uniqueness.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let manifest: Manifest =
            serde_json::from_str(json).map_err(|e| StoreError::Corrupt(format!("manifest: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read a manifest file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Instance ids must be unique, and so must part ids across the dataset.
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut instances = HashSet::new();
        let mut parts = HashSet::new();
        for instance in &self.instances {
            if !instances.insert(instance.id) {
                return Err(StoreError::Corrupt(format!(
                    "manifest: instance {} listed twice",
                    instance.id
                )));
            }
            for part in &instance.parts {
                if !parts.insert(part.global_id) {
                    return Err(StoreError::Corrupt(format!(
                        "manifest: part {} listed twice",
                        part.global_id
                    )));
                }
                if part.objs.is_empty() {
                    return Err(StoreError::Corrupt(format!(
                        "manifest: part {} has no obj files",
                        part.global_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Instance ids in manifest order.
    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.instances.iter().map(|i| i.id).collect()
    }

    /// Part records keyed by global id.
    pub fn part_index(&self) -> HashMap<PartId, PartRecord> {
        self.instances
            .iter()
            .flat_map(|i| i.parts.iter())
            .map(|p| (p.global_id, p.clone()))
            .collect()
    }
}
