#![warn(missing_docs)]

//! Filesystem backends for the partgraph pipeline.
//!
//! [`DatasetStore`] reads part meshes from OBJ files listed in a JSON
//! manifest and keeps recently used meshes in a bounded [`MeshCache`].
//! [`DiskCache`] persists fitted boxes and instance artifacts under a cache
//! directory so later runs can reuse them.

mod dataset;
mod disk;
mod manifest;
mod mesh_cache;
mod obj;

pub use dataset::{DatasetStore, DEFAULT_MESH_CACHE_CAPACITY};
pub use disk::DiskCache;
pub use manifest::{InstanceRecord, Manifest, PartRecord};
pub use mesh_cache::{CacheStats, MeshCache};
pub use obj::{parse_obj, read_obj, ObjError};
