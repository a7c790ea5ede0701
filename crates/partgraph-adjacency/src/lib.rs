#![warn(missing_docs)]

//! Directed adjacency graphs over the leaf parts of a shape instance.
//!
//! For every instance the builder fits a box to each leaf part, measures all
//! pairwise box distances, and writes two matrices: the symmetric distance
//! matrix and a size-directed matrix in which a touching pair carries its
//! distance only from the larger part toward the smaller one. The sequencer
//! turns the directed matrix into a randomized placement order.
//!
//! # Example
//!
//! ```
//! use partgraph_adjacency::{AdjacencyBuilder, AdjacencySettings, Lowest, MemoryStore};
//! use partgraph_bbox::Mesh;
//! use partgraph_math::{Point3, Vec3};
//!
//! let store = MemoryStore::new();
//! store.insert_part(1, Mesh::cuboid(Point3::origin(), Vec3::new(1.0, 1.0, 1.0)));
//! store.insert_part(2, Mesh::cuboid(Point3::new(1.5, 0.0, 0.0), Vec3::new(0.5, 0.5, 0.5)));
//! store.insert_instance(7, vec![2, 1]);
//!
//! let builder = AdjacencyBuilder::new(&store, &store, AdjacencySettings::default()).unwrap();
//! let order = builder.sequence(7, &mut Lowest).unwrap();
//! assert_eq!(order, vec![1, 2]);
//! ```

mod artifact;
mod batch;
mod builder;
mod error;
mod sequence;
mod store;

pub use artifact::{Artifact, EdgeRule, IdMapping, NO_EDGE};
pub use batch::{run_batch, BatchReport};
pub use builder::{AdjacencyBuilder, AdjacencySettings, BuildOutcome, PairFailure, FAILURE_DISTANCE};
pub use error::{
    DuplicatePart, GraphBuildError, IntegrityError, PipelineError, SettingsError, ShapeMismatch, StoreError,
};
pub use sequence::{sequence, sequence_parts, Lowest, Tiebreak, Uniform};
pub use store::{ArtifactStore, InstanceId, MemoryStore, PartId, PartStore};
