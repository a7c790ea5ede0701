//! Error types for graph construction and sequencing.

use partgraph_bbox::GeometryError;
use partgraph_gjk::DistanceError;
use thiserror::Error;

use crate::store::{InstanceId, PartId};

/// Errors raised by part and artifact stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind (`"part"`, `"instance"`, ...).
        kind: &'static str,
        /// The missing identifier.
        id: u64,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// A part id listed twice in one instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("part {0} appears more than once")]
pub struct DuplicatePart(pub PartId);

/// An artifact matrix whose shape does not match its id mapping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{matrix} matrix is {rows}x{cols}, expected {expected}x{expected}")]
pub struct ShapeMismatch {
    /// Which matrix (`"distance"` or `"directional"`).
    pub matrix: &'static str,
    /// Actual row count.
    pub rows: usize,
    /// Actual column count.
    pub cols: usize,
    /// Number of mapped parts.
    pub expected: usize,
}

/// Invalid pipeline settings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    /// An adjacency parameter is out of range.
    #[error("invalid adjacency settings: {0}")]
    Invalid(String),

    /// Invalid box fitting settings.
    #[error(transparent)]
    Fit(#[from] GeometryError),

    /// Invalid distance settings.
    #[error(transparent)]
    Distance(#[from] DistanceError),
}

/// Fatal failure building one instance's graph.
///
/// Every variant names the instance, and the part where one is at fault, so the
/// instance can be re-run later.
#[derive(Error, Debug)]
pub enum GraphBuildError {
    /// The leaf parts of the instance could not be listed.
    #[error("instance {instance}: cannot list leaf parts: {source}")]
    LeafParts {
        /// Instance being built.
        instance: InstanceId,
        /// Store failure.
        #[source]
        source: StoreError,
    },

    /// A leaf part's mesh could not be loaded.
    #[error("instance {instance}: cannot load mesh of part {part}: {source}")]
    Mesh {
        /// Instance being built.
        instance: InstanceId,
        /// Failing part.
        part: PartId,
        /// Store failure.
        #[source]
        source: StoreError,
    },

    /// No box could be fit to a leaf part.
    #[error("instance {instance}: cannot fit a box to part {part}: {source}")]
    Geometry {
        /// Instance being built.
        instance: InstanceId,
        /// Failing part.
        part: PartId,
        /// Fitter failure.
        #[source]
        source: GeometryError,
    },

    /// A box is unusable as distance input.
    #[error("instance {instance}: box of part {part} is unusable: {reason}")]
    CorruptBox {
        /// Instance being built.
        instance: InstanceId,
        /// Failing part.
        part: PartId,
        /// What is wrong with it.
        reason: String,
    },

    /// The leaf part list does not form a valid id mapping.
    #[error("instance {instance}: {source}")]
    Mapping {
        /// Instance being built.
        instance: InstanceId,
        /// The duplicated part.
        #[source]
        source: DuplicatePart,
    },

    /// The assembled matrices do not match the leaf part count.
    #[error("instance {instance}: {source}")]
    Shape {
        /// Instance being built.
        instance: InstanceId,
        /// Shape check failure.
        #[source]
        source: ShapeMismatch,
    },

    /// Boxes or the artifact could not be persisted.
    #[error("instance {instance}: cannot persist results: {source}")]
    Persist {
        /// Instance being built.
        instance: InstanceId,
        /// Store failure.
        #[source]
        source: StoreError,
    },
}

impl GraphBuildError {
    /// The instance whose build failed.
    pub fn instance(&self) -> InstanceId {
        match self {
            GraphBuildError::LeafParts { instance, .. }
            | GraphBuildError::Mesh { instance, .. }
            | GraphBuildError::Geometry { instance, .. }
            | GraphBuildError::CorruptBox { instance, .. }
            | GraphBuildError::Mapping { instance, .. }
            | GraphBuildError::Shape { instance, .. }
            | GraphBuildError::Persist { instance, .. } => *instance,
        }
    }

    /// The part at fault, if the failure is tied to one.
    pub fn part(&self) -> Option<PartId> {
        match self {
            GraphBuildError::Mesh { part, .. }
            | GraphBuildError::Geometry { part, .. }
            | GraphBuildError::CorruptBox { part, .. } => Some(*part),
            GraphBuildError::Mapping { source, .. } => Some(source.0),
            _ => None,
        }
    }
}

/// The directed relation has a cycle: no part is ready to be placed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// Sequencing stopped with parts left and none of in-degree zero.
    #[error("sequencer stalled after placing {placed} parts; {remaining} remain with no ready part")]
    Stalled {
        /// Parts already placed.
        placed: usize,
        /// Parts left unplaced.
        remaining: usize,
    },
}

/// Any failure of the end-to-end sequence query.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Graph construction failed.
    #[error(transparent)]
    Build(#[from] GraphBuildError),

    /// The stored graph is cyclic.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}
