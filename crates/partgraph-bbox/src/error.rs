//! Error types for bounding box fitting.

use thiserror::Error;

/// Errors that can occur while fitting a bounding box to a mesh.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Mesh has no vertices.
    #[error("mesh has no vertices")]
    EmptyMesh,

    /// A vertex coordinate is NaN or infinite.
    #[error("vertex {index} has a non-finite coordinate")]
    NonFiniteVertex {
        /// Index of the offending vertex.
        index: usize,
    },

    /// A face references a vertex that does not exist.
    #[error("face {face} references vertex {index} but the mesh has {vertex_count} vertices")]
    FaceIndexOutOfRange {
        /// Index of the offending face.
        face: usize,
        /// The out-of-range vertex index.
        index: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// Geometry is too degenerate to carry a box (e.g. all vertices coincide).
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    /// Invalid fit settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for fitting operations.
pub type Result<T> = std::result::Result<T, GeometryError>;
