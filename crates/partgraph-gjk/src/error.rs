//! Error types for the convex distance engine.

use thiserror::Error;

/// Malformed input geometry. Fatal to the single query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    /// A box does not have exactly 8 corners.
    #[error("shape {shape} has {found} corners, expected 8")]
    CornerCount {
        /// Which operand (`'A'` or `'B'`).
        shape: char,
        /// Number of corners supplied.
        found: usize,
    },

    /// A point set has no points.
    #[error("shape {shape} has no points")]
    EmptyShape {
        /// Which operand (`'A'` or `'B'`).
        shape: char,
    },

    /// A coordinate is NaN or infinite.
    #[error("shape {shape} point {index} has a non-finite coordinate")]
    NonFinite {
        /// Which operand (`'A'` or `'B'`).
        shape: char,
        /// Index of the offending point.
        index: usize,
    },
}

/// Errors from a distance query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistanceError {
    /// The input was malformed.
    #[error(transparent)]
    Input(#[from] InputError),

    /// The iteration cap was reached before the distance bounds met.
    #[error("no convergence after {iterations} iterations (bound gap {gap:e})")]
    NonConvergence {
        /// Iterations performed.
        iterations: usize,
        /// Remaining gap between the upper and lower distance bounds.
        gap: f64,
    },

    /// The iteration produced a non-finite value.
    #[error("numerical failure: {0}")]
    Numerical(String),

    /// Invalid query settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl DistanceError {
    /// True for malformed input, false for computation failures.
    pub fn is_input(&self) -> bool {
        matches!(self, DistanceError::Input(_))
    }
}

/// Result type for distance queries.
pub type Result<T> = std::result::Result<T, DistanceError>;
