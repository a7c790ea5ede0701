#![warn(missing_docs)]

//! Convex distance engine for oriented boxes.
//!
//! Computes the minimum separating distance between the convex hulls of two
//! point sets with the Gilbert-Johnson-Keerthi algorithm. The box contract
//! ([`distance`]) takes exactly 8 corners per shape and returns `0.0` when the
//! boxes touch or overlap.
//!
//! # Example
//!
//! ```
//! use partgraph_gjk::distance;
//! use partgraph_math::Point3;
//!
//! let cube = |x: f64| -> Vec<Point3> {
//!     (0..8)
//!         .map(|i| Point3::new(x + (i >> 2 & 1) as f64, (i >> 1 & 1) as f64, (i & 1) as f64))
//!         .collect()
//! };
//! let d = distance(&cube(0.0), &cube(3.0)).unwrap();
//! assert!((d - 2.0).abs() < 1e-9);
//! ```

mod error;
mod gjk;
mod simplex;

pub use error::{DistanceError, InputError, Result};
pub use gjk::{closest_points, Proximity};

use partgraph_math::Point3;
use serde::{Deserialize, Serialize};

/// Number of corners expected per box.
pub const BOX_CORNERS: usize = 8;

/// Distance query parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GjkSettings {
    /// Iteration cap before reporting non-convergence.
    pub max_iterations: usize,
    /// Stop once the squared-distance bound gap falls below this fraction.
    pub relative_tolerance: f64,
    /// Separations at or below this are reported as touching (distance 0).
    pub touch_tolerance: f64,
}

impl Default for GjkSettings {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            relative_tolerance: 1e-12,
            touch_tolerance: 1e-9,
        }
    }
}

impl GjkSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(DistanceError::InvalidSettings(
                "max_iterations must be positive".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.relative_tolerance) {
            return Err(DistanceError::InvalidSettings(
                "relative_tolerance must be in [0, 1)".into(),
            ));
        }
        if !(self.touch_tolerance >= 0.0 && self.touch_tolerance.is_finite()) {
            return Err(DistanceError::InvalidSettings(
                "touch_tolerance must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}

fn check_corners(corners: &[Point3], shape: char) -> std::result::Result<(), InputError> {
    if corners.len() != BOX_CORNERS {
        return Err(InputError::CornerCount {
            shape,
            found: corners.len(),
        });
    }
    Ok(())
}

/// Separation distance between two 8-corner boxes with default settings.
pub fn distance(a: &[Point3], b: &[Point3]) -> Result<f64> {
    distance_with(a, b, &GjkSettings::default())
}

/// Separation distance between two 8-corner boxes.
///
/// Returns exactly `0.0` when the boxes intersect or touch. Degenerate
/// (flat or collapsed) boxes yield a finite distance.
pub fn distance_with(a: &[Point3], b: &[Point3], settings: &GjkSettings) -> Result<f64> {
    check_corners(a, 'A')?;
    check_corners(b, 'B')?;
    Ok(closest_points(a, b, settings)?.distance)
}
