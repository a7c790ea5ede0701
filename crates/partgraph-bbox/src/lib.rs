#![warn(missing_docs)]

//! Oriented bounding box fitting for part meshes.
//!
//! A part mesh is summarized by a tight oriented box: a rigid frame, three
//! half-extents and the 8 corners they produce. The primary fitter searches
//! convex-hull-aligned orientations for the minimum-volume box; near-planar
//! or hull-less parts fall back to a principal-axis projection.
//!
//! # Example
//!
//! ```
//! use partgraph_bbox::{fit, Mesh};
//! use partgraph_math::{Point3, Vec3};
//!
//! let mesh = Mesh::cuboid(Point3::origin(), Vec3::new(1.0, 2.0, 3.0));
//! let bbox = fit(&mesh).unwrap();
//! assert!((bbox.volume() - 48.0).abs() < 1e-9);
//! ```

mod bbox;
mod error;
mod fit;
mod hull;
mod mesh;
mod principal;

pub use bbox::{corners_from, BoundingBox, BOX_CORNERS, BOX_EDGES, CORNER_SIGNS};
pub use error::{GeometryError, Result};
pub use fit::{fit, fit_with_method, FitMethod, FitSettings};
pub use mesh::Mesh;
pub use principal::{fit_principal, PrincipalFrame};
