//! Box fitting entry points.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{GeometryError, Result};
use crate::hull::fit_hull;
use crate::mesh::Mesh;
use crate::principal::{fit_principal, PrincipalFrame};

/// Which method produced a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitMethod {
    /// Minimum-volume search over convex hull orientations.
    HullSearch,
    /// Projection onto the covariance eigenvectors.
    PrincipalAxes,
}

/// Fitting parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitSettings {
    /// Parts whose smallest covariance eigenvalue is below this fraction of the
    /// largest are treated as planar and fit on the principal axes directly.
    pub planarity_ratio: f64,
    /// Maximum number of hull triangles used to seed candidate orientations.
    pub max_hull_faces: usize,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            planarity_ratio: 1e-9,
            max_hull_faces: 2048,
        }
    }
}

impl FitSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.planarity_ratio) {
            return Err(GeometryError::InvalidSettings(
                "planarity_ratio must be in [0, 1)".into(),
            ));
        }
        if self.max_hull_faces == 0 {
            return Err(GeometryError::InvalidSettings(
                "max_hull_faces must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Fit an oriented bounding box to a mesh with default settings.
pub fn fit(mesh: &Mesh) -> Result<BoundingBox> {
    fit_with_method(mesh, &FitSettings::default()).map(|(bbox, _)| bbox)
}

/// Fit an oriented bounding box and report which method produced it.
///
/// The hull search runs first; near-planar parts and parts whose hull cannot
/// be built fall back to the principal-axis projection. Both paths produce
/// boxes of the same shape.
pub fn fit_with_method(mesh: &Mesh, settings: &FitSettings) -> Result<(BoundingBox, FitMethod)> {
    settings.validate()?;
    mesh.validate()?;

    let points = mesh.shape_points();
    let frame = PrincipalFrame::compute(&points)?;

    if frame.is_planar(settings.planarity_ratio) {
        log::debug!(
            "planar part ({} points, eigenvalues {:?}), using principal axes",
            points.len(),
            frame.eigenvalues.as_slice()
        );
        return Ok((fit_principal(&points, &frame), FitMethod::PrincipalAxes));
    }

    match fit_hull(&points, &frame, settings.max_hull_faces) {
        Ok(bbox) => Ok((bbox, FitMethod::HullSearch)),
        Err(failure) => {
            log::debug!("hull search failed ({}), using principal axes", failure.0);
            Ok((fit_principal(&points, &frame), FitMethod::PrincipalAxes))
        }
    }
}
