//! Principal-axis frames and the projection box fit.
//!
//! Used directly for near-planar parts and as the fallback whenever the
//! hull search cannot run.

use nalgebra::{Matrix3, SymmetricEigen};
use partgraph_math::{Point3, Vec3};

use crate::bbox::BoundingBox;
use crate::error::{GeometryError, Result};

/// Principal axes of a point set.
#[derive(Debug, Clone)]
pub struct PrincipalFrame {
    /// Mean of the points.
    pub centroid: Point3,
    /// Covariance eigenvalues in ascending order.
    pub eigenvalues: Vec3,
    /// Matching unit eigenvectors as columns: normal, secondary, primary.
    ///
    /// Always a right-handed rotation.
    pub axes: Matrix3<f64>,
}

impl PrincipalFrame {
    /// Eigen-decompose the covariance of `points`.
    ///
    /// Fails when there are no points or when the covariance vanishes
    /// (every point coincides), since no axis can be recovered.
    pub fn compute(points: &[Point3]) -> Result<Self> {
        if points.is_empty() {
            return Err(GeometryError::EmptyMesh);
        }

        let n = points.len() as f64;
        let centroid = Point3::from(points.iter().map(|p| p.coords).sum::<Vec3>() / n);

        let mut cov = Matrix3::zeros();
        for p in points {
            let d = p - centroid;
            cov += d * d.transpose();
        }
        cov /= n;

        let eigen = SymmetricEigen::new(cov);
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

        let eigenvalues = Vec3::new(
            eigen.eigenvalues[order[0]],
            eigen.eigenvalues[order[1]],
            eigen.eigenvalues[order[2]],
        );
        if !eigenvalues.iter().all(|v| v.is_finite()) {
            return Err(GeometryError::Degenerate("covariance is not finite".into()));
        }

        let magnitude = points
            .iter()
            .flat_map(|p| p.coords.iter().map(|c| c.abs()))
            .fold(0.0f64, f64::max);
        let noise = f64::EPSILON * magnitude.max(f64::MIN_POSITIVE);
        if eigenvalues.z <= noise * noise {
            return Err(GeometryError::Degenerate(
                "singular covariance: all vertices coincide".into(),
            ));
        }

        let mut axes = Matrix3::from_columns(&[
            eigen.eigenvectors.column(order[0]).into_owned(),
            eigen.eigenvectors.column(order[1]).into_owned(),
            eigen.eigenvectors.column(order[2]).into_owned(),
        ]);
        if axes.determinant() < 0.0 {
            let flipped = -axes.column(2);
            axes.set_column(2, &flipped);
        }

        Ok(Self {
            centroid,
            eigenvalues,
            axes,
        })
    }

    /// True if the spread along the normal axis is negligible next to the primary axis.
    pub fn is_planar(&self, ratio: f64) -> bool {
        self.eigenvalues.x <= ratio * self.eigenvalues.z
    }
}

/// Axis-aligned extremes of `points` expressed in the frame `axes`.
pub(crate) fn local_bounds(points: &[Point3], axes: &Matrix3<f64>) -> (Vec3, Vec3) {
    let inverse = axes.transpose();
    let mut min = Vec3::repeat(f64::INFINITY);
    let mut max = Vec3::repeat(f64::NEG_INFINITY);
    for p in points {
        let local = inverse * p.coords;
        min = min.inf(&local);
        max = max.sup(&local);
    }
    (min, max)
}

/// Box from local extremes: center mapped back to world space.
pub(crate) fn box_from_bounds(axes: &Matrix3<f64>, min: &Vec3, max: &Vec3) -> BoundingBox {
    let half_extents = (max - min) / 2.0;
    let center = Point3::from(axes * ((min + max) / 2.0));
    BoundingBox::from_frame(&center, axes, half_extents)
}

/// Fit a box by projecting onto the principal axes and taking min/max.
pub fn fit_principal(points: &[Point3], frame: &PrincipalFrame) -> BoundingBox {
    let (min, max) = local_bounds(points, &frame.axes);
    box_from_bounds(&frame.axes, &min, &max)
}
