#![warn(missing_docs)]

//! Math types for the partgraph adjacency pipeline.
//!
//! The box fitter, distance engine and graph builder share one vocabulary:
//! nalgebra points and vectors, a rigid box frame stored as a homogeneous
//! matrix, and the tolerance used to compare box corners.

use nalgebra::{Matrix3, Matrix4, Unit, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// Homogeneous frame placing a box's local axes in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Rotation in the upper-left block, box center in the last column.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Rigid frame placing the local axes (matrix columns) at `origin`.
    ///
    /// A local point `(u, v, w)` maps to `origin + u*axes[0] + v*axes[1] + w*axes[2]`.
    pub fn from_frame(origin: &Point3, axes: &Matrix3<f64>) -> Self {
        let mut matrix = Matrix4::identity();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(axes);
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&origin.coords);
        Self { matrix }
    }

    /// Rotation by `angle` radians about `axis` through the origin (Rodrigues).
    pub fn rotation_about_axis(axis: &Dir3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.x, axis.y, axis.z);
        let rotation = Matrix3::new(
            t * x * x + c,
            t * x * y - s * z,
            t * x * z + s * y,
            t * x * y + s * z,
            t * y * y + c,
            t * y * z - s * x,
            t * x * z - s * y,
            t * y * z + s * x,
            t * z * z + c,
        );
        Self::from_frame(&Point3::origin(), &rotation)
    }

    /// Map a local point to world space.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        self.matrix.transform_point(p)
    }

    /// Upper-left 3x3 block: the local axes as columns.
    pub fn linear(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Frame origin (box center).
    pub fn origin(&self) -> Point3 {
        Point3::from(self.matrix.fixed_view::<3, 1>(0, 3).into_owned())
    }

    /// True if every matrix entry is finite.
    pub fn is_finite(&self) -> bool {
        self.matrix.iter().all(|x| x.is_finite())
    }
}

/// Absolute plus relative tolerance for comparing positions.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Absolute distance tolerance in model units.
    pub linear: f64,
    /// Tolerance relative to the magnitude of the compared quantities.
    pub relative: f64,
}

impl Tolerance {
    /// 1e-9 absolute, 1e-9 relative.
    pub const DEFAULT: Self = Self {
        linear: 1e-9,
        relative: 1e-9,
    };

    /// Effective tolerance for quantities of magnitude `scale`.
    pub fn at_scale(&self, scale: f64) -> f64 {
        self.linear + self.relative * scale.abs()
    }

    /// Coincidence test scaled by the larger of the two position vectors.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        let scale = a.coords.norm().max(b.coords.norm());
        (a - b).norm() <= self.at_scale(scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_from_frame_maps_local_axes() {
        // Local x -> world y, local y -> world -x, local z -> world z
        let axes = Matrix3::from_columns(&[Vec3::y(), -Vec3::x(), Vec3::z()]);
        let t = Transform::from_frame(&Point3::new(5.0, 0.0, 1.0), &axes);
        let result = t.apply_point(&Point3::new(1.0, 2.0, 3.0));
        assert!((result - Point3::new(3.0, 1.0, 4.0)).norm() < 1e-12);
        assert!((t.origin() - Point3::new(5.0, 0.0, 1.0)).norm() < 1e-12);
        assert!((t.linear() - axes).norm() < 1e-12);
        assert_eq!(t.matrix[(3, 3)], 1.0);
    }

    #[test]
    fn test_rotation_about_axis() {
        let z = Dir3::new_normalize(Vec3::z());
        let t = Transform::rotation_about_axis(&z, PI / 2.0);
        let result = t.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((result - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
        assert_eq!(t.origin(), Point3::origin());

        // Half turn about (1, 1, 0) swaps x and y
        let diagonal = Dir3::new_normalize(Vec3::new(1.0, 1.0, 0.0));
        let swap = Transform::rotation_about_axis(&diagonal, PI);
        let r = swap.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((r - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_rotation_is_orthonormal() {
        let axis = Dir3::new_normalize(Vec3::new(0.3, -1.0, 2.0));
        let r = Transform::rotation_about_axis(&axis, 1.1).linear();
        assert!((r.transpose() * r - Matrix3::identity()).norm() < 1e-12);
        assert!((r.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_points_equal_scales_with_magnitude() {
        let tol = Tolerance::DEFAULT;
        let a = Point3::new(1.0, 2.0, 3.0);
        assert!(tol.points_equal(&a, &Point3::new(1.0 + 1e-12, 2.0, 3.0)));
        assert!(!tol.points_equal(&a, &Point3::new(1.001, 2.0, 3.0)));

        let far = Point3::new(1e6, 0.0, 0.0);
        assert!(tol.points_equal(&far, &Point3::new(1e6 + 1e-4, 0.0, 0.0)));
    }

    #[test]
    fn test_non_finite_frame() {
        let mut t = Transform::from_frame(&Point3::new(1.0, 2.0, 3.0), &Matrix3::identity());
        assert!(t.is_finite());
        t.matrix[(0, 3)] = f64::NAN;
        assert!(!t.is_finite());
    }
}
