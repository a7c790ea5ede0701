//! The 8-corner bounding box shared by the whole pipeline.

use nalgebra::Matrix3;
use partgraph_math::{Point3, Tolerance, Transform, Vec3};

/// Number of corners of a box.
pub const BOX_CORNERS: usize = 8;

/// Sign template for corner enumeration.
///
/// Cartesian product of `[-1, 1]` over the three local axes with the first
/// axis varying slowest, so corner `i` has sign bits `(i >> 2, i >> 1, i) & 1`.
pub const CORNER_SIGNS: [[f64; 3]; BOX_CORNERS] = [
    [-1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, 1.0, 1.0],
    [1.0, -1.0, -1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, -1.0],
    [1.0, 1.0, 1.0],
];

/// Corner index pairs forming the 12 box edges.
pub const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (0, 2),
    (3, 1),
    (3, 2),
    (4, 5),
    (4, 6),
    (7, 5),
    (7, 6),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// An oriented box: 8 corners, the rigid frame placing it, and its half-extents.
///
/// `corners[i] = transform * (CORNER_SIGNS[i] ⊙ half_extents)`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    corners: [Point3; BOX_CORNERS],
    transform: Transform,
    half_extents: Vec3,
}

impl BoundingBox {
    /// Build a box from its center, local axes (matrix columns) and half-extents.
    pub fn from_frame(center: &Point3, axes: &Matrix3<f64>, half_extents: Vec3) -> Self {
        let transform = Transform::from_frame(center, axes);
        let corners = corners_from(&transform, &half_extents);
        Self {
            corners,
            transform,
            half_extents,
        }
    }

    /// Reassemble a box from stored parts without recomputing anything.
    ///
    /// Used when reading boxes back from a cache; check the result with
    /// [`BoundingBox::is_consistent`] if the source is untrusted.
    pub fn from_parts(corners: [Point3; BOX_CORNERS], transform: Transform, half_extents: Vec3) -> Self {
        Self {
            corners,
            transform,
            half_extents,
        }
    }

    /// The 8 corners in canonical order.
    pub fn corners(&self) -> &[Point3; BOX_CORNERS] {
        &self.corners
    }

    /// Homogeneous transform from the box's local frame to world space.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Half-extents along the local axes.
    pub fn half_extents(&self) -> &Vec3 {
        &self.half_extents
    }

    /// Full edge lengths along the local axes.
    pub fn extents(&self) -> Vec3 {
        self.half_extents * 2.0
    }

    /// Box center in world space.
    pub fn center(&self) -> Point3 {
        self.transform.origin()
    }

    /// Volume measured from the corners.
    ///
    /// Product of the three canonical edges leaving corner 0
    /// (towards corners 4, 2 and 1).
    pub fn volume(&self) -> f64 {
        let c = &self.corners;
        (c[4] - c[0]).norm() * (c[2] - c[0]).norm() * (c[1] - c[0]).norm()
    }

    /// The 12 wireframe edges as corner point pairs, in [`BOX_EDGES`] order.
    pub fn edges(&self) -> [(Point3, Point3); 12] {
        BOX_EDGES.map(|(a, b)| (self.corners[a], self.corners[b]))
    }

    /// True if all corners, the transform and the extents are finite.
    pub fn is_finite(&self) -> bool {
        self.transform.is_finite()
            && self.half_extents.iter().all(|x| x.is_finite())
            && self
                .corners
                .iter()
                .all(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite())
    }

    /// Check that the corners are reproduced by transform and extents.
    pub fn is_consistent(&self, tol: &Tolerance) -> bool {
        if !self.is_finite() {
            return false;
        }
        let expected = corners_from(&self.transform, &self.half_extents);
        self.corners
            .iter()
            .zip(expected.iter())
            .all(|(a, b)| tol.points_equal(a, b))
    }
}

/// Enumerate the 8 corners of a box given its frame and half-extents.
pub fn corners_from(transform: &Transform, half_extents: &Vec3) -> [Point3; BOX_CORNERS] {
    CORNER_SIGNS.map(|s| {
        let local = Point3::new(
            s[0] * half_extents.x,
            s[1] * half_extents.y,
            s[2] * half_extents.z,
        );
        transform.apply_point(&local)
    })
}
