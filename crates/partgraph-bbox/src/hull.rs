//! Minimum-volume oriented box search over the convex hull.
//!
//! Candidate orientations are the principal frame of the hull plus, for every
//! hull triangle, the frame made of the triangle normal and each of its edges.
//! The candidate whose hull-aligned box has the smallest volume wins.

use nalgebra::Matrix3;
use parry3d_f64::transformation::try_convex_hull;
use partgraph_math::{Point3, Vec3};

use crate::bbox::BoundingBox;
use crate::principal::{box_from_bounds, local_bounds, PrincipalFrame};

/// Reason the hull search could not produce a box.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HullFailure(pub String);

/// Search hull-aligned orientations for the smallest box.
///
/// `max_faces` caps how many hull triangles seed candidates; larger hulls are
/// sampled with a uniform stride.
pub(crate) fn fit_hull(
    points: &[Point3],
    frame: &PrincipalFrame,
    max_faces: usize,
) -> Result<BoundingBox, HullFailure> {
    let (hull, triangles) =
        try_convex_hull(points).map_err(|e| HullFailure(format!("convex hull failed: {e:?}")))?;
    if hull.len() < 4 || triangles.len() < 4 {
        return Err(HullFailure(format!(
            "hull is not a solid ({} vertices, {} faces)",
            hull.len(),
            triangles.len()
        )));
    }

    let scale = hull
        .iter()
        .map(|p| (p - frame.centroid).norm())
        .fold(0.0f64, f64::max);
    let min_norm = 1e-12 * scale.max(f64::MIN_POSITIVE);

    let mut best_axes = frame.axes;
    let (mut best_min, mut best_max) = local_bounds(&hull, &best_axes);
    let mut best_volume = volume_of(&best_min, &best_max);

    let stride = triangles.len().div_ceil(max_faces.max(1));
    for tri in triangles.iter().step_by(stride) {
        let [p0, p1, p2] = tri.map(|i| hull[i as usize]);
        let Some(normal) = (p1 - p0).cross(&(p2 - p0)).try_normalize(min_norm * min_norm) else {
            continue;
        };
        for edge in [p1 - p0, p2 - p1, p0 - p2] {
            let in_plane = edge - normal * normal.dot(&edge);
            let Some(u) = in_plane.try_normalize(min_norm) else {
                continue;
            };
            let axes = Matrix3::from_columns(&[u, normal.cross(&u), normal]);
            let (min, max) = local_bounds(&hull, &axes);
            let volume = volume_of(&min, &max);
            if volume < best_volume {
                best_volume = volume;
                best_axes = axes;
                best_min = min;
                best_max = max;
            }
        }
    }

    if !best_volume.is_finite() {
        return Err(HullFailure("no finite candidate box".into()));
    }

    let (axes, min, max) = sort_by_extent(&best_axes, &best_min, &best_max);
    Ok(box_from_bounds(&axes, &min, &max))
}

fn volume_of(min: &Vec3, max: &Vec3) -> f64 {
    let d = max - min;
    d.x * d.y * d.z
}

/// Reorder the frame so extents ascend, keeping it right-handed.
fn sort_by_extent(axes: &Matrix3<f64>, min: &Vec3, max: &Vec3) -> (Matrix3<f64>, Vec3, Vec3) {
    let extent = max - min;
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| extent[a].total_cmp(&extent[b]));

    let mut sorted = Matrix3::from_columns(&[
        axes.column(order[0]).into_owned(),
        axes.column(order[1]).into_owned(),
        axes.column(order[2]).into_owned(),
    ]);
    let mut lo = Vec3::new(min[order[0]], min[order[1]], min[order[2]]);
    let mut hi = Vec3::new(max[order[0]], max[order[1]], max[order[2]]);

    if sorted.determinant() < 0.0 {
        // Flipping an axis mirrors its interval
        let flipped = -sorted.column(2);
        sorted.set_column(2, &flipped);
        let (l, h) = (-hi.z, -lo.z);
        lo.z = l;
        hi.z = h;
    }
    (sorted, lo, hi)
}
