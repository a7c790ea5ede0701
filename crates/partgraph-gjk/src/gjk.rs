//! GJK iteration over the Minkowski difference of two convex point sets.

use partgraph_math::{Point3, Vec3};

use crate::error::{DistanceError, InputError, Result};
use crate::simplex::{reduce, Reduced, SupportPoint};
use crate::GjkSettings;

/// Result of a proximity query between two convex shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct Proximity {
    /// Euclidean separation; exactly `0.0` when the shapes touch or overlap.
    pub distance: f64,
    /// Closest point on shape A.
    pub point_a: Point3,
    /// Closest point on shape B.
    pub point_b: Point3,
    /// True when the shapes touch or overlap.
    pub intersecting: bool,
    /// GJK iterations used.
    pub iterations: usize,
}

/// Check that a point set is non-empty and finite.
pub(crate) fn validate_points(points: &[Point3], shape: char) -> std::result::Result<(), InputError> {
    if points.is_empty() {
        return Err(InputError::EmptyShape { shape });
    }
    if let Some(index) = points
        .iter()
        .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
    {
        return Err(InputError::NonFinite { shape, index });
    }
    Ok(())
}

fn argmax(points: &[Point3], dir: &Vec3) -> usize {
    let mut best = 0;
    let mut best_dot = points[0].coords.dot(dir);
    for (i, p) in points.iter().enumerate().skip(1) {
        let d = p.coords.dot(dir);
        if d > best_dot {
            best = i;
            best_dot = d;
        }
    }
    best
}

/// Support point of `A - B` in direction `dir`.
fn support(a: &[Point3], b: &[Point3], dir: &Vec3) -> SupportPoint {
    SupportPoint::new(a, b, argmax(a, dir), argmax(b, &-dir))
}

fn touching(simplex: &Reduced, iterations: usize) -> Proximity {
    let (point_a, point_b) = simplex.witnesses();
    Proximity {
        distance: 0.0,
        point_a,
        point_b,
        intersecting: true,
        iterations,
    }
}

fn separated(simplex: &Reduced, distance: f64, iterations: usize) -> Proximity {
    let (point_a, point_b) = simplex.witnesses();
    Proximity {
        distance,
        point_a,
        point_b,
        intersecting: false,
        iterations,
    }
}

/// Minimum distance between the convex hulls of two point sets.
///
/// Separations at or below `settings.touch_tolerance` are reported as exactly
/// zero. Fails with [`DistanceError::Input`] on empty or non-finite input and
/// with [`DistanceError::NonConvergence`] when the iteration cap is hit.
pub fn closest_points(a: &[Point3], b: &[Point3], settings: &GjkSettings) -> Result<Proximity> {
    settings.validate()?;
    validate_points(a, 'A')?;
    validate_points(b, 'B')?;

    let touch_sq = settings.touch_tolerance * settings.touch_tolerance;
    let mut simplex = reduce(&[SupportPoint::new(a, b, 0, 0)]);
    let mut v = simplex.point();
    // Best lower bound on the distance seen so far
    let mut lower = f64::NEG_INFINITY;
    let mut iterations = 0;

    loop {
        let vv = v.norm_squared();
        if !vv.is_finite() {
            return Err(DistanceError::Numerical(format!(
                "search direction became non-finite after {iterations} iterations"
            )));
        }
        if simplex.contains_origin || vv <= touch_sq {
            return Ok(touching(&simplex, iterations));
        }
        if iterations >= settings.max_iterations {
            return Err(DistanceError::NonConvergence {
                iterations,
                gap: vv.sqrt() - lower.max(0.0),
            });
        }
        iterations += 1;

        let w = support(a, b, &-v);
        let vw = v.dot(&w.w);
        lower = lower.max(vw / vv.sqrt());

        if vv - vw <= settings.relative_tolerance * vv
            || simplex.vertices.iter().any(|p| p.ids == w.ids)
        {
            return Ok(separated(&simplex, vv.sqrt(), iterations));
        }

        let mut next = simplex.vertices.clone();
        next.push(w);
        let candidate = reduce(&next);
        let next_v = candidate.point();

        if !candidate.contains_origin && next_v.norm_squared() >= vv {
            // No progress: rounding has taken over
            if lower <= settings.touch_tolerance {
                return Ok(touching(&simplex, iterations));
            }
            return Ok(separated(&simplex, vv.sqrt(), iterations));
        }
        simplex = candidate;
        v = next_v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube(cx: f64, cy: f64, cz: f64, h: f64) -> Vec<Point3> {
        let mut pts = Vec::new();
        for sx in [-1.0, 1.0] {
            for sy in [-1.0, 1.0] {
                for sz in [-1.0, 1.0] {
                    pts.push(Point3::new(cx + sx * h, cy + sy * h, cz + sz * h));
                }
            }
        }
        pts
    }

    #[test]
    fn test_witness_points_on_separated_cubes() {
        let p = closest_points(&cube(0.0, 0.0, 0.0, 1.0), &cube(5.0, 0.5, 0.0, 1.0), &GjkSettings::default())
            .unwrap();
        assert!(!p.intersecting);
        assert_relative_eq!(p.distance, 3.0, epsilon = 1e-9);
        assert_relative_eq!(p.point_a.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(p.point_b.x, 4.0, epsilon = 1e-9);
        assert_relative_eq!((p.point_b - p.point_a).norm(), p.distance, epsilon = 1e-9);
    }

    #[test]
    fn test_point_against_cube() {
        let point = [Point3::new(0.0, 0.0, 4.0)];
        let p = closest_points(&point, &cube(0.0, 0.0, 0.0, 1.0), &GjkSettings::default()).unwrap();
        assert_relative_eq!(p.distance, 3.0, epsilon = 1e-9);
        assert_relative_eq!(p.point_b.z, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_overlap_reports_intersection() {
        let p = closest_points(&cube(0.0, 0.0, 0.0, 1.0), &cube(0.5, 0.5, 0.5, 1.0), &GjkSettings::default())
            .unwrap();
        assert!(p.intersecting);
        assert_eq!(p.distance, 0.0);
    }

    #[test]
    fn test_empty_shape_is_input_error() {
        let err = closest_points(&[], &cube(0.0, 0.0, 0.0, 1.0), &GjkSettings::default()).unwrap_err();
        assert_eq!(err, DistanceError::Input(InputError::EmptyShape { shape: 'A' }));
        assert!(err.is_input());
    }

    #[test]
    fn test_iteration_cap_is_reported() {
        let settings = GjkSettings {
            max_iterations: 1,
            ..Default::default()
        };
        let err = closest_points(&cube(0.0, 0.0, 0.0, 1.0), &cube(9.0, 0.0, 0.0, 1.0), &settings).unwrap_err();
        assert!(matches!(err, DistanceError::NonConvergence { iterations: 1, .. }));
        assert!(!err.is_input());
    }
}
