//! Closest point to the origin on a simplex of up to four support points.
//!
//! Each solver returns the smallest sub-simplex whose affine hull contains
//! the closest point, together with its barycentric weights. Region tests
//! follow the Voronoi-region classification for points, segments,
//! triangles and tetrahedra.

use partgraph_math::{Point3, Vec3};

/// A vertex of the Minkowski difference `A - B` with the points it came from.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SupportPoint {
    pub w: Vec3,
    pub a: Point3,
    pub b: Point3,
    pub ids: (usize, usize),
}

impl SupportPoint {
    pub fn new(a: &[Point3], b: &[Point3], ia: usize, ib: usize) -> Self {
        Self {
            w: a[ia] - b[ib],
            a: a[ia],
            b: b[ib],
            ids: (ia, ib),
        }
    }
}

/// Reduced simplex with barycentric weights of the closest point.
#[derive(Debug, Clone)]
pub(crate) struct Reduced {
    pub vertices: Vec<SupportPoint>,
    pub weights: Vec<f64>,
    /// The origin lies inside a full-dimensional tetrahedron.
    pub contains_origin: bool,
}

impl Reduced {
    fn single(p: SupportPoint) -> Self {
        Self {
            vertices: vec![p],
            weights: vec![1.0],
            contains_origin: false,
        }
    }

    fn pair(p: SupportPoint, q: SupportPoint, t: f64) -> Self {
        if t <= 0.0 {
            Self::single(p)
        } else if t >= 1.0 {
            Self::single(q)
        } else {
            Self {
                vertices: vec![p, q],
                weights: vec![1.0 - t, t],
                contains_origin: false,
            }
        }
    }

    /// Closest point of the simplex to the origin.
    pub fn point(&self) -> Vec3 {
        self.vertices
            .iter()
            .zip(&self.weights)
            .map(|(p, &l)| p.w * l)
            .sum()
    }

    /// Matching points on the two source shapes.
    pub fn witnesses(&self) -> (Point3, Point3) {
        let mut pa = Vec3::zeros();
        let mut pb = Vec3::zeros();
        for (p, &l) in self.vertices.iter().zip(&self.weights) {
            pa += p.a.coords * l;
            pb += p.b.coords * l;
        }
        (Point3::from(pa), Point3::from(pb))
    }
}

/// Reduce a simplex of 1 to 4 support points.
pub(crate) fn reduce(simplex: &[SupportPoint]) -> Reduced {
    match *simplex {
        [p] => Reduced::single(p),
        [p, q] => segment(p, q),
        [p, q, r] => triangle(p, q, r),
        [p, q, r, s] => tetrahedron(p, q, r, s),
        _ => unreachable!("simplex has 1 to 4 vertices, got {}", simplex.len()),
    }
}

/// `n / d` clamped to `[0, 1]`; zero when `d` vanishes.
fn ratio(n: f64, d: f64) -> f64 {
    if d > 0.0 {
        (n / d).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn nearest(candidates: impl IntoIterator<Item = Reduced>) -> Option<Reduced> {
    candidates
        .into_iter()
        .min_by(|x, y| x.point().norm_squared().total_cmp(&y.point().norm_squared()))
}

fn segment(p: SupportPoint, q: SupportPoint) -> Reduced {
    let d = q.w - p.w;
    Reduced::pair(p, q, ratio(-p.w.dot(&d), d.norm_squared()))
}

fn triangle(a: SupportPoint, b: SupportPoint, c: SupportPoint) -> Reduced {
    let ab = b.w - a.w;
    let ac = c.w - a.w;

    let ap = -a.w;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return Reduced::single(a);
    }

    let bp = -b.w;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return Reduced::single(b);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return Reduced::pair(a, b, ratio(d1, d1 - d3));
    }

    let cp = -c.w;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return Reduced::single(c);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return Reduced::pair(a, c, ratio(d2, d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && d4 - d3 >= 0.0 && d5 - d6 >= 0.0 {
        return Reduced::pair(b, c, ratio(d4 - d3, (d4 - d3) + (d5 - d6)));
    }

    let sum = va + vb + vc;
    if !(sum > f64::EPSILON * ab.norm_squared() * ac.norm_squared()) {
        // Collinear: the closest point lies on one of the edges
        return nearest([segment(a, b), segment(b, c), segment(a, c)])
            .unwrap_or_else(|| Reduced::single(a));
    }
    let v = vb / sum;
    let w = vc / sum;
    Reduced {
        vertices: vec![a, b, c],
        weights: vec![1.0 - v - w, v, w],
        contains_origin: false,
    }
}

fn det(x: &Vec3, y: &Vec3, z: &Vec3) -> f64 {
    x.cross(y).dot(z)
}

/// True if the origin and `opposite` lie strictly on different sides of plane `pqr`.
fn origin_outside(p: &SupportPoint, q: &SupportPoint, r: &SupportPoint, opposite: &SupportPoint) -> bool {
    let n = (q.w - p.w).cross(&(r.w - p.w));
    let side_origin = (-p.w).dot(&n);
    let side_opposite = (opposite.w - p.w).dot(&n);
    side_origin * side_opposite < 0.0
}

fn tetrahedron(a: SupportPoint, b: SupportPoint, c: SupportPoint, d: SupportPoint) -> Reduced {
    let ab = b.w - a.w;
    let ac = c.w - a.w;
    let ad = d.w - a.w;
    let volume = det(&ab, &ac, &ad);
    let edge = ab.norm().max(ac.norm()).max(ad.norm());
    let flat = volume.abs() <= 1e-12 * edge * edge * edge;

    let faces = [(a, b, c, d), (a, c, d, b), (a, d, b, c), (b, d, c, a)];
    let outside = faces
        .iter()
        .filter(|(p, q, r, o)| flat || origin_outside(p, q, r, o))
        .map(|&(p, q, r, _)| triangle(p, q, r));
    if let Some(best) = nearest(outside) {
        return best;
    }

    let ao = -a.w;
    let lb = det(&ao, &ac, &ad) / volume;
    let lc = det(&ab, &ao, &ad) / volume;
    let ld = det(&ab, &ac, &ao) / volume;
    Reduced {
        vertices: vec![a, b, c, d],
        weights: vec![1.0 - lb - lc - ld, lb, lc, ld],
        contains_origin: true,
    }
}
