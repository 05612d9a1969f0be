//! TIN (Triangulated Irregular Network) interpolation
//!
//! Builds a Delaunay triangulation of the samples with the incremental
//! Bowyer-Watson algorithm and interpolates linearly inside each triangle
//! using barycentric coordinates. Cells outside the convex hull take the
//! nearest sample's value or stay missing, per [`HullFallback`].

use std::collections::HashMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::maybe_rayon::*;
use fwdet_core::{Error, Result};

use super::kdtree::KdTree;
use super::SamplePoint;

/// What cells outside the triangulated hull receive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HullFallback {
    /// Value of the nearest sample
    #[default]
    Nearest,
    /// NaN
    Missing,
}

/// Parameters for TIN interpolation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TinParams {
    pub hull_fallback: HullFallback,
}

/// A triangle defined by three indices into the sample slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub v0: usize,
    pub v1: usize,
    pub v2: usize,
}

#[derive(Debug, Clone, Copy)]
struct Circumcircle {
    cx: f64,
    cy: f64,
    radius_sq: f64,
}

impl Circumcircle {
    fn of(p0: &SamplePoint, p1: &SamplePoint, p2: &SamplePoint) -> Option<Self> {
        let (ax, ay) = (p0.x, p0.y);
        let (bx, by) = (p1.x, p1.y);
        let (cx, cy) = (p2.x, p2.y);

        let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
        if d.abs() < 1e-12 {
            return None;
        }

        let a2 = ax * ax + ay * ay;
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
        let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;

        Some(Self {
            cx: ux,
            cy: uy,
            radius_sq: p0.dist_sq(ux, uy),
        })
    }

    fn contains(&self, p: &SamplePoint) -> bool {
        p.dist_sq(self.cx, self.cy) <= self.radius_sq
    }
}

/// Barycentric coordinates (u, v, w) of (px, py) in triangle (p0, p1, p2)
fn barycentric(
    px: f64,
    py: f64,
    p0: &SamplePoint,
    p1: &SamplePoint,
    p2: &SamplePoint,
) -> (f64, f64, f64) {
    let (e0x, e0y) = (p1.x - p0.x, p1.y - p0.y);
    let (e1x, e1y) = (p2.x - p0.x, p2.y - p0.y);
    let (qx, qy) = (px - p0.x, py - p0.y);

    let d00 = e0x * e0x + e0y * e0y;
    let d01 = e0x * e1x + e0y * e1y;
    let d11 = e1x * e1x + e1y * e1y;
    let d20 = qx * e0x + qy * e0y;
    let d21 = qx * e1x + qy * e1y;

    let inv_denom = 1.0 / (d00 * d11 - d01 * d01);
    let v = (d11 * d20 - d01 * d21) * inv_denom;
    let w = (d00 * d21 - d01 * d20) * inv_denom;
    (1.0 - v - w, v, w)
}

/// Twice the signed area of (a, b, p); positive when `p` is left of a→b
#[inline]
fn orient(a: &SamplePoint, b: &SamplePoint, p: &SamplePoint) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Working triangle of the mesh: counter-clockwise vertices, with `adj[i]`
/// the facet across the edge opposite `v[i]`
#[derive(Debug, Clone)]
struct Facet {
    v: [usize; 3],
    adj: [Option<usize>; 3],
    circle: Option<Circumcircle>,
    alive: bool,
}

/// Edge of an insertion cavity: `a → b` counter-clockwise around the cavity,
/// the dead facet it came from and the live facet outside it
struct RimEdge {
    a: usize,
    b: usize,
    inner: usize,
    outer: Option<usize>,
}

/// Super-triangle occupies vertex slots 0..3
const SUPER: usize = 3;

#[derive(Debug)]
struct Mesh {
    vertices: Vec<SamplePoint>,
    facets: Vec<Facet>,
}

impl Mesh {
    fn new(points: &[SamplePoint]) -> Self {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let delta = (max_x - min_x).max(max_y - min_y).max(1.0);
        let (mid_x, mid_y) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);

        let mut vertices = Vec::with_capacity(points.len() + SUPER);
        vertices.push(SamplePoint::new(mid_x - 20.0 * delta, mid_y - delta, 0.0));
        vertices.push(SamplePoint::new(mid_x + 20.0 * delta, mid_y - delta, 0.0));
        vertices.push(SamplePoint::new(mid_x, mid_y + 20.0 * delta, 0.0));
        vertices.extend_from_slice(points);

        let circle = Circumcircle::of(&vertices[0], &vertices[1], &vertices[2]);
        let facets = vec![Facet {
            v: [0, 1, 2],
            adj: [None; 3],
            circle,
            alive: true,
        }];
        Self { vertices, facets }
    }

    /// Walk from `start` towards `p` until a facet contains it.
    fn locate(&self, start: usize, p: &SamplePoint) -> Option<usize> {
        let mut t = start;
        for _ in 0..self.facets.len() {
            let f = &self.facets[t];
            let across = (0..3).find_map(|i| {
                let a = &self.vertices[f.v[(i + 1) % 3]];
                let b = &self.vertices[f.v[(i + 2) % 3]];
                if orient(a, b, p) < 0.0 { f.adj[i] } else { None }
            });
            match across {
                Some(next) => t = next,
                None => return Some(t),
            }
        }
        // The walk cycled on a degenerate configuration
        self.facets
            .iter()
            .position(|f| f.alive && f.circle.is_some_and(|c| c.contains(p)))
    }

    /// Insert vertex `vi`, starting the point location at `hint`.
    ///
    /// Returns a live facet touching the new vertex, the next walk start.
    fn insert(&mut self, vi: usize, hint: usize) -> usize {
        let p = self.vertices[vi];
        let Some(seed) = self.locate(hint, &p) else {
            return hint;
        };
        let duplicate = self.facets[seed]
            .v
            .iter()
            .any(|&v| self.vertices[v].dist_sq(p.x, p.y) < 1e-20);
        if duplicate {
            return seed;
        }

        // Facets whose circumcircle holds `p` form a connected cavity
        self.facets[seed].alive = false;
        let mut cavity = vec![seed];
        let mut next = 0;
        while next < cavity.len() {
            let adj = self.facets[cavity[next]].adj;
            next += 1;
            for n in adj.into_iter().flatten() {
                let f = &self.facets[n];
                if f.alive && f.circle.is_some_and(|c| c.contains(&p)) {
                    self.facets[n].alive = false;
                    cavity.push(n);
                }
            }
        }

        let mut rim = Vec::new();
        for &t in &cavity {
            let f = &self.facets[t];
            for i in 0..3 {
                let outer = f.adj[i];
                if outer.is_none_or(|n| self.facets[n].alive) {
                    rim.push(RimEdge {
                        a: f.v[(i + 1) % 3],
                        b: f.v[(i + 2) % 3],
                        inner: t,
                        outer,
                    });
                }
            }
        }

        // Fan the cavity rim around `p`
        let first = self.facets.len();
        let mut starting_at = HashMap::with_capacity(rim.len());
        let mut ending_at = HashMap::with_capacity(rim.len());
        for (k, edge) in rim.iter().enumerate() {
            let id = first + k;
            let (a, b) = (&self.vertices[edge.a], &self.vertices[edge.b]);
            self.facets.push(Facet {
                v: [edge.a, edge.b, vi],
                adj: [None, None, edge.outer],
                circle: Circumcircle::of(a, b, &p),
                alive: true,
            });
            starting_at.insert(edge.a, id);
            ending_at.insert(edge.b, id);
            if let Some(outer) = edge.outer {
                for slot in &mut self.facets[outer].adj {
                    if *slot == Some(edge.inner) {
                        *slot = Some(id);
                    }
                }
            }
        }
        for id in first..self.facets.len() {
            let [a, b, _] = self.facets[id].v;
            // Edge b→p is shared with the facet starting at b, p→a with the
            // facet ending at a
            self.facets[id].adj[0] = starting_at.get(&b).copied();
            self.facets[id].adj[1] = ending_at.get(&a).copied();
        }
        first
    }

    fn into_triangles(self) -> Vec<Triangle> {
        self.facets
            .into_iter()
            .filter(|f| f.alive && f.circle.is_some() && f.v.iter().all(|&v| v >= SUPER))
            .map(|f| Triangle {
                v0: f.v[0] - SUPER,
                v1: f.v[1] - SUPER,
                v2: f.v[2] - SUPER,
            })
            .collect()
    }
}

/// Spread the low 16 bits of `v` to the even bits
fn spread_bits(v: u32) -> u64 {
    let mut x = u64::from(v & 0xFFFF);
    x = (x | (x << 8)) & 0x00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333;
    (x | (x << 1)) & 0x5555_5555
}

/// splitmix64 finaliser: a fixed pseudo-random key per index
fn scramble(i: usize) -> u64 {
    let mut z = (i as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Biased randomised insertion order: a fixed shuffle cut into rounds of
/// doubling size, each round sorted along a Z-order curve.
fn insertion_order(points: &[SamplePoint]) -> Vec<usize> {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let span = (max_x - min_x).max(max_y - min_y).max(1e-12);
    let quantise = |v: f64, lo: f64| ((v - lo) / span * 65535.0) as u32;
    let z_key = |p: &SamplePoint| {
        spread_bits(quantise(p.x, min_x)) | (spread_bits(quantise(p.y, min_y)) << 1)
    };

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by_key(|&i| scramble(i));
    let mut lo = 1;
    while lo < order.len() {
        let hi = (lo * 2).min(order.len());
        order[lo..hi].sort_by_key(|&i| z_key(&points[i]));
        lo = hi;
    }
    order
}

/// Column extent of a triangle along row `y`, `None` when the row misses it
fn row_span(y: f64, corners: [&SamplePoint; 3]) -> Option<(f64, f64)> {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for k in 0..3 {
        let (a, b) = (corners[k], corners[(k + 1) % 3]);
        if y < a.y.min(b.y) || y > a.y.max(b.y) {
            continue;
        }
        let (x0, x1) = if a.y == b.y {
            (a.x.min(b.x), a.x.max(b.x))
        } else {
            let x = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
            (x, x)
        };
        lo = lo.min(x0);
        hi = hi.max(x1);
    }
    (lo <= hi).then_some((lo, hi))
}

/// Delaunay triangulation by incremental Bowyer-Watson insertion.
///
/// Points go in by a biased randomised order; each is located by walking the
/// facet adjacency from the previous insertion and its cavity is grown
/// through neighbours. Expected cost is `O(n log n)`, perimeter rings
/// included.
///
/// Returns an empty list for fewer than 3 points or a collinear set.
/// Indices refer to `points`.
pub fn delaunay(points: &[SamplePoint]) -> Vec<Triangle> {
    if points.len() < 3 {
        return Vec::new();
    }

    let mut mesh = Mesh::new(points);
    let mut hint = 0;
    for i in insertion_order(points) {
        hint = mesh.insert(i + SUPER, hint);
    }
    mesh.into_triangles()
}

/// Interpolate `points` (index-space coordinates) onto a grid of `shape`.
///
/// With 1 or 2 samples, or a collinear set, there is no triangle to
/// interpolate in and every cell takes its nearest sample (this requires
/// [`HullFallback::Nearest`] for fewer than 3 samples).
pub fn tin_interpolation(
    points: &[SamplePoint],
    shape: (usize, usize),
    params: &TinParams,
) -> Result<Array2<f64>> {
    let required = match params.hull_fallback {
        HullFallback::Nearest => 1,
        HullFallback::Missing => 3,
    };
    if points.len() < required {
        return Err(Error::InsufficientSamples {
            method: "linear",
            required,
            found: points.len(),
        });
    }

    let (rows, cols) = shape;
    let mut grid = Array2::from_elem(shape, f64::NAN);
    let triangles = delaunay(points);

    for tri in &triangles {
        let (p0, p1, p2) = (&points[tri.v0], &points[tri.v1], &points[tri.v2]);
        let lo_x = p0.x.min(p1.x).min(p2.x).ceil().max(0.0) as usize;
        let lo_y = p0.y.min(p1.y).min(p2.y).ceil().max(0.0) as usize;
        let hi_x = p0.x.max(p1.x).max(p2.x).floor();
        let hi_y = p0.y.max(p1.y).max(p2.y).floor();
        if hi_x < 0.0 || hi_y < 0.0 {
            continue;
        }
        let hi_x = (hi_x as usize).min(cols.saturating_sub(1));
        let hi_y = (hi_y as usize).min(rows.saturating_sub(1));

        for row in lo_y..=hi_y {
            let Some((x0, x1)) = row_span(row as f64, [p0, p1, p2]) else {
                continue;
            };
            let x1 = (x1 + 1e-9).floor();
            if x1 < 0.0 {
                continue;
            }
            let first = ((x0 - 1e-9).ceil().max(0.0) as usize).max(lo_x);
            let last = (x1 as usize).min(hi_x);
            for col in first..=last {
                if row >= rows || col >= cols || !grid[[row, col]].is_nan() {
                    continue;
                }
                let (u, v, w) = barycentric(col as f64, row as f64, p0, p1, p2);
                const EPS: f64 = -1e-10;
                if u >= EPS && v >= EPS && w >= EPS {
                    grid[[row, col]] = u * p0.value + v * p1.value + w * p2.value;
                }
            }
        }
    }

    let fill_nearest =
        triangles.is_empty() || params.hull_fallback == HullFallback::Nearest;
    if fill_nearest {
        let tree = KdTree::build(points);
        let filled: Vec<f64> = (0..rows)
            .into_par_iter()
            .flat_map(|row| {
                (0..cols)
                    .map(|col| {
                        let v = grid[[row, col]];
                        if !v.is_nan() {
                            return v;
                        }
                        tree.nearest(col as f64, row as f64)
                            .map_or(f64::NAN, |n| n.point.value)
                    })
                    .collect::<Vec<f64>>()
            })
            .collect();
        grid = Array2::from_shape_vec(shape, filled).map_err(|e| Error::Other(e.to_string()))?;
    }

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn corner_points() -> Vec<SamplePoint> {
        vec![
            SamplePoint::new(0.0, 0.0, 10.0),
            SamplePoint::new(8.0, 0.0, 20.0),
            SamplePoint::new(0.0, 8.0, 30.0),
            SamplePoint::new(8.0, 8.0, 40.0),
        ]
    }

    #[test]
    fn test_delaunay_square() {
        assert_eq!(delaunay(&corner_points()).len(), 2);
    }

    #[test]
    fn test_delaunay_grid_triangle_count() {
        // n points with h on the hull: 2n - h - 2 triangles
        let points: Vec<SamplePoint> = (0..5)
            .flat_map(|r| (0..5).map(move |c| SamplePoint::new(c as f64, r as f64, 0.0)))
            .collect();
        assert_eq!(delaunay(&points).len(), 2 * 25 - 16 - 2);
    }

    #[test]
    fn test_delaunay_collinear() {
        let points: Vec<SamplePoint> = (0..5)
            .map(|i| SamplePoint::new(i as f64, 2.0 * i as f64, 0.0))
            .collect();
        assert!(delaunay(&points).is_empty());
    }

    #[test]
    fn test_delaunay_circumcircles_are_empty() {
        let unit = |k: u64| (k >> 11) as f64 / (1u64 << 53) as f64;
        let points: Vec<SamplePoint> = (0..300)
            .map(|i| {
                let (x, y) = (unit(scramble(2 * i)), unit(scramble(2 * i + 1)));
                SamplePoint::new(100.0 * x, 100.0 * y, 0.0)
            })
            .collect();
        let triangles = delaunay(&points);
        assert!(triangles.len() > 500, "{} triangles", triangles.len());

        for t in &triangles {
            let cc = Circumcircle::of(&points[t.v0], &points[t.v1], &points[t.v2]).unwrap();
            for (i, p) in points.iter().enumerate() {
                if i != t.v0 && i != t.v1 && i != t.v2 {
                    assert!(p.dist_sq(cc.cx, cc.cy) >= cc.radius_sq * (1.0 - 1e-9));
                }
            }
        }
    }

    #[test]
    fn test_lobed_shoreline_reproduces_plane() {
        // A few thousand cells on a wavy closed curve, like a lake perimeter
        let plane = |x: f64, y: f64| 2.0 + 0.01 * x + 0.02 * y;
        let mut cells: Vec<(usize, usize)> = (0..4000)
            .map(|i| {
                let t = std::f64::consts::TAU * i as f64 / 4000.0;
                let radius = 300.0 * (1.0 + 0.3 * (7.0 * t).sin());
                (
                    (400.0 + radius * t.sin()).round() as usize,
                    (400.0 + radius * t.cos()).round() as usize,
                )
            })
            .collect();
        cells.sort_unstable();
        cells.dedup();
        let points: Vec<SamplePoint> = cells
            .iter()
            .map(|&(r, c)| SamplePoint::new(c as f64, r as f64, plane(c as f64, r as f64)))
            .collect();

        let params = TinParams {
            hull_fallback: HullFallback::Missing,
        };
        let grid = tin_interpolation(&points, (800, 800), &params).unwrap();
        assert!(grid[[400, 400]].is_finite());
        for ((r, c), &v) in grid.indexed_iter() {
            if v.is_finite() {
                assert_relative_eq!(v, plane(c as f64, r as f64), epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn test_insertion_order_is_a_permutation() {
        let points: Vec<SamplePoint> = (0..37)
            .map(|i| SamplePoint::new((i % 6) as f64, (i / 6) as f64, 0.0))
            .collect();
        let mut order = insertion_order(&points);
        assert_ne!(order, (0..37).collect::<Vec<_>>());
        order.sort_unstable();
        assert_eq!(order, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn test_plane_is_reproduced_inside_hull() {
        let plane = |x: f64, y: f64| 5.0 + x - 0.5 * y;
        let points: Vec<SamplePoint> = [(0.0, 0.0), (9.0, 0.0), (0.0, 9.0), (9.0, 9.0), (3.0, 5.0)]
            .iter()
            .map(|&(x, y)| SamplePoint::new(x, y, plane(x, y)))
            .collect();
        let grid = tin_interpolation(&points, (10, 10), &TinParams::default()).unwrap();
        for ((r, c), &v) in grid.indexed_iter() {
            assert_relative_eq!(v, plane(c as f64, r as f64), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_outside_hull_fallbacks() {
        let points = vec![
            SamplePoint::new(1.0, 1.0, 1.0),
            SamplePoint::new(3.0, 1.0, 2.0),
            SamplePoint::new(1.0, 3.0, 3.0),
        ];
        let nearest = tin_interpolation(&points, (6, 6), &TinParams::default()).unwrap();
        assert_relative_eq!(nearest[[5, 0]], 3.0);
        assert_relative_eq!(nearest[[0, 5]], 2.0);
        assert!(nearest.iter().all(|v| v.is_finite()));

        let params = TinParams {
            hull_fallback: HullFallback::Missing,
        };
        let missing = tin_interpolation(&points, (6, 6), &params).unwrap();
        assert!(missing[[5, 5]].is_nan());
        assert_relative_eq!(missing[[1, 2]], 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_few_samples() {
        let points = vec![SamplePoint::new(0.0, 0.0, 4.0), SamplePoint::new(4.0, 0.0, 8.0)];
        let grid = tin_interpolation(&points, (2, 5), &TinParams::default()).unwrap();
        assert_eq!(grid[[1, 1]], 4.0);
        assert_eq!(grid[[0, 3]], 8.0);

        let params = TinParams {
            hull_fallback: HullFallback::Missing,
        };
        assert!(matches!(
            tin_interpolation(&points, (2, 5), &params),
            Err(Error::InsufficientSamples { required: 3, found: 2, .. })
        ));
        assert!(tin_interpolation(&[], (2, 2), &TinParams::default()).is_err());
    }

    #[test]
    fn test_collinear_samples_use_nearest() {
        let points: Vec<SamplePoint> = (0..4)
            .map(|i| SamplePoint::new(i as f64 * 2.0, 0.0, i as f64))
            .collect();
        let params = TinParams {
            hull_fallback: HullFallback::Missing,
        };
        let grid = tin_interpolation(&points, (3, 7), &params).unwrap();
        assert_eq!(grid[[2, 6]], 3.0);
        assert!(grid.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_barycentric_centroid() {
        let p0 = SamplePoint::new(0.0, 0.0, 1.0);
        let p1 = SamplePoint::new(10.0, 0.0, 2.0);
        let p2 = SamplePoint::new(0.0, 10.0, 3.0);
        let (u, v, w) = barycentric(10.0 / 3.0, 10.0 / 3.0, &p0, &p1, &p2);
        assert_relative_eq!(u, 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(v, 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(w, 1.0 / 3.0, epsilon = 1e-12);
    }
}
