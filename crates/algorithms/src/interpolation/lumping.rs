//! Lumping: coarsening scattered samples onto a square lattice
//!
//! A coordinate `v` belongs to lump `(v + c/2) div c` (integer halving), so
//! lump `k` is centred on full-resolution coordinate `k * c`. Samples in the
//! same lump are averaged.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView2};

use fwdet_core::{Error, Result};

use super::SamplePoint;

/// Lump index of a non-negative coordinate
#[inline]
fn lump_coord(v: f64, factor: usize) -> f64 {
    ((v + (factor / 2) as f64) / factor as f64).floor()
}

fn check_factor(factor: usize) -> Result<()> {
    if factor == 0 {
        return Err(Error::InvalidParameter {
            name: "averaging_constant",
            value: "0".into(),
            reason: "must be at least 1".into(),
        });
    }
    Ok(())
}

/// Average samples falling into the same lump.
///
/// Output coordinates are lump indices. Non-finite values are skipped.
/// Lumps come out ordered by x, then y.
pub fn lump(points: &[SamplePoint], factor: usize) -> Result<Vec<SamplePoint>> {
    check_factor(factor)?;

    let mut sums: BTreeMap<(i64, i64), (f64, usize)> = BTreeMap::new();
    for p in points.iter().filter(|p| p.value.is_finite()) {
        let key = (
            lump_coord(p.x, factor) as i64,
            lump_coord(p.y, factor) as i64,
        );
        let entry = sums.entry(key).or_insert((0.0, 0));
        entry.0 += p.value;
        entry.1 += 1;
    }

    Ok(sums
        .into_iter()
        .map(|((x, y), (sum, n))| SamplePoint::new(x as f64, y as f64, sum / n as f64))
        .collect())
}

/// The lattice of lump centres covering a full-resolution grid.
///
/// Node `(i, j)` sits at lumped coordinate `(x = j, y = i)`, which is
/// full-resolution cell `(row = i * factor, col = j * factor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoarseLattice {
    factor: usize,
    full: (usize, usize),
    nodes: (usize, usize),
}

impl CoarseLattice {
    pub fn new(shape: (usize, usize), factor: usize) -> Result<Self> {
        check_factor(factor)?;
        let count = |n: usize| if n == 0 { 0 } else { (n - 1 + factor / 2) / factor + 1 };
        Ok(Self {
            factor,
            full: shape,
            nodes: (count(shape.0), count(shape.1)),
        })
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Node counts as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.nodes
    }

    /// Shape of the full-resolution grid
    pub fn full_shape(&self) -> (usize, usize) {
        self.full
    }

    /// Lumped (x, y) of every node, row-major
    pub fn node_coords(&self) -> Vec<(f64, f64)> {
        let (nr, nc) = self.nodes;
        (0..nr)
            .flat_map(|i| (0..nc).map(move |j| (j as f64, i as f64)))
            .collect()
    }

    /// Full-resolution grid taking each cell's value from its own lump.
    pub fn refine_nearest(&self, coarse: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_coarse(coarse)?;
        let half = self.factor / 2;
        Ok(Array2::from_shape_fn(self.full, |(r, c)| {
            coarse[[(r + half) / self.factor, (c + half) / self.factor]]
        }))
    }

    /// Full-resolution grid by bilinear interpolation between lattice nodes.
    ///
    /// Cells past the last node take the edge value.
    pub fn refine_bilinear(&self, coarse: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_coarse(coarse)?;
        let (nr, nc) = self.nodes;
        let f = self.factor;

        // (lower node, upper node, weight of upper) along one axis
        let axis = |v: usize, n: usize| {
            let lo = (v / f).min(n - 1);
            let hi = (lo + 1).min(n - 1);
            let t = if hi == lo { 0.0 } else { (v - lo * f) as f64 / f as f64 };
            (lo, hi, t)
        };

        Ok(Array2::from_shape_fn(self.full, |(r, c)| {
            let (r0, r1, tr) = axis(r, nr);
            let (c0, c1, tc) = axis(c, nc);
            let top = lerp(coarse[[r0, c0]], coarse[[r0, c1]], tc);
            let bottom = lerp(coarse[[r1, c0]], coarse[[r1, c1]], tc);
            lerp(top, bottom, tr)
        }))
    }

    fn check_coarse(&self, coarse: ArrayView2<'_, f64>) -> Result<()> {
        if coarse.dim() != self.nodes {
            return Err(Error::SizeMismatch {
                er: self.nodes.0,
                ec: self.nodes.1,
                ar: coarse.nrows(),
                ac: coarse.ncols(),
            });
        }
        Ok(())
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    if t == 0.0 { a } else { a + (b - a) * t }
}
