//! Local thin-plate spline interpolation on a lumped lattice
//!
//! Each lattice node is evaluated with a spline fitted to its `neighbors`
//! nearest lumped samples:
//! ```text
//! f(x,y) = a₁ + a₂·x + a₃·y + Σᵢ wᵢ · U(‖(x,y) - (xᵢ,yᵢ)‖),   U(r) = r²·ln(r)
//! ```
//! Nodes sharing the same neighbour set share one solve. The lattice is then
//! refined to full resolution by bilinear interpolation.
//!
//! Reference:
//! Duchon, J. (1976). Interpolation des fonctions de deux variables suivant
//! le principe de la flexion des plaques minces. RAIRO Analyse Numérique.

use std::collections::HashMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::maybe_rayon::*;
use fwdet_core::{Error, Result};

use super::kdtree::KdTree;
use super::linalg::gauss_solve;
use super::lumping::{lump, CoarseLattice};
use super::SamplePoint;

/// Parameters for local thin-plate spline interpolation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TpsParams {
    /// Side of the lumping square in cells (60 suits 25 m data, 300 suits 5 m)
    pub averaging_constant: usize,
    /// Lumped samples used by each local spline
    pub neighbors: usize,
}

impl Default for TpsParams {
    fn default() -> Self {
        Self {
            averaging_constant: 60,
            neighbors: 100,
        }
    }
}

impl TpsParams {
    pub fn validate(&self) -> Result<()> {
        if self.averaging_constant == 0 {
            return Err(Error::InvalidParameter {
                name: "averaging_constant",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.neighbors < 3 {
            return Err(Error::InvalidParameter {
                name: "neighbors",
                value: self.neighbors.to_string(),
                reason: "a degree-1 spline needs at least 3 neighbours".into(),
            });
        }
        Ok(())
    }
}

/// TPS radial basis function: U(r) = r² · ln(r), with U(0) = 0
#[inline]
fn tps_kernel(r: f64) -> f64 {
    if r < 1e-15 { 0.0 } else { r * r * r.ln() }
}

/// A thin-plate spline through a handful of samples
#[derive(Debug)]
enum LocalSurface {
    Spline {
        centre: (f64, f64),
        points: Vec<SamplePoint>,
        weights: Vec<f64>,
        affine: [f64; 3],
    },
    /// Singular spline system: inverse-distance weighting of the same samples
    Idw(Vec<SamplePoint>),
}

impl LocalSurface {
    fn fit(points: Vec<SamplePoint>) -> Self {
        // Shift to the local centroid; the kernel only sees distances
        let n = points.len();
        let cx = points.iter().map(|p| p.x).sum::<f64>() / n as f64;
        let cy = points.iter().map(|p| p.y).sum::<f64>() / n as f64;

        // [K  P] [w]   [z]
        // [Pᵀ 0] [a] = [0]
        let m = n + 3;
        let mut mat = vec![0.0_f64; m * m];
        let mut rhs = vec![0.0_f64; m];
        for (i, pi) in points.iter().enumerate() {
            for (j, pj) in points.iter().enumerate().skip(i + 1) {
                let k = tps_kernel(pi.dist(pj.x, pj.y));
                mat[i * m + j] = k;
                mat[j * m + i] = k;
            }
            let (x, y) = (pi.x - cx, pi.y - cy);
            for (col, v) in [1.0, x, y].into_iter().enumerate() {
                mat[i * m + n + col] = v;
                mat[(n + col) * m + i] = v;
            }
            rhs[i] = pi.value;
        }

        match gauss_solve(m, &mut mat, &mut rhs) {
            Ok(coeffs) => Self::Spline {
                centre: (cx, cy),
                weights: coeffs[..n].to_vec(),
                affine: [coeffs[n], coeffs[n + 1], coeffs[n + 2]],
                points,
            },
            Err(_) => Self::Idw(points),
        }
    }

    fn evaluate(&self, x: f64, y: f64) -> f64 {
        match self {
            Self::Spline {
                centre,
                points,
                weights,
                affine,
            } => {
                let poly = affine[0] + affine[1] * (x - centre.0) + affine[2] * (y - centre.1);
                poly + points
                    .iter()
                    .zip(weights)
                    .map(|(p, w)| w * tps_kernel(p.dist(x, y)))
                    .sum::<f64>()
            }
            Self::Idw(points) => idw(points, x, y),
        }
    }
}

/// Inverse-distance weighting with power 2; exact at sample locations.
fn idw(points: &[SamplePoint], x: f64, y: f64) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for p in points {
        let d2 = p.dist_sq(x, y);
        if d2 < 1e-20 {
            return p.value;
        }
        num += p.value / d2;
        den += 1.0 / d2;
    }
    num / den
}

/// Interpolate `points` (index-space coordinates) onto a grid of `shape`.
///
/// Fails with [`Error::InsufficientSamples`] when fewer than 3 lumped
/// samples remain.
pub fn tps_interpolation(
    points: &[SamplePoint],
    shape: (usize, usize),
    params: &TpsParams,
) -> Result<Array2<f64>> {
    params.validate()?;

    let lumped = lump(points, params.averaging_constant)?;
    if lumped.len() < 3 {
        return Err(Error::InsufficientSamples {
            method: "thin-plate spline",
            required: 3,
            found: lumped.len(),
        });
    }

    let lattice = CoarseLattice::new(shape, params.averaging_constant)?;
    let nodes = lattice.node_coords();
    let tree = KdTree::build(&lumped);
    let k = params.neighbors.min(lumped.len());

    // Group nodes by neighbour set, keeping first-seen order
    let mut groups: Vec<(Vec<usize>, Vec<usize>)> = Vec::new();
    let mut slot: HashMap<Vec<usize>, usize> = HashMap::new();
    for (node, &(x, y)) in nodes.iter().enumerate() {
        let mut key: Vec<usize> = tree.k_nearest(x, y, k).iter().map(|r| r.index).collect();
        key.sort_unstable();
        match slot.get(&key) {
            Some(&g) => groups[g].1.push(node),
            None => {
                slot.insert(key.clone(), groups.len());
                groups.push((key, vec![node]));
            }
        }
    }
    debug!(
        nodes = nodes.len(),
        samples = lumped.len(),
        systems = groups.len(),
        "local thin-plate spline systems"
    );

    let solved: Vec<Vec<(usize, f64)>> = groups
        .into_par_iter()
        .map(|(key, members)| {
            let surface = LocalSurface::fit(key.iter().map(|&i| lumped[i]).collect());
            members
                .into_iter()
                .map(|node| {
                    let (x, y) = nodes[node];
                    (node, surface.evaluate(x, y))
                })
                .collect()
        })
        .collect();

    let mut coarse = vec![f64::NAN; nodes.len()];
    for (node, value) in solved.into_iter().flatten() {
        coarse[node] = value;
    }
    let coarse = Array2::from_shape_vec(lattice.shape(), coarse)
        .map_err(|e| Error::Other(e.to_string()))?;

    lattice.refine_bilinear(coarse.view())
}
