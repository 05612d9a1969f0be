//! Zero-mean Gaussian-process regression with a squared-exponential kernel
//!
//! ```text
//! k(a, b) = exp(-|a - b|² / (2ℓ²))
//! ```
//!
//! The posterior mean at `q` is `Σ αᵢ k(q, pᵢ)` with `α = (K + σ²I)⁻¹ y`.

use std::f64::consts::PI;

use fwdet_core::{Error, Result};
use tracing::debug;

use super::linalg::{cholesky, cholesky_solve};

/// Diagonal jitter tried, in order, after the configured noise fails
const JITTER_LADDER: [f64; 4] = [1e-8, 1e-6, 1e-4, 1e-2];

/// Range the fitted length scale is confined to
const LENGTH_SCALE_BOUNDS: (f64, f64) = (1e-5, 1e5);

/// Coarse likelihood scan at `initial · 2ᵏ`
const SCAN_OCTAVES: std::ops::RangeInclusive<i32> = -8..=4;

/// Golden-section steps refining the best scan point
const GOLDEN_STEPS: usize = 24;

/// A fitted Gaussian process.
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    coords: Vec<(f64, f64)>,
    alpha: Vec<f64>,
    inv_two_l2: f64,
    length_scale: f64,
}

impl GaussianProcess {
    /// Condition the process on `targets` observed at `coords`.
    ///
    /// `noise` is added to the kernel diagonal. If the matrix is not
    /// positive definite, increasing jitter is added until the Cholesky
    /// factorisation succeeds, or [`Error::Singular`] is returned.
    pub fn fit(
        coords: &[(f64, f64)],
        targets: &[f64],
        length_scale: f64,
        noise: f64,
    ) -> Result<Self> {
        if coords.len() != targets.len() {
            return Err(Error::Algorithm(format!(
                "{} coordinates but {} targets",
                coords.len(),
                targets.len()
            )));
        }
        if !(length_scale.is_finite() && length_scale > 0.0) {
            return Err(Error::InvalidParameter {
                name: "length_scale",
                value: length_scale.to_string(),
                reason: "must be positive and finite".into(),
            });
        }

        let n = coords.len();
        let kernel = kernel_matrix(coords, length_scale);
        let ladder = std::iter::once(noise).chain(JITTER_LADDER.into_iter().filter(|&j| j > noise));
        for jitter in ladder {
            let mut mat = kernel.clone();
            add_diagonal(&mut mat, n, jitter);
            if let Some(l) = cholesky(n, &mat) {
                if jitter != noise {
                    debug!(n, jitter, "kernel matrix needed extra jitter");
                }
                return Ok(Self {
                    coords: coords.to_vec(),
                    alpha: cholesky_solve(n, &l, targets),
                    inv_two_l2: inv_two_l2(length_scale),
                    length_scale,
                });
            }
        }

        Err(Error::Singular(format!(
            "kernel matrix of {n} samples is not positive definite"
        )))
    }

    /// Fit with the length scale that maximises the marginal likelihood,
    /// searched around `initial`.
    pub fn fit_optimised(
        coords: &[(f64, f64)],
        targets: &[f64],
        initial: f64,
        noise: f64,
    ) -> Result<Self> {
        let length_scale = optimise_length_scale(coords, targets, initial, noise);
        debug!(n = coords.len(), initial, length_scale, "length scale fitted");
        Self::fit(coords, targets, length_scale, noise)
    }

    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    /// Posterior mean at (x, y)
    pub fn predict(&self, x: f64, y: f64) -> f64 {
        self.coords
            .iter()
            .zip(&self.alpha)
            .map(|(&c, &a)| a * rbf((x, y), c, self.inv_two_l2))
            .sum()
    }
}

/// Log marginal likelihood `log p(y | ℓ)` of a unit-variance RBF process.
///
/// `None` when the kernel matrix is not positive definite at this noise.
pub fn log_marginal_likelihood(
    coords: &[(f64, f64)],
    targets: &[f64],
    length_scale: f64,
    noise: f64,
) -> Option<f64> {
    let n = coords.len();
    if n == 0 || targets.len() != n {
        return None;
    }
    let mut mat = kernel_matrix(coords, length_scale);
    add_diagonal(&mut mat, n, noise);
    let l = cholesky(n, &mat)?;
    let alpha = cholesky_solve(n, &l, targets);

    let fit: f64 = targets.iter().zip(&alpha).map(|(y, a)| y * a).sum();
    let log_det: f64 = (0..n).map(|i| l[i * n + i].ln()).sum();
    let value = -0.5 * fit - log_det - 0.5 * n as f64 * (2.0 * PI).ln();
    value.is_finite().then_some(value)
}

/// Maximum-likelihood length scale.
///
/// Scans octaves around `initial`, then refines the best one by golden
/// section on `ln ℓ`. Returns `initial` when the targets are all zero or no
/// candidate factorises.
pub fn optimise_length_scale(
    coords: &[(f64, f64)],
    targets: &[f64],
    initial: f64,
    noise: f64,
) -> f64 {
    if targets.iter().all(|t| t.abs() < 1e-12) {
        return initial;
    }
    let (lo, hi) = LENGTH_SCALE_BOUNDS;
    let score = |l: f64| log_marginal_likelihood(coords, targets, l, noise);

    let mut best: Option<(f64, f64)> = None;
    for k in SCAN_OCTAVES {
        let l = (initial * 2f64.powi(k)).clamp(lo, hi);
        match (score(l), best) {
            (Some(v), Some((_, b))) if v <= b => {}
            (Some(v), _) => best = Some((l, v)),
            (None, _) => {}
        }
    }
    let Some((best_l, best_v)) = best else {
        return initial;
    };

    let f = |t: f64| score(t.exp()).unwrap_or(f64::NEG_INFINITY);
    let ratio = (5f64.sqrt() - 1.0) / 2.0;
    let (mut a, mut b) = ((best_l / 2.0).max(lo).ln(), (best_l * 2.0).min(hi).ln());
    let (mut c, mut d) = (b - ratio * (b - a), a + ratio * (b - a));
    let (mut fc, mut fd) = (f(c), f(d));
    for _ in 0..GOLDEN_STEPS {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - ratio * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + ratio * (b - a);
            fd = f(d);
        }
    }

    let t = 0.5 * (a + b);
    if f(t) > best_v { t.exp() } else { best_l }
}

fn inv_two_l2(length_scale: f64) -> f64 {
    1.0 / (2.0 * length_scale * length_scale)
}

/// Dense symmetric RBF kernel, row-major
fn kernel_matrix(coords: &[(f64, f64)], length_scale: f64) -> Vec<f64> {
    let inv = inv_two_l2(length_scale);
    let n = coords.len();
    let mut kernel = vec![0.0_f64; n * n];
    for i in 0..n {
        for j in 0..=i {
            let k = rbf(coords[i], coords[j], inv);
            kernel[i * n + j] = k;
            kernel[j * n + i] = k;
        }
    }
    kernel
}

fn add_diagonal(mat: &mut [f64], n: usize, value: f64) {
    for i in 0..n {
        mat[i * n + i] += value;
    }
}

#[inline]
fn rbf(a: (f64, f64), b: (f64, f64), inv_two_l2: f64) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (-(dx * dx + dy * dy) * inv_two_l2).exp()
}
