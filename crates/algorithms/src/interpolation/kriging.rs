//! Regression kriging on a lumped lattice
//!
//! 1. Lump samples into `averaging_constant` squares and average
//! 2. Fit an OLS plane to the lumped samples
//! 3. Condition a zero-mean Gaussian process on the plane residuals, with
//!    the length scale fitted by maximum likelihood
//! 4. Predict plane + GP mean at every lattice node
//! 5. Give each full-resolution cell the prediction of its own lump

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::maybe_rayon::*;
use fwdet_core::{Error, Result};

use super::gaussian_process::GaussianProcess;
use super::lumping::{lump, CoarseLattice};
use super::regression::LinearTrend;
use super::SamplePoint;

/// Parameters for regression kriging
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KrigingParams {
    /// Side of the lumping square in cells (60 suits 25 m data, 300 suits 5 m)
    pub averaging_constant: usize,
    /// RBF length scale in lumped units; the starting point when optimised
    pub length_scale: f64,
    /// Fit the length scale to the residuals by maximum likelihood
    pub optimise_length_scale: bool,
    /// Noise variance added to the kernel diagonal
    pub noise: f64,
}

impl Default for KrigingParams {
    fn default() -> Self {
        Self {
            averaging_constant: 60,
            length_scale: 72.0 / 4.0,
            optimise_length_scale: true,
            noise: 1e-10,
        }
    }
}

impl KrigingParams {
    pub fn validate(&self) -> Result<()> {
        if self.averaging_constant == 0 {
            return Err(Error::InvalidParameter {
                name: "averaging_constant",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        if !(self.length_scale.is_finite() && self.length_scale > 0.0) {
            return Err(Error::InvalidParameter {
                name: "length_scale",
                value: self.length_scale.to_string(),
                reason: "must be positive and finite".into(),
            });
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "noise",
                value: self.noise.to_string(),
                reason: "must be non-negative and finite".into(),
            });
        }
        Ok(())
    }
}

/// Interpolate `points` (index-space coordinates) onto a grid of `shape`.
///
/// Fails with [`Error::InsufficientSamples`] when no finite sample remains
/// after lumping, and [`Error::Singular`] when the kernel matrix cannot be
/// factorised even with jitter.
pub fn kriging_interpolation(
    points: &[SamplePoint],
    shape: (usize, usize),
    params: &KrigingParams,
) -> Result<Array2<f64>> {
    params.validate()?;

    let lumped = lump(points, params.averaging_constant)?;
    if lumped.is_empty() {
        return Err(Error::InsufficientSamples {
            method: "kriging",
            required: 1,
            found: 0,
        });
    }

    let trend = LinearTrend::fit(&lumped);
    let coords: Vec<(f64, f64)> = lumped.iter().map(|p| (p.x, p.y)).collect();
    let residuals: Vec<f64> = lumped
        .iter()
        .map(|p| p.value - trend.predict(p.x, p.y))
        .collect();
    let gp = if params.optimise_length_scale {
        GaussianProcess::fit_optimised(&coords, &residuals, params.length_scale, params.noise)?
    } else {
        GaussianProcess::fit(&coords, &residuals, params.length_scale, params.noise)?
    };

    let lattice = CoarseLattice::new(shape, params.averaging_constant)?;
    let predictions: Vec<f64> = lattice
        .node_coords()
        .into_par_iter()
        .map(|(x, y)| trend.predict(x, y) + gp.predict(x, y))
        .collect();
    let coarse = Array2::from_shape_vec(lattice.shape(), predictions)
        .map_err(|e| Error::Other(e.to_string()))?;

    lattice.refine_nearest(coarse.view())
}
