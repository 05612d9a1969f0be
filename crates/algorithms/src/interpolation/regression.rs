//! First-order trend surface fitted by ordinary least squares

use fwdet_core::{Error, Result};

use super::linalg::gauss_solve;
use super::SamplePoint;

/// Fit `z = b0 + b1·x + b2·y` by solving the normal equations.
///
/// Fails with [`Error::InsufficientSamples`] below 3 points and
/// [`Error::Singular`] when the points are collinear.
pub fn ols_fit(points: &[SamplePoint]) -> Result<[f64; 3]> {
    if points.len() < 3 {
        return Err(Error::InsufficientSamples {
            method: "OLS trend",
            required: 3,
            found: points.len(),
        });
    }

    // Centre coordinates so the normal equations stay well conditioned
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let my = points.iter().map(|p| p.y).sum::<f64>() / n;

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    let (mut sz, mut sxz, mut syz) = (0.0, 0.0, 0.0);
    for p in points {
        let (x, y) = (p.x - mx, p.y - my);
        sxx += x * x;
        sxy += x * y;
        syy += y * y;
        sz += p.value;
        sxz += x * p.value;
        syz += y * p.value;
    }

    // Centred sums of x and y vanish
    let mut mat = [n, 0.0, 0.0, 0.0, sxx, sxy, 0.0, sxy, syy];
    let mut rhs = [sz, sxz, syz];
    let beta = gauss_solve(3, &mut mat, &mut rhs)?;

    let (b1, b2) = (beta[1], beta[2]);
    Ok([beta[0] - b1 * mx - b2 * my, b1, b2])
}

/// A planar trend, or a constant when no plane can be fitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    pub intercept: f64,
    pub slope_x: f64,
    pub slope_y: f64,
}

impl LinearTrend {
    /// OLS plane through `points`, falling back to their mean when the fit
    /// is under-determined. `points` must not be empty.
    pub fn fit(points: &[SamplePoint]) -> Self {
        match ols_fit(points) {
            Ok([intercept, slope_x, slope_y]) => Self {
                intercept,
                slope_x,
                slope_y,
            },
            Err(_) => {
                let mean =
                    points.iter().map(|p| p.value).sum::<f64>() / points.len().max(1) as f64;
                Self::constant(mean)
            }
        }
    }

    pub fn constant(value: f64) -> Self {
        Self {
            intercept: value,
            slope_x: 0.0,
            slope_y: 0.0,
        }
    }

    #[inline]
    pub fn predict(&self, x: f64, y: f64) -> f64 {
        self.intercept + self.slope_x * x + self.slope_y * y
    }
}
