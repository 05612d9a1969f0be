//! Scattered-point interpolation onto regular grids
//!
//! All routines work in index space: a sample at column `c`, row `r` has
//! `x = c`, `y = r`, and the output grid cell `(row, col)` is evaluated at
//! `(col, row)`.
//!
//! - TIN: Delaunay triangulation with linear barycentric interpolation
//! - Kriging: OLS plane trend plus Gaussian-process residual on a lumped lattice
//! - TPS: local thin-plate spline on a lumped lattice, bilinear refinement

mod gaussian_process;
pub mod kdtree;
mod kriging;
pub mod linalg;
pub mod lumping;
mod regression;
mod tin;
mod tps;

pub use gaussian_process::GaussianProcess;
pub use kdtree::{KdTree, NearestResult};
pub use kriging::{kriging_interpolation, KrigingParams};
pub use lumping::{lump, CoarseLattice};
pub use regression::{ols_fit, LinearTrend};
pub use tin::{delaunay, tin_interpolation, HullFallback, TinParams, Triangle};
pub use tps::{tps_interpolation, TpsParams};

/// A sample point with x, y coordinates and a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    /// Squared Euclidean distance to another point
    #[inline]
    pub fn dist_sq(&self, other_x: f64, other_y: f64) -> f64 {
        let dx = self.x - other_x;
        let dy = self.y - other_y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn dist(&self, other_x: f64, other_y: f64) -> f64 {
        self.dist_sq(other_x, other_y).sqrt()
    }
}
