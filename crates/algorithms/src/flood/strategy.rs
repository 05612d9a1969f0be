//! Water-surface interpolation strategies
//!
//! Every strategy turns the perimeter samples of one grid into a dense surface
//! of the same shape. NaN marks cells the strategy could not estimate.

use std::fmt::Debug;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use fwdet_core::Result;

use crate::interpolation::{
    kriging_interpolation, tin_interpolation, tps_interpolation, KrigingParams, TinParams,
    TpsParams,
};

use super::boundary::BoundarySamples;

/// Perimeter samples → dense water-surface elevations
pub trait InterpolationStrategy: Send + Sync + Debug {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Interpolate over the full sample grid.
    ///
    /// The returned grid has the shape of `samples.shape()`.
    fn interpolate(&self, samples: &BoundarySamples) -> Result<Array2<f64>>;
}

/// Delaunay triangulation with barycentric interpolation, no lumping
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearStrategy {
    pub params: TinParams,
}

impl LinearStrategy {
    pub fn new(params: TinParams) -> Self {
        Self { params }
    }
}

impl InterpolationStrategy for LinearStrategy {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn interpolate(&self, samples: &BoundarySamples) -> Result<Array2<f64>> {
        tin_interpolation(samples.points(), samples.shape(), &self.params)
    }
}

/// Linear trend plus Gaussian-process residual on a lumped lattice
#[derive(Debug, Clone, Copy, Default)]
pub struct KrigingStrategy {
    pub params: KrigingParams,
}

impl KrigingStrategy {
    pub fn new(params: KrigingParams) -> Self {
        Self { params }
    }
}

impl InterpolationStrategy for KrigingStrategy {
    fn name(&self) -> &'static str {
        "kriging"
    }

    fn interpolate(&self, samples: &BoundarySamples) -> Result<Array2<f64>> {
        kriging_interpolation(samples.points(), samples.shape(), &self.params)
    }
}

/// Local thin-plate splines on a lumped lattice
#[derive(Debug, Clone, Copy, Default)]
pub struct ThinPlateSplineStrategy {
    pub params: TpsParams,
}

impl ThinPlateSplineStrategy {
    pub fn new(params: TpsParams) -> Self {
        Self { params }
    }
}

impl InterpolationStrategy for ThinPlateSplineStrategy {
    fn name(&self) -> &'static str {
        "thin_plate_spline"
    }

    fn interpolate(&self, samples: &BoundarySamples) -> Result<Array2<f64>> {
        tps_interpolation(samples.points(), samples.shape(), &self.params)
    }
}

/// Serializable strategy selection.
///
/// ```json
/// { "method": "kriging", "averaging_constant": 300 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum StrategyConfig {
    Linear(TinParams),
    Kriging(KrigingParams),
    ThinPlateSpline(TpsParams),
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::ThinPlateSpline(TpsParams::default())
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            StrategyConfig::Linear(_) => Ok(()),
            StrategyConfig::Kriging(p) => p.validate(),
            StrategyConfig::ThinPlateSpline(p) => p.validate(),
        }
    }

    /// Validate and instantiate the selected strategy
    pub fn build(&self) -> Result<Box<dyn InterpolationStrategy>> {
        self.validate()?;
        Ok(match *self {
            StrategyConfig::Linear(p) => Box::new(LinearStrategy::new(p)),
            StrategyConfig::Kriging(p) => Box::new(KrigingStrategy::new(p)),
            StrategyConfig::ThinPlateSpline(p) => Box::new(ThinPlateSplineStrategy::new(p)),
        })
    }
}
