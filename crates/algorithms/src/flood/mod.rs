//! Floodwater depth estimation (FwDET)
//!
//! The water surface is reconstructed from DEM elevations along the flood
//! perimeter, then depth is surface minus ground.
//!
//! - [`extract_boundary`]: wet cells touching dry land, with their elevations
//! - [`InterpolationStrategy`]: perimeter samples → dense water surface
//! - [`FwdetEstimator`]: the per-region pipeline producing encoded depths
//! - [`encode_depth`] / [`decode_depth`]: the millimetre `u16` depth encoding

mod boundary;
mod encoding;
mod estimator;
mod strategy;

pub use boundary::{boundary_mask, extract_boundary, BoundarySamples};
pub use encoding::{
    decode_depth, encode_depth, DepthClass, CAPPED, DRY, MAX_DEPTH, MIN_DEPTH, NODATA, SCALE,
};
pub use estimator::{FwdetEstimator, RegionDepth, RegionStatus};
pub use strategy::{
    InterpolationStrategy, KrigingStrategy, LinearStrategy, StrategyConfig,
    ThinPlateSplineStrategy,
};
