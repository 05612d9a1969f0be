//! # FwDET Algorithms
//!
//! Floodwater depth estimation from a wet/dry classification and a DEM.
//!
//! ## Modules
//!
//! - **morphology**: binary dilation used to find the flood perimeter
//! - **interpolation**: Delaunay (TIN), kriging and thin-plate spline surfaces
//!   from scattered perimeter elevations
//! - **flood**: boundary extraction, interpolation strategies, depth encoding
//!   and the per-region [`FwdetEstimator`](flood::FwdetEstimator)

pub mod flood;
pub mod interpolation;
pub(crate) mod maybe_rayon;
pub mod morphology;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::flood::{
        decode_depth, encode_depth, extract_boundary, BoundarySamples, DepthClass,
        FwdetEstimator, InterpolationStrategy, KrigingStrategy, LinearStrategy, RegionDepth,
        RegionStatus, StrategyConfig, ThinPlateSplineStrategy,
    };
    pub use crate::interpolation::{
        HullFallback, KrigingParams, SamplePoint, TinParams, TpsParams,
    };
    pub use crate::morphology::{dilate, StructuringElement};
    pub use fwdet_core::prelude::*;
}
