//! # FwDET Core
//!
//! Core types shared by the floodwater depth estimation crates.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `Region`, `BoundingBox`, `RegionCatalog`: partitioning of a large grid
//! - `SpatialInputs`: co-registered mask, DEM and channel grids
//! - `MaskClasses`: the wet/dry/nodata code table of the classification mask

pub mod classes;
pub mod error;
pub mod inputs;
pub mod raster;
pub mod region;

pub use classes::{CellClass, MaskClasses};
pub use error::{Error, Result};
pub use inputs::{SpatialInputs, SpatialInputsView};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use region::{BoundingBox, Region, RegionCatalog};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classes::{CellClass, MaskClasses};
    pub use crate::error::{Error, Result};
    pub use crate::inputs::{SpatialInputs, SpatialInputsView};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::region::{BoundingBox, Region, RegionCatalog};
}
