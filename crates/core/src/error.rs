//! Error types for FwDET

use thiserror::Error;

/// Main error type for flood depth operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error(
        "Region {id} bounds rows {row_start}..{row_end}, cols {col_start}..{col_end} \
         fall outside a grid of size ({rows}, {cols})"
    )]
    RegionOutOfBounds {
        id: u32,
        row_start: usize,
        row_end: usize,
        col_start: usize,
        col_end: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{method} needs at least {required} samples, got {found}")]
    InsufficientSamples {
        method: &'static str,
        required: usize,
        found: usize,
    },

    #[error("Singular system: {0}")]
    Singular(String),

    #[error("Region {id} failed: {reason}")]
    RegionFailed { id: u32, reason: String },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for FwDET operations
pub type Result<T> = std::result::Result<T, Error>;
