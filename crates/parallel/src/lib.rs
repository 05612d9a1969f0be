//! # FwDET Parallel
//!
//! Region-partitioned flood depth estimation.
//!
//! This crate provides:
//! - [`FloodDepthEngine`]: runs an estimator over every region of a catalog
//! - [`merge`], [`merge_by_membership`], [`merge_strict`]: whole-extent assembly
//! - [`ProcessingMode`]: sequential or rayon-parallel scheduling
//! - [`tiled_catalog`]: regular partitions for grids without a catalog
//! - [`FwdetConfig`]: serde configuration building the engine

pub mod config;
pub mod engine;
pub mod strategy;
pub mod tiled;

pub use config::FwdetConfig;
pub use engine::{
    merge, merge_by_membership, merge_strict, DepthByRegion, FloodDepthEngine, MergedDepth,
    RegionOutcome,
};
pub use strategy::{num_cpus, ParallelStrategy, ProcessingMode};
pub use tiled::{tiled_catalog, TileIterator};
