//! Region-partitioned depth estimation
//!
//! Every region of a catalog is estimated from its own window of the inputs,
//! independently of the others, then the per-region rasters are blitted into
//! one whole-extent raster. Results away from region seams match a
//! whole-extent run; cells near a seam can differ because each region only
//! sees its own part of the flood perimeter.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use ndarray::ArrayView2;
use tracing::{debug, info, warn};

use fwdet_algorithms::flood::{FwdetEstimator, RegionDepth, NODATA};
use fwdet_core::{Error, GeoTransform, Raster, Region, RegionCatalog, Result, SpatialInputsView};

use crate::strategy::{ParallelStrategy, ProcessingMode};

/// Outcome of one region task
#[derive(Debug, Clone)]
pub struct RegionOutcome {
    pub region: Region,
    /// [`Error::RegionFailed`] when the task could not produce a raster
    pub result: Result<RegionDepth>,
}

impl RegionOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-region results of an engine run, in catalog order
#[derive(Debug, Clone)]
pub struct DepthByRegion {
    shape: (usize, usize),
    transform: GeoTransform,
    outcomes: Vec<RegionOutcome>,
}

impl DepthByRegion {
    /// Shape of the whole extent the regions index into
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn outcomes(&self) -> &[RegionOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Result of the last region with this id
    pub fn get(&self, id: u32) -> Option<&Result<RegionDepth>> {
        self.outcomes
            .iter()
            .rev()
            .find(|o| o.region.id == id)
            .map(|o| &o.result)
    }

    /// Ids of regions whose task failed
    pub fn failed(&self) -> Vec<u32> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_ok())
            .map(|o| o.region.id)
            .collect()
    }
}

/// Whole-extent depth raster assembled from region results
#[derive(Debug, Clone)]
pub struct MergedDepth {
    pub depth: Raster<u16>,
    /// Regions with no raster; their cells stay nodata unless another region
    /// covers them
    pub missing: Vec<u32>,
    /// Regions merged with an empty perimeter or a failed interpolation
    pub incomplete: Vec<u32>,
}

impl MergedDepth {
    /// Every region produced an interpolated surface
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.incomplete.is_empty()
    }
}

/// Runs an estimator over every region of a catalog
#[derive(Debug)]
pub struct FloodDepthEngine {
    estimator: FwdetEstimator,
    mode: ProcessingMode,
}

impl FloodDepthEngine {
    pub fn new(estimator: FwdetEstimator) -> Self {
        Self {
            estimator,
            mode: ProcessingMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn estimator(&self) -> &FwdetEstimator {
        &self.estimator
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    /// Estimate every region of `catalog` from its window of `inputs`.
    ///
    /// Each region yields its own outcome: a malformed bounding box, an
    /// estimator error or a panic inside the task becomes
    /// [`Error::RegionFailed`] for that region only. The returned error is
    /// reserved for failures of the scheduler itself.
    pub fn calculate(
        &self,
        inputs: &SpatialInputsView<'_>,
        catalog: &RegionCatalog,
    ) -> Result<DepthByRegion> {
        inputs.check_shapes()?;
        let start = Instant::now();
        info!(
            regions = catalog.len(),
            rows = inputs.shape().0,
            cols = inputs.shape().1,
            strategy = self.estimator.strategy().name(),
            threads = self.mode.threads(),
            "estimating region depths"
        );

        let outcomes = self.mode.par_map(catalog.regions(), |region| RegionOutcome {
            region: *region,
            result: self.run_region(inputs, region),
        })?;

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        info!(
            regions = outcomes.len(),
            failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "region depths estimated"
        );

        Ok(DepthByRegion {
            shape: inputs.shape(),
            transform: inputs.transform,
            outcomes,
        })
    }

    /// [`calculate`](Self::calculate) then [`merge`].
    pub fn run(
        &self,
        inputs: &SpatialInputsView<'_>,
        catalog: &RegionCatalog,
    ) -> Result<MergedDepth> {
        merge(&self.calculate(inputs, catalog)?)
    }

    fn run_region(&self, inputs: &SpatialInputsView<'_>, region: &Region) -> Result<RegionDepth> {
        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.estimator.calculate(inputs, region)
        }));

        let result = match outcome {
            Ok(Ok(depth)) => Ok(depth),
            Ok(Err(e)) => Err(Error::RegionFailed {
                id: region.id,
                reason: e.to_string(),
            }),
            Err(payload) => Err(Error::RegionFailed {
                id: region.id,
                reason: format!("task panicked: {}", panic_message(payload.as_ref())),
            }),
        };

        match &result {
            Ok(depth) => debug!(
                region = region.id,
                samples = depth.samples,
                status = %depth.status,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "region done"
            ),
            Err(e) => warn!(region = region.id, error = %e, "region failed"),
        }
        result
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Blit every successful region into a whole-extent raster.
///
/// The output starts as [`NODATA`]; regions are copied in catalog order so
/// the later region wins where bounding boxes overlap.
pub fn merge(results: &DepthByRegion) -> Result<MergedDepth> {
    let mut merged = MergeTarget::new(results);
    for outcome in &results.outcomes {
        if let Some(depth) = merged.accept(outcome) {
            merged.depth.paste(&depth.region.bbox, depth.depth.view())?;
        }
    }
    Ok(merged.finish())
}

/// Blit only the cells each region owns in `labels`.
///
/// `labels` holds `id + 1` of the owning region per cell and 0 where no
/// region owns it, as produced by [`RegionCatalog::label_grid`].
pub fn merge_by_membership(
    results: &DepthByRegion,
    labels: ArrayView2<'_, u32>,
) -> Result<MergedDepth> {
    if labels.dim() != results.shape {
        return Err(Error::SizeMismatch {
            er: results.shape.0,
            ec: results.shape.1,
            ar: labels.nrows(),
            ac: labels.ncols(),
        });
    }

    let mut merged = MergeTarget::new(results);
    for outcome in &results.outcomes {
        let Some(depth) = merged.accept(outcome) else {
            continue;
        };
        let bbox = depth.region.bbox;
        let label = depth.region.label()?;
        let src = depth.depth.data();
        if src.dim() != bbox.shape() {
            return Err(Error::SizeMismatch {
                er: bbox.rows(),
                ec: bbox.cols(),
                ar: src.nrows(),
                ac: src.ncols(),
            });
        }
        let dst = merged.depth.data_mut();
        for ((r, c), &value) in src.indexed_iter() {
            let (row, col) = (bbox.row_start + r, bbox.col_start + c);
            if labels[[row, col]] == label {
                dst[[row, col]] = value;
            }
        }
    }
    Ok(merged.finish())
}

/// Like [`merge`], but any failed region aborts the merge.
pub fn merge_strict(results: &DepthByRegion) -> Result<MergedDepth> {
    for outcome in &results.outcomes {
        match &outcome.result {
            Ok(_) => {}
            Err(e @ Error::RegionFailed { .. }) => return Err(e.clone()),
            Err(e) => {
                return Err(Error::RegionFailed {
                    id: outcome.region.id,
                    reason: e.to_string(),
                });
            }
        }
    }
    merge(results)
}

struct MergeTarget {
    depth: Raster<u16>,
    missing: Vec<u32>,
    incomplete: Vec<u32>,
}

impl MergeTarget {
    fn new(results: &DepthByRegion) -> Self {
        let (rows, cols) = results.shape;
        let mut depth = Raster::filled(rows, cols, NODATA);
        depth.set_transform(results.transform);
        depth.set_nodata(Some(NODATA));
        Self {
            depth,
            missing: Vec::new(),
            incomplete: Vec::new(),
        }
    }

    fn accept<'a>(&mut self, outcome: &'a RegionOutcome) -> Option<&'a RegionDepth> {
        match &outcome.result {
            Ok(depth) => {
                if !depth.status.is_complete() {
                    self.incomplete.push(outcome.region.id);
                }
                Some(depth)
            }
            Err(_) => {
                self.missing.push(outcome.region.id);
                None
            }
        }
    }

    fn finish(self) -> MergedDepth {
        if !self.missing.is_empty() {
            warn!(missing = ?self.missing, "merged raster has missing regions");
        }
        MergedDepth {
            depth: self.depth,
            missing: self.missing,
            incomplete: self.incomplete,
        }
    }
}
