//! Per-region depth estimation
//!
//! For one window of the inputs:
//! 1. sample the DEM on the flood perimeter
//! 2. interpolate a water surface from the samples, bounded by the lowest
//!    and highest perimeter elevation
//! 3. depth = surface - ground on wet cells, plus the channel correction
//! 4. clamp to the representable range and encode as millimetres

use std::fmt;
use std::time::Instant;

use ndarray::{Array2, ArrayView2};
use tracing::{debug, warn};

use fwdet_core::{CellClass, MaskClasses, Raster, Region, Result, SpatialInputsView};

use super::boundary::{extract_boundary, BoundarySamples};
use super::encoding::{encode_depth, DRY, MAX_DEPTH, MIN_DEPTH, NODATA};
use super::strategy::{InterpolationStrategy, StrategyConfig};

/// How the water surface of a region was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionStatus {
    /// Surface interpolated from perimeter samples
    Complete,
    /// No wet/dry perimeter; wet cells are nodata
    EmptyBoundary,
    /// The strategy could not fit a surface; wet cells are nodata
    InterpolationFailed(String),
}

impl RegionStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, RegionStatus::Complete)
    }
}

impl fmt::Display for RegionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionStatus::Complete => write!(f, "complete"),
            RegionStatus::EmptyBoundary => write!(f, "empty boundary"),
            RegionStatus::InterpolationFailed(reason) => {
                write!(f, "interpolation failed: {reason}")
            }
        }
    }
}

/// Encoded depth of one region, aligned to the region's bounding box
#[derive(Debug, Clone)]
pub struct RegionDepth {
    pub region: Region,
    pub depth: Raster<u16>,
    pub status: RegionStatus,
    /// Perimeter samples fed to the strategy
    pub samples: usize,
}

/// FwDET depth estimator holding one interpolation strategy
#[derive(Debug)]
pub struct FwdetEstimator {
    strategy: Box<dyn InterpolationStrategy>,
    classes: MaskClasses,
}

impl Default for FwdetEstimator {
    fn default() -> Self {
        Self {
            strategy: Box::new(super::strategy::ThinPlateSplineStrategy::default()),
            classes: MaskClasses::default(),
        }
    }
}

impl FwdetEstimator {
    pub fn new(strategy: Box<dyn InterpolationStrategy>) -> Self {
        Self {
            strategy,
            classes: MaskClasses::default(),
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Result<Self> {
        Ok(Self::new(config.build()?))
    }

    /// Use a non-default mask code table
    pub fn with_classes(mut self, classes: MaskClasses) -> Result<Self> {
        classes.validate()?;
        self.classes = classes;
        Ok(self)
    }

    pub fn strategy(&self) -> &dyn InterpolationStrategy {
        self.strategy.as_ref()
    }

    pub fn classes(&self) -> &MaskClasses {
        &self.classes
    }

    /// Estimate depth over `region` of `inputs`.
    ///
    /// The region's bounding box is relative to `inputs`. An empty perimeter
    /// or a failed interpolation is reported through [`RegionStatus`], not as
    /// an error; errors are limited to malformed regions and grid shapes.
    pub fn calculate(
        &self,
        inputs: &SpatialInputsView<'_>,
        region: &Region,
    ) -> Result<RegionDepth> {
        region.check_within(inputs.shape())?;
        let window = inputs.crop(&region.bbox)?;
        let (depth, status, samples) = self.estimate(&window)?;
        Ok(RegionDepth {
            region: *region,
            depth,
            status,
            samples,
        })
    }

    /// Estimate depth over the whole of `window`.
    pub fn estimate(
        &self,
        window: &SpatialInputsView<'_>,
    ) -> Result<(Raster<u16>, RegionStatus, usize)> {
        window.check_shapes()?;
        let start = Instant::now();

        let samples = extract_boundary(window.mask, window.dem, &self.classes)?;
        let extracted = start.elapsed();

        let (surface, status) = self.surface(&samples);
        let interpolated = start.elapsed();

        let encoded = self.encode(window, surface.view());
        let mut depth = Raster::from_array(encoded);
        depth.set_transform(window.transform);
        depth.set_nodata(Some(NODATA));

        debug!(
            strategy = self.strategy.name(),
            rows = window.shape().0,
            cols = window.shape().1,
            samples = samples.len(),
            boundary_ms = extracted.as_millis() as u64,
            interpolate_ms = (interpolated - extracted).as_millis() as u64,
            total_ms = start.elapsed().as_millis() as u64,
            %status,
            "region depth estimated"
        );
        Ok((depth, status, samples.len()))
    }

    fn surface(&self, samples: &BoundarySamples) -> (Array2<f64>, RegionStatus) {
        let missing = || Array2::from_elem(samples.shape(), f64::NAN);
        if samples.is_empty() {
            return (missing(), RegionStatus::EmptyBoundary);
        }
        match self.strategy.interpolate(samples) {
            Ok(surface) if surface.dim() == samples.shape() => {
                (bound_to_perimeter(surface, samples), RegionStatus::Complete)
            }
            Ok(surface) => {
                let reason = format!(
                    "surface shape {:?} does not match grid {:?}",
                    surface.dim(),
                    samples.shape()
                );
                warn!(strategy = self.strategy.name(), %reason, "discarding surface");
                (missing(), RegionStatus::InterpolationFailed(reason))
            }
            Err(e) => {
                warn!(
                    strategy = self.strategy.name(),
                    samples = samples.len(),
                    error = %e,
                    "interpolation failed, region left as nodata"
                );
                (missing(), RegionStatus::InterpolationFailed(e.to_string()))
            }
        }
    }

    fn encode(&self, window: &SpatialInputsView<'_>, surface: ArrayView2<'_, f64>) -> Array2<u16> {
        Array2::from_shape_fn(window.shape(), |(r, c)| {
            match self.classes.classify(window.mask[[r, c]]) {
                CellClass::Dry => DRY,
                CellClass::NoData => NODATA,
                CellClass::Wet => {
                    let correction = window
                        .channel
                        .map(|ch| ch[[r, c]])
                        .filter(|v| !v.is_nan())
                        .unwrap_or(0.0);
                    encode_depth(wet_depth(surface[[r, c]], window.dem[[r, c]], correction))
                }
            }
        })
    }
}

/// Clamp a water surface into the elevation range of its perimeter samples.
fn bound_to_perimeter(mut surface: Array2<f64>, samples: &BoundarySamples) -> Array2<f64> {
    if let Some((lo, hi)) = samples.elevation_range() {
        surface.mapv_inplace(|z| z.clamp(lo, hi));
    }
    surface
}

/// Depth of a wet cell in metres, `None` when the surface or ground is unknown.
///
/// Non-positive depths become [`MIN_DEPTH`] so a wet cell never reads as dry.
fn wet_depth(surface: f64, ground: f64, correction: f64) -> Option<f64> {
    let depth = surface - ground;
    if depth.is_nan() {
        return None;
    }
    let depth = depth + correction;
    Some(if depth <= 0.0 {
        MIN_DEPTH
    } else {
        depth.min(MAX_DEPTH)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flood::encoding::CAPPED;
    use crate::flood::strategy::{LinearStrategy, ThinPlateSplineStrategy};
    use crate::interpolation::{HullFallback, TinParams, TpsParams};
    use fwdet_core::{Error, GeoTransform, SpatialInputs};

    const WET: u8 = 3;
    const DRY_CODE: u8 = 2;

    /// 25×25 paraboloid bowl, wet where the DEM is below 0.7
    fn paraboloid() -> SpatialInputs {
        let dem = Array2::from_shape_fn((25, 25), |(r, c)| {
            let (x, y) = (c as f64 - 12.5, r as f64 - 12.5);
            (x * x + y * y) / 16.0
        });
        let mask = dem.mapv(|z| if z < 0.7 { WET } else { DRY_CODE });
        bundle(mask, dem)
    }

    fn bundle(mask: Array2<u8>, dem: Array2<f64>) -> SpatialInputs {
        SpatialInputs::new(Raster::from_array(mask), Raster::from_array(dem), None).unwrap()
    }

    fn linear() -> FwdetEstimator {
        FwdetEstimator::new(Box::new(LinearStrategy::default()))
    }

    fn on_ring(mask: &Array2<u8>, r: usize, c: usize) -> bool {
        mask[[r, c]] == WET
            && (r.saturating_sub(1)..=(r + 1).min(24))
                .flat_map(|nr| (c.saturating_sub(1)..=(c + 1).min(24)).map(move |nc| (nr, nc)))
                .any(|(nr, nc)| mask[[nr, nc]] == DRY_CODE)
    }

    #[test]
    fn test_paraboloid_linear() {
        let inputs = paraboloid();
        let (depth, status, samples) = linear().estimate(&inputs.view()).unwrap();
        assert_eq!(status, RegionStatus::Complete);
        assert_eq!(samples, 20);

        let mask = inputs.mask().data();
        let mut wet = 0;
        for ((r, c), &d) in depth.data().indexed_iter() {
            if mask[[r, c]] == WET {
                wet += 1;
                assert_ne!(d, NODATA);
                if on_ring(mask, r, c) {
                    assert_eq!(d, 1, "ring cell ({r}, {c})");
                } else {
                    assert!(d > 1, "interior cell ({r}, {c}) = {d}");
                }
            } else {
                assert_eq!(d, DRY);
            }
        }
        assert_eq!(wet, 32);
    }

    /// Returns the same level everywhere
    #[derive(Debug)]
    struct Level(f64);

    impl InterpolationStrategy for Level {
        fn name(&self) -> &'static str {
            "level"
        }

        fn interpolate(&self, samples: &BoundarySamples) -> Result<Array2<f64>> {
            Ok(Array2::from_elem(samples.shape(), self.0))
        }
    }

    #[test]
    fn test_surface_bounded_by_perimeter() {
        // Perimeter elevations span 0.28125..=0.53125
        let inputs = paraboloid();
        let (low, _, _) = FwdetEstimator::new(Box::new(Level(-5.0)))
            .estimate(&inputs.view())
            .unwrap();
        let (floor, _, _) = FwdetEstimator::new(Box::new(Level(0.28125)))
            .estimate(&inputs.view())
            .unwrap();
        assert_eq!(low, floor);
        assert_eq!(low.data()[[12, 12]], 250);
        assert_eq!(low.data()[[14, 13]], 125);

        let (high, _, _) = FwdetEstimator::new(Box::new(Level(50.0)))
            .estimate(&inputs.view())
            .unwrap();
        assert_eq!(high.data()[[12, 12]], 500);
        assert_eq!(high.data()[[10, 12]], 125);
        assert_eq!(high.count(NODATA), 0);
    }

    #[test]
    fn test_uniformly_dry() {
        let mask = Raster::filled(6, 7, DRY_CODE);
        let dem = Raster::filled(6, 7, 1.0);
        let inputs = SpatialInputs::new(mask, dem, None).unwrap();
        let (depth, status, _) = linear().estimate(&inputs.view()).unwrap();
        assert_eq!(status, RegionStatus::EmptyBoundary);
        assert_eq!(depth.count(DRY), 42);
    }

    #[test]
    fn test_uniformly_nodata() {
        let mask = Raster::filled(6, 7, 0u8);
        let dem = Raster::filled(6, 7, f64::NAN);
        let inputs = SpatialInputs::new(mask, dem, None).unwrap();
        let (depth, _, _) = FwdetEstimator::default().estimate(&inputs.view()).unwrap();
        assert_eq!(depth.count(NODATA), 42);
        assert_eq!(depth.nodata(), Some(NODATA));
    }

    #[test]
    fn test_uniformly_wet_is_nodata() {
        let mask = Raster::filled(5, 5, WET);
        let dem = Raster::filled(5, 5, 1.0);
        let inputs = SpatialInputs::new(mask, dem, None).unwrap();
        let (depth, status, samples) = linear().estimate(&inputs.view()).unwrap();
        assert_eq!(status, RegionStatus::EmptyBoundary);
        assert_eq!(samples, 0);
        assert_eq!(depth.count(NODATA), 25);
    }

    #[test]
    fn test_failed_interpolation_keeps_dry_cells() {
        // A single perimeter cell cannot be triangulated and Missing forbids
        // the nearest-sample fallback
        let mask = Array2::from_shape_fn((3, 4), |(r, c)| match (r, c) {
            (0, 0..=1) => DRY_CODE,
            (0, _) => WET,
            _ => 0,
        });
        let dem = Array2::from_elem((3, 4), 1.0);
        let inputs = bundle(mask, dem);
        let estimator = FwdetEstimator::new(Box::new(LinearStrategy::new(TinParams {
            hull_fallback: HullFallback::Missing,
        })));

        let (depth, status, samples) = estimator.estimate(&inputs.view()).unwrap();
        assert_eq!(samples, 1);
        assert!(matches!(status, RegionStatus::InterpolationFailed(_)));
        assert_eq!(depth.data()[[0, 0]], DRY);
        assert_eq!(depth.data()[[0, 1]], DRY);
        assert_eq!(depth.data()[[0, 2]], NODATA);
        assert_eq!(depth.count(NODATA), 10);
    }

    #[test]
    fn test_channel_correction() {
        let mask = Array2::from_shape_fn((3, 3), |(_, c)| if c == 0 { DRY_CODE } else { WET });
        let dem = Array2::from_elem((3, 3), 5.0);
        let mut channel = Array2::from_elem((3, 3), f64::NAN);
        channel[[1, 2]] = 0.75;
        channel[[2, 2]] = 100.0;
        let inputs = SpatialInputs::new(
            Raster::from_array(mask),
            Raster::from_array(dem),
            Some(Raster::from_array(channel)),
        )
        .unwrap();

        let (depth, _, _) = linear().estimate(&inputs.view()).unwrap();
        let d = depth.data();
        // Flat water over flat ground: zero depth clamps to the 1 mm floor
        assert_eq!(d[[0, 1]], 1);
        assert_eq!(d[[0, 2]], 1);
        assert_eq!(d[[1, 2]], 750);
        assert_eq!(d[[2, 2]], CAPPED);
        assert_eq!(d[[1, 0]], DRY);
    }

    #[test]
    fn test_wet_depth_clamps() {
        assert_eq!(wet_depth(1.0, 2.0, 0.0), Some(MIN_DEPTH));
        assert_eq!(wet_depth(1.0, 1.0, 0.0), Some(MIN_DEPTH));
        assert_eq!(wet_depth(100.0, 1.0, 0.0), Some(MAX_DEPTH));
        assert_eq!(wet_depth(2.0, 1.0, 0.5), Some(1.5));
        assert_eq!(wet_depth(f64::NAN, 1.0, 0.5), None);
        assert_eq!(wet_depth(2.0, f64::NAN, 0.5), None);
    }

    #[test]
    fn test_calculate_region_window() {
        let inputs = paraboloid();
        let transform = GeoTransform::new(100.0, 200.0, 25.0, -25.0);
        let mut mask = inputs.mask().clone();
        mask.set_transform(transform);
        let inputs = SpatialInputs::new(mask, inputs.dem().clone(), None).unwrap();

        let region = Region::new(7, (5, 20, 5, 20));
        let out = linear().calculate(&inputs.view(), &region).unwrap();
        assert_eq!(out.region, region);
        assert_eq!(out.depth.shape(), (15, 15));
        assert_eq!(out.depth.transform().origin_x, 225.0);
        assert_eq!(out.depth.transform().origin_y, 75.0);
        // The window holds the whole flood: 20 ring cells, 12 interior
        assert_eq!(out.samples, 20);
        assert_eq!(out.depth.count(1), 20);
        assert_eq!(out.depth.count(DRY), 15 * 15 - 32);
        assert_eq!(out.depth.count(NODATA), 0);
    }

    #[test]
    fn test_calculate_rejects_region_outside_grid() {
        let inputs = paraboloid();
        let region = Region::new(3, (20, 30, 0, 5));
        let err = linear().calculate(&inputs.view(), &region).unwrap_err();
        assert!(matches!(err, Error::RegionOutOfBounds { id: 3, .. }));
    }

    #[test]
    fn test_remapped_classes() {
        let mask = Array2::from_shape_fn((4, 4), |(_, c)| if c == 0 { 1u8 } else { 200 });
        let dem = Array2::from_shape_fn((4, 4), |(_, c)| c as f64);
        let inputs = bundle(mask, dem);
        let estimator = FwdetEstimator::new(Box::new(ThinPlateSplineStrategy::new(TpsParams {
            averaging_constant: 1,
            neighbors: 4,
        })))
        .with_classes(MaskClasses::new(0, 1, 200).unwrap())
        .unwrap();

        let (depth, status, samples) = estimator.estimate(&inputs.view()).unwrap();
        assert_eq!(samples, 4);
        // Collinear samples: every local spline falls back to IDW
        assert_eq!(status, RegionStatus::Complete);
        assert!(depth.data().column(0).iter().all(|&d| d == DRY));
        assert!(depth.data().column(3).iter().all(|&d| d != NODATA && d != DRY));
    }
}
