//! Depth estimation over synthetic flooded bowls.
//!
//! Both bowls are 25×25 grids centred between cells 12 and 13, flooded
//! where the DEM is below 0.7:
//! - paraboloid `z = (x² + y²) / 16`: 32 wet cells, 20 on the perimeter
//! - cone `z = √(x² + y²) / 4`: 24 wet cells, 20 on the perimeter, the
//!   4 centre cells interior

use std::collections::BTreeMap;

use fwdet_algorithms::flood::{
    decode_depth, DepthClass, FwdetEstimator, InterpolationStrategy, KrigingStrategy,
    LinearStrategy, RegionStatus, ThinPlateSplineStrategy, DRY, NODATA,
};
use fwdet_algorithms::interpolation::{KrigingParams, TpsParams};
use fwdet_core::{Raster, SpatialInputs};
use ndarray::Array2;

const SIZE: usize = 25;
const WET: u8 = 3;
const DRY_CODE: u8 = 2;

fn bowl(profile: impl Fn(f64) -> f64) -> SpatialInputs {
    let dem = Array2::from_shape_fn((SIZE, SIZE), |(r, c)| {
        let (x, y) = (c as f64 - 12.5, r as f64 - 12.5);
        profile(x * x + y * y)
    });
    let mask = dem.mapv(|z| if z < 0.7 { WET } else { DRY_CODE });
    SpatialInputs::new(Raster::from_array(mask), Raster::from_array(dem), None).unwrap()
}

fn paraboloid() -> SpatialInputs {
    bowl(|r2| r2 / 16.0)
}

fn cone() -> SpatialInputs {
    bowl(|r2| r2.sqrt() / 4.0)
}

/// Strategies tuned for a grid this small: no lumping, few neighbours
fn strategies() -> Vec<Box<dyn InterpolationStrategy>> {
    vec![
        Box::new(LinearStrategy::default()),
        Box::new(KrigingStrategy::new(KrigingParams {
            averaging_constant: 1,
            ..Default::default()
        })),
        Box::new(ThinPlateSplineStrategy::new(TpsParams {
            averaging_constant: 1,
            neighbors: 7,
        })),
    ]
}

fn is_centre(r: usize, c: usize) -> bool {
    (12..=13).contains(&r) && (12..=13).contains(&c)
}

/// Four times the squared distance from the bowl centre, exact in integers
fn radius_key(r: usize, c: usize) -> i64 {
    let (dx, dy) = (2 * c as i64 - 25, 2 * r as i64 - 25);
    dx * dx + dy * dy
}

#[test]
fn paraboloid_has_depth_on_every_wet_cell() {
    let inputs = paraboloid();
    let mask = inputs.mask().data();
    for strategy in strategies() {
        let name = strategy.name();
        let (depth, status, samples) = FwdetEstimator::new(strategy)
            .estimate(&inputs.view())
            .unwrap();
        assert_eq!(status, RegionStatus::Complete, "{name}");
        assert_eq!(samples, 20, "{name}");

        for ((r, c), &d) in depth.data().indexed_iter() {
            if mask[[r, c]] == WET {
                assert_ne!(d, NODATA, "{name}: wet cell ({r}, {c})");
                assert_ne!(d, DRY, "{name}: wet cell ({r}, {c})");
            } else {
                assert_eq!(d, DRY, "{name}: dry cell ({r}, {c})");
            }
        }
        assert_eq!(depth.count(DRY), SIZE * SIZE - 32, "{name}");
    }
}

#[test]
fn paraboloid_depth_falls_away_from_centre() {
    let inputs = paraboloid();
    let mask = inputs.mask().data();
    for strategy in strategies() {
        let name = strategy.name();
        let (depth, _, _) = FwdetEstimator::new(strategy)
            .estimate(&inputs.view())
            .unwrap();

        // (shallowest, deepest) per distance from the centre
        let mut bands: BTreeMap<i64, (u16, u16)> = BTreeMap::new();
        for ((r, c), &d) in depth.data().indexed_iter() {
            if mask[[r, c]] == WET {
                let band = bands.entry(radius_key(r, c)).or_insert((d, d));
                band.0 = band.0.min(d);
                band.1 = band.1.max(d);
            }
        }
        let bands: Vec<(u16, u16)> = bands.into_values().collect();
        for pair in bands.windows(2) {
            assert!(
                pair[1].1 <= pair[0].0,
                "{name}: depth rises away from the centre {bands:?}"
            );
        }

        // Shoreline ring at depth zero, the centre 0.25 m below the lowest
        // shoreline sample
        assert_eq!(bands.last(), Some(&(1, 1)), "{name}");
        assert_eq!(bands[0], (250, 250), "{name}");
        assert!(bands[1].0 > 1, "{name}: {bands:?}");
    }
}

#[test]
fn paraboloid_linear_depths() {
    let inputs = paraboloid();
    let (depth, _, _) = FwdetEstimator::new(Box::new(LinearStrategy::default()))
        .estimate(&inputs.view())
        .unwrap();
    let d = depth.data();

    // Inner perimeter corners sit at 0.28125, so the centre is 0.25 m deep
    for (r, c) in [(12, 12), (12, 13), (13, 12), (13, 13)] {
        assert_eq!(d[[r, c]], 250);
    }
    assert_eq!(decode_depth(d[[14, 13]]), DepthClass::Depth(0.125));
    // Perimeter cells carry their own elevation: zero depth, floored to 1 mm
    assert_eq!(d[[10, 12]], 1);
    assert_eq!(d[[15, 14]], 1);
}

#[test]
fn cone_is_deepest_at_centre() {
    let inputs = cone();
    let mask = inputs.mask().data();
    assert_eq!(mask.iter().filter(|&&m| m == WET).count(), 24);

    for strategy in strategies() {
        let name = strategy.name();
        let (depth, status, _) = FwdetEstimator::new(strategy)
            .estimate(&inputs.view())
            .unwrap();
        assert_eq!(status, RegionStatus::Complete, "{name}");

        let d = depth.data();
        let centre_min = (12..=13)
            .flat_map(|r| (12..=13).map(move |c| d[[r, c]]))
            .min()
            .unwrap();
        assert!(centre_min > 1, "{name}: centre depth {centre_min}");

        for ((r, c), &v) in d.indexed_iter() {
            if mask[[r, c]] != WET {
                assert_eq!(v, DRY, "{name}");
            } else if !is_centre(r, c) {
                // Every strategy reproduces the perimeter samples
                assert_eq!(v, 1, "{name}: perimeter cell ({r}, {c})");
                assert!(v < centre_min, "{name}");
            }
        }
    }
}

#[test]
fn cone_linear_centre() {
    let inputs = cone();
    let (depth, _, _) = FwdetEstimator::new(Box::new(LinearStrategy::default()))
        .estimate(&inputs.view())
        .unwrap();
    let centre = depth.data()[[12, 12]];
    assert!(centre > 150 && centre < 300, "centre depth {centre}");
}

#[test]
fn production_lumping_on_small_grid() {
    // A 60-cell lump swallows the whole bowl: kriging degrades to the mean
    // elevation, the spline has too few lumps and leaves the flood as nodata
    let inputs = paraboloid();
    let mask = inputs.mask().data();

    let kriging = FwdetEstimator::new(Box::new(KrigingStrategy::default()));
    let (depth, status, _) = kriging.estimate(&inputs.view()).unwrap();
    assert_eq!(status, RegionStatus::Complete);
    let wet: Vec<u16> = depth
        .data()
        .iter()
        .zip(mask.iter())
        .filter(|&(_, &m)| m == WET)
        .map(|(&d, _)| d)
        .collect();
    assert!(wet.iter().all(|&d| d != NODATA && d != DRY));

    let tps = FwdetEstimator::default();
    let (depth, status, _) = tps.estimate(&inputs.view()).unwrap();
    assert!(matches!(status, RegionStatus::InterpolationFailed(_)));
    assert_eq!(depth.count(NODATA), 32);
    assert_eq!(depth.count(DRY), SIZE * SIZE - 32);
}

#[test]
fn channel_correction_deepens_wet_cells() {
    let plain = paraboloid();
    let channel = Raster::filled(SIZE, SIZE, 0.5);
    let corrected = SpatialInputs::new(
        plain.mask().clone(),
        plain.dem().clone(),
        Some(channel),
    )
    .unwrap();

    let estimator = FwdetEstimator::new(Box::new(LinearStrategy::default()));
    let (base, _, _) = estimator.estimate(&plain.view()).unwrap();
    let (deeper, _, _) = estimator.estimate(&corrected.view()).unwrap();

    assert_eq!(deeper.data()[[12, 12]], 750);
    // A zero perimeter depth gains the full correction
    assert_eq!(deeper.data()[[10, 12]], 500);
    // Dry cells ignore the correction
    assert_eq!(deeper.data()[[0, 0]], DRY);
    assert_eq!(base.count(DRY), deeper.count(DRY));
}
