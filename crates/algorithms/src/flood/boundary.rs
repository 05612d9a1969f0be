//! Flood perimeter extraction
//!
//! The perimeter is the ring of wet cells touching dry land (8-connected),
//! found by dilating the dry indicator with a 3×3 square and removing the dry
//! and nodata cells from the result.

use ndarray::{Array2, ArrayView2, Zip};

use fwdet_core::{CellClass, Error, MaskClasses, Result};

use crate::interpolation::SamplePoint;
use crate::morphology::{dilate, StructuringElement};

/// DEM elevations on the flood perimeter of one grid
#[derive(Debug, Clone)]
pub struct BoundarySamples {
    grid: Array2<f64>,
    points: Vec<SamplePoint>,
}

impl BoundarySamples {
    /// Build from a sparse elevation grid; NaN marks "no sample".
    pub fn from_grid(grid: Array2<f64>) -> Self {
        let points = grid
            .indexed_iter()
            .filter(|(_, v)| v.is_finite())
            .map(|((r, c), &v)| SamplePoint::new(c as f64, r as f64, v))
            .collect();
        Self { grid, points }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.grid.dim()
    }

    /// Sparse grid, NaN off the perimeter
    pub fn grid(&self) -> ArrayView2<'_, f64> {
        self.grid.view()
    }

    /// Samples in row-major order, `x` = column and `y` = row
    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Lowest and highest sampled elevation, `None` without samples
    pub fn elevation_range(&self) -> Option<(f64, f64)> {
        self.points.iter().map(|p| p.value).fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// Perimeter indicator: 1 on wet cells 8-adjacent to a dry cell, else 0.
pub fn boundary_mask(mask: ArrayView2<'_, u8>, classes: &MaskClasses) -> Result<Array2<u8>> {
    let dry = mask.mapv(|code| u8::from(classes.is_dry(code)));
    let dilated = dilate(dry.view(), &StructuringElement::Square(1))?;

    // dilated - dry - nodata leaves exactly the wet cells of the ring
    let mut ring = Array2::<u8>::zeros(mask.dim());
    Zip::from(&mut ring)
        .and(&dilated)
        .and(mask)
        .for_each(|out, &d, &code| {
            *out = u8::from(d == 1 && classes.classify(code) == CellClass::Wet);
        });
    Ok(ring)
}

/// Sample `dem` on the flood perimeter of `mask`.
///
/// Perimeter cells with a NaN elevation contribute no sample.
pub fn extract_boundary(
    mask: ArrayView2<'_, u8>,
    dem: ArrayView2<'_, f64>,
    classes: &MaskClasses,
) -> Result<BoundarySamples> {
    if mask.dim() != dem.dim() {
        return Err(Error::SizeMismatch {
            er: mask.nrows(),
            ec: mask.ncols(),
            ar: dem.nrows(),
            ac: dem.ncols(),
        });
    }

    let ring = boundary_mask(mask, classes)?;
    let mut grid = Array2::from_elem(mask.dim(), f64::NAN);
    Zip::from(&mut grid)
        .and(&ring)
        .and(dem)
        .for_each(|out, &on_ring, &z| {
            if on_ring == 1 {
                *out = z;
            }
        });

    Ok(BoundarySamples::from_grid(grid))
}
