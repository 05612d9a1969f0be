//! Regions: rectangular sub-extents of a large grid processed independently

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Half-open index rectangle `[row_start, row_end) x [col_start, col_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl BoundingBox {
    pub fn new(row_start: usize, row_end: usize, col_start: usize, col_end: usize) -> Self {
        Self {
            row_start,
            row_end,
            col_start,
            col_end,
        }
    }

    /// Number of rows (0 for an inverted box)
    pub fn rows(&self) -> usize {
        self.row_end.saturating_sub(self.row_start)
    }

    /// Number of columns (0 for an inverted box)
    pub fn cols(&self) -> usize {
        self.col_end.saturating_sub(self.col_start)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0 || self.cols() == 0
    }

    /// Whether (row, col) of the parent grid lies inside the box
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.row_start..self.row_end).contains(&row)
            && (self.col_start..self.col_end).contains(&col)
    }

    /// Whether the box is well-formed and lies inside a grid of `shape`
    pub fn fits(&self, (rows, cols): (usize, usize)) -> bool {
        self.row_start <= self.row_end
            && self.col_start <= self.col_end
            && self.row_end <= rows
            && self.col_end <= cols
    }

    /// Express `inner` (parent coordinates) relative to this box.
    ///
    /// Returns `None` if `inner` is not fully contained.
    pub fn relative(&self, inner: &BoundingBox) -> Option<BoundingBox> {
        let contained = inner.row_start >= self.row_start
            && inner.row_end <= self.row_end
            && inner.col_start >= self.col_start
            && inner.col_end <= self.col_end
            && inner.row_start <= inner.row_end
            && inner.col_start <= inner.col_end;
        contained.then(|| {
            BoundingBox::new(
                inner.row_start - self.row_start,
                inner.row_end - self.row_start,
                inner.col_start - self.col_start,
                inner.col_end - self.col_start,
            )
        })
    }
}

impl From<(usize, usize, usize, usize)> for BoundingBox {
    fn from((row_start, row_end, col_start, col_end): (usize, usize, usize, usize)) -> Self {
        Self::new(row_start, row_end, col_start, col_end)
    }
}

/// A rectangular sub-extent tagged with an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub id: u32,
    pub bbox: BoundingBox,
}

impl Region {
    pub fn new(id: u32, bbox: impl Into<BoundingBox>) -> Self {
        Self {
            id,
            bbox: bbox.into(),
        }
    }

    /// Fail with [`Error::RegionOutOfBounds`] unless the region fits `shape`.
    pub fn check_within(&self, shape: (usize, usize)) -> Result<()> {
        if self.bbox.fits(shape) {
            return Ok(());
        }
        Err(Error::RegionOutOfBounds {
            id: self.id,
            row_start: self.bbox.row_start,
            row_end: self.bbox.row_end,
            col_start: self.bbox.col_start,
            col_end: self.bbox.col_end,
            rows: shape.0,
            cols: shape.1,
        })
    }

    /// Membership label `id + 1`; 0 is reserved for uncovered cells.
    pub fn label(&self) -> Result<u32> {
        self.id.checked_add(1).ok_or_else(|| Error::InvalidParameter {
            name: "id",
            value: self.id.to_string(),
            reason: "no membership label above u32::MAX".into(),
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bbox;
        write!(
            f,
            "{}: ({}, {}, {}, {})",
            self.id, b.row_start, b.row_end, b.col_start, b.col_end
        )
    }
}

/// Ordered collection of regions covering a grid.
///
/// Order matters: when regions overlap, the later region wins in a merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionCatalog {
    regions: Vec<Region>,
}

impl RegionCatalog {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    /// Build from an id → `(row_start, row_end, col_start, col_end)` table,
    /// ordered by id.
    pub fn from_bounds(bounds: &BTreeMap<u32, (usize, usize, usize, usize)>) -> Self {
        Self::new(
            bounds
                .iter()
                .map(|(&id, &bbox)| Region::new(id, bbox))
                .collect(),
        )
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    pub fn get(&self, id: u32) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Check every region against the grid shape; reports the first offender.
    pub fn validate(&self, shape: (usize, usize)) -> Result<()> {
        self.regions.iter().try_for_each(|r| r.check_within(shape))
    }

    /// Region-membership raster: each cell holds `id + 1` of the last region
    /// covering it, 0 where no region does.
    pub fn label_grid(&self, shape: (usize, usize)) -> Result<Array2<u32>> {
        let mut labels = Array2::zeros(shape);
        for region in &self.regions {
            region.check_within(shape)?;
            let label = region.label()?;
            let b = &region.bbox;
            labels
                .slice_mut(s![b.row_start..b.row_end, b.col_start..b.col_end])
                .fill(label);
        }
        Ok(labels)
    }

    /// Number of cells of a `shape` grid not covered by any region.
    pub fn uncovered_cells(&self, shape: (usize, usize)) -> Result<usize> {
        Ok(self.label_grid(shape)?.iter().filter(|&&l| l == 0).count())
    }

    /// The 23-region partition of the Murray–Darling Basin on the
    /// 1-arc-second grid of shape [`Self::MURRAY_DARLING_SHAPE`].
    pub fn murray_darling_basin() -> Self {
        let bounds: [(usize, usize, usize, usize); 23] = [
            (23967, 35491, 12410, 19489),
            (34097, 45151, 28775, 41294),
            (38537, 48592, 21375, 36884),
            (32962, 40056, 16950, 31319),
            (16967, 30731, 14085, 23104),
            (5342, 16231, 40465, 51668),
            (757, 13731, 32275, 42614),
            (12057, 23596, 35865, 45649),
            (10302, 22721, 27670, 40414),
            (28632, 39916, 27845, 43064),
            (26567, 35566, 16680, 29344),
            (37487, 48376, 10750, 24564),
            (27942, 44726, 0, 9159),
            (31552, 45446, 7360, 19759),
            (24652, 34426, 5125, 14264),
            (17562, 28816, 21240, 29374),
            (0, 11301, 21630, 35354),
            (9657, 19246, 19575, 26404),
            (20517, 33311, 35850, 49034),
            (20622, 32036, 31725, 39519),
            (13317, 22201, 42850, 50689),
            (8947, 20356, 24245, 34399),
            (19577, 30981, 25710, 34154),
        ];
        Self::new(
            bounds
                .into_iter()
                .enumerate()
                .map(|(id, bbox)| Region::new(id as u32, bbox))
                .collect(),
        )
    }

    /// Grid shape (rows, cols) of the Murray–Darling Basin inputs
    pub const MURRAY_DARLING_SHAPE: (usize, usize) = (48592, 51668);
}

impl<'a> IntoIterator for &'a RegionCatalog {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}

impl FromIterator<Region> for RegionCatalog {
    fn from_iter<I: IntoIterator<Item = Region>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
