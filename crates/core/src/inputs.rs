//! Co-registered input grids and zero-copy windows over them

use ndarray::{s, ArrayView2};

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use crate::region::{BoundingBox, Region};

/// Classification mask, elevation model and optional channel correction,
/// all on one grid.
#[derive(Debug, Clone)]
pub struct SpatialInputs {
    mask: Raster<u8>,
    dem: Raster<f64>,
    channel: Option<Raster<f64>>,
}

impl SpatialInputs {
    /// Bundle the grids, failing if their shapes differ.
    ///
    /// The mask's transform is taken as the grid georeference.
    pub fn new(mask: Raster<u8>, dem: Raster<f64>, channel: Option<Raster<f64>>) -> Result<Self> {
        check_shape(mask.shape(), dem.shape())?;
        if let Some(ch) = &channel {
            check_shape(mask.shape(), ch.shape())?;
        }
        Ok(Self { mask, dem, channel })
    }

    pub fn mask(&self) -> &Raster<u8> {
        &self.mask
    }

    pub fn dem(&self) -> &Raster<f64> {
        &self.dem
    }

    pub fn channel(&self) -> Option<&Raster<f64>> {
        self.channel.as_ref()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.mask.shape()
    }

    /// View over the whole extent
    pub fn view(&self) -> SpatialInputsView<'_> {
        SpatialInputsView {
            mask: self.mask.view(),
            dem: self.dem.view(),
            channel: self.channel.as_ref().map(|c| c.view()),
            transform: *self.mask.transform(),
            bbox: self.mask.extent(),
        }
    }

    /// View restricted to `region`, borrowing the grids.
    pub fn crop(&self, region: &Region) -> Result<SpatialInputsView<'_>> {
        region.check_within(self.shape())?;
        self.view().crop(&region.bbox)
    }
}

fn check_shape(expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected == actual {
        return Ok(());
    }
    Err(Error::SizeMismatch {
        er: expected.0,
        ec: expected.1,
        ar: actual.0,
        ac: actual.1,
    })
}

/// Borrowed window over [`SpatialInputs`].
///
/// `bbox` is the window's position in the full grid and `transform` is
/// shifted so that cell (0, 0) of the view maps to the window origin.
#[derive(Debug, Clone, Copy)]
pub struct SpatialInputsView<'a> {
    pub mask: ArrayView2<'a, u8>,
    pub dem: ArrayView2<'a, f64>,
    pub channel: Option<ArrayView2<'a, f64>>,
    pub transform: GeoTransform,
    pub bbox: BoundingBox,
}

impl<'a> SpatialInputsView<'a> {
    /// Build a view from raw array views, checking shapes agree.
    pub fn from_arrays(
        mask: ArrayView2<'a, u8>,
        dem: ArrayView2<'a, f64>,
        channel: Option<ArrayView2<'a, f64>>,
    ) -> Result<Self> {
        let view = Self {
            mask,
            dem,
            channel,
            transform: GeoTransform::default(),
            bbox: BoundingBox::new(0, mask.nrows(), 0, mask.ncols()),
        };
        view.check_shapes()?;
        Ok(view)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.mask.dim()
    }

    /// Every grid of the view must match the mask's shape
    pub fn check_shapes(&self) -> Result<()> {
        check_shape(self.mask.dim(), self.dem.dim())?;
        if let Some(ch) = &self.channel {
            check_shape(self.mask.dim(), ch.dim())?;
        }
        Ok(())
    }

    /// Sub-window; `bbox` is relative to this view.
    pub fn crop(&self, bbox: &BoundingBox) -> Result<SpatialInputsView<'a>> {
        if !bbox.fits(self.shape()) {
            let (rows, cols) = self.shape();
            return Err(Error::RegionOutOfBounds {
                id: u32::MAX,
                row_start: bbox.row_start,
                row_end: bbox.row_end,
                col_start: bbox.col_start,
                col_end: bbox.col_end,
                rows,
                cols,
            });
        }
        self.check_shapes()?;

        let rs = bbox.row_start..bbox.row_end;
        let cs = bbox.col_start..bbox.col_end;
        Ok(SpatialInputsView {
            mask: self.mask.slice_move(s![rs.clone(), cs.clone()]),
            dem: self.dem.slice_move(s![rs.clone(), cs.clone()]),
            channel: self.channel.map(|c| c.slice_move(s![rs, cs])),
            transform: self.transform.window(bbox.row_start, bbox.col_start),
            bbox: BoundingBox::new(
                self.bbox.row_start + bbox.row_start,
                self.bbox.row_start + bbox.row_end,
                self.bbox.col_start + bbox.col_start,
                self.bbox.col_start + bbox.col_end,
            ),
        })
    }
}
