//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use crate::region::BoundingBox;
use ndarray::{s, Array2, ArrayView2};

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a 2D grid with associated
/// geographic metadata (transform and no-data value).
///
/// # Example
///
/// ```ignore
/// use fwdet_core::Raster;
///
/// // 25x25 depth raster, every cell marked missing
/// let mut depth: Raster<u16> = Raster::filled(25, 25, u16::MAX);
/// depth.set(12, 12, 250)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The bounding box covering the whole raster
    pub fn extent(&self) -> BoundingBox {
        BoundingBox::new(0, self.rows(), 0, self.cols())
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            }),
        }
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    /// Borrow the cells inside `bbox` without copying.
    pub fn window(&self, bbox: &BoundingBox) -> Result<ArrayView2<'_, T>> {
        self.check_bbox(bbox)?;
        Ok(self
            .data
            .slice(s![bbox.row_start..bbox.row_end, bbox.col_start..bbox.col_end]))
    }

    /// Overwrite the cells inside `bbox` with `values`.
    ///
    /// `values` must have exactly the shape of `bbox`.
    pub fn paste(&mut self, bbox: &BoundingBox, values: ArrayView2<'_, T>) -> Result<()> {
        self.check_bbox(bbox)?;
        let (vr, vc) = values.dim();
        if (vr, vc) != bbox.shape() {
            return Err(Error::SizeMismatch {
                er: bbox.rows(),
                ec: bbox.cols(),
                ar: vr,
                ac: vc,
            });
        }
        self.data
            .slice_mut(s![bbox.row_start..bbox.row_end, bbox.col_start..bbox.col_end])
            .assign(&values);
        Ok(())
    }

    fn check_bbox(&self, bbox: &BoundingBox) -> Result<()> {
        if bbox.fits(self.shape()) {
            Ok(())
        } else {
            Err(Error::IndexOutOfBounds {
                row: bbox.row_end,
                col: bbox.col_end,
                rows: self.rows(),
                cols: self.cols(),
            })
        }
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Number of cells holding exactly `value`
    pub fn count(&self, value: T) -> usize {
        self.data.iter().filter(|&&v| v == value).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
        assert_eq!(raster.extent(), BoundingBox::new(0, 100, 0, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f32> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.get(10, 0).is_err());
        assert!(raster.set(0, 10, 1.0).is_err());
    }

    #[test]
    fn test_window_borrows_subrectangle() {
        let data = Array2::from_shape_fn((6, 5), |(r, c)| (r * 10 + c) as u16);
        let raster = Raster::from_array(data);

        let win = raster.window(&BoundingBox::new(2, 4, 1, 3)).unwrap();
        assert_eq!(win.dim(), (2, 2));
        assert_eq!(win[[0, 0]], 21);
        assert_eq!(win[[1, 1]], 32);

        assert!(raster.window(&BoundingBox::new(2, 7, 0, 5)).is_err());
    }

    #[test]
    fn test_paste_writes_only_bbox() {
        let mut raster: Raster<u16> = Raster::filled(4, 4, u16::MAX);
        let patch = Array2::from_elem((2, 3), 7u16);
        raster
            .paste(&BoundingBox::new(1, 3, 1, 4), patch.view())
            .unwrap();

        assert_eq!(raster.count(7), 6);
        assert_eq!(raster.get(0, 0).unwrap(), u16::MAX);
        assert_eq!(raster.get(2, 3).unwrap(), 7);
    }

    #[test]
    fn test_paste_rejects_wrong_shape() {
        let mut raster: Raster<u16> = Raster::new(4, 4);
        let patch = Array2::from_elem((3, 3), 1u16);
        let err = raster
            .paste(&BoundingBox::new(0, 2, 0, 2), patch.view())
            .unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }
}
