//! Binary dilation
//!
//! A cell of the output is 1 when any cell under the structuring element,
//! centred on it, is 1 in the input. Cells outside the grid count as 0.

use ndarray::{Array2, ArrayView2};

use crate::maybe_rayon::*;
use fwdet_core::raster::offset_within;
use fwdet_core::{Error, Result};

use super::element::StructuringElement;

/// Dilate a 0/1 indicator grid.
///
/// Any non-zero input cell counts as set. The output holds only 0 and 1.
pub fn dilate(indicator: ArrayView2<'_, u8>, element: &StructuringElement) -> Result<Array2<u8>> {
    element.validate()?;

    let (rows, cols) = indicator.dim();
    let offsets = element.offsets();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let hit = offsets.iter().any(|&off| {
                        offset_within(row, col, off, rows, cols)
                            .is_some_and(|(nr, nc)| indicator[[nr, nc]] != 0)
                    });
                    u8::from(hit)
                })
                .collect::<Vec<u8>>()
        })
        .collect();

    Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_single_cell_grows_to_square() {
        let mut grid = Array2::<u8>::zeros((5, 5));
        grid[[2, 2]] = 1;

        let out = dilate(grid.view(), &StructuringElement::Square(1)).unwrap();
        assert_eq!(out.iter().filter(|&&v| v == 1).count(), 9);
        assert_eq!(out[[1, 1]], 1);
        assert_eq!(out[[3, 3]], 1);
        assert_eq!(out[[0, 2]], 0);
    }

    #[test]
    fn test_outside_grid_counts_as_unset() {
        let grid = array![[0u8, 0, 0], [0, 0, 0], [0, 0, 1]];
        let out = dilate(grid.view(), &StructuringElement::default()).unwrap();
        assert_eq!(out, array![[0u8, 0, 0], [0, 1, 1], [0, 1, 1]]);
    }

    #[test]
    fn test_empty_grid() {
        let grid = Array2::<u8>::zeros((0, 0));
        let out = dilate(grid.view(), &StructuringElement::default()).unwrap();
        assert!(out.is_empty());
    }
}
