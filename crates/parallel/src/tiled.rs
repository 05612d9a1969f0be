//! Regular tiling of a grid into regions

use fwdet_core::{BoundingBox, Error, Region, RegionCatalog, Result};

/// Iterator over row-major tiles covering a grid.
///
/// Tiles on the last row and column are truncated to the grid edge.
#[derive(Debug, Clone)]
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_rows: usize,
    tile_cols: usize,
    current_row: usize,
    current_col: usize,
}

impl TileIterator {
    /// Create a new tile iterator; tile sides must be non-zero.
    pub fn new(
        total_rows: usize,
        total_cols: usize,
        tile_rows: usize,
        tile_cols: usize,
    ) -> Result<Self> {
        if tile_rows == 0 || tile_cols == 0 {
            return Err(Error::InvalidParameter {
                name: "tile_size",
                value: format!("{tile_rows}x{tile_cols}"),
                reason: "tile sides must be at least 1".into(),
            });
        }
        Ok(Self {
            total_rows,
            total_cols,
            tile_rows,
            tile_cols,
            current_row: 0,
            current_col: 0,
        })
    }
}

impl Iterator for TileIterator {
    type Item = BoundingBox;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let tile = BoundingBox::new(
            self.current_row,
            (self.current_row + self.tile_rows).min(self.total_rows),
            self.current_col,
            (self.current_col + self.tile_cols).min(self.total_cols),
        );

        self.current_col += self.tile_cols;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row += self.tile_rows;
        }

        Some(tile)
    }
}

/// Partition a `rows × cols` grid into tiles numbered from 0 in row-major order.
pub fn tiled_catalog(
    rows: usize,
    cols: usize,
    tile_rows: usize,
    tile_cols: usize,
) -> Result<RegionCatalog> {
    Ok(TileIterator::new(rows, cols, tile_rows, tile_cols)?
        .enumerate()
        .map(|(id, bbox)| Region::new(id as u32, bbox))
        .collect())
}
