//! Bounds-checked neighbour lookup

/// Apply an offset to (row, col), returning `None` when it leaves a
/// `rows` x `cols` grid.
#[inline]
pub fn offset_within(
    row: usize,
    col: usize,
    (dr, dc): (isize, isize),
    rows: usize,
    cols: usize,
) -> Option<(usize, usize)> {
    let nr = row.checked_add_signed(dr)?;
    let nc = col.checked_add_signed(dc)?;
    (nr < rows && nc < cols).then_some((nr, nc))
}
