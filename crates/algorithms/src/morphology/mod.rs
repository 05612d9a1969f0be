//! Binary morphology on 0/1 indicator grids
//!
//! - **Dilation**: a cell is set when any cell under the structuring element is set

mod dilate;
mod element;

pub use dilate::dilate;
pub use element::StructuringElement;
