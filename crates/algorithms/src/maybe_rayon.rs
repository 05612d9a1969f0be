//! `into_par_iter()` with or without rayon.
//!
//! Builds without the `parallel` feature get a blanket trait that maps
//! `into_par_iter()` onto `into_iter()`, so call sites stay unchanged and run
//! on the calling thread.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
pub trait IntoParallelIterator: IntoIterator + Sized {
    fn into_par_iter(self) -> Self::IntoIter {
        self.into_iter()
    }
}

#[cfg(not(feature = "parallel"))]
impl<I: IntoIterator> IntoParallelIterator for I {}
