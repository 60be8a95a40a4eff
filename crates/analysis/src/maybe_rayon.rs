//! Iterator plumbing that works with or without rayon.
//!
//! With the `parallel` feature on, rayon's prelude is re-exported and the
//! row loops fan out across a thread pool. With it off, a one-method
//! stand-in trait routes `into_par_iter()` to plain `into_iter()`, so the
//! same call sites compile down to ordinary sequential iterator chains.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

/// Stand-in for `rayon::prelude::IntoParallelIterator` when the thread
/// pool is compiled out.
#[cfg(not(feature = "parallel"))]
pub trait IntoParallelIterator {
    type Iter;
    type Item;
    fn into_par_iter(self) -> Self::Iter;
}

#[cfg(not(feature = "parallel"))]
impl<I> IntoParallelIterator for I
where
    I: IntoIterator,
{
    type Iter = I::IntoIter;
    type Item = I::Item;

    fn into_par_iter(self) -> Self::Iter {
        self.into_iter()
    }
}
