//! Iterators which run in parallel if the `parallel` feature is enabled and sequentially otherwise.

#[cfg(feature = "parallel")]
pub use rayon::iter::ParallelIterator as MaybeParallelIterator;
#[cfg(not(feature = "parallel"))]
pub use std::iter::Iterator as MaybeParallelIterator;

pub trait MaybeParallelRefIterator<'a> {
    type Iter;

    fn maybe_par_iter(&'a self) -> Self::Iter;
}

#[cfg(feature = "parallel")]
impl<'a, T: Sync + 'a> MaybeParallelRefIterator<'a> for [T] {
    type Iter = rayon::slice::Iter<'a, T>;

    fn maybe_par_iter(&'a self) -> Self::Iter {
        use rayon::prelude::*;
        self.par_iter()
    }
}

#[cfg(not(feature = "parallel"))]
impl<'a, T: 'a> MaybeParallelRefIterator<'a> for [T] {
    type Iter = std::slice::Iter<'a, T>;

    fn maybe_par_iter(&'a self) -> Self::Iter {
        self.iter()
    }
}
