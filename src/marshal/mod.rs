//! Marshaling of host arrays and texts into `{data, len, cap}` views the
//! foreign engine reads in place.
//!
//! Every view borrows its source, so the borrow checker guarantees the
//! source outlives the foreign call the view is passed into and is not
//! mutated or moved meanwhile.

pub mod array;
pub mod text;

pub use array::{ForeignMatrix, ForeignSlice, ForeignSliceMut, RawMatrix};
pub use text::{take_foreign_string, ForeignStr, ForeignStrList, RawStrList};

use crate::data::Matrix;
use crate::error::Result;

/// Conversion of a borrowed host value into its foreign view.
pub trait ToForeign<'a> {
    type Output;

    fn to_foreign(self) -> Result<Self::Output>;
}

impl<'a> ToForeign<'a> for &'a [f64] {
    type Output = ForeignSlice<'a>;

    fn to_foreign(self) -> Result<Self::Output> {
        Ok(ForeignSlice::new(self))
    }
}

impl<'a> ToForeign<'a> for &'a Vec<f64> {
    type Output = ForeignSlice<'a>;

    fn to_foreign(self) -> Result<Self::Output> {
        Ok(ForeignSlice::new(self))
    }
}

impl<'a> ToForeign<'a> for &'a Matrix {
    type Output = ForeignMatrix<'a>;

    fn to_foreign(self) -> Result<Self::Output> {
        Ok(ForeignMatrix::from_matrix(self))
    }
}

impl<'a> ToForeign<'a> for &'a [Vec<f64>] {
    type Output = ForeignMatrix<'a>;

    fn to_foreign(self) -> Result<Self::Output> {
        ForeignMatrix::new(self)
    }
}

impl<'a> ToForeign<'a> for &'a str {
    type Output = ForeignStr<'a>;

    fn to_foreign(self) -> Result<Self::Output> {
        Ok(ForeignStr::new(self))
    }
}

impl<'a> ToForeign<'a> for &'a [String] {
    type Output = ForeignStrList<'a>;

    fn to_foreign(self) -> Result<Self::Output> {
        Ok(ForeignStrList::new(self))
    }
}
