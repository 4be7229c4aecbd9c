use crate::data::Matrix;
use crate::error::{Result, SymbindError};
use std::marker::PhantomData;

/// Read-only view over a `f64` buffer laid out as `{data, len, cap}`.
///
/// The view aliases the source buffer: nothing is copied, and the lifetime
/// `'a` keeps the source borrowed (and therefore unmoved and unmodified) for
/// as long as the view exists. An empty source still yields a non-null
/// pointer.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ForeignSlice<'a> {
    data: *const f64,
    len: i64,
    cap: i64,
    _marker: PhantomData<&'a [f64]>,
}

impl<'a> ForeignSlice<'a> {
    pub fn new(values: &'a [f64]) -> Self {
        Self {
            data: values.as_ptr(),
            len: values.len() as i64,
            cap: values.len() as i64,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.cap as usize
    }

    pub fn as_ptr(&self) -> *const f64 {
        self.data
    }

    /// Reads the viewed values back.
    pub fn as_slice(&self) -> &'a [f64] {
        // SAFETY: `data`/`len` were taken from a `&'a [f64]` that is still
        // borrowed for `'a`, and the fields are never mutated afterwards.
        unsafe { std::slice::from_raw_parts(self.data, self.len as usize) }
    }
}

/// Writable view over a caller-allocated `f64` buffer, same layout as
/// [`ForeignSlice`]. Used for output buffers the foreign side fills in place.
#[repr(C)]
#[derive(Debug)]
pub struct ForeignSliceMut<'a> {
    data: *mut f64,
    len: i64,
    cap: i64,
    _marker: PhantomData<&'a mut [f64]>,
}

impl<'a> ForeignSliceMut<'a> {
    pub fn new(values: &'a mut [f64]) -> Self {
        Self {
            data: values.as_mut_ptr(),
            len: values.len() as i64,
            cap: values.len() as i64,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const f64 {
        self.data
    }

    pub fn as_slice(&self) -> &[f64] {
        // SAFETY: built from an exclusive borrow that lives for `'a`.
        unsafe { std::slice::from_raw_parts(self.data, self.len as usize) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        // SAFETY: as above; `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.data, self.len as usize) }
    }

    /// Bitwise copy handed to a foreign call by value. The copy borrows
    /// `self` mutably so the buffer cannot be touched from Rust meanwhile.
    pub(crate) fn reborrow(&mut self) -> ForeignSliceMut<'_> {
        ForeignSliceMut {
            data: self.data,
            len: self.len,
            cap: self.cap,
            _marker: PhantomData,
        }
    }
}

/// Row table for a 2-D array. Each entry aliases one source row.
///
/// The table itself is owned here; [`ForeignMatrix::as_raw`] produces the
/// `{data, len, cap}` value that points into it.
#[derive(Debug, Clone)]
pub struct ForeignMatrix<'a> {
    rows: Vec<ForeignSlice<'a>>,
    n_cols: usize,
}

/// `{data, len, cap}` header over a [`ForeignMatrix`] row table, passed to
/// the foreign side by value.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawMatrix<'m> {
    data: *const ForeignSlice<'m>,
    len: i64,
    cap: i64,
    _marker: PhantomData<&'m [ForeignSlice<'m>]>,
}

impl<'a> ForeignMatrix<'a> {
    /// Marshals rows of any slice-like type. Rows must share one length.
    pub fn new<R: AsRef<[f64]>>(rows: &'a [R]) -> Result<Self> {
        let n_cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut table = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != n_cols {
                return Err(SymbindError::Marshal(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    n_cols
                )));
            }
            table.push(ForeignSlice::new(row));
        }
        Ok(Self { rows: table, n_cols })
    }

    pub fn from_matrix(matrix: &'a Matrix) -> Self {
        Self {
            rows: matrix.rows().iter().map(|r| ForeignSlice::new(r)).collect(),
            n_cols: matrix.n_cols(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, i: usize) -> Option<&'a [f64]> {
        self.rows.get(i).map(ForeignSlice::as_slice)
    }

    pub fn as_raw(&self) -> RawMatrix<'_> {
        let rows: &[ForeignSlice<'_>] = &self.rows;
        RawMatrix {
            data: rows.as_ptr(),
            len: rows.len() as i64,
            cap: rows.len() as i64,
            _marker: PhantomData,
        }
    }

    /// Copies the viewed values out into owned rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.as_slice().to_vec()).collect()
    }
}

impl<'m> RawMatrix<'m> {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const ForeignSlice<'m> {
        self.data
    }

    pub fn rows(&self) -> &'m [ForeignSlice<'m>] {
        // SAFETY: points into a row table borrowed for `'m`.
        unsafe { std::slice::from_raw_parts(self.data, self.len as usize) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_aliases_source() {
        let values = vec![1.0, 2.0, 3.0];
        let view = ForeignSlice::new(&values);
        assert_eq!(view.as_ptr(), values.as_ptr());
        assert_eq!(view.len(), 3);
        assert_eq!(view.capacity(), 3);
        assert_eq!(view.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_empty_slice_is_not_null() {
        let values: Vec<f64> = Vec::new();
        let view = ForeignSlice::new(&values);
        assert!(!view.as_ptr().is_null());
        assert!(view.is_empty());
        assert!(view.as_slice().is_empty());
    }

    #[test]
    fn test_mut_view_writes_through() {
        let mut values = vec![0.0; 4];
        {
            let mut view = ForeignSliceMut::new(&mut values);
            view.as_mut_slice()[2] = 7.5;
            assert_eq!(view.as_slice()[2], 7.5);
        }
        assert_eq!(values, vec![0.0, 0.0, 7.5, 0.0]);
    }

    #[test]
    fn test_matrix_rows_alias_source_rows() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let m = ForeignMatrix::new(&rows).unwrap();
        let raw = m.as_raw();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.rows()[1].as_ptr(), rows[1].as_ptr());
        assert_eq!(m.to_rows(), rows);
    }

    fn read_back(m: &ForeignMatrix<'_>) -> Vec<Vec<f64>> {
        m.as_raw().rows().iter().map(|r| r.as_slice().to_vec()).collect()
    }

    #[test]
    fn test_single_element_views() {
        let values = [4.25];
        let view = ForeignSlice::new(&values);
        assert_eq!(view.len(), 1);
        assert_eq!(view.as_slice(), &[4.25]);

        let rows = vec![vec![4.25]];
        let m = ForeignMatrix::new(&rows).unwrap();
        assert_eq!((m.n_rows(), m.n_cols()), (1, 1));
        assert_eq!(read_back(&m), rows);
    }

    #[test]
    fn test_single_row_matrix() {
        let rows = vec![vec![1.0, -2.0, 3.5]];
        let m = ForeignMatrix::new(&rows).unwrap();
        let raw = m.as_raw();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw.rows()[0].len(), 3);
        assert_eq!(raw.rows()[0].as_ptr(), rows[0].as_ptr());
        assert_eq!(read_back(&m), rows);
    }

    #[test]
    fn test_single_column_matrix() {
        let rows = vec![vec![1.0], vec![-2.0], vec![3.5]];
        let m = ForeignMatrix::new(&rows).unwrap();
        let raw = m.as_raw();
        assert_eq!(raw.len(), 3);
        assert_eq!(m.n_cols(), 1);
        for (view, row) in raw.rows().iter().zip(&rows) {
            assert_eq!(view.len(), 1);
            assert_eq!(view.as_ptr(), row.as_ptr());
        }
        assert_eq!(read_back(&m), rows);
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(ForeignMatrix::new(&rows), Err(SymbindError::Marshal(_))));
    }

    #[test]
    fn test_empty_matrix_is_not_null() {
        let rows: Vec<Vec<f64>> = Vec::new();
        let m = ForeignMatrix::new(&rows).unwrap();
        let raw = m.as_raw();
        assert!(!raw.as_ptr().is_null());
        assert!(raw.is_empty());
        assert_eq!(m.n_cols(), 0);
    }

    #[test]
    fn test_layout_matches_go_slice_header() {
        assert_eq!(std::mem::size_of::<ForeignSlice<'_>>(), 24);
        assert_eq!(std::mem::size_of::<ForeignSliceMut<'_>>(), 24);
        assert_eq!(std::mem::size_of::<RawMatrix<'_>>(), 24);
    }
}
