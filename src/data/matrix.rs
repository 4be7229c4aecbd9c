use crate::error::{Result, SymbindError};
use serde::{Deserialize, Serialize};

/// Dense, rectangular, row-major matrix of `f64` values.
///
/// Each row is its own buffer so that rows can be handed to a foreign call
/// as independent slices without copying.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct Matrix {
    rows: Vec<Vec<f64>>,
    n_cols: usize,
}

impl Matrix {
    /// Builds a matrix from row buffers. Every row must have the same length.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_cols = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
            return Err(SymbindError::Marshal(format!(
                "row {} has {} values, expected {}",
                i,
                row.len(),
                n_cols
            )));
        }
        Ok(Self { rows, n_cols })
    }

    /// Builds a matrix from column buffers, i.e. the transpose of `new`.
    pub fn from_columns(columns: Vec<Vec<f64>>) -> Result<Self> {
        Ok(Self::new(columns)?.transpose())
    }

    /// Matrix with `n_rows` rows and no columns.
    pub fn with_rows(n_rows: usize) -> Self {
        Self {
            rows: vec![Vec::new(); n_rows],
            n_cols: 0,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.n_cols == 0
    }

    pub fn row(&self, i: usize) -> Option<&[f64]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn column(&self, j: usize) -> Option<Vec<f64>> {
        if j >= self.n_cols {
            return None;
        }
        Some(self.rows.iter().map(|r| r[j]).collect())
    }

    /// Returns a copy with rows and columns swapped.
    ///
    /// Fitting data is handed to the engine feature-major, one buffer per
    /// column; this is the step that produces that layout. A matrix with
    /// rows but no columns transposes to an empty matrix.
    pub fn transpose(&self) -> Self {
        let rows = (0..self.n_cols)
            .map(|j| self.rows.iter().map(|r| r[j]).collect())
            .collect();
        Self {
            rows,
            n_cols: self.rows.len(),
        }
    }
}

impl TryFrom<Vec<Vec<f64>>> for Matrix {
    type Error = SymbindError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Matrix::new(rows)
    }
}

impl From<Matrix> for Vec<Vec<f64>> {
    fn from(m: Matrix) -> Self {
        m.rows
    }
}
