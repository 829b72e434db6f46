//! Compressed sparse row storage for document-term count matrices.

use super::Matrix;
use crate::error::{LdaError, LdaResult};
use serde::{Deserialize, Serialize};

/// A sparse matrix in compressed sparse row (CSR) format.
///
/// Rows are documents, columns are vocabulary terms. Row slices and
/// vertical stacking are order-preserving; the partitioner and the parallel
/// driver rely on that.
///
/// # Examples
///
/// ```
/// use aprender_lda::primitives::{CsrMatrix, Matrix};
///
/// let dense = Matrix::from_vec(2, 3, vec![1.0, 0.0, 2.0, 0.0, 0.0, 3.0]).expect("2x3");
/// let x = CsrMatrix::from_dense(&dense);
/// assert_eq!(x.nnz(), 3);
/// assert_eq!(x.row(0).indices, &[0, 2]);
/// assert_eq!(x.to_dense(), dense);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

/// Borrowed view of one CSR row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseRow<'a> {
    /// Column indices of stored entries, strictly increasing
    pub indices: &'a [usize],
    /// Stored values, aligned with `indices`
    pub values: &'a [f64],
}

impl SparseRow<'_> {
    /// Sum of the stored values.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Iterate `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

impl CsrMatrix {
    /// Build a CSR matrix from raw parts.
    ///
    /// # Errors
    ///
    /// Returns [`LdaError::InvalidInput`] if the structure is inconsistent:
    /// wrong `indptr` length, decreasing offsets, column indices out of range
    /// or not strictly increasing within a row.
    pub fn new(
        rows: usize,
        cols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f64>,
    ) -> LdaResult<Self> {
        if indptr.len() != rows + 1 {
            return Err(LdaError::InvalidInput(format!(
                "indptr length {} must be rows + 1 = {}",
                indptr.len(),
                rows + 1
            )));
        }
        if indices.len() != data.len() {
            return Err(LdaError::InvalidInput(format!(
                "indices length {} differs from data length {}",
                indices.len(),
                data.len()
            )));
        }
        if indptr[0] != 0 || indptr[rows] != data.len() {
            return Err(LdaError::InvalidInput(
                "indptr must start at 0 and end at nnz".to_string(),
            ));
        }
        // non-decreasing from 0 to nnz keeps every row slice in bounds
        if let Some(r) = indptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(LdaError::InvalidInput(format!("indptr decreases at row {r}")));
        }
        for r in 0..rows {
            let row = &indices[indptr[r]..indptr[r + 1]];
            if row.iter().any(|&c| c >= cols) {
                return Err(LdaError::InvalidInput(format!(
                    "row {r} has a column index >= {cols}"
                )));
            }
            if row.windows(2).any(|w| w[0] >= w[1]) {
                return Err(LdaError::InvalidInput(format!(
                    "row {r} column indices are not strictly increasing"
                )));
            }
        }
        Ok(Self {
            indptr,
            indices,
            data,
            rows,
            cols,
        })
    }

    /// An all-zero matrix with no stored entries.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            indptr: vec![0; rows + 1],
            indices: Vec::new(),
            data: Vec::new(),
            rows,
            cols,
        }
    }

    /// Convert a dense matrix, dropping zero entries.
    #[must_use]
    pub fn from_dense(dense: &Matrix<f64>) -> Self {
        let (rows, cols) = dense.shape();
        let mut indptr = Vec::with_capacity(rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for r in 0..rows {
            for (c, &v) in dense.row(r).iter().enumerate() {
                if v != 0.0 {
                    indices.push(c);
                    data.push(v);
                }
            }
            indptr.push(data.len());
        }
        Self {
            indptr,
            indices,
            data,
            rows,
            cols,
        }
    }

    /// Expand into a dense matrix.
    #[must_use]
    pub fn to_dense(&self) -> Matrix<f64> {
        let mut out = Matrix::zeros(self.rows, self.cols);
        for r in 0..self.rows {
            for (c, v) in self.row(r).iter() {
                out.set(r, c, v);
            }
        }
        out
    }

    /// Returns the shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of rows (documents).
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (vocabulary terms).
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Sum of all stored values.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Borrow one row.
    ///
    /// # Panics
    ///
    /// Panics if `r >= n_rows()`.
    #[must_use]
    pub fn row(&self, r: usize) -> SparseRow<'_> {
        let (start, end) = (self.indptr[r], self.indptr[r + 1]);
        SparseRow {
            indices: &self.indices[start..end],
            values: &self.data[start..end],
        }
    }

    /// Copy the contiguous rows `start..end` into a new matrix.
    ///
    /// # Panics
    ///
    /// Panics if `start > end` or `end > n_rows()`.
    #[must_use]
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        assert!(start <= end && end <= self.rows, "row slice out of bounds");
        let lo = self.indptr[start];
        let hi = self.indptr[end];
        Self {
            indptr: self.indptr[start..=end].iter().map(|p| p - lo).collect(),
            indices: self.indices[lo..hi].to_vec(),
            data: self.data[lo..hi].to_vec(),
            rows: end - start,
            cols: self.cols,
        }
    }

    /// Stack matrices vertically, preserving row order.
    ///
    /// # Errors
    ///
    /// Returns [`LdaError::EmptyInput`] for an empty list and
    /// [`LdaError::DimensionMismatch`] if column counts differ.
    pub fn vstack(blocks: &[Self]) -> LdaResult<Self> {
        let first = blocks
            .first()
            .ok_or_else(|| LdaError::EmptyInput("no matrices to stack".to_string()))?;
        let cols = first.cols;
        let mut indptr = Vec::with_capacity(blocks.iter().map(|b| b.rows).sum::<usize>() + 1);
        let mut indices = Vec::with_capacity(blocks.iter().map(Self::nnz).sum());
        let mut data = Vec::with_capacity(indices.capacity());
        indptr.push(0);
        for block in blocks {
            if block.cols != cols {
                return Err(LdaError::dimension_mismatch(
                    "stacked column count",
                    cols,
                    block.cols,
                ));
            }
            let offset = data.len();
            indptr.extend(block.indptr[1..].iter().map(|p| p + offset));
            indices.extend_from_slice(&block.indices);
            data.extend_from_slice(&block.data);
        }
        Ok(Self {
            rows: indptr.len() - 1,
            indptr,
            indices,
            data,
            cols,
        })
    }

    /// Check that every stored value is a finite, non-negative count.
    ///
    /// # Errors
    ///
    /// Returns [`LdaError::InvalidInput`] naming the first offending entry.
    pub fn validate_counts(&self) -> LdaResult<()> {
        for r in 0..self.rows {
            for (c, v) in self.row(r).iter() {
                if !v.is_finite() || v < 0.0 {
                    return Err(LdaError::InvalidInput(format!(
                        "document-term counts must be finite and non-negative, found {v} at ({r}, {c})"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl From<&Matrix<f64>> for CsrMatrix {
    fn from(dense: &Matrix<f64>) -> Self {
        Self::from_dense(dense)
    }
}

#[cfg(test)]
#[path = "sparse_tests.rs"]
mod tests;
