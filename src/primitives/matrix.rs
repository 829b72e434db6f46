//! Matrix type for 2D numeric data.

use serde::{Deserialize, Serialize};

/// A 2D matrix of floating-point values (row-major storage).
///
/// Used for every dense quantity of the topic model: the topic-word
/// parameters λ (`n_topics` × `n_vocab`), the per-document γ rows
/// (`n_docs` × `n_topics`) and the batch sufficient statistics.
///
/// # Examples
///
/// ```
/// use aprender_lda::primitives::Matrix;
///
/// let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("data length matches rows * cols");
/// assert_eq!(m.shape(), (2, 3));
/// assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Copy> Matrix<T> {
    /// Creates a new matrix from a vector of data.
    ///
    /// # Errors
    ///
    /// Returns an error if data length doesn't match rows * cols.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, &'static str> {
        if data.len() != rows * cols {
            return Err("Data length must equal rows * cols");
        }
        Ok(Self { data, rows, cols })
    }

    /// Returns the shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Gets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    /// Sets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    /// Returns a row as a slice.
    #[must_use]
    pub fn row(&self, row_idx: usize) -> &[T] {
        let start = row_idx * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Returns a row as a mutable slice.
    pub fn row_mut(&mut self, row_idx: usize) -> &mut [T] {
        let start = row_idx * self.cols;
        &mut self.data[start..start + self.cols]
    }

    /// Returns the underlying data as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the underlying data as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl Matrix<f64> {
    /// Creates a matrix of zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    /// Creates a matrix with every entry set to `value`.
    #[must_use]
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            data: vec![value; rows * cols],
            rows,
            cols,
        }
    }

    /// Sum of each row.
    #[must_use]
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.rows).map(|i| self.row(i).iter().sum()).collect()
    }

    /// Returns a copy whose rows sum to 1.
    ///
    /// Rows that sum to zero are left untouched.
    #[must_use]
    pub fn normalize_rows(&self) -> Self {
        let mut out = self.clone();
        for i in 0..out.rows {
            let row = out.row_mut(i);
            let sum: f64 = row.iter().sum();
            if sum > 0.0 {
                for v in row.iter_mut() {
                    *v /= sum;
                }
            }
        }
        out
    }

    /// Element-wise in-place addition.
    ///
    /// # Errors
    ///
    /// Returns an error if shapes differ.
    pub fn add_assign(&mut self, other: &Self) -> Result<(), &'static str> {
        if self.shape() != other.shape() {
            return Err("Matrix dimensions must match for addition");
        }
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += *b;
        }
        Ok(())
    }

    /// Stacks rows of equally wide matrices vertically.
    ///
    /// # Errors
    ///
    /// Returns an error if column counts differ.
    pub fn vstack(cols: usize, blocks: &[Self]) -> Result<Self, &'static str> {
        let mut data = Vec::with_capacity(blocks.iter().map(|b| b.data.len()).sum());
        let mut rows = 0;
        for block in blocks {
            if block.cols != cols {
                return Err("All stacked matrices must have the same number of columns");
            }
            data.extend_from_slice(&block.data);
            rows += block.rows;
        }
        Ok(Self { data, rows, cols })
    }
}

#[cfg(test)]
#[path = "matrix_tests.rs"]
mod tests;
