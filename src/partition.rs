//! Row partitioning of document-term matrices.
//!
//! Three policies feed training and evaluation:
//! - explicit batch sizes ([`split_by_sizes`])
//! - near-equal folds ([`split_into_folds`]), used for E-step sharding and
//!   cross-validation
//! - fixed-size mini-batches with a remainder ([`split_into_mini_batches`])
//!
//! Every policy preserves row order, so stacking the produced slices in
//! order reconstructs the input exactly.

use crate::error::{LdaError, LdaResult};
use crate::primitives::CsrMatrix;

/// Lazy sequence of contiguous row slices of a [`CsrMatrix`].
///
/// Each call to `next` copies the next slice out of the borrowed matrix.
/// The sequence is consumed once; build a new one to iterate again.
#[derive(Debug)]
pub struct RowBatches<'a> {
    matrix: &'a CsrMatrix,
    sizes: std::vec::IntoIter<usize>,
    start: usize,
}

impl RowBatches<'_> {
    /// Row index in the source matrix where the next batch begins.
    #[must_use]
    pub fn next_offset(&self) -> usize {
        self.start
    }
}

impl Iterator for RowBatches<'_> {
    type Item = CsrMatrix;

    fn next(&mut self) -> Option<Self::Item> {
        let size = self.sizes.next()?;
        let end = self.start + size;
        let batch = self.matrix.slice_rows(self.start, end);
        self.start = end;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.sizes.size_hint()
    }
}

impl ExactSizeIterator for RowBatches<'_> {}

/// Split `matrix` into consecutive row slices with the given row counts.
///
/// # Errors
///
/// Returns [`LdaError::PartitionMismatch`] if `sizes` does not sum to the
/// row count. Nothing is sliced in that case.
///
/// # Examples
///
/// ```
/// use aprender_lda::partition::split_by_sizes;
/// use aprender_lda::primitives::{CsrMatrix, Matrix};
///
/// let dense = Matrix::from_vec(3, 2, vec![1.0, 0.0, 0.0, 2.0, 3.0, 3.0]).expect("3x2");
/// let x = CsrMatrix::from_dense(&dense);
/// let batches: Vec<_> = split_by_sizes(&x, &[1, 2]).expect("sizes cover rows").collect();
/// assert_eq!(batches[0].n_rows(), 1);
/// assert_eq!(batches[1].n_rows(), 2);
/// ```
pub fn split_by_sizes<'a>(matrix: &'a CsrMatrix, sizes: &[usize]) -> LdaResult<RowBatches<'a>> {
    let total: usize = sizes.iter().sum();
    if total != matrix.n_rows() {
        return Err(LdaError::PartitionMismatch {
            expected: matrix.n_rows(),
            actual: total,
        });
    }
    Ok(RowBatches {
        matrix,
        sizes: sizes.to_vec().into_iter(),
        start: 0,
    })
}

/// Split `matrix` into `n_folds` contiguous folds of near-equal size.
///
/// No fold exceeds ⌈rows / n_folds⌉ rows; when `n_folds > rows` the
/// trailing folds are empty.
///
/// # Errors
///
/// Returns [`LdaError::InvalidHyperparameter`] if `n_folds` is zero.
pub fn split_into_folds(matrix: &CsrMatrix, n_folds: usize) -> LdaResult<RowBatches<'_>> {
    let sizes = fold_sizes(matrix.n_rows(), n_folds)?;
    split_by_sizes(matrix, &sizes)
}

/// Split `matrix` into batches of `batch_size` rows plus a final remainder.
///
/// # Errors
///
/// Returns [`LdaError::InvalidHyperparameter`] if `batch_size` is zero.
pub fn split_into_mini_batches(
    matrix: &CsrMatrix,
    batch_size: usize,
) -> LdaResult<RowBatches<'_>> {
    let sizes = mini_batch_sizes(matrix.n_rows(), batch_size)?;
    split_by_sizes(matrix, &sizes)
}

/// Row counts produced by [`split_into_folds`] for `n_rows` rows.
///
/// The first `n_rows % n_folds` folds carry one extra row.
///
/// # Errors
///
/// Returns [`LdaError::InvalidHyperparameter`] if `n_folds` is zero.
pub fn fold_sizes(n_rows: usize, n_folds: usize) -> LdaResult<Vec<usize>> {
    if n_folds == 0 {
        return Err(LdaError::invalid_hyperparameter("n_folds", n_folds, ">= 1"));
    }
    let base = n_rows / n_folds;
    let extra = n_rows % n_folds;
    Ok((0..n_folds)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect())
}

/// Row counts produced by [`split_into_mini_batches`] for `n_rows` rows.
///
/// # Errors
///
/// Returns [`LdaError::InvalidHyperparameter`] if `batch_size` is zero.
pub fn mini_batch_sizes(n_rows: usize, batch_size: usize) -> LdaResult<Vec<usize>> {
    if batch_size == 0 {
        return Err(LdaError::invalid_hyperparameter(
            "batch_size",
            batch_size,
            ">= 1",
        ));
    }
    let mut sizes = vec![batch_size; n_rows / batch_size];
    let rem = n_rows % batch_size;
    if rem > 0 {
        sizes.push(rem);
    }
    Ok(sizes)
}

/// Start offset of each batch for a list of batch sizes.
#[must_use]
pub fn offsets(sizes: &[usize]) -> Vec<usize> {
    sizes
        .iter()
        .scan(0, |acc, &s| {
            let start = *acc;
            *acc += s;
            Some(start)
        })
        .collect()
}

#[cfg(test)]
#[path = "partition_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "partition_tests_contract.rs"]
mod tests_contract;
