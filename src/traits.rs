//! Core traits for topic-model estimators.
//!
//! These traits define the API contract shared by trainable topic models.

use crate::error::LdaResult;
use crate::primitives::{CsrMatrix, Matrix};

/// Estimator interface for topic models over document-term matrices.
///
/// Models move from unfitted to fitted on the first `fit` or
/// `partial_fit`; `transform` is only valid afterwards.
///
/// # Examples
///
/// ```
/// use aprender_lda::prelude::*;
///
/// let dtm = Matrix::from_vec(4, 4, vec![
///     4.0, 3.0, 0.0, 0.0,
///     3.0, 4.0, 0.0, 0.0,
///     0.0, 0.0, 4.0, 3.0,
///     0.0, 0.0, 3.0, 4.0,
/// ]).expect("4x4");
/// let x = CsrMatrix::from_dense(&dtm);
///
/// let mut model = LatentDirichletAllocation::new(2);
/// model.fit(&x, 5).expect("fit should succeed");
/// let doc_topics = model.transform(&x).expect("model is fitted");
/// for s in doc_topics.row_sums() {
///     assert!((s - 1.0).abs() < 1e-9);
/// }
/// ```
pub trait TopicModel {
    /// Fits the model with `max_iter` passes over `x`.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid input, a vocabulary mismatch with an
    /// already fitted model, or a numeric failure.
    fn fit(&mut self, x: &CsrMatrix, max_iter: usize) -> LdaResult<()>;

    /// Updates the model with one mini-batch.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid input or a vocabulary mismatch.
    fn partial_fit(&mut self, x: &CsrMatrix) -> LdaResult<()>;

    /// Infers the topic distribution of each row of `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted or `x` does not match it.
    fn transform(&self, x: &CsrMatrix) -> LdaResult<Matrix<f64>>;

    /// Fits on `x`, then returns its document-topic distributions.
    ///
    /// # Errors
    ///
    /// Propagates errors from `fit` and `transform`.
    fn fit_transform(&mut self, x: &CsrMatrix, max_iter: usize) -> LdaResult<Matrix<f64>> {
        self.fit(x, max_iter)?;
        self.transform(x)
    }
}
