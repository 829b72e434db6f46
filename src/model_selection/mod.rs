//! Cross-validated held-out perplexity.
//!
//! The corpus is cut into contiguous folds; each fold is scored by a fresh
//! copy of the template model trained on the remaining folds.

use crate::error::{LdaError, LdaResult};
use crate::lda::LatentDirichletAllocation;
use crate::partition::split_into_folds;
use crate::primitives::CsrMatrix;
use crate::traits::TopicModel;
use tracing::debug;

/// Results from cross-validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidationResult {
    /// Held-out perplexity for each fold
    pub scores: Vec<f64>,
}

impl CrossValidationResult {
    /// Calculate mean score across folds
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<f64>() / self.scores.len() as f64
    }

    /// Calculate standard deviation of scores
    #[must_use]
    pub fn std(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .scores
            .iter()
            .map(|&score| (score - mean).powi(2))
            .sum::<f64>()
            / self.scores.len() as f64;
        variance.sqrt()
    }

    /// Get minimum score
    #[must_use]
    pub fn min(&self) -> f64 {
        self.scores.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Get maximum score
    #[must_use]
    pub fn max(&self) -> f64 {
        self.scores
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Held-out perplexity of `template` under `n_folds`-fold cross-validation.
///
/// For each fold, a clone of the template is reset to the unfitted state,
/// fitted for `max_iter` passes on the other folds stacked in order, and
/// scored on the held-out fold with `transform` + `perplexity`.
///
/// # Errors
///
/// Returns [`LdaError::InvalidHyperparameter`] unless
/// `2 <= n_folds <= x.n_rows()`, and propagates training or scoring errors
/// (a held-out fold without words is an [`LdaError::EmptyInput`]).
///
/// # Example
///
/// ```rust
/// use aprender_lda::prelude::*;
/// use aprender_lda::model_selection::cross_validate_perplexity;
///
/// let dense = Matrix::from_vec(6, 4, vec![
///     3.0, 2.0, 0.0, 0.0,
///     2.0, 3.0, 0.0, 0.0,
///     0.0, 0.0, 3.0, 2.0,
///     0.0, 0.0, 2.0, 3.0,
///     3.0, 3.0, 0.0, 0.0,
///     0.0, 0.0, 3.0, 3.0,
/// ]).expect("6x4");
/// let x = CsrMatrix::from_dense(&dense);
///
/// let template = LatentDirichletAllocation::new(2);
/// let results = cross_validate_perplexity(&template, &x, 3, 5).expect("3 folds");
/// assert_eq!(results.scores.len(), 3);
/// println!("held-out perplexity: {:.3} ± {:.3}", results.mean(), results.std());
/// ```
pub fn cross_validate_perplexity(
    template: &LatentDirichletAllocation,
    x: &CsrMatrix,
    n_folds: usize,
    max_iter: usize,
) -> LdaResult<CrossValidationResult> {
    if n_folds < 2 || n_folds > x.n_rows() {
        return Err(LdaError::invalid_hyperparameter(
            "n_folds",
            n_folds,
            &format!("value in [2, {}]", x.n_rows()),
        ));
    }
    let folds: Vec<CsrMatrix> = split_into_folds(x, n_folds)?.collect();
    let mut scores = Vec::with_capacity(n_folds);

    for (i, held_out) in folds.iter().enumerate() {
        let train_parts: Vec<CsrMatrix> = folds
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, f)| f.clone())
            .collect();
        let train = CsrMatrix::vstack(&train_parts)?;

        let mut fold_model = LatentDirichletAllocation::from_config(template.config().clone())?;
        fold_model.fit(&train, max_iter)?;
        let doc_topic = fold_model.transform(held_out)?;
        let score = fold_model.perplexity(held_out, &doc_topic, false)?;
        debug!(fold = i, perplexity = score, "held-out fold scored");
        scores.push(score);
    }

    Ok(CrossValidationResult { scores })
}
