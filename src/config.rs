//! Hyperparameters for online variational LDA.

use crate::error::{LdaError, LdaResult};
use serde::{Deserialize, Serialize};

/// How `fit` walks the corpus on each pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LearningMethod {
    /// One E-step over all rows, then λ ← η + S (ρ = 1).
    #[default]
    Batch,
    /// Mini-batches of `batch_size` rows, each with a decayed ρₜ update.
    Online,
}

/// How the topic-word parameters λ are allocated on first training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InitStrategy {
    /// Every entry drawn from Gamma(100, 1/100).
    Gamma,
    /// Gamma noise plus the counts of `n_topics` documents picked k-means++
    /// style under the Hellinger distance.
    #[default]
    SpreadDocuments,
}

/// Configuration for [`LatentDirichletAllocation`](crate::LatentDirichletAllocation).
///
/// # Examples
///
/// ```
/// use aprender_lda::config::{LdaConfig, LearningMethod};
///
/// let config = LdaConfig {
///     n_topics: 3,
///     learning_method: LearningMethod::Online,
///     ..LdaConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert!((config.alpha() - 1.0 / 3.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LdaConfig {
    /// Number of topics K
    pub n_topics: usize,
    /// Document-topic prior α (defaults to 1/K)
    pub doc_topic_prior: Option<f64>,
    /// Topic-word prior η (defaults to 1/K)
    pub topic_word_prior: Option<f64>,
    /// Learning-rate offset τ₀; downweights early updates
    pub learning_offset: f64,
    /// Learning-rate decay κ in (0, 1]
    pub learning_decay: f64,
    /// Estimated total number of documents in the stream
    pub total_samples: f64,
    /// Rows per mini-batch in online `fit`
    pub batch_size: usize,
    /// Update scheme used by `fit`
    pub learning_method: LearningMethod,
    /// E-step stopping threshold on the mean absolute change of γ
    pub mean_change_tol: f64,
    /// E-step iteration cap per document
    pub max_doc_update_iter: usize,
    /// Worker threads for the E-step (≤ 1 runs sequentially)
    pub n_jobs: usize,
    /// PRNG seed
    pub random_seed: u64,
    /// λ initialisation
    pub init: InitStrategy,
    /// Evaluate training perplexity every N passes of `fit` (0 = never)
    pub evaluate_every: usize,
    /// Stop `fit` once perplexity changes by less than this
    pub perplexity_tol: f64,
    /// Documents scored by subsampled perplexity
    pub subsample_size: usize,
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self {
            n_topics: 10,
            doc_topic_prior: None,
            topic_word_prior: None,
            learning_offset: 1000.0,
            learning_decay: 0.7,
            total_samples: 1e6,
            batch_size: 128,
            learning_method: LearningMethod::Batch,
            mean_change_tol: 1e-3,
            max_doc_update_iter: 100,
            n_jobs: 1,
            random_seed: 0,
            init: InitStrategy::SpreadDocuments,
            evaluate_every: 0,
            perplexity_tol: 0.1,
            subsample_size: 1000,
        }
    }
}

impl LdaConfig {
    /// Default configuration with `n_topics` topics.
    #[must_use]
    pub fn with_topics(n_topics: usize) -> Self {
        Self {
            n_topics,
            ..Self::default()
        }
    }

    /// Effective document-topic prior α.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.doc_topic_prior
            .unwrap_or(1.0 / self.n_topics.max(1) as f64)
    }

    /// Effective topic-word prior η.
    #[must_use]
    pub fn eta(&self) -> f64 {
        self.topic_word_prior
            .unwrap_or(1.0 / self.n_topics.max(1) as f64)
    }

    /// Check every hyperparameter against its domain.
    ///
    /// # Errors
    ///
    /// Returns [`LdaError::InvalidHyperparameter`] for the first violation.
    pub fn validate(&self) -> LdaResult<()> {
        if self.n_topics == 0 {
            return Err(LdaError::invalid_hyperparameter(
                "n_topics",
                self.n_topics,
                ">= 1",
            ));
        }
        positive("doc_topic_prior", self.alpha())?;
        positive("topic_word_prior", self.eta())?;
        if !(self.learning_offset.is_finite() && self.learning_offset >= 0.0) {
            return Err(LdaError::invalid_hyperparameter(
                "learning_offset",
                self.learning_offset,
                "finite value >= 0",
            ));
        }
        if !(self.learning_decay > 0.0 && self.learning_decay <= 1.0) {
            return Err(LdaError::invalid_hyperparameter(
                "learning_decay",
                self.learning_decay,
                "value in (0, 1]",
            ));
        }
        positive("total_samples", self.total_samples)?;
        if self.batch_size == 0 {
            return Err(LdaError::invalid_hyperparameter(
                "batch_size",
                self.batch_size,
                ">= 1",
            ));
        }
        if !(self.mean_change_tol.is_finite() && self.mean_change_tol >= 0.0) {
            return Err(LdaError::invalid_hyperparameter(
                "mean_change_tol",
                self.mean_change_tol,
                "finite value >= 0",
            ));
        }
        if self.max_doc_update_iter == 0 {
            return Err(LdaError::invalid_hyperparameter(
                "max_doc_update_iter",
                self.max_doc_update_iter,
                ">= 1",
            ));
        }
        if !(self.perplexity_tol.is_finite() && self.perplexity_tol >= 0.0) {
            return Err(LdaError::invalid_hyperparameter(
                "perplexity_tol",
                self.perplexity_tol,
                "finite value >= 0",
            ));
        }
        if self.subsample_size == 0 {
            return Err(LdaError::invalid_hyperparameter(
                "subsample_size",
                self.subsample_size,
                ">= 1",
            ));
        }
        Ok(())
    }
}

fn positive(param: &str, value: f64) -> LdaResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LdaError::invalid_hyperparameter(
            param,
            value,
            "finite value > 0",
        ))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
