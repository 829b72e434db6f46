//! Online variational Bayes for Latent Dirichlet Allocation.
//!
//! The estimator learns topic-word parameters λ from a document-term count
//! matrix, either in full passes ([`LearningMethod::Batch`] and
//! [`LearningMethod::Online`] through `fit`) or one mini-batch at a time
//! through `partial_fit`, which is what makes streaming corpora possible.
//!
//! # Quick Start
//!
//! ```
//! use aprender_lda::prelude::*;
//!
//! // Document-term matrix (4 docs × 6 terms)
//! let dtm = Matrix::from_vec(4, 6, vec![
//!     3.0, 2.0, 3.0, 0.0, 0.0, 0.0,
//!     2.0, 3.0, 2.0, 0.0, 0.0, 0.0,
//!     0.0, 0.0, 0.0, 3.0, 2.0, 3.0,
//!     0.0, 0.0, 0.0, 2.0, 3.0, 2.0,
//! ]).expect("4x6");
//! let x = CsrMatrix::from_dense(&dtm);
//!
//! let mut lda = LatentDirichletAllocation::new(2).with_random_seed(7);
//! let doc_topics = lda.fit_transform(&x, 10).expect("fit should succeed");
//! assert_eq!(doc_topics.shape(), (4, 2));
//! ```

mod perplexity;

pub use perplexity::{approx_bound, perplexity};

use crate::config::{InitStrategy, LdaConfig, LearningMethod};
use crate::error::{LdaError, LdaResult};
use crate::estep::EStepParams;
use crate::init::initialize_lambda;
use crate::mstep::{LearningRateSchedule, StochasticMStep, UpdateWeights};
use crate::parallel::EStepDriver;
use crate::partition::{mini_batch_sizes, split_by_sizes};
use crate::primitives::{CsrMatrix, Matrix};
use crate::special::dirichlet_expectation_rows;
use crate::traits::TopicModel;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Lifecycle of the corpus-level parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum ModelState {
    Unfit,
    Fit(FittedState),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedState {
    /// Topic-word parameters λ (`n_topics` × `n_vocab`)
    lambda: Matrix<f64>,
    /// M-steps applied so far (t)
    n_batch_iter: u64,
    /// Vocabulary size frozen by the first training call
    n_vocab: usize,
}

/// Latent Dirichlet Allocation trained by online variational Bayes.
///
/// LDA models:
/// - each document as a mixture of topics (γ, per document)
/// - each topic as a distribution over words (λ, shared)
///
/// # Examples
///
/// ```
/// use aprender_lda::prelude::*;
///
/// let dtm = Matrix::from_vec(2, 3, vec![
///     1.0, 2.0, 0.0,
///     0.0, 1.0, 2.0,
/// ]).expect("2x3");
/// let x = CsrMatrix::from_dense(&dtm);
///
/// let mut lda = LatentDirichletAllocation::new(2)
///     .with_learning_method(LearningMethod::Online)
///     .with_batch_size(1);
/// lda.partial_fit(&x).expect("partial_fit should succeed");
/// assert_eq!(lda.n_batch_iter(), 1);
/// assert_eq!(lda.components().expect("fitted").shape(), (2, 3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentDirichletAllocation {
    config: LdaConfig,
    state: ModelState,
    /// Passes run by the last `fit`
    n_iter: usize,
}

impl Default for LatentDirichletAllocation {
    fn default() -> Self {
        Self {
            config: LdaConfig::default(),
            state: ModelState::Unfit,
            n_iter: 0,
        }
    }
}

impl LatentDirichletAllocation {
    /// Create an unfitted model with `n_topics` topics and default settings.
    ///
    /// # Examples
    ///
    /// ```
    /// use aprender_lda::LatentDirichletAllocation;
    ///
    /// let lda = LatentDirichletAllocation::new(5);
    /// assert!(!lda.is_fitted());
    /// ```
    #[must_use]
    pub fn new(n_topics: usize) -> Self {
        Self {
            config: LdaConfig::with_topics(n_topics),
            ..Self::default()
        }
    }

    /// Create an unfitted model from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LdaError::InvalidHyperparameter`] if the configuration is
    /// invalid.
    pub fn from_config(config: LdaConfig) -> LdaResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Set the document-topic prior α.
    #[must_use]
    pub fn with_doc_topic_prior(mut self, alpha: f64) -> Self {
        self.config.doc_topic_prior = Some(alpha);
        self
    }

    /// Set the topic-word prior η.
    #[must_use]
    pub fn with_topic_word_prior(mut self, eta: f64) -> Self {
        self.config.topic_word_prior = Some(eta);
        self
    }

    /// Set the learning-rate offset τ₀.
    #[must_use]
    pub fn with_learning_offset(mut self, offset: f64) -> Self {
        self.config.learning_offset = offset;
        self
    }

    /// Set the learning-rate decay κ.
    #[must_use]
    pub fn with_learning_decay(mut self, decay: f64) -> Self {
        self.config.learning_decay = decay;
        self
    }

    /// Set the estimated corpus size used to rescale `partial_fit` batches.
    #[must_use]
    pub fn with_total_samples(mut self, total: f64) -> Self {
        self.config.total_samples = total;
        self
    }

    /// Set the mini-batch size of online `fit`.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Set how `fit` walks the corpus.
    #[must_use]
    pub fn with_learning_method(mut self, method: LearningMethod) -> Self {
        self.config.learning_method = method;
        self
    }

    /// Set the E-step convergence tolerance.
    #[must_use]
    pub fn with_mean_change_tol(mut self, tol: f64) -> Self {
        self.config.mean_change_tol = tol;
        self
    }

    /// Set the E-step iteration cap.
    #[must_use]
    pub fn with_max_doc_update_iter(mut self, max_iter: usize) -> Self {
        self.config.max_doc_update_iter = max_iter;
        self
    }

    /// Set the number of E-step worker threads.
    #[must_use]
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.config.n_jobs = n_jobs;
        self
    }

    /// Set random seed.
    ///
    /// # Examples
    ///
    /// ```
    /// use aprender_lda::LatentDirichletAllocation;
    ///
    /// let lda = LatentDirichletAllocation::new(3).with_random_seed(123);
    /// assert_eq!(lda.config().random_seed, 123);
    /// ```
    #[must_use]
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    /// Set the λ initialisation strategy.
    #[must_use]
    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.config.init = init;
        self
    }

    /// Evaluate training perplexity every `n` passes of `fit` (0 disables).
    #[must_use]
    pub fn with_evaluate_every(mut self, n: usize) -> Self {
        self.config.evaluate_every = n;
        self
    }

    /// Set the early-stopping perplexity tolerance.
    #[must_use]
    pub fn with_perplexity_tol(mut self, tol: f64) -> Self {
        self.config.perplexity_tol = tol;
        self
    }

    /// Set how many documents subsampled perplexity scores.
    #[must_use]
    pub fn with_subsample_size(mut self, n: usize) -> Self {
        self.config.subsample_size = n;
        self
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &LdaConfig {
        &self.config
    }

    /// Number of topics K.
    #[must_use]
    pub fn n_topics(&self) -> usize {
        self.config.n_topics
    }

    /// True once λ has been allocated and updated.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        matches!(self.state, ModelState::Fit(_))
    }

    /// M-steps applied over the model's lifetime.
    #[must_use]
    pub fn n_batch_iter(&self) -> u64 {
        match &self.state {
            ModelState::Fit(s) => s.n_batch_iter,
            ModelState::Unfit => 0,
        }
    }

    /// Passes over the data run by the last `fit`.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Frozen vocabulary size, once fitted.
    #[must_use]
    pub fn n_vocab(&self) -> Option<usize> {
        match &self.state {
            ModelState::Fit(s) => Some(s.n_vocab),
            ModelState::Unfit => None,
        }
    }

    /// Unnormalised topic-word parameters λ (`n_topics` × `n_vocab`).
    ///
    /// # Errors
    ///
    /// Returns [`LdaError::NotFitted`] before the first training call.
    pub fn components(&self) -> LdaResult<&Matrix<f64>> {
        self.fitted("components").map(|s| &s.lambda)
    }

    /// Topic-word distributions: λ with each row normalised to sum to 1.
    ///
    /// # Errors
    ///
    /// Returns [`LdaError::NotFitted`] before the first training call.
    pub fn topic_word_distribution(&self) -> LdaResult<Matrix<f64>> {
        Ok(self.fitted("topic_word_distribution")?.lambda.normalize_rows())
    }

    /// Indices of the `n` highest-weighted terms of each topic, best first.
    ///
    /// # Errors
    ///
    /// Returns [`LdaError::NotFitted`] before the first training call.
    pub fn top_term_indices(&self, n: usize) -> LdaResult<Vec<Vec<usize>>> {
        let lambda = &self.fitted("top_term_indices")?.lambda;
        Ok((0..lambda.n_rows())
            .map(|k| {
                let row = lambda.row(k);
                let mut idx: Vec<usize> = (0..row.len()).collect();
                idx.sort_by(|&a, &b| row[b].total_cmp(&row[a]));
                idx.truncate(n);
                idx
            })
            .collect())
    }

    /// Get top words for each topic with their probabilities.
    ///
    /// # Arguments
    ///
    /// * `vocabulary` - Term for each column of the training matrix
    /// * `n_words` - Number of top words to return per topic
    ///
    /// # Errors
    ///
    /// Returns [`LdaError::NotFitted`] before the first training call and
    /// [`LdaError::DimensionMismatch`] if the vocabulary length differs from
    /// the frozen vocabulary size.
    pub fn top_words(
        &self,
        vocabulary: &[String],
        n_words: usize,
    ) -> LdaResult<Vec<Vec<(String, f64)>>> {
        let state = self.fitted("top_words")?;
        if vocabulary.len() != state.n_vocab {
            return Err(LdaError::dimension_mismatch(
                "vocabulary length",
                state.n_vocab,
                vocabulary.len(),
            ));
        }
        let beta = state.lambda.normalize_rows();
        Ok(self
            .top_term_indices(n_words)?
            .into_iter()
            .enumerate()
            .map(|(k, terms)| {
                terms
                    .into_iter()
                    .map(|w| (vocabulary[w].clone(), beta.get(k, w)))
                    .collect()
            })
            .collect())
    }

    /// Perplexity of `x` under the model and a document-topic matrix.
    ///
    /// `doc_topic` is usually the output of `transform(x)`; its rows are
    /// normalised before scoring. With `subsampling`, at most
    /// `subsample_size` documents drawn without replacement are scored.
    /// Lower is better.
    ///
    /// # Errors
    ///
    /// Returns [`LdaError::NotFitted`] before the first training call,
    /// [`LdaError::DimensionMismatch`] if `x` or `doc_topic` do not match
    /// the model, and [`LdaError::EmptyInput`] if the scored documents hold
    /// no words.
    pub fn perplexity(
        &self,
        x: &CsrMatrix,
        doc_topic: &Matrix<f64>,
        subsampling: bool,
    ) -> LdaResult<f64> {
        let state = self.fitted("perplexity")?;
        check_counts(x)?;
        check_vocabulary(state.n_vocab, x)?;
        if doc_topic.n_rows() != x.n_rows() {
            return Err(LdaError::dimension_mismatch(
                "document-topic rows",
                x.n_rows(),
                doc_topic.n_rows(),
            ));
        }
        if doc_topic.n_cols() != self.config.n_topics {
            return Err(LdaError::dimension_mismatch(
                "document-topic columns",
                self.config.n_topics,
                doc_topic.n_cols(),
            ));
        }

        let docs = if subsampling && x.n_rows() > self.config.subsample_size {
            let mut rng = StdRng::seed_from_u64(self.config.random_seed);
            let mut picked =
                rand::seq::index::sample(&mut rng, x.n_rows(), self.config.subsample_size)
                    .into_vec();
            picked.sort_unstable();
            picked
        } else {
            (0..x.n_rows()).collect()
        };
        perplexity(
            &state.lambda.normalize_rows(),
            x,
            &doc_topic.normalize_rows(),
            &docs,
        )
    }

    /// Approximate variational lower bound of `x`; higher is better.
    ///
    /// # Errors
    ///
    /// Returns [`LdaError::NotFitted`] before the first training call and
    /// [`LdaError::DimensionMismatch`] on a vocabulary mismatch.
    pub fn score(&self, x: &CsrMatrix) -> LdaResult<f64> {
        let state = self.fitted("score")?;
        check_counts(x)?;
        check_vocabulary(state.n_vocab, x)?;
        let gamma = self.infer_gamma(&state.lambda, x)?;
        Ok(approx_bound(
            &state.lambda,
            x,
            &gamma,
            self.config.alpha(),
            self.config.eta(),
        ))
    }

    fn fitted(&self, operation: &'static str) -> LdaResult<&FittedState> {
        match &self.state {
            ModelState::Fit(s) => Ok(s),
            ModelState::Unfit => Err(LdaError::NotFitted { operation }),
        }
    }

    fn estep_params(&self) -> EStepParams {
        EStepParams {
            alpha: self.config.alpha(),
            mean_change_tol: self.config.mean_change_tol,
            max_iter: self.config.max_doc_update_iter,
            seed: self.config.random_seed,
        }
    }

    fn driver(&self) -> EStepDriver {
        EStepDriver::new(self.config.n_jobs)
    }

    fn schedule(&self) -> LearningRateSchedule {
        LearningRateSchedule::new(self.config.learning_offset, self.config.learning_decay)
    }

    /// λ and t to train from: the current state, or a fresh allocation.
    fn starting_point(&self, x: &CsrMatrix) -> LdaResult<(Matrix<f64>, u64)> {
        match &self.state {
            ModelState::Fit(s) => {
                check_vocabulary(s.n_vocab, x)?;
                Ok((s.lambda.clone(), s.n_batch_iter))
            }
            ModelState::Unfit => {
                let lambda = initialize_lambda(
                    self.config.init,
                    self.config.n_topics,
                    x,
                    self.config.random_seed,
                )?;
                Ok((lambda, 0))
            }
        }
    }

    /// One E-step over `batch` followed by one M-step.
    fn update_step(
        &self,
        lambda: &Matrix<f64>,
        batch: &CsrMatrix,
        row_offset: usize,
        weights: UpdateWeights,
    ) -> LdaResult<Matrix<f64>> {
        let elog_beta = dirichlet_expectation_rows(lambda);
        let out = self
            .driver()
            .run(&elog_beta, batch, row_offset, &self.estep_params(), true)?;
        debug!(
            rows = batch.n_rows(),
            words = batch.total(),
            rho = weights.rho,
            scale = weights.scale,
            capped = out.n_capped,
            "mini-batch update"
        );
        if out.n_capped > 0 && out.n_capped == batch.n_rows() {
            warn!(
                rows = batch.n_rows(),
                max_doc_update_iter = self.config.max_doc_update_iter,
                "every document hit the E-step iteration cap"
            );
        }
        let sstats = out
            .sstats
            .ok_or_else(|| LdaError::Computation("E-step returned no statistics".to_string()))?;
        StochasticMStep::new(self.config.eta()).apply(lambda, &sstats, weights)
    }

    /// Unnormalised γ for every row of `x` under `lambda`.
    fn infer_gamma(&self, lambda: &Matrix<f64>, x: &CsrMatrix) -> LdaResult<Matrix<f64>> {
        let elog_beta = dirichlet_expectation_rows(lambda);
        let out = self
            .driver()
            .run(&elog_beta, x, 0, &self.estep_params(), false)?;
        Ok(out.gamma)
    }
}

impl TopicModel for LatentDirichletAllocation {
    /// Run `max_iter` passes over `x`.
    ///
    /// Batch mode applies one full-corpus update per pass (ρ = 1); online
    /// mode walks `batch_size` mini-batches per pass with the decaying
    /// schedule. A fitted model continues from its current λ.
    fn fit(&mut self, x: &CsrMatrix, max_iter: usize) -> LdaResult<()> {
        self.config.validate()?;
        if max_iter == 0 {
            return Err(LdaError::invalid_hyperparameter("max_iter", max_iter, ">= 1"));
        }
        check_counts(x)?;
        let (mut lambda, mut t) = self.starting_point(x)?;

        let batch_sizes = mini_batch_sizes(x.n_rows(), self.config.batch_size)?;
        let schedule = self.schedule();
        let mut last_perplexity: Option<f64> = None;
        let mut passes = 0;

        for pass in 0..max_iter {
            match self.config.learning_method {
                LearningMethod::Batch => {
                    lambda = self.update_step(&lambda, x, 0, UpdateWeights::batch())?;
                    t += 1;
                }
                LearningMethod::Online => {
                    let mut batches = split_by_sizes(x, &batch_sizes)?;
                    loop {
                        let start = batches.next_offset();
                        let Some(batch) = batches.next() else {
                            break;
                        };
                        let weights =
                            UpdateWeights::online(&schedule, t, x.n_rows() as f64, batch.n_rows());
                        lambda = self.update_step(&lambda, &batch, start, weights)?;
                        t += 1;
                    }
                }
            }
            passes = pass + 1;

            let every = self.config.evaluate_every;
            if every > 0 && passes % every == 0 {
                let gamma = self.infer_gamma(&lambda, x)?;
                let all: Vec<usize> = (0..x.n_rows()).collect();
                let current = perplexity(
                    &lambda.normalize_rows(),
                    x,
                    &gamma.normalize_rows(),
                    &all,
                )?;
                debug!(pass = passes, perplexity = current, "training perplexity");
                if let Some(prev) = last_perplexity {
                    if (prev - current).abs() < self.config.perplexity_tol {
                        info!(
                            pass = passes,
                            perplexity = current,
                            "perplexity converged, stopping early"
                        );
                        break;
                    }
                }
                last_perplexity = Some(current);
            }
        }

        self.state = ModelState::Fit(FittedState {
            lambda,
            n_batch_iter: t,
            n_vocab: x.n_cols(),
        });
        self.n_iter = passes;
        info!(passes, n_batch_iter = t, "fit complete");
        Ok(())
    }

    /// One E-step and one M-step over `x` as a single mini-batch.
    ///
    /// The first call freezes the vocabulary size; later calls must match
    /// it. Statistics are rescaled by `total_samples / x.n_rows()`.
    fn partial_fit(&mut self, x: &CsrMatrix) -> LdaResult<()> {
        self.config.validate()?;
        check_counts(x)?;
        let (lambda, t) = self.starting_point(x)?;
        let weights = UpdateWeights::online(
            &self.schedule(),
            t,
            self.config.total_samples,
            x.n_rows(),
        );
        let lambda = self.update_step(&lambda, x, 0, weights)?;
        self.state = ModelState::Fit(FittedState {
            lambda,
            n_batch_iter: t + 1,
            n_vocab: x.n_cols(),
        });
        Ok(())
    }

    /// Document-topic distributions of `x`, rows summing to 1.
    fn transform(&self, x: &CsrMatrix) -> LdaResult<Matrix<f64>> {
        let state = self.fitted("transform")?;
        check_counts(x)?;
        check_vocabulary(state.n_vocab, x)?;
        Ok(self.infer_gamma(&state.lambda, x)?.normalize_rows())
    }
}

fn check_counts(x: &CsrMatrix) -> LdaResult<()> {
    if x.n_rows() == 0 || x.n_cols() == 0 {
        return Err(LdaError::EmptyInput(format!(
            "document-term matrix is {}x{}",
            x.n_rows(),
            x.n_cols()
        )));
    }
    x.validate_counts()
}

fn check_vocabulary(expected: usize, x: &CsrMatrix) -> LdaResult<()> {
    if x.n_cols() == expected {
        Ok(())
    } else {
        Err(LdaError::dimension_mismatch(
            "vocabulary size",
            expected,
            x.n_cols(),
        ))
    }
}

#[cfg(test)]
mod tests;
