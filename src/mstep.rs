//! Stochastic M-step for the topic-word parameters λ.
//!
//! Given batch sufficient statistics S, the batch-only estimate is
//! λ̃ = η + scale·S, and the global parameters move toward it:
//!
//! ```text
//! λ ← (1 − ρₜ)·λ + ρₜ·λ̃,   ρₜ = min(1, (τ₀ + t)^(−κ))
//! ```
//!
//! Full-batch training is the special case ρ = 1, scale = 1.

use crate::error::{LdaError, LdaResult};
use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};

/// Decaying learning rate ρₜ = (τ₀ + t)^(−κ), capped at 1.
///
/// # Examples
///
/// ```
/// use aprender_lda::mstep::LearningRateSchedule;
///
/// let schedule = LearningRateSchedule::new(1000.0, 0.7);
/// assert!(schedule.rho(0) > schedule.rho(10));
/// assert_eq!(LearningRateSchedule::new(0.0, 0.7).rho(0), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningRateSchedule {
    /// τ₀
    pub offset: f64,
    /// κ
    pub decay: f64,
}

impl LearningRateSchedule {
    /// Create a schedule with offset τ₀ and decay κ.
    #[must_use]
    pub fn new(offset: f64, decay: f64) -> Self {
        Self { offset, decay }
    }

    /// Learning rate at step `t`.
    #[must_use]
    pub fn rho(&self, t: u64) -> f64 {
        (self.offset + t as f64).powf(-self.decay).min(1.0)
    }
}

/// Mixing weight and corpus rescaling for one update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateWeights {
    /// ρ in (0, 1]
    pub rho: f64,
    /// Factor lifting batch statistics to corpus scale
    pub scale: f64,
}

impl UpdateWeights {
    /// Pure replacement λ ← η + S.
    #[must_use]
    pub fn batch() -> Self {
        Self {
            rho: 1.0,
            scale: 1.0,
        }
    }

    /// Online weights for step `t` on a batch of `batch_rows` documents out
    /// of an estimated `corpus_size`.
    #[must_use]
    pub fn online(
        schedule: &LearningRateSchedule,
        t: u64,
        corpus_size: f64,
        batch_rows: usize,
    ) -> Self {
        Self {
            rho: schedule.rho(t),
            scale: corpus_size / batch_rows.max(1) as f64,
        }
    }
}

/// Applies the natural-gradient update to λ.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticMStep {
    eta: f64,
}

impl StochasticMStep {
    /// Create an M-step with topic-word prior η.
    #[must_use]
    pub fn new(eta: f64) -> Self {
        Self { eta }
    }

    /// Compute the updated λ into a fresh matrix.
    ///
    /// The input λ is left untouched, so a failed update never leaves the
    /// model half-written.
    ///
    /// # Errors
    ///
    /// Returns [`LdaError::DimensionMismatch`] if `sstats` is not shaped like
    /// `lambda`, and [`LdaError::Computation`] if any updated entry is not a
    /// finite positive number.
    pub fn apply(
        &self,
        lambda: &Matrix<f64>,
        sstats: &Matrix<f64>,
        weights: UpdateWeights,
    ) -> LdaResult<Matrix<f64>> {
        if lambda.n_rows() != sstats.n_rows() {
            return Err(LdaError::dimension_mismatch(
                "sufficient statistics topics",
                lambda.n_rows(),
                sstats.n_rows(),
            ));
        }
        if lambda.n_cols() != sstats.n_cols() {
            return Err(LdaError::dimension_mismatch(
                "sufficient statistics vocabulary",
                lambda.n_cols(),
                sstats.n_cols(),
            ));
        }

        let UpdateWeights { rho, scale } = weights;
        let mut updated = lambda.clone();
        for (l, &s) in updated.as_mut_slice().iter_mut().zip(sstats.as_slice()) {
            let target = self.eta + scale * s;
            *l = (1.0 - rho) * *l + rho * target;
        }
        if let Some(bad) = updated
            .as_slice()
            .iter()
            .find(|v| !(v.is_finite() && **v > 0.0))
        {
            return Err(LdaError::Computation(format!(
                "topic-word update produced {bad} (rho = {rho}, scale = {scale})"
            )));
        }
        Ok(updated)
    }
}

#[cfg(test)]
#[path = "mstep_tests.rs"]
mod tests;
