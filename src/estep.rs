//! Variational E-step for LDA.
//!
//! For one document with counts `n_w` and current topic-word parameters λ,
//! the mean-field updates are iterated to a fixed point:
//!
//! ```text
//! log φ_wk ∝ E[log θ_k] + E[log β_kw]
//! γ_k      = α + Σ_w n_w φ_wk
//! ```
//!
//! The responsibilities are normalised per term with log-sum-exp, so no
//! exponentials of large magnitude are ever formed.

use crate::error::{LdaError, LdaResult};
use crate::init::noise_distribution;
use crate::primitives::{CsrMatrix, Matrix, SparseRow};
use crate::special::{dirichlet_expectation_into, log_sum_exp};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Distribution;
use tracing::trace;

/// Settings shared by every document of an E-step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EStepParams {
    /// Document-topic prior α
    pub alpha: f64,
    /// Stop once the mean absolute change of γ drops below this
    pub mean_change_tol: f64,
    /// Iteration cap per document
    pub max_iter: usize,
    /// Base seed for γ initialisation
    pub seed: u64,
}

/// Result of inferring one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPosterior {
    /// Variational Dirichlet parameters γ, length K
    pub gamma: Vec<f64>,
    /// Fixed-point iterations performed
    pub n_iter: usize,
    /// False if the iteration cap was reached first
    pub converged: bool,
}

/// Result of an E-step over a batch of documents.
#[derive(Debug, Clone, PartialEq)]
pub struct EStepOutput {
    /// Unnormalised γ, one row per document in batch order
    pub gamma: Matrix<f64>,
    /// Expected topic-word counts Σ_d n_dw φ_dwk (K × V), when requested
    pub sstats: Option<Matrix<f64>>,
    /// Documents that stopped at the iteration cap
    pub n_capped: usize,
}

/// Seed of the γ initialisation for the document at `row`.
///
/// Depends only on the base seed and the row's position in the caller's
/// matrix, so sharding a batch does not change any document's result.
#[must_use]
pub fn document_seed(seed: u64, row: usize) -> u64 {
    let mut z = seed ^ (row as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Infer γ for one document.
///
/// `elog_beta` is E[log β] (K × V). When `sstats` is given, the document's
/// expected counts under the converged γ are added to it.
///
/// Documents without a positive count return γ = α and contribute nothing.
///
/// # Errors
///
/// Returns [`LdaError::Computation`] if a term's responsibilities cannot be
/// normalised (non-finite log normaliser).
pub fn infer_document(
    elog_beta: &Matrix<f64>,
    doc: SparseRow<'_>,
    params: &EStepParams,
    row: usize,
    sstats: Option<&mut Matrix<f64>>,
) -> LdaResult<DocumentPosterior> {
    let n_topics = elog_beta.n_rows();
    let terms: Vec<(usize, f64)> = doc.iter().filter(|&(_, c)| c > 0.0).collect();
    if terms.is_empty() {
        return Ok(DocumentPosterior {
            gamma: vec![params.alpha; n_topics],
            n_iter: 0,
            converged: true,
        });
    }

    let mut rng = StdRng::seed_from_u64(document_seed(params.seed, row));
    let noise = noise_distribution()?;
    let mut gamma: Vec<f64> = (0..n_topics).map(|_| noise.sample(&mut rng)).collect();
    let mut next = vec![0.0; n_topics];
    let mut elog_theta = vec![0.0; n_topics];
    let mut log_phi = vec![0.0; n_topics];

    let mut n_iter = 0;
    let mut converged = false;
    while n_iter < params.max_iter {
        n_iter += 1;
        dirichlet_expectation_into(&gamma, &mut elog_theta);
        next.fill(params.alpha);
        for &(w, count) in &terms {
            let norm = responsibilities(elog_beta, &elog_theta, w, &mut log_phi, row)?;
            for (g, lp) in next.iter_mut().zip(&log_phi) {
                *g += count * (lp - norm).exp();
            }
        }
        let change = gamma
            .iter()
            .zip(&next)
            .map(|(a, b)| (a - b).abs())
            .sum::<f64>()
            / n_topics as f64;
        std::mem::swap(&mut gamma, &mut next);
        if change < params.mean_change_tol {
            converged = true;
            break;
        }
    }
    trace!(row, n_iter, converged, "document E-step");

    if let Some(stats) = sstats {
        dirichlet_expectation_into(&gamma, &mut elog_theta);
        for &(w, count) in &terms {
            let norm = responsibilities(elog_beta, &elog_theta, w, &mut log_phi, row)?;
            for (k, lp) in log_phi.iter().enumerate() {
                let cell = stats.get(k, w) + count * (lp - norm).exp();
                stats.set(k, w, cell);
            }
        }
    }

    Ok(DocumentPosterior {
        gamma,
        n_iter,
        converged,
    })
}

/// Fill `log_phi` with unnormalised log responsibilities of term `w` and
/// return their log normaliser.
fn responsibilities(
    elog_beta: &Matrix<f64>,
    elog_theta: &[f64],
    w: usize,
    log_phi: &mut [f64],
    row: usize,
) -> LdaResult<f64> {
    for (k, lp) in log_phi.iter_mut().enumerate() {
        *lp = elog_theta[k] + elog_beta.get(k, w);
    }
    let norm = log_sum_exp(log_phi);
    if norm.is_finite() {
        Ok(norm)
    } else {
        Err(LdaError::Computation(format!(
            "responsibilities of term {w} in document {row} cannot be normalised"
        )))
    }
}

/// Run the E-step over every row of `batch`.
///
/// `row_offset` is the position of the batch's first row in the caller's
/// matrix; it keys the per-document seeds.
///
/// # Errors
///
/// Returns [`LdaError::DimensionMismatch`] if `batch` and `elog_beta`
/// disagree on the vocabulary size, or the first per-document failure.
pub fn e_step(
    elog_beta: &Matrix<f64>,
    batch: &CsrMatrix,
    row_offset: usize,
    params: &EStepParams,
    collect_sstats: bool,
) -> LdaResult<EStepOutput> {
    if batch.n_cols() != elog_beta.n_cols() {
        return Err(LdaError::dimension_mismatch(
            "vocabulary size",
            elog_beta.n_cols(),
            batch.n_cols(),
        ));
    }
    let n_topics = elog_beta.n_rows();
    let mut gamma = Matrix::zeros(batch.n_rows(), n_topics);
    let mut sstats = collect_sstats.then(|| Matrix::zeros(n_topics, batch.n_cols()));
    let mut n_capped = 0;

    for r in 0..batch.n_rows() {
        let post = infer_document(
            elog_beta,
            batch.row(r),
            params,
            row_offset + r,
            sstats.as_mut(),
        )?;
        if !post.converged {
            n_capped += 1;
        }
        gamma.row_mut(r).copy_from_slice(&post.gamma);
    }

    Ok(EStepOutput {
        gamma,
        sstats,
        n_capped,
    })
}

#[cfg(test)]
#[path = "estep_tests.rs"]
mod tests;
