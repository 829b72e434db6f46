//! Held-out perplexity and the variational lower bound.

use crate::error::{LdaError, LdaResult};
use crate::primitives::{CsrMatrix, Matrix};
use crate::special::{
    dirichlet_expectation, dirichlet_expectation_rows, ln_dirichlet_norm, log_sum_exp,
};
use statrs::function::gamma::ln_gamma;

/// exp(−Σ n_dw ln Σ_k θ_dk β_kw / Σ n_dw) over the listed documents.
///
/// `doc_topic` (θ) and `topic_word` (β) must already be row-normalised.
///
/// # Errors
///
/// Returns [`LdaError::EmptyInput`] if the listed documents hold no words,
/// and [`LdaError::Computation`] if a word gets zero or non-finite
/// probability.
pub fn perplexity(
    topic_word: &Matrix<f64>,
    x: &CsrMatrix,
    doc_topic: &Matrix<f64>,
    docs: &[usize],
) -> LdaResult<f64> {
    let n_topics = topic_word.n_rows();
    let mut log_likelihood = 0.0;
    let mut n_words = 0.0;
    for &d in docs {
        let theta = doc_topic.row(d);
        let doc = x.row(d);
        n_words += doc.total();
        for (w, count) in doc.iter().filter(|&(_, c)| c > 0.0) {
            let p: f64 = (0..n_topics).map(|k| theta[k] * topic_word.get(k, w)).sum();
            let lp = p.ln();
            if !lp.is_finite() {
                return Err(LdaError::Computation(format!(
                    "document {d} gives term {w} probability {p}"
                )));
            }
            log_likelihood += count * lp;
        }
    }
    if n_words <= 0.0 {
        return Err(LdaError::EmptyInput(
            "no word counts to score perplexity on".to_string(),
        ));
    }
    Ok((-log_likelihood / n_words).exp())
}

/// Approximate evidence lower bound of `x` given per-document γ and the
/// topic-word parameters λ.
///
/// Sums the expected log-likelihood of the counts, the document-level
/// Dirichlet terms E[log p(θ|α) − log q(θ|γ)] and the topic-level terms
/// E[log p(β|η) − log q(β|λ)].
#[must_use]
pub fn approx_bound(
    lambda: &Matrix<f64>,
    x: &CsrMatrix,
    gamma: &Matrix<f64>,
    alpha: f64,
    eta: f64,
) -> f64 {
    let (n_topics, n_vocab) = lambda.shape();
    let elog_beta = dirichlet_expectation_rows(lambda);
    let mut log_phi = vec![0.0; n_topics];
    let mut score = 0.0;
    // normalisers of the symmetric priors
    let theta_prior = n_topics as f64 * ln_gamma(alpha) - ln_gamma(alpha * n_topics as f64);
    let beta_prior = n_vocab as f64 * ln_gamma(eta) - ln_gamma(eta * n_vocab as f64);

    for d in 0..x.n_rows() {
        let g = gamma.row(d);
        let elog_theta = dirichlet_expectation(g);
        for (w, count) in x.row(d).iter().filter(|&(_, c)| c > 0.0) {
            for (k, lp) in log_phi.iter_mut().enumerate() {
                *lp = elog_theta[k] + elog_beta.get(k, w);
            }
            score += count * log_sum_exp(&log_phi);
        }
        score += g
            .iter()
            .zip(&elog_theta)
            .map(|(gk, et)| (alpha - gk) * et)
            .sum::<f64>();
        score += ln_dirichlet_norm(g) - theta_prior;
    }

    for k in 0..n_topics {
        let l = lambda.row(k);
        score += l
            .iter()
            .zip(elog_beta.row(k))
            .map(|(lw, eb)| (eta - lw) * eb)
            .sum::<f64>();
        score += ln_dirichlet_norm(l) - beta_prior;
    }
    score
}
