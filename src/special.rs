//! Special functions for Dirichlet expectations.
//!
//! All topic-model expectations are kept in log space:
//! E[log X_k] = ψ(α_k) − ψ(Σ α) for X ~ Dirichlet(α).

use crate::primitives::Matrix;
use statrs::function::gamma::{digamma, ln_gamma};

/// Write E[log X] for X ~ Dirichlet(`alpha`) into `out`.
///
/// # Panics
///
/// Panics if `out` is shorter than `alpha`.
pub fn dirichlet_expectation_into(alpha: &[f64], out: &mut [f64]) {
    let psi_total = digamma(alpha.iter().sum());
    for (o, &a) in out.iter_mut().zip(alpha) {
        *o = digamma(a) - psi_total;
    }
}

/// E[log X] for X ~ Dirichlet(`alpha`).
#[must_use]
pub fn dirichlet_expectation(alpha: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; alpha.len()];
    dirichlet_expectation_into(alpha, &mut out);
    out
}

/// Row-wise Dirichlet expectation of a parameter matrix.
///
/// For the topic-word parameters λ this yields E[log β].
#[must_use]
pub fn dirichlet_expectation_rows(params: &Matrix<f64>) -> Matrix<f64> {
    let mut out = Matrix::zeros(params.n_rows(), params.n_cols());
    for k in 0..params.n_rows() {
        dirichlet_expectation_into(params.row(k), out.row_mut(k));
    }
    out
}

/// Numerically stable log(Σ exp(x)).
///
/// Returns `-inf` for an empty slice or when every entry is `-inf`.
#[must_use]
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Σ ln Γ(x) over a slice.
#[must_use]
pub fn ln_gamma_sum(values: &[f64]) -> f64 {
    values.iter().map(|&v| ln_gamma(v)).sum()
}

/// Log normaliser of a Dirichlet: Σ ln Γ(α_k) − ln Γ(Σ α_k).
#[must_use]
pub fn ln_dirichlet_norm(alpha: &[f64]) -> f64 {
    ln_gamma_sum(alpha) - ln_gamma(alpha.iter().sum())
}
