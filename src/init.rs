//! Initialisation of the topic-word parameters λ.

use crate::config::InitStrategy;
use crate::error::{LdaError, LdaResult};
use crate::primitives::{CsrMatrix, Matrix};
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma};
use tracing::debug;

/// Shape of the Gamma noise used for λ and γ initialisation.
pub const NOISE_SHAPE: f64 = 100.0;

/// Gamma(100, 1/100): mean 1, small spread.
///
/// # Errors
///
/// Returns [`LdaError::Computation`] if the distribution cannot be built.
pub fn noise_distribution() -> LdaResult<Gamma<f64>> {
    Gamma::new(NOISE_SHAPE, 1.0 / NOISE_SHAPE)
        .map_err(|e| LdaError::Computation(format!("gamma noise distribution: {e}")))
}

/// Allocate λ (`n_topics` × `x.n_cols()`) for the first training call.
///
/// # Errors
///
/// Propagates distribution construction or sampling failures.
pub fn initialize_lambda(
    strategy: InitStrategy,
    n_topics: usize,
    x: &CsrMatrix,
    seed: u64,
) -> LdaResult<Matrix<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = noise_distribution()?;
    let mut lambda = Matrix::zeros(n_topics, x.n_cols());
    for v in lambda.as_mut_slice() {
        *v = noise.sample(&mut rng);
    }

    if strategy == InitStrategy::SpreadDocuments {
        let picked = spread_documents(x, n_topics, &mut rng)?;
        debug!(?picked, "seeding topics from documents");
        for (k, &d) in picked.iter().enumerate() {
            let row = lambda.row_mut(k);
            for (w, c) in x.row(d).iter() {
                if c > 0.0 {
                    row[w] += c;
                }
            }
        }
    }
    Ok(lambda)
}

/// Pick up to `k` mutually distant documents, k-means++ style.
///
/// The first document is uniform among non-empty rows; each next one is
/// drawn with probability proportional to its squared Hellinger distance
/// to the nearest document already picked. Stops early when every
/// remaining document duplicates a picked one.
///
/// # Errors
///
/// Returns [`LdaError::Computation`] if the sampling weights are invalid.
pub fn spread_documents<R: Rng>(x: &CsrMatrix, k: usize, rng: &mut R) -> LdaResult<Vec<usize>> {
    let docs: Vec<(usize, Vec<(usize, f64)>)> = (0..x.n_rows())
        .filter_map(|d| {
            let terms: Vec<(usize, f64)> = x.row(d).iter().filter(|&(_, c)| c > 0.0).collect();
            let total: f64 = terms.iter().map(|&(_, c)| c).sum();
            (total > 0.0).then(|| (d, terms.into_iter().map(|(w, c)| (w, c / total)).collect()))
        })
        .collect();
    if docs.is_empty() || k == 0 {
        return Ok(Vec::new());
    }

    let first = rng.gen_range(0..docs.len());
    let mut picked = vec![docs[first].0];
    let mut nearest: Vec<f64> = docs
        .iter()
        .map(|(_, p)| hellinger_sq(p, &docs[first].1))
        .collect();

    while picked.len() < k {
        if nearest.iter().sum::<f64>() <= 0.0 {
            break;
        }
        let dist = WeightedIndex::new(&nearest)
            .map_err(|e| LdaError::Computation(format!("document spread weights: {e}")))?;
        let next = dist.sample(rng);
        picked.push(docs[next].0);
        for (d, (_, p)) in nearest.iter_mut().zip(&docs) {
            *d = d.min(hellinger_sq(p, &docs[next].1));
        }
    }
    Ok(picked)
}

/// Squared Hellinger distance 1 − Σ √(p·q) between two sparse
/// distributions with sorted term indices.
#[must_use]
pub fn hellinger_sq(p: &[(usize, f64)], q: &[(usize, f64)]) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut affinity = 0.0;
    while i < p.len() && j < q.len() {
        match p[i].0.cmp(&q[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                affinity += (p[i].1 * q[j].1).sqrt();
                i += 1;
                j += 1;
            }
        }
    }
    let dist = 1.0 - affinity;
    // identical rows can land a few ulps away from zero
    if dist < 1e-12 {
        0.0
    } else {
        dist
    }
}
