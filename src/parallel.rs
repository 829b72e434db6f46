//! Data-parallel E-step driver.
//!
//! A batch is cut into contiguous shards with the fold policy of
//! [`partition`](crate::partition). Each shard runs its E-step into private
//! buffers against a shared read-only E[log β]; the driver then stacks the
//! γ rows in order and sums the sufficient statistics.

use crate::error::{LdaError, LdaResult};
use crate::estep::{e_step, EStepOutput, EStepParams};
use crate::partition::{fold_sizes, offsets, split_by_sizes};
use crate::primitives::{CsrMatrix, Matrix};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

/// Fans an E-step out over `n_jobs` shards on the rayon global pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EStepDriver {
    n_jobs: usize,
}

impl EStepDriver {
    /// Create a driver; `n_jobs <= 1` runs sequentially.
    #[must_use]
    pub fn new(n_jobs: usize) -> Self {
        Self { n_jobs }
    }

    /// Number of shards used for a batch of `n_rows` documents.
    #[must_use]
    pub fn n_shards(&self, n_rows: usize) -> usize {
        self.n_jobs.clamp(1, n_rows.max(1))
    }

    /// Run the E-step over `batch`.
    ///
    /// `row_offset` is the position of the batch's first row in the caller's
    /// matrix. The result does not depend on the number of jobs.
    ///
    /// # Errors
    ///
    /// Sequential runs propagate the E-step error unchanged. Sharded runs
    /// report every failed shard as one [`LdaError::WorkerFailure`].
    pub fn run(
        &self,
        elog_beta: &Matrix<f64>,
        batch: &CsrMatrix,
        row_offset: usize,
        params: &EStepParams,
        collect_sstats: bool,
    ) -> LdaResult<EStepOutput> {
        let n_shards = self.n_shards(batch.n_rows());
        if n_shards == 1 {
            return e_step(elog_beta, batch, row_offset, params, collect_sstats);
        }

        let sizes = fold_sizes(batch.n_rows(), n_shards)?;
        let starts = offsets(&sizes);
        let shards: Vec<(usize, CsrMatrix)> = starts
            .into_iter()
            .zip(split_by_sizes(batch, &sizes)?)
            .collect();
        debug!(n_shards, rows = batch.n_rows(), "dispatching sharded E-step");

        // shards are a data split; rayon's global pool schedules them
        #[cfg(feature = "parallel")]
        let results: Vec<LdaResult<EStepOutput>> = shards
            .par_iter()
            .map(|(start, shard)| {
                e_step(elog_beta, shard, row_offset + start, params, collect_sstats)
            })
            .collect();

        #[cfg(not(feature = "parallel"))]
        let results: Vec<LdaResult<EStepOutput>> = shards
            .iter()
            .map(|(start, shard)| {
                e_step(elog_beta, shard, row_offset + start, params, collect_sstats)
            })
            .collect();

        reduce(results, elog_beta.n_rows(), batch.n_cols(), collect_sstats)
    }
}

/// Combine shard outputs in shard order.
fn reduce(
    results: Vec<LdaResult<EStepOutput>>,
    n_topics: usize,
    n_vocab: usize,
    collect_sstats: bool,
) -> LdaResult<EStepOutput> {
    let total = results.len();
    let mut outputs = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(out) => outputs.push(out),
            Err(e) => failures.push(format!("shard {i}: {e}")),
        }
    }
    if let Some(first) = failures.first() {
        return Err(LdaError::WorkerFailure {
            failed: failures.len(),
            total,
            message: first.clone(),
        });
    }

    let mut sstats = collect_sstats.then(|| Matrix::zeros(n_topics, n_vocab));
    let mut n_capped = 0;
    let mut gammas = Vec::with_capacity(outputs.len());
    for out in outputs {
        n_capped += out.n_capped;
        if let (Some(acc), Some(part)) = (sstats.as_mut(), out.sstats.as_ref()) {
            acc.add_assign(part)
                .map_err(|e| LdaError::Computation(e.to_string()))?;
        }
        gammas.push(out.gamma);
    }
    let gamma =
        Matrix::vstack(n_topics, &gammas).map_err(|e| LdaError::Computation(e.to_string()))?;

    Ok(EStepOutput {
        gamma,
        sstats,
        n_capped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::special::dirichlet_expectation_rows;

    fn corpus() -> CsrMatrix {
        let data = (0..40 * 6).map(|i| ((i * 7) % 5) as f64).collect();
        CsrMatrix::from_dense(&Matrix::from_vec(40, 6, data).expect("40x6"))
    }

    fn elog_beta() -> Matrix<f64> {
        let lambda = Matrix::from_vec(
            3,
            6,
            vec![
                5.0, 4.0, 1.0, 0.5, 0.2, 0.1, //
                0.1, 0.5, 5.0, 4.0, 0.3, 0.2, //
                0.3, 0.1, 0.2, 1.0, 6.0, 5.0,
            ],
        )
        .expect("3x6");
        dirichlet_expectation_rows(&lambda)
    }

    fn params() -> EStepParams {
        EStepParams {
            alpha: 1.0 / 3.0,
            mean_change_tol: 1e-3,
            max_iter: 100,
            seed: 11,
        }
    }

    #[test]
    fn test_shard_count() {
        let driver = EStepDriver::new(4);
        assert_eq!(driver.n_shards(10), 4);
        assert_eq!(driver.n_shards(2), 2);
        assert_eq!(driver.n_shards(0), 1);
        assert_eq!(EStepDriver::new(0).n_shards(10), 1);
    }

    #[test]
    fn test_sharded_matches_sequential() {
        let x = corpus();
        let eb = elog_beta();
        let seq = EStepDriver::new(1)
            .run(&eb, &x, 0, &params(), true)
            .expect("sequential");
        for n_jobs in [2, 3, 7] {
            let par = EStepDriver::new(n_jobs)
                .run(&eb, &x, 0, &params(), true)
                .expect("sharded");
            assert_eq!(par.gamma, seq.gamma, "n_jobs = {n_jobs}");
            assert_eq!(par.n_capped, seq.n_capped);
            let (a, b) = (
                par.sstats.expect("requested"),
                seq.sstats.as_ref().expect("requested"),
            );
            for (u, v) in a.as_slice().iter().zip(b.as_slice()) {
                assert!((u - v).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_repeated_wide_runs_are_stable() {
        let x = corpus();
        let eb = elog_beta();
        let seq = EStepDriver::new(1)
            .run(&eb, &x, 0, &params(), false)
            .expect("sequential");
        let driver = EStepDriver::new(64);
        assert_eq!(driver.n_shards(x.n_rows()), 40);
        for _ in 0..50 {
            let out = driver.run(&eb, &x, 0, &params(), false).expect("sharded");
            assert_eq!(out.gamma, seq.gamma);
        }
    }

    #[test]
    fn test_more_jobs_than_rows() {
        let x = corpus().slice_rows(0, 2);
        let out = EStepDriver::new(8)
            .run(&elog_beta(), &x, 0, &params(), false)
            .expect("two shards");
        assert_eq!(out.gamma.shape(), (2, 3));
        assert!(out.sstats.is_none());
    }

    #[test]
    fn test_shard_failures_are_aggregated() {
        let x = corpus();
        let broken = Matrix::filled(3, 6, f64::NEG_INFINITY);
        let err = EStepDriver::new(4)
            .run(&broken, &x, 0, &params(), true)
            .expect_err("every shard fails");
        match err {
            LdaError::WorkerFailure { failed, total, .. } => {
                assert_eq!(failed, 4);
                assert_eq!(total, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sequential_failure_is_unwrapped() {
        let x = corpus();
        let broken = Matrix::filled(3, 6, f64::NEG_INFINITY);
        let err = EStepDriver::new(1)
            .run(&broken, &x, 0, &params(), false)
            .expect_err("fails");
        assert!(matches!(err, LdaError::Computation(_)));
    }
}
