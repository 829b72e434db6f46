// =========================================================================
// FALSIFY-PART: row partitioning contract (aprender-lda partition)
//
// Five-Whys:
//   Why 1: online training and E-step sharding both consume partitions
//   Why 2: a dropped or duplicated row silently biases λ
//   Why 3: offsets feed the per-document seeds of the E-step
//   Why 4: a shifted offset changes γ initialisation for every later row
//   Why 5: partition slicing was "obviously correct" (index arithmetic)
//
// References:
//   - Hoffman, Blei, Bach (2010) "Online Learning for Latent Dirichlet Allocation"
// =========================================================================

use super::*;
use crate::primitives::Matrix;

fn ramp(rows: usize, cols: usize) -> CsrMatrix {
    let data = (0..rows * cols).map(|i| (i % 4) as f64).collect();
    CsrMatrix::from_dense(&Matrix::from_vec(rows, cols, data).expect("rows * cols values"))
}

/// FALSIFY-PART-001: every policy reconstructs the input when stacked
#[test]
fn falsify_part_001_concatenation_reconstructs() {
    let x = ramp(23, 5);
    let policies: Vec<Vec<CsrMatrix>> = vec![
        split_by_sizes(&x, &[5, 0, 11, 7]).expect("sum 23").collect(),
        split_into_folds(&x, 4).expect("4 folds").collect(),
        split_into_mini_batches(&x, 6).expect("size 6").collect(),
    ];
    for (i, parts) in policies.iter().enumerate() {
        let rebuilt = CsrMatrix::vstack(parts).expect("same width");
        assert_eq!(
            rebuilt, x,
            "FALSIFIED PART-001: policy {i} did not reconstruct the matrix"
        );
    }
}

/// FALSIFY-PART-002: a size mismatch fails before any batch is produced
#[test]
fn falsify_part_002_mismatch_rejected_up_front() {
    let x = ramp(10, 2);
    for sizes in [&[5, 6][..], &[9][..], &[][..]] {
        let result = split_by_sizes(&x, sizes);
        assert!(
            matches!(result, Err(LdaError::PartitionMismatch { .. })),
            "FALSIFIED PART-002: sizes {sizes:?} accepted for 10 rows"
        );
    }
}

/// FALSIFY-PART-003: no fold exceeds ⌈rows / n_folds⌉
#[test]
fn falsify_part_003_fold_cap() {
    for rows in 1usize..40 {
        for n_folds in 1..9 {
            let cap = rows.div_ceil(n_folds);
            let sizes = fold_sizes(rows, n_folds).expect("n_folds >= 1");
            assert_eq!(sizes.len(), n_folds);
            assert_eq!(sizes.iter().sum::<usize>(), rows);
            assert!(
                sizes.iter().all(|&s| s <= cap),
                "FALSIFIED PART-003: rows={rows} folds={n_folds} sizes={sizes:?} cap={cap}"
            );
        }
    }
}

/// FALSIFY-PART-004: mini-batches are full except a final remainder
#[test]
fn falsify_part_004_remainder_last() {
    for rows in 0..30 {
        for batch in 1..8 {
            let sizes = mini_batch_sizes(rows, batch).expect("batch >= 1");
            assert_eq!(sizes.len(), rows.div_ceil(batch));
            if let Some((last, full)) = sizes.split_last() {
                assert!(full.iter().all(|&s| s == batch));
                let expected_last = if rows % batch == 0 { batch } else { rows % batch };
                assert_eq!(
                    *last, expected_last,
                    "FALSIFIED PART-004: rows={rows} batch={batch} last={last}"
                );
            }
        }
    }
}

/// FALSIFY-PART-005: offsets tile the row range without gaps
#[test]
fn falsify_part_005_offsets_tile_rows() {
    let sizes = fold_sizes(17, 5).expect("5 folds");
    let starts = offsets(&sizes);
    for i in 1..sizes.len() {
        assert_eq!(
            starts[i],
            starts[i - 1] + sizes[i - 1],
            "FALSIFIED PART-005: gap before fold {i}"
        );
    }
}
