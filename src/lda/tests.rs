use super::*;

/// 3 topics × 3 disjoint vocabulary groups, every count 3.
fn block_corpus() -> CsrMatrix {
    let mut dense = Matrix::zeros(9, 9);
    for b in 0..3 {
        for i in 0..3 {
            for j in 0..3 {
                dense.set(b * 3 + i, b * 3 + j, 3.0);
            }
        }
    }
    CsrMatrix::from_dense(&dense)
}

fn block_model() -> LatentDirichletAllocation {
    LatentDirichletAllocation::new(3)
        .with_doc_topic_prior(1.0 / 3.0)
        .with_topic_word_prior(1.0 / 3.0)
}

fn counts(rows: usize, cols: usize, seed: u64) -> CsrMatrix {
    let data = (0..rows * cols)
        .map(|i| ((i as u64 * 31 + seed * 17) % 4) as f64)
        .collect();
    CsrMatrix::from_dense(&Matrix::from_vec(rows, cols, data).expect("rows * cols values"))
}

#[test]
fn test_new() {
    let lda = LatentDirichletAllocation::new(5);
    assert_eq!(lda.n_topics(), 5);
    assert!(!lda.is_fitted());
    assert_eq!(lda.n_batch_iter(), 0);
    assert_eq!(lda.n_iter(), 0);
    assert_eq!(lda.n_vocab(), None);
}

#[test]
fn test_builders_fill_config() {
    let lda = LatentDirichletAllocation::new(4)
        .with_doc_topic_prior(0.2)
        .with_topic_word_prior(0.05)
        .with_learning_offset(30.0)
        .with_learning_decay(0.6)
        .with_total_samples(500.0)
        .with_batch_size(16)
        .with_learning_method(LearningMethod::Online)
        .with_mean_change_tol(1e-4)
        .with_max_doc_update_iter(50)
        .with_n_jobs(2)
        .with_random_seed(9)
        .with_init(InitStrategy::Gamma)
        .with_evaluate_every(2)
        .with_perplexity_tol(0.5)
        .with_subsample_size(10);
    let c = lda.config();
    assert_eq!(c.doc_topic_prior, Some(0.2));
    assert_eq!(c.topic_word_prior, Some(0.05));
    assert_eq!(c.learning_offset, 30.0);
    assert_eq!(c.learning_decay, 0.6);
    assert_eq!(c.total_samples, 500.0);
    assert_eq!(c.batch_size, 16);
    assert_eq!(c.learning_method, LearningMethod::Online);
    assert_eq!(c.mean_change_tol, 1e-4);
    assert_eq!(c.max_doc_update_iter, 50);
    assert_eq!(c.n_jobs, 2);
    assert_eq!(c.random_seed, 9);
    assert_eq!(c.init, InitStrategy::Gamma);
    assert_eq!(c.evaluate_every, 2);
    assert_eq!(c.perplexity_tol, 0.5);
    assert_eq!(c.subsample_size, 10);
    assert!(c.validate().is_ok());
}

#[test]
fn test_from_config_validates() {
    let bad = LdaConfig {
        learning_decay: 2.0,
        ..LdaConfig::default()
    };
    assert!(LatentDirichletAllocation::from_config(bad).is_err());
    assert!(LatentDirichletAllocation::from_config(LdaConfig::with_topics(2)).is_ok());
}

#[test]
fn test_invalid_config_rejected_at_fit() {
    let mut lda = LatentDirichletAllocation::new(0);
    let err = lda.fit(&block_corpus(), 1).expect_err("0 topics");
    assert!(matches!(err, LdaError::InvalidHyperparameter { .. }));
    assert!(!lda.is_fitted());
}

#[test]
fn test_fit_batch_recovers_blocks() {
    let x = block_corpus();
    let mut lda = block_model();
    lda.fit(&x, 10).expect("fit should succeed");

    assert!(lda.is_fitted());
    assert_eq!(lda.n_iter(), 10);
    assert_eq!(lda.n_batch_iter(), 10);
    assert_eq!(lda.n_vocab(), Some(9));
    for top in lda.top_term_indices(3).expect("fitted") {
        let mut top = top;
        top.sort_unstable();
        assert!(
            [[0, 1, 2], [3, 4, 5], [6, 7, 8]].contains(&[top[0], top[1], top[2]]),
            "topic top terms {top:?}"
        );
    }
}

#[test]
fn test_fit_online_counts_mini_batches() {
    let x = block_corpus();
    let mut lda = block_model()
        .with_learning_method(LearningMethod::Online)
        .with_batch_size(4)
        .with_learning_offset(10.0);
    lda.fit(&x, 3).expect("fit should succeed");
    // 9 rows in batches of 4, 4, 1
    assert_eq!(lda.n_batch_iter(), 9);
    assert_eq!(lda.n_iter(), 3);
    assert!(lda
        .components()
        .expect("fitted")
        .as_slice()
        .iter()
        .all(|&v| v > 0.0));
}

#[test]
fn test_fit_rejects_zero_passes() {
    let mut lda = block_model();
    assert!(lda.fit(&block_corpus(), 0).is_err());
    assert!(!lda.is_fitted());
}

#[test]
fn test_fit_rejects_empty_and_negative_input() {
    let mut lda = block_model();
    assert!(matches!(
        lda.fit(&CsrMatrix::zeros(0, 9), 1),
        Err(LdaError::EmptyInput(_))
    ));
    let neg = CsrMatrix::from_dense(&Matrix::from_vec(1, 2, vec![1.0, -2.0]).expect("1x2"));
    assert!(matches!(lda.partial_fit(&neg), Err(LdaError::InvalidInput(_))));
    assert!(!lda.is_fitted());
}

#[test]
fn test_partial_fit_advances_counter_and_freezes_vocabulary() {
    let mut lda = block_model().with_learning_offset(30.0);
    let x = block_corpus();
    lda.partial_fit(&x).expect("first batch");
    lda.partial_fit(&x).expect("second batch");
    assert_eq!(lda.n_batch_iter(), 2);
    assert_eq!(lda.n_vocab(), Some(9));

    let before = lda.components().expect("fitted").clone();
    let wider = counts(4, 10, 1);
    let err = lda.partial_fit(&wider).expect_err("10 != 9 columns");
    assert!(err.is_value_error());
    assert_eq!(lda.components().expect("fitted"), &before);
    assert_eq!(lda.n_batch_iter(), 2);
}

#[test]
fn test_fit_continues_from_partial_fit() {
    let x = block_corpus();
    let mut lda = block_model();
    lda.partial_fit(&x).expect("partial_fit");
    lda.fit(&x, 2).expect("fit");
    assert_eq!(lda.n_batch_iter(), 3);
    assert_eq!(lda.n_iter(), 2);
    assert!(lda.fit(&counts(3, 4, 0), 1).is_err());
}

#[test]
fn test_not_fitted_errors() {
    let lda = block_model();
    let x = block_corpus();
    for err in [
        lda.transform(&x).expect_err("transform"),
        lda.perplexity(&x, &Matrix::filled(9, 3, 1.0), false)
            .expect_err("perplexity"),
        lda.score(&x).expect_err("score"),
        lda.components().map(|_| ()).expect_err("components"),
        lda.top_term_indices(3).map(|_| ()).expect_err("top terms"),
    ] {
        assert!(err.is_state_error(), "{err}");
    }
}

#[test]
fn test_transform_rows_sum_to_one() {
    let x = block_corpus();
    let mut lda = block_model();
    let doc_topic = lda.fit_transform(&x, 10).expect("fit_transform");
    assert_eq!(doc_topic.shape(), (9, 3));
    for s in doc_topic.row_sums() {
        assert!((s - 1.0).abs() < 1e-10);
    }
    assert!(doc_topic.as_slice().iter().all(|&v| v > 0.0));
}

#[test]
fn test_transform_does_not_mutate_model() {
    let x = block_corpus();
    let mut lda = block_model();
    lda.fit(&x, 3).expect("fit");
    let snapshot = lda.clone();
    let _ = lda.transform(&x).expect("transform");
    assert_eq!(lda, snapshot);
}

#[test]
fn test_transform_vocabulary_mismatch() {
    let mut lda = block_model();
    lda.partial_fit(&counts(20, 10, 0)).expect("partial_fit");
    let err = lda.transform(&counts(10, 8, 1)).expect_err("8 != 10 columns");
    assert!(matches!(
        err,
        LdaError::DimensionMismatch {
            expected: 10,
            actual: 8,
            ..
        }
    ));
}

#[test]
fn test_fit_transform_equals_fit_then_transform() {
    let x = counts(12, 7, 3);
    let mut a = LatentDirichletAllocation::new(3).with_random_seed(4);
    let from_fit = a.fit_transform(&x, 5).expect("fit_transform");
    let mut b = LatentDirichletAllocation::new(3).with_random_seed(4);
    b.fit(&x, 5).expect("fit");
    assert_eq!(from_fit, b.transform(&x).expect("transform"));
    assert_eq!(from_fit, a.transform(&x).expect("transform"));
}

#[test]
fn test_empty_document_gets_prior_topics() {
    let x = block_corpus();
    let mut lda = block_model();
    lda.fit(&x, 5).expect("fit");
    let docs = CsrMatrix::zeros(2, 9);
    let doc_topic = lda.transform(&docs).expect("transform");
    for v in doc_topic.as_slice() {
        assert!((v - 1.0 / 3.0).abs() < 1e-12);
    }
}

#[test]
fn test_perplexity_improves_with_training() {
    let x = block_corpus();
    let mut short = block_model().with_random_seed(0);
    let d1 = short.fit_transform(&x, 1).expect("1 pass");
    let p1 = short.perplexity(&x, &d1, false).expect("perplexity");

    let mut long = block_model().with_random_seed(0);
    let d10 = long.fit_transform(&x, 10).expect("10 passes");
    let p10 = long.perplexity(&x, &d10, false).expect("perplexity");

    assert!(p10 < p1, "{p10} should be below {p1}");
    // each document spreads evenly over 3 terms
    assert!(p10 < 3.5);
}

#[test]
fn test_perplexity_shape_checks() {
    let x = block_corpus();
    let mut lda = block_model();
    lda.fit(&x, 2).expect("fit");
    assert!(lda.perplexity(&x, &Matrix::filled(8, 3, 1.0), false).is_err());
    assert!(lda.perplexity(&x, &Matrix::filled(9, 2, 1.0), false).is_err());
}

#[test]
fn test_subsampled_perplexity_is_deterministic() {
    let x = block_corpus();
    let mut lda = block_model().with_subsample_size(4);
    let d = lda.fit_transform(&x, 5).expect("fit_transform");
    let a = lda.perplexity(&x, &d, true).expect("subsampled");
    let b = lda.perplexity(&x, &d, true).expect("subsampled");
    assert_eq!(a, b);
    assert!(a.is_finite() && a >= 1.0);

    let big = lda.clone().with_subsample_size(100);
    assert_eq!(
        big.perplexity(&x, &d, true).expect("all docs"),
        lda.perplexity(&x, &d, false).expect("all docs")
    );
}

#[test]
fn test_score_improves_with_training() {
    let x = block_corpus();
    let mut short = block_model().with_init(InitStrategy::SpreadDocuments);
    short.fit(&x, 1).expect("fit");
    let mut long = block_model().with_init(InitStrategy::SpreadDocuments);
    long.fit(&x, 10).expect("fit");
    let (s1, s10) = (short.score(&x).expect("score"), long.score(&x).expect("score"));
    assert!(s1.is_finite() && s10.is_finite());
    assert!(s10 > s1, "{s10} should exceed {s1}");
}

#[test]
fn test_early_stopping() {
    let x = block_corpus();
    let mut lda = block_model()
        .with_evaluate_every(1)
        .with_perplexity_tol(1.0);
    lda.fit(&x, 50).expect("fit");
    assert!(lda.n_iter() < 50);
    assert_eq!(lda.n_batch_iter() as usize, lda.n_iter());
}

#[test]
fn test_top_words() {
    let x = block_corpus();
    let mut lda = block_model();
    lda.fit(&x, 10).expect("fit");
    let vocab: Vec<String> = (0..9).map(|i| format!("w{i}")).collect();
    let top = lda.top_words(&vocab, 3).expect("fitted");
    assert_eq!(top.len(), 3);
    for topic in &top {
        assert_eq!(topic.len(), 3);
        assert!(topic[0].1 >= topic[1].1 && topic[1].1 >= topic[2].1);
    }
    assert!(lda.top_words(&vocab[..5], 3).is_err());
}

#[test]
fn test_topic_word_distribution_rows() {
    let x = block_corpus();
    let mut lda = block_model();
    lda.fit(&x, 2).expect("fit");
    for s in lda.topic_word_distribution().expect("fitted").row_sums() {
        assert!((s - 1.0).abs() < 1e-12);
    }
}

#[test]
fn test_n_jobs_does_not_change_model() {
    let x = block_corpus();
    let mut one = block_model().with_n_jobs(1);
    let mut three = block_model().with_n_jobs(3);
    one.fit(&x, 5).expect("fit");
    three.fit(&x, 5).expect("fit");
    let (a, b) = (
        one.components().expect("fitted"),
        three.components().expect("fitted"),
    );
    for (u, v) in a.as_slice().iter().zip(b.as_slice()) {
        assert!((u - v).abs() < 1e-9);
    }
}

#[test]
fn test_online_fit_is_independent_of_n_jobs() {
    let x = block_corpus();
    let online = block_model()
        .with_learning_method(LearningMethod::Online)
        .with_batch_size(4)
        .with_learning_offset(10.0);
    let mut one = online.clone().with_n_jobs(1);
    let mut two = online.with_n_jobs(2);
    one.fit(&x, 3).expect("fit");
    two.fit(&x, 3).expect("fit");
    assert_eq!(one.n_batch_iter(), two.n_batch_iter());
    let (a, b) = (
        one.components().expect("fitted"),
        two.components().expect("fitted"),
    );
    for (u, v) in a.as_slice().iter().zip(b.as_slice()) {
        assert!((u - v).abs() < 1e-9);
    }
}

#[test]
fn test_serde_roundtrip_resumes_training() {
    let x = block_corpus();
    let mut lda = block_model().with_learning_offset(30.0);
    lda.partial_fit(&x).expect("partial_fit");
    let json = serde_json::to_string(&lda).expect("serialize");
    let mut restored: LatentDirichletAllocation = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(restored.n_batch_iter(), 1);
    assert_eq!(restored.n_vocab(), Some(9));
    restored.partial_fit(&x).expect("resume");
    assert_eq!(restored.n_batch_iter(), 2);
}
