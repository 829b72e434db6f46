use super::*;

fn sample_dense() -> Matrix<f64> {
    Matrix::from_vec(
        4,
        3,
        vec![
            1.0, 0.0, 2.0, //
            0.0, 0.0, 0.0, //
            0.0, 3.0, 0.0, //
            4.0, 5.0, 6.0,
        ],
    )
    .expect("4x3")
}

#[test]
fn test_from_dense_roundtrip() {
    let dense = sample_dense();
    let x = CsrMatrix::from_dense(&dense);
    assert_eq!(x.shape(), (4, 3));
    assert_eq!(x.nnz(), 6);
    assert_eq!(x.to_dense(), dense);
}

#[test]
fn test_row_view() {
    let x = CsrMatrix::from_dense(&sample_dense());
    let r = x.row(3);
    assert_eq!(r.indices, &[0, 1, 2]);
    assert_eq!(r.values, &[4.0, 5.0, 6.0]);
    assert!((r.total() - 15.0).abs() < 1e-12);
    assert!(x.row(1).indices.is_empty());
}

#[test]
fn test_new_validates_structure() {
    let ok = CsrMatrix::new(2, 3, vec![0, 1, 2], vec![2, 0], vec![1.0, 1.0]);
    assert!(ok.is_ok());

    let bad_len = CsrMatrix::new(2, 3, vec![0, 1], vec![2], vec![1.0]);
    assert!(matches!(bad_len, Err(LdaError::InvalidInput(_))));

    let bad_col = CsrMatrix::new(1, 3, vec![0, 1], vec![3], vec![1.0]);
    assert!(bad_col.is_err());

    let unsorted = CsrMatrix::new(1, 3, vec![0, 2], vec![2, 1], vec![1.0, 1.0]);
    assert!(unsorted.is_err());

    let bad_end = CsrMatrix::new(1, 3, vec![0, 1], vec![0, 1], vec![1.0, 1.0]);
    assert!(bad_end.is_err());
}

#[test]
fn test_new_rejects_interior_offset_past_nnz() {
    let x = CsrMatrix::new(2, 3, vec![0, 10, 2], vec![0, 1], vec![1.0, 1.0]);
    assert!(matches!(x, Err(LdaError::InvalidInput(_))));

    let dip = CsrMatrix::new(3, 3, vec![0, 2, 1, 2], vec![0, 1], vec![1.0, 1.0]);
    assert!(matches!(dip, Err(LdaError::InvalidInput(_))));
}

#[test]
fn test_slice_rows() {
    let x = CsrMatrix::from_dense(&sample_dense());
    let s = x.slice_rows(1, 3);
    assert_eq!(s.shape(), (2, 3));
    assert_eq!(s.nnz(), 1);
    assert_eq!(s.row(1).indices, &[1]);

    let empty = x.slice_rows(2, 2);
    assert_eq!(empty.shape(), (0, 3));
}

#[test]
#[should_panic(expected = "row slice out of bounds")]
fn test_slice_rows_out_of_bounds() {
    let x = CsrMatrix::from_dense(&sample_dense());
    let _ = x.slice_rows(2, 5);
}

#[test]
fn test_vstack_reconstructs() {
    let x = CsrMatrix::from_dense(&sample_dense());
    let parts = vec![x.slice_rows(0, 1), x.slice_rows(1, 3), x.slice_rows(3, 4)];
    let stacked = CsrMatrix::vstack(&parts).expect("same width");
    assert_eq!(stacked, x);
}

#[test]
fn test_vstack_errors() {
    assert!(matches!(
        CsrMatrix::vstack(&[]),
        Err(LdaError::EmptyInput(_))
    ));
    let a = CsrMatrix::zeros(1, 3);
    let b = CsrMatrix::zeros(1, 4);
    assert!(matches!(
        CsrMatrix::vstack(&[a, b]),
        Err(LdaError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_validate_counts() {
    let x = CsrMatrix::from_dense(&sample_dense());
    assert!(x.validate_counts().is_ok());

    let neg = Matrix::from_vec(1, 2, vec![1.0, -1.0]).expect("1x2");
    let err = CsrMatrix::from_dense(&neg)
        .validate_counts()
        .expect_err("negative count");
    assert!(err.to_string().contains("non-negative"));

    let nan = CsrMatrix::new(1, 1, vec![0, 1], vec![0], vec![f64::NAN]).expect("structure ok");
    assert!(nan.validate_counts().is_err());
}

#[test]
fn test_zeros_and_total() {
    let z = CsrMatrix::zeros(3, 5);
    assert_eq!(z.nnz(), 0);
    assert_eq!(z.total(), 0.0);
    let x = CsrMatrix::from(&sample_dense());
    assert!((x.total() - 21.0).abs() < 1e-12);
}
