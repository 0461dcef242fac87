//! End-to-end tests across the Matrix Market and container codecs

use bsp::matrix_market;
use bsp::{
    check_equivalence, convert, declamp_values, list_matrices, minimize_values, read_matrix,
    read_matrix_parallel, write_matrix, ElementType, Matrix, MatrixFormat, Mismatch, MmType,
    ReadOptions, TypedArray, WriteOptions,
};
use num_complex::Complex64;
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn sorted_coo(nrows: usize, ncols: usize, mut entries: Vec<(u16, u16, f64)>) -> Matrix {
    entries.sort_by_key(|&(row, col, _)| (row, col));
    Matrix::coo(
        nrows,
        ncols,
        TypedArray::from(entries.iter().map(|e| e.0 as u8).collect::<Vec<_>>()),
        TypedArray::from(entries.iter().map(|e| e.1 as u8).collect::<Vec<_>>()),
        TypedArray::from(entries.iter().map(|e| e.2).collect::<Vec<_>>()),
    )
}

#[test]
fn test_mtx_to_container_pipeline() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let mtx = dir.path().join("clamped.mtx");
    let bsp = dir.path().join("clamped.bsp");
    fs::write(
        &mtx,
        "%%MatrixMarket matrix coordinate real general\n\
         % infinities stored as 1e308\n\
         4 4 5\n\
         4 4 -1e308\n\
         1 2 1.0\n\
         3 1 1e308\n\
         1 1 -2.5\n\
         2 3 0.75\n",
    )
    .unwrap();

    let mut original = read_matrix(&mtx, None).unwrap();
    assert_eq!(declamp_values(&mut original), 2);
    assert_eq!(original.values.read::<f64>(4), f64::NEG_INFINITY);

    let minimized = minimize_values(original.clone());
    assert_eq!(minimized.values.element_type(), ElementType::Float32);
    let csr = convert(&minimized, MatrixFormat::Csr).unwrap();
    let comment = matrix_market::read_metadata(&mtx).unwrap().comments;
    write_matrix(
        &bsp,
        &csr,
        Some("/converted/clamped"),
        &WriteOptions::default().with_comment(comment),
    )
    .unwrap();

    let read = read_matrix_parallel(
        &bsp,
        Some("/converted/clamped"),
        &ReadOptions::default().with_num_threads(3),
    )
    .unwrap();
    assert_eq!(read, csr);
    check_equivalence(&read, &original).unwrap();

    let listed = list_matrices(&bsp).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].group, "/converted/clamped");
    assert_eq!(listed[0].descriptor.data_types["values"], "float32");
}

#[test]
fn test_equivalence_reports_value_change() {
    init_tracing();
    let a = sorted_coo(3, 3, vec![(0, 1, 1.0), (2, 2, 4.0)]);
    let mut b = convert(&a, MatrixFormat::Csr).unwrap();
    b.values.write(1, 5.0f64);

    match check_equivalence(&a, &b) {
        Err(Mismatch::Value {
            component, index, ..
        }) => {
            assert_eq!(component, "values");
            assert_eq!(index, 1);
        }
        other => panic!("expected a value mismatch, got {other:?}"),
    }
}

#[test]
fn test_pattern_file_to_container() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let mtx = dir.path().join("pattern.mtx");
    let bsp = dir.path().join("pattern.bsp");
    fs::write(
        &mtx,
        "%%MatrixMarket matrix coordinate pattern general\n2 2 2\n1 1\n2 2\n",
    )
    .unwrap();

    let matrix = read_matrix(&mtx, None).unwrap();
    write_matrix(&bsp, &matrix, None, &WriteOptions::default()).unwrap();
    let read = read_matrix(&bsp, None).unwrap();
    assert!(read.is_iso);
    assert_eq!(read.values, TypedArray::bint8(vec![1]));
    assert_eq!(read, matrix);
}

fn entries(max_dim: u16, max_len: usize) -> impl Strategy<Value = Vec<(u16, u16, f64)>> {
    prop::collection::vec(
        (0..max_dim, 0..max_dim, -1e300f64..1e300f64),
        0..max_len,
    )
}

/// Row-sorted COO holding values of the Matrix Market type `ty`
fn typed_coo(nrows: usize, ncols: usize, ty: MmType, entries: Vec<(u16, u16, f64)>) -> Matrix {
    let mut matrix = sorted_coo(nrows, ncols, entries);
    let reals = matrix.values.as_slice::<f64>().unwrap().to_vec();
    match ty {
        MmType::Real => {}
        MmType::Integer => {
            let values: Vec<i64> = reals.iter().map(|&v| (v / 1e285) as i64).collect();
            matrix.values = TypedArray::from(values);
        }
        MmType::Complex => {
            let values: Vec<Complex64> =
                reals.iter().map(|&v| Complex64::new(v, -v / 3.0)).collect();
            matrix.values = TypedArray::from(values);
        }
        MmType::Pattern => {
            matrix.values = TypedArray::bint8(vec![1]);
            matrix.is_iso = true;
        }
    }
    matrix
}

fn mm_type() -> impl Strategy<Value = MmType> {
    prop::sample::select(vec![MmType::Real, MmType::Integer, MmType::Complex, MmType::Pattern])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_container_round_trip(entries in entries(40, 200), level in 0u32..=9) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prop.bsp");
        let coo = sorted_coo(40, 40, entries);
        let csr = convert(&coo, MatrixFormat::Csr).unwrap();
        let options = WriteOptions::default()
            .with_compression_level(level)
            .with_chunk_bytes(256);

        write_matrix(&path, &coo, Some("coo"), &options).unwrap();
        write_matrix(&path, &csr, Some("csr"), &options).unwrap();
        prop_assert_eq!(read_matrix(&path, Some("coo")).unwrap(), coo);
        prop_assert_eq!(read_matrix(&path, Some("csr")).unwrap(), csr);
    }

    #[test]
    fn prop_matrix_market_round_trip(entries in entries(30, 100), ty in mm_type()) {
        let coo = typed_coo(30, 30, ty, entries);
        prop_assert_eq!(MmType::of(&coo), ty);
        let mut text = Vec::new();
        matrix_market::write_to(&mut text, &coo).unwrap();
        let read = matrix_market::read_from(text.as_slice()).unwrap();
        prop_assert_eq!(read, coo);
    }
}
