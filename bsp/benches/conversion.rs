//! Benchmarks for format conversion and container I/O.

use bsp::generate::generate_coo;
use bsp::{convert, read_matrix, read_matrix_parallel, write_matrix, ElementType, MatrixFormat};
use bsp::{ReadOptions, WriteOptions};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

fn sample(nnz: usize) -> bsp::Matrix {
    let mut rng = StdRng::seed_from_u64(42);
    let n = (nnz / 8).max(1);
    generate_coo(n, n, nnz, ElementType::Float64, ElementType::UInt32, &mut rng).unwrap()
}

fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert");

    for nnz in [1_000, 100_000, 1_000_000].iter() {
        let coo = sample(*nnz);
        let csr = convert(&coo, MatrixFormat::Csr).unwrap();

        group.bench_with_input(BenchmarkId::new("coo_to_csr", nnz), nnz, |b, _| {
            b.iter(|| convert(black_box(&coo), MatrixFormat::Csr).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("csr_to_coo", nnz), nnz, |b, _| {
            b.iter(|| convert(black_box(&csr), MatrixFormat::Coor).unwrap());
        });
    }

    group.finish();
}

fn bench_container(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let mut group = c.benchmark_group("container");
    group.sample_size(20);

    for level in [0u32, 1, 9].iter() {
        let matrix = sample(1_000_000);
        let path = dir.path().join(format!("bench_{level}.bsp"));
        let options = WriteOptions::default().with_compression_level(*level);

        group.bench_with_input(BenchmarkId::new("write", level), level, |b, _| {
            b.iter(|| write_matrix(&path, black_box(&matrix), None, &options).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("read", level), level, |b, _| {
            b.iter(|| read_matrix(&path, None).unwrap());
        });

        let parallel = ReadOptions::default().with_num_threads(4);
        group.bench_with_input(BenchmarkId::new("read_parallel", level), level, |b, _| {
            b.iter(|| read_matrix_parallel(&path, None, &parallel).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_convert, bench_container);
criterion_main!(benches);
