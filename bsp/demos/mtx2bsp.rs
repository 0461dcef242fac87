//! Convert a Matrix Market file into a binsparse container
//!
//! Usage: mtx2bsp <input.mtx> <output.bsp[:group]> [COO|CSR] [compression level]

use bsp::{
    convert, declamp_values, matrix_market, minimize_values, read_matrix, write_matrix_at,
    MatrixFormat, WriteOptions,
};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> bsp::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} <input.mtx> <output.bsp[:group]> [COO|CSR] [level]", args[0]);
        std::process::exit(1);
    }
    let format: MatrixFormat = args.get(3).map_or(Ok(MatrixFormat::COO), |f| f.parse())?;
    let level = args.get(4).and_then(|l| l.parse().ok()).unwrap_or(9);

    let start = Instant::now();
    let metadata = matrix_market::read_metadata(&args[1])?;
    let mut matrix = read_matrix(&args[1], None)?;
    println!("Read {} in {:.3}s", args[1], start.elapsed().as_secs_f64());

    let declamped = declamp_values(&mut matrix);
    if declamped > 0 {
        println!("Declamped {declamped} values");
    }
    let mut matrix = minimize_values(matrix);
    if format != matrix.format {
        matrix = convert(&matrix, format)?;
    }
    println!("{matrix}");

    let start = Instant::now();
    let options = WriteOptions::default()
        .with_compression_level(level)
        .with_comment(metadata.comments);
    write_matrix_at(&args[2], &matrix, &options)?;
    println!("Wrote {} in {:.3}s", args[2], start.elapsed().as_secs_f64());
    Ok(())
}
