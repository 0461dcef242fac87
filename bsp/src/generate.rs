//! Random COO matrices for tests and benchmarks

use bsp_core::{ElementType, Error, Matrix, Result, TypedArray, Value};
use num_complex::Complex64;
use rand::Rng;

/// Values are drawn from `[0, VALUE_BOUND)`
pub const VALUE_BOUND: u64 = 100;

/// Largest index `ty` can hold, or `None` for non-index types
fn index_capacity(ty: ElementType) -> Option<u64> {
    match ty {
        ElementType::UInt8 => Some(u8::MAX as u64),
        ElementType::UInt16 => Some(u16::MAX as u64),
        ElementType::UInt32 => Some(u32::MAX as u64),
        ElementType::UInt64 => Some(u64::MAX),
        ElementType::Int8 => Some(i8::MAX as u64),
        ElementType::Int16 => Some(i16::MAX as u64),
        ElementType::Int32 => Some(i32::MAX as u64),
        ElementType::Int64 => Some(i64::MAX as u64),
        _ => None,
    }
}

/// Fill `array` with values below `bound`; bint8 gets 0 or 1
fn fill_random<R: Rng>(array: &mut TypedArray, bound: u64, rng: &mut R) {
    let ty = array.element_type();
    for i in 0..array.len() {
        let value = match ty {
            ElementType::Bint8 => Value::UInt(rng.gen_range(0..2)),
            ty if ty.is_float() => Value::Float(rng.gen::<f64>() * bound as f64),
            ty if ty.is_complex() => Value::Complex(Complex64::new(
                rng.gen::<f64>() * bound as f64,
                rng.gen::<f64>() * bound as f64,
            )),
            _ => Value::UInt(rng.gen_range(0..bound)),
        };
        array.write_value(i, value);
    }
}

/// Generate an `m x n` COO matrix with `nnz` random entries
///
/// Coordinates are uniform and sorted by row then column. Duplicates are
/// possible, as with any independent draw.
pub fn generate_coo<R: Rng>(
    m: usize,
    n: usize,
    nnz: usize,
    value_type: ElementType,
    index_type: ElementType,
    rng: &mut R,
) -> Result<Matrix> {
    let capacity = index_capacity(index_type).ok_or(Error::TypeMismatch {
        expected: "integer index",
        found: index_type,
    })?;
    if nnz > 0 && (m == 0 || n == 0) {
        return Err(Error::InvalidMatrix(format!(
            "cannot place {nnz} entries in a {m} x {n} matrix"
        )));
    }
    if nnz > 0 && m.max(n) as u64 - 1 > capacity {
        return Err(Error::InvalidMatrix(format!(
            "{index_type} cannot index a {m} x {n} matrix"
        )));
    }

    let mut values = TypedArray::new(nnz, value_type)?;
    let mut rows = TypedArray::new(nnz, index_type)?;
    let mut cols = TypedArray::new(nnz, index_type)?;
    fill_random(&mut values, VALUE_BOUND, rng);
    fill_random(&mut rows, m as u64, rng);
    fill_random(&mut cols, n as u64, rng);

    let mut order: Vec<usize> = (0..nnz).collect();
    order.sort_by_key(|&k| (rows.index(k), cols.index(k)));
    rows.permute(&order);
    cols.permute(&order);

    Ok(Matrix::coo(m, n, rows, cols, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsp_core::MatrixFormat;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_shape_and_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let matrix =
            generate_coo(30, 5, 500, ElementType::Float64, ElementType::UInt8, &mut rng).unwrap();

        assert_eq!(matrix.format, MatrixFormat::Coor);
        assert_eq!((matrix.nrows, matrix.ncols, matrix.nnz), (30, 5, 500));
        assert!(matrix.validate().is_ok());
        for k in 0..matrix.nnz {
            assert!(matrix.indices_0.index(k) < 30);
            assert!(matrix.indices_1.index(k) < 5);
            let value = matrix.values.read::<f64>(k);
            assert!((0.0..100.0).contains(&value));
        }
    }

    #[test]
    fn test_entries_are_sorted() {
        let mut rng = StdRng::seed_from_u64(11);
        let matrix =
            generate_coo(100, 100, 2000, ElementType::Int32, ElementType::UInt16, &mut rng)
                .unwrap();
        let key = |k| (matrix.indices_0.index(k), matrix.indices_1.index(k));
        assert!((1..matrix.nnz).all(|k| key(k - 1) <= key(k)));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            generate_coo(50, 50, 64, ElementType::Complex64, ElementType::Int64, &mut rng).unwrap()
        };
        assert_eq!(draw(3), draw(3));
        assert_ne!(draw(3), draw(4));
    }

    #[test]
    fn test_bint8_values() {
        let mut rng = StdRng::seed_from_u64(1);
        let matrix =
            generate_coo(4, 4, 200, ElementType::Bint8, ElementType::UInt8, &mut rng).unwrap();
        let values = matrix.values.as_slice::<u8>().unwrap();
        assert!(values.iter().all(|&v| v <= 1));
        assert!(values.contains(&0) && values.contains(&1));
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            generate_coo(4, 4, 1, ElementType::Float32, ElementType::Float32, &mut rng),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            generate_coo(0, 4, 1, ElementType::Float32, ElementType::UInt8, &mut rng),
            Err(Error::InvalidMatrix(_))
        ));
        assert!(matches!(
            generate_coo(300, 4, 1, ElementType::Float32, ElementType::Int8, &mut rng),
            Err(Error::InvalidMatrix(_))
        ));
        let empty =
            generate_coo(0, 0, 0, ElementType::Float32, ElementType::UInt8, &mut rng).unwrap();
        assert_eq!(empty.nnz, 0);
    }
}
