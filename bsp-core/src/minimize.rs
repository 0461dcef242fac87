//! Lossless narrowing of value arrays
//!
//! float64 and complex64 values drop to 32-bit components when every value
//! survives the round trip unchanged. int64 values move to the smallest
//! unsigned or signed type whose range covers `[min, max]`. Other types are
//! already considered minimal.

use crate::array::{Element, Value};
use crate::{Matrix, TypedArray};
use num_complex::{Complex32, Complex64};
use tracing::debug;

/// Replace the matrix values with their narrowest lossless representation
pub fn minimize_values(mut matrix: Matrix) -> Matrix {
    matrix.values = minimize_array(std::mem::take(&mut matrix.values));
    matrix
}

/// Narrow one array, returning it unchanged when nothing smaller is exact
pub fn minimize_array(array: TypedArray) -> TypedArray {
    let from = array.element_type();
    let minimized = match array {
        TypedArray::Float64(values) => {
            if values.iter().all(|&v| (v as f32) as f64 == v) {
                TypedArray::Float32(values.iter().map(|&v| v as f32).collect())
            } else {
                TypedArray::Float64(values)
            }
        }
        TypedArray::Int64(values) => minimize_int64(values),
        TypedArray::Complex64(values) => {
            if values.iter().all(|v| fits_complex32(*v)) {
                TypedArray::Complex32(
                    values
                        .iter()
                        .map(|v| Complex32::new(v.re as f32, v.im as f32))
                        .collect(),
                )
            } else {
                TypedArray::Complex64(values)
            }
        }
        other => other,
    };

    if minimized.element_type() != from {
        debug!(%from, to = %minimized.element_type(), len = minimized.len(), "minimized values");
    }
    minimized
}

fn fits_complex32(v: Complex64) -> bool {
    (v.re as f32) as f64 == v.re && (v.im as f32) as f64 == v.im
}

fn minimize_int64(values: Vec<i64>) -> TypedArray {
    if values.is_empty() {
        return TypedArray::Int64(values);
    }
    let min = values.iter().copied().fold(i64::MAX, i64::min);
    let max = values.iter().copied().fold(i64::MIN, i64::max);

    if min >= 0 {
        if max <= u8::MAX as i64 {
            narrow::<u8>(&values)
        } else if max <= u16::MAX as i64 {
            narrow::<u16>(&values)
        } else if max <= u32::MAX as i64 {
            narrow::<u32>(&values)
        } else {
            narrow::<u64>(&values)
        }
    } else if min >= i8::MIN as i64 && max <= i8::MAX as i64 {
        narrow::<i8>(&values)
    } else if min >= i16::MIN as i64 && max <= i16::MAX as i64 {
        narrow::<i16>(&values)
    } else if min >= i32::MIN as i64 && max <= i32::MAX as i64 {
        narrow::<i32>(&values)
    } else {
        TypedArray::Int64(values)
    }
}

fn narrow<T: Element>(values: &[i64]) -> TypedArray {
    TypedArray::from(
        values
            .iter()
            .map(|&v| T::from_value(Value::Int(v)))
            .collect::<Vec<T>>(),
    )
}
