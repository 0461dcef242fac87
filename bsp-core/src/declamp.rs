//! Restore infinities from clamped sentinel values
//!
//! Some matrix collections store `±inf` as `±1e308`. Declamping maps any
//! float64 component at or beyond that bound back to a signed infinity.

use crate::{Matrix, TypedArray};
use num_complex::Complex64;

/// Magnitude at which a float64 is treated as a clamped infinity
pub const CLAMP_BOUND: f64 = 1e308;

/// Map a single value back to infinity if it sits on the clamp bound
#[inline]
pub fn declamp(value: f64) -> f64 {
    if value >= CLAMP_BOUND {
        f64::INFINITY
    } else if value <= -CLAMP_BOUND {
        f64::NEG_INFINITY
    } else {
        value
    }
}

/// Declamp a float64 or complex64 array in place, returning how many
/// components changed. Other element types are left alone.
pub fn declamp_array(array: &mut TypedArray) -> usize {
    let mut changed = 0;
    let mut fix = |v: &mut f64| {
        let fixed = declamp(*v);
        if fixed.to_bits() != v.to_bits() {
            *v = fixed;
            changed += 1;
        }
    };

    match array {
        TypedArray::Float64(values) => values.iter_mut().for_each(&mut fix),
        TypedArray::Complex64(values) => {
            for Complex64 { re, im } in values.iter_mut() {
                fix(re);
                fix(im);
            }
        }
        _ => {}
    }
    changed
}

/// Declamp the value array of `matrix`
pub fn declamp_values(matrix: &mut Matrix) -> usize {
    let changed = declamp_array(&mut matrix.values);
    if changed > 0 {
        tracing::debug!(changed, "declamped values");
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_declamp_bounds() {
        assert_eq!(declamp(1e308), f64::INFINITY);
        assert_eq!(declamp(f64::MAX), f64::INFINITY);
        assert_eq!(declamp(-1e308), f64::NEG_INFINITY);
        assert_eq!(declamp(9.9e307), 9.9e307);
        assert_eq!(declamp(0.0), 0.0);
    }

    #[test]
    fn test_declamp_complex_parts() {
        let mut array = TypedArray::from(vec![
            Complex64::new(1e308, 2.0),
            Complex64::new(-3.0, -1e308),
        ]);
        assert_eq!(declamp_array(&mut array), 2);
        let values = array.as_slice::<Complex64>().unwrap();
        assert_eq!(values[0], Complex64::new(f64::INFINITY, 2.0));
        assert_eq!(values[1], Complex64::new(-3.0, f64::NEG_INFINITY));
    }

    #[test]
    fn test_other_types_untouched() {
        let mut floats = TypedArray::from(vec![f32::MAX]);
        assert_eq!(declamp_array(&mut floats), 0);
        assert_eq!(floats.as_slice::<f32>(), Some(&[f32::MAX][..]));

        let mut ints = TypedArray::from(vec![i64::MAX]);
        assert_eq!(declamp_array(&mut ints), 0);
    }

    #[test]
    fn test_declamp_matrix_values() {
        let mut matrix = Matrix::coo(
            1,
            2,
            TypedArray::from(vec![0u8, 0]),
            TypedArray::from(vec![0u8, 1]),
            TypedArray::from(vec![-1e308, 5.0]),
        );
        assert_eq!(declamp_values(&mut matrix), 1);
        assert_eq!(matrix.values.read::<f64>(0), f64::NEG_INFINITY);
        assert_eq!(matrix.values.read::<f64>(1), 5.0);
    }

    proptest! {
        #[test]
        fn prop_declamp_is_idempotent(values in prop::collection::vec(any::<f64>(), 0..64)) {
            let mut once = TypedArray::from(values);
            declamp_array(&mut once);
            let mut twice = once.clone();
            prop_assert_eq!(declamp_array(&mut twice), 0);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_interior_values_unchanged(v in -9.99e307f64..9.99e307) {
            prop_assert_eq!(declamp(v), v);
        }
    }
}
