//! Semantic comparison of two matrices
//!
//! Two matrices are equivalent when they describe the same entries, even if
//! their arrays use different element types. Matrices in different formats
//! are both brought to row-sorted COO first.

use crate::{convert, ElementType, Error, Matrix, MatrixFormat, Structure, TypedArray};

/// First difference found between two matrices
#[derive(thiserror::Error, Debug)]
pub enum Mismatch {
    #[error("could not convert to COO: {0}")]
    Conversion(#[source] Error),

    #[error("formats do not match ({0} != {1})")]
    Format(MatrixFormat, MatrixFormat),

    #[error("structures do not match ({0} != {1})")]
    Structure(Structure, Structure),

    #[error("dimensions do not match ({0}, {1}) != ({2}, {3})")]
    Dimensions(usize, usize, usize, usize),

    #[error("number of stored values does not match ({0} != {1})")]
    Nnz(usize, usize),

    #[error("iso-ness does not match ({0} != {1})")]
    Iso(bool, bool),

    #[error("{component} sizes do not match ({left} != {right})")]
    Size {
        component: &'static str,
        left: usize,
        right: usize,
    },

    #[error("{component} kinds do not match ({left} != {right})")]
    Kind {
        component: &'static str,
        left: ElementType,
        right: ElementType,
    },

    #[error("{component} differ at index {index} ({left} != {right})")]
    Value {
        component: &'static str,
        index: usize,
        left: String,
        right: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Integer,
    Real,
    Complex,
}

impl Kind {
    fn of(ty: ElementType) -> Self {
        if ty.is_complex() {
            Kind::Complex
        } else if ty.is_float() {
            Kind::Real
        } else {
            Kind::Integer
        }
    }
}

/// Check that `a` and `b` hold the same matrix
pub fn check_equivalence(a: &Matrix, b: &Matrix) -> Result<(), Mismatch> {
    let (a, b) = if a.format != b.format {
        (to_coo(a)?, to_coo(b)?)
    } else {
        (a.clone(), b.clone())
    };

    if a.format != b.format {
        return Err(Mismatch::Format(a.format, b.format));
    }
    if a.structure != b.structure {
        return Err(Mismatch::Structure(a.structure, b.structure));
    }
    if (a.nrows, a.ncols) != (b.nrows, b.ncols) {
        return Err(Mismatch::Dimensions(a.nrows, a.ncols, b.nrows, b.ncols));
    }
    if a.nnz != b.nnz {
        return Err(Mismatch::Nnz(a.nnz, b.nnz));
    }
    if a.is_iso != b.is_iso {
        return Err(Mismatch::Iso(a.is_iso, b.is_iso));
    }

    for ((component, left), (_, right)) in a.components().into_iter().zip(b.components()) {
        check_arrays(component, left, right)?;
    }
    Ok(())
}

fn to_coo(matrix: &Matrix) -> Result<Matrix, Mismatch> {
    if matrix.format == MatrixFormat::Coor {
        Ok(matrix.clone())
    } else {
        convert(matrix, MatrixFormat::Coor).map_err(Mismatch::Conversion)
    }
}

fn check_arrays(
    component: &'static str,
    left: &TypedArray,
    right: &TypedArray,
) -> Result<(), Mismatch> {
    if left.len() != right.len() {
        return Err(Mismatch::Size {
            component,
            left: left.len(),
            right: right.len(),
        });
    }
    if left.is_empty() {
        return Ok(());
    }

    let kind = Kind::of(left.element_type());
    if kind != Kind::of(right.element_type()) {
        return Err(Mismatch::Kind {
            component,
            left: left.element_type(),
            right: right.element_type(),
        });
    }

    for index in 0..left.len() {
        let (x, y) = (left.value(index), right.value(index));
        let equal = match kind {
            Kind::Integer => x.as_u64() == y.as_u64(),
            Kind::Real => x.as_f64() == y.as_f64(),
            Kind::Complex => x.as_complex() == y.as_complex(),
        };
        if !equal {
            return Err(Mismatch::Value {
                component,
                index,
                left: x.to_string(),
                right: y.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coo() -> Matrix {
        Matrix::coo(
            3,
            3,
            TypedArray::from(vec![0u8, 1, 2]),
            TypedArray::from(vec![2u8, 1, 0]),
            TypedArray::from(vec![1.5f64, 2.0, -3.0]),
        )
    }

    #[test]
    fn test_equivalent_across_types() {
        let mut narrow = coo();
        narrow.values = TypedArray::from(vec![1.5f32, 2.0, -3.0]);
        narrow.indices_0 = TypedArray::from(vec![0u64, 1, 2]);
        assert!(check_equivalence(&coo(), &narrow).is_ok());
    }

    #[test]
    fn test_equivalent_across_formats() {
        let csr = convert(&coo(), MatrixFormat::Csr).unwrap();
        assert!(check_equivalence(&coo(), &csr).is_ok());
        assert!(check_equivalence(&csr, &coo()).is_ok());
    }

    #[test]
    fn test_header_mismatches() {
        let mut other = coo();
        other.structure = Structure::SymmetricLower;
        assert!(matches!(
            check_equivalence(&coo(), &other),
            Err(Mismatch::Structure(Structure::General, Structure::SymmetricLower))
        ));

        let mut other = coo();
        other.ncols = 4;
        assert!(matches!(
            check_equivalence(&coo(), &other),
            Err(Mismatch::Dimensions(3, 3, 3, 4))
        ));
    }

    #[test]
    fn test_value_mismatch() {
        let mut other = coo();
        other.values.write(1, 2.5f64);
        let err = check_equivalence(&coo(), &other).unwrap_err();
        assert!(matches!(err, Mismatch::Value { component: "values", index: 1, .. }));
        assert_eq!(err.to_string(), "values differ at index 1 (2 != 2.5)");
    }

    #[test]
    fn test_kind_mismatch() {
        let mut other = coo();
        other.values = TypedArray::from(vec![1i64, 2, -3]);
        assert!(matches!(
            check_equivalence(&coo(), &other),
            Err(Mismatch::Kind { component: "values", .. })
        ));
    }

    #[test]
    fn test_unconvertible_format() {
        let mut csc = coo();
        csc.format = MatrixFormat::Csc;
        assert!(matches!(
            check_equivalence(&coo(), &csc),
            Err(Mismatch::Conversion(Error::UnsupportedConversion { .. }))
        ));
    }
}
