//! Format conversion between coordinate and compressed layouts
//!
//! Row-sorted COO is the hub: CSR converts to COO directly, and any other
//! pair is routed through COO. Pairs without an algorithm report
//! [`Error::UnsupportedConversion`].

use crate::array::{Element, Value};
use crate::{pick_integer_type, Error, Matrix, MatrixFormat, Result, TypedArray};
use tracing::debug;

/// Convert `matrix` into `target` format, returning a new matrix
pub fn convert(matrix: &Matrix, target: MatrixFormat) -> Result<Matrix> {
    if matrix.format == target {
        return Err(Error::Conversion(format!(
            "matrix is already in {target} format"
        )));
    }

    debug!(from = %matrix.format, to = %target, nnz = matrix.nnz, "converting matrix");

    if target == MatrixFormat::Coor {
        return match matrix.format {
            MatrixFormat::Csr => csr_to_coo(matrix),
            from => Err(Error::UnsupportedConversion { from, to: target }),
        };
    }

    if matrix.format != MatrixFormat::Coor {
        let intermediate = convert(matrix, MatrixFormat::Coor)?;
        return convert(&intermediate, target);
    }

    match target {
        MatrixFormat::Csr => coo_to_csr(matrix),
        to => Err(Error::UnsupportedConversion {
            from: matrix.format,
            to,
        }),
    }
}

fn csr_to_coo(matrix: &Matrix) -> Result<Matrix> {
    let index_type = pick_integer_type(matrix.nrows.max(matrix.ncols));

    if matrix.pointers_to_1.len() != matrix.nrows + 1 {
        return Err(Error::InvalidMatrix(format!(
            "CSR matrix with {} rows has {} row pointers",
            matrix.nrows,
            matrix.pointers_to_1.len()
        )));
    }

    let mut rows = TypedArray::new(matrix.nnz, index_type)?;
    match &mut rows {
        TypedArray::UInt8(data) => expand_rows(data, &matrix.pointers_to_1)?,
        TypedArray::UInt16(data) => expand_rows(data, &matrix.pointers_to_1)?,
        TypedArray::UInt32(data) => expand_rows(data, &matrix.pointers_to_1)?,
        TypedArray::UInt64(data) => expand_rows(data, &matrix.pointers_to_1)?,
        other => {
            return Err(Error::TypeMismatch {
                expected: "unsigned index",
                found: other.element_type(),
            })
        }
    }

    Ok(Matrix {
        values: matrix.values.clone(),
        indices_0: rows,
        indices_1: matrix.indices_1.to_type(index_type)?,
        pointers_to_1: TypedArray::default(),
        format: MatrixFormat::Coor,
        ..shape_of(matrix)
    })
}

/// Write row `i` into every slot spanned by `pointers[i]..pointers[i + 1]`
fn expand_rows<T: Element>(rows: &mut [T], pointers: &TypedArray) -> Result<()> {
    for row in 0..pointers.len().saturating_sub(1) {
        let start = pointers.index(row);
        let end = pointers.index(row + 1);
        if start > end || end > rows.len() {
            return Err(Error::InvalidMatrix(format!(
                "row {row} spans {start}..{end} outside of {} stored values",
                rows.len()
            )));
        }
        rows[start..end].fill(T::from_value(Value::UInt(row as u64)));
    }
    Ok(())
}

fn coo_to_csr(matrix: &Matrix) -> Result<Matrix> {
    let nrows = matrix.nrows;
    let nnz = matrix.nnz;

    // offsets run up to nnz, which can exceed the value count of iso matrices
    let index_type = pick_integer_type(matrix.nrows.max(matrix.ncols).max(nnz));

    if matrix.indices_0.len() != nnz {
        return Err(Error::InvalidMatrix(format!(
            "COO matrix has {} row indices for {nnz} nnz",
            matrix.indices_0.len()
        )));
    }

    let mut pointers = TypedArray::new(nrows + 1, index_type)?;
    let mut row = 0;

    for c in 0..nnz {
        let j = matrix.indices_0.index(c);
        if j >= nrows {
            return Err(Error::InvalidMatrix(format!(
                "row index {j} out of range for {nrows} rows"
            )));
        }
        if j < row {
            return Err(Error::InvalidMatrix(format!(
                "row indices are not sorted at position {c}"
            )));
        }
        while row < j {
            pointers.write(row + 1, c as u64);
            row += 1;
        }
    }

    while row < nrows {
        pointers.write(row + 1, nnz as u64);
        row += 1;
    }

    Ok(Matrix {
        values: matrix.values.clone(),
        indices_0: TypedArray::default(),
        indices_1: matrix.indices_1.to_type(index_type)?,
        pointers_to_1: pointers,
        format: MatrixFormat::Csr,
        ..shape_of(matrix)
    })
}

fn shape_of(matrix: &Matrix) -> Matrix {
    Matrix {
        nrows: matrix.nrows,
        ncols: matrix.ncols,
        nnz: matrix.nnz,
        is_iso: matrix.is_iso,
        structure: matrix.structure,
        ..Default::default()
    }
}
