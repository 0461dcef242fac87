//! Sparse and dense matrix record

use crate::{Error, MatrixFormat, Result, Structure, TypedArray};
use core::fmt;

/// A matrix stored as up to four typed component arrays
///
/// The meaning of each component depends on `format`:
///
/// | format | indices_0 | indices_1 | pointers_to_1 |
/// |--------|-----------|-----------|---------------|
/// | COO    | row index | col index | -             |
/// | CSR    | -         | col index | row offsets   |
/// | DMAT   | -         | -         | -             |
///
/// When `is_iso` is set, `values` holds a single value shared by all `nnz`
/// stored entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matrix {
    pub values: TypedArray,
    pub indices_0: TypedArray,
    pub indices_1: TypedArray,
    pub pointers_to_1: TypedArray,
    pub nrows: usize,
    pub ncols: usize,
    pub nnz: usize,
    pub is_iso: bool,
    pub format: MatrixFormat,
    pub structure: Structure,
}

impl Matrix {
    /// Build a row-sorted COO matrix from its component arrays
    pub fn coo(
        nrows: usize,
        ncols: usize,
        rows: TypedArray,
        cols: TypedArray,
        values: TypedArray,
    ) -> Self {
        Self {
            nnz: values.len(),
            values,
            indices_0: rows,
            indices_1: cols,
            nrows,
            ncols,
            format: MatrixFormat::Coor,
            ..Default::default()
        }
    }

    /// Build a CSR matrix from row offsets, column indices and values
    pub fn csr(
        nrows: usize,
        ncols: usize,
        pointers: TypedArray,
        cols: TypedArray,
        values: TypedArray,
    ) -> Self {
        Self {
            nnz: values.len(),
            values,
            indices_1: cols,
            pointers_to_1: pointers,
            nrows,
            ncols,
            format: MatrixFormat::Csr,
            ..Default::default()
        }
    }

    /// Total bytes held by the non-empty component arrays
    pub fn nbytes(&self) -> usize {
        self.components()
            .iter()
            .map(|(_, array)| array.nbytes())
            .sum()
    }

    /// Component arrays paired with their container names
    pub fn components(&self) -> [(&'static str, &TypedArray); 4] {
        [
            ("values", &self.values),
            ("indices_0", &self.indices_0),
            ("indices_1", &self.indices_1),
            ("pointers_to_1", &self.pointers_to_1),
        ]
    }

    /// Check the layout invariants for the matrix format
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::InvalidMatrix(message));

        if self.is_iso {
            if self.values.len() != 1 {
                return invalid(format!(
                    "iso matrix must hold one value, found {}",
                    self.values.len()
                ));
            }
        } else if self.values.len() != self.nnz {
            return invalid(format!(
                "{} values stored for {} nnz",
                self.values.len(),
                self.nnz
            ));
        }

        if self.format.is_coordinate()
            && (self.indices_0.len() != self.nnz || self.indices_1.len() != self.nnz)
        {
            return invalid(format!(
                "coordinate indices have lengths {} and {}, expected {}",
                self.indices_0.len(),
                self.indices_1.len(),
                self.nnz
            ));
        }

        let major_dim = match self.format {
            MatrixFormat::Csr => Some(self.nrows),
            MatrixFormat::Csc => Some(self.ncols),
            _ => None,
        };

        if let Some(major_dim) = major_dim {
            let pointers = &self.pointers_to_1;
            if pointers.len() != major_dim + 1 {
                return invalid(format!(
                    "pointers_to_1 has {} entries, expected {}",
                    pointers.len(),
                    major_dim + 1
                ));
            }
            if pointers.index(0) != 0 || pointers.index(major_dim) != self.nnz {
                return invalid("pointers_to_1 must start at 0 and end at nnz".to_string());
            }
            if (1..pointers.len()).any(|i| pointers.index(i - 1) > pointers.index(i)) {
                return invalid("pointers_to_1 is not monotonic".to_string());
            }
            if self.indices_1.len() != self.nnz {
                return invalid(format!(
                    "indices_1 has {} entries, expected {}",
                    self.indices_1.len(),
                    self.nnz
                ));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} x {} matrix with {} nnz.",
            self.nrows, self.ncols, self.nnz
        )?;
        write!(f, "{} format with {} structure", self.format, self.structure)?;
        for (name, array) in self.components() {
            if !array.is_empty() {
                write!(
                    f,
                    "\n{} {} of type {}",
                    array.len(),
                    name,
                    array.element_type()
                )?;
            }
        }
        Ok(())
    }
}
