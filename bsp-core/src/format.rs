//! Matrix storage format tags

use crate::{Error, Result};
use core::fmt;
use core::str::FromStr;

/// Matrix storage formats known to binsparse
///
/// Discriminants follow the reference tag values. Only `Csr` and `Coor`
/// take part in conversion; the rest can be stored and read back as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MatrixFormat {
    /// Dense vector
    Dvec = 11,
    /// Dense matrix, row-major
    Dmatr = 12,
    /// Dense matrix, column-major
    Dmatc = 13,
    /// Compressed sparse vector
    Cvec = 14,
    /// Compressed Sparse Row
    Csr = 15,
    /// Compressed Sparse Column
    Csc = 16,
    /// Doubly compressed sparse row
    Dcsr = 17,
    /// Doubly compressed sparse column
    Dcsc = 18,
    /// Coordinate, sorted by row then column
    #[default]
    Coor = 19,
    /// Coordinate, sorted by column then row
    Cooc = 20,
}

impl MatrixFormat {
    /// Plain dense matrix, an alias of [`MatrixFormat::Dmatr`]
    pub const DMAT: MatrixFormat = MatrixFormat::Dmatr;

    /// Plain coordinate format, an alias of [`MatrixFormat::Coor`]
    pub const COO: MatrixFormat = MatrixFormat::Coor;

    const ALL: [MatrixFormat; 10] = [
        MatrixFormat::Dvec,
        MatrixFormat::Dmatr,
        MatrixFormat::Dmatc,
        MatrixFormat::Cvec,
        MatrixFormat::Csr,
        MatrixFormat::Csc,
        MatrixFormat::Dcsr,
        MatrixFormat::Dcsc,
        MatrixFormat::Coor,
        MatrixFormat::Cooc,
    ];

    /// Convert from u8 representation
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            11 => Some(MatrixFormat::Dvec),
            12 => Some(MatrixFormat::Dmatr),
            13 => Some(MatrixFormat::Dmatc),
            14 => Some(MatrixFormat::Cvec),
            15 => Some(MatrixFormat::Csr),
            16 => Some(MatrixFormat::Csc),
            17 => Some(MatrixFormat::Dcsr),
            18 => Some(MatrixFormat::Dcsc),
            19 => Some(MatrixFormat::Coor),
            20 => Some(MatrixFormat::Cooc),
            _ => None,
        }
    }

    /// Convert to u8 representation
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Format string written to metadata
    pub const fn as_str(self) -> &'static str {
        match self {
            MatrixFormat::Dvec => "DVEC",
            MatrixFormat::Dmatr => "DMAT",
            MatrixFormat::Dmatc => "DMATC",
            MatrixFormat::Cvec => "CVEC",
            MatrixFormat::Csr => "CSR",
            MatrixFormat::Csc => "CSC",
            MatrixFormat::Dcsr => "DCSR",
            MatrixFormat::Dcsc => "DCSC",
            MatrixFormat::Coor => "COO",
            MatrixFormat::Cooc => "COOC",
        }
    }

    /// Whether indices_0/indices_1 hold one entry per stored value
    pub const fn is_coordinate(self) -> bool {
        matches!(self, MatrixFormat::Coor | MatrixFormat::Cooc)
    }

    /// Whether the format carries a pointers_to_1 offsets array
    pub const fn has_pointers(self) -> bool {
        matches!(
            self,
            MatrixFormat::Csr
                | MatrixFormat::Csc
                | MatrixFormat::Dcsr
                | MatrixFormat::Dcsc
                | MatrixFormat::Cvec
        )
    }
}

impl fmt::Display for MatrixFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatrixFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DMATR" => Ok(MatrixFormat::Dmatr),
            "COOR" => Ok(MatrixFormat::Coor),
            _ => MatrixFormat::ALL
                .into_iter()
                .find(|format| format.as_str() == s)
                .ok_or_else(|| Error::UnknownFormat(s.to_string())),
        }
    }
}

impl_tag_serde!(MatrixFormat);
