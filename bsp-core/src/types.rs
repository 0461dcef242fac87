//! Element type registry
//!
//! The closed set of element types a [`TypedArray`](crate::TypedArray) can hold,
//! their byte widths, and the type-tag strings used in container metadata.

use crate::{Error, Result};
use core::fmt;
use core::str::FromStr;

/// Element types supported by binsparse arrays
///
/// Discriminants match the numeric tags used by the reference binsparse
/// implementation. Complex types are stored as interleaved real/imaginary
/// pairs of the corresponding floating width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    UInt8 = 0,
    UInt16 = 1,
    UInt32 = 2,
    UInt64 = 3,
    Int8 = 4,
    Int16 = 5,
    Int32 = 6,
    Int64 = 7,
    Float32 = 8,
    Float64 = 9,
    /// Boolean stored in one byte, logically 0 or 1
    Bint8 = 10,
    Complex32 = 11,
    Complex64 = 12,
}

impl ElementType {
    /// Every element type, in tag order
    pub const ALL: [ElementType; 13] = [
        ElementType::UInt8,
        ElementType::UInt16,
        ElementType::UInt32,
        ElementType::UInt64,
        ElementType::Int8,
        ElementType::Int16,
        ElementType::Int32,
        ElementType::Int64,
        ElementType::Float32,
        ElementType::Float64,
        ElementType::Bint8,
        ElementType::Complex32,
        ElementType::Complex64,
    ];

    /// Convert from u8 representation
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ElementType::UInt8),
            1 => Some(ElementType::UInt16),
            2 => Some(ElementType::UInt32),
            3 => Some(ElementType::UInt64),
            4 => Some(ElementType::Int8),
            5 => Some(ElementType::Int16),
            6 => Some(ElementType::Int32),
            7 => Some(ElementType::Int64),
            8 => Some(ElementType::Float32),
            9 => Some(ElementType::Float64),
            10 => Some(ElementType::Bint8),
            11 => Some(ElementType::Complex32),
            12 => Some(ElementType::Complex64),
            _ => None,
        }
    }

    /// Convert to u8 representation
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Get the size in bytes of one element
    pub const fn size_bytes(self) -> usize {
        match self {
            ElementType::UInt8 | ElementType::Int8 | ElementType::Bint8 => 1,
            ElementType::UInt16 | ElementType::Int16 => 2,
            ElementType::UInt32 | ElementType::Int32 | ElementType::Float32 => 4,
            ElementType::UInt64
            | ElementType::Int64
            | ElementType::Float64
            | ElementType::Complex32 => 8,
            ElementType::Complex64 => 16,
        }
    }

    /// Type tag as written to container metadata
    pub const fn as_str(self) -> &'static str {
        match self {
            ElementType::UInt8 => "uint8",
            ElementType::UInt16 => "uint16",
            ElementType::UInt32 => "uint32",
            ElementType::UInt64 => "uint64",
            ElementType::Int8 => "int8",
            ElementType::Int16 => "int16",
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
            ElementType::Bint8 => "bint8",
            ElementType::Complex32 => "complex[float32]",
            ElementType::Complex64 => "complex[float64]",
        }
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            ElementType::UInt8 | ElementType::UInt16 | ElementType::UInt32 | ElementType::UInt64
        )
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            ElementType::Int8 | ElementType::Int16 | ElementType::Int32 | ElementType::Int64
        )
    }

    /// Unsigned, signed, or bint8
    pub const fn is_integer(self) -> bool {
        self.is_unsigned() || self.is_signed() || matches!(self, ElementType::Bint8)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, ElementType::Complex32 | ElementType::Complex64)
    }

    /// Floating type of one complex component
    pub const fn real_type(self) -> Option<ElementType> {
        match self {
            ElementType::Complex32 => Some(ElementType::Float32),
            ElementType::Complex64 => Some(ElementType::Float64),
            _ => None,
        }
    }

    /// Complex type built from pairs of this floating type
    pub const fn complex_type(self) -> Option<ElementType> {
        match self {
            ElementType::Float32 => Some(ElementType::Complex32),
            ElementType::Float64 => Some(ElementType::Complex64),
            _ => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ElementType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| Error::UnknownType(s.to_string()))
    }
}

impl_tag_serde!(ElementType);

/// Pick the narrowest unsigned type able to index up to `max_value`
///
/// Comparisons are strict, so a bound equal to a type's maximum moves to
/// the next wider type.
pub fn pick_integer_type(max_value: usize) -> ElementType {
    let max_value = max_value as u64;
    if max_value < u8::MAX as u64 {
        ElementType::UInt8
    } else if max_value < u16::MAX as u64 {
        ElementType::UInt16
    } else if max_value < u32::MAX as u64 {
        ElementType::UInt32
    } else {
        ElementType::UInt64
    }
}
