//! Matrix structure tags (symmetry and stored triangle)

use crate::{Error, Result};
use core::fmt;
use core::str::FromStr;

/// Symmetry structure of a stored matrix
///
/// Non-general structures store a single triangle; the other half is implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Structure {
    #[default]
    General = 99,
    SymmetricLower = 100,
    SymmetricUpper = 101,
    HermitianLower = 102,
    HermitianUpper = 103,
    SkewSymmetricLower = 104,
    SkewSymmetricUpper = 105,
}

impl Structure {
    const ALL: [Structure; 7] = [
        Structure::General,
        Structure::SymmetricLower,
        Structure::SymmetricUpper,
        Structure::HermitianLower,
        Structure::HermitianUpper,
        Structure::SkewSymmetricLower,
        Structure::SkewSymmetricUpper,
    ];

    /// Convert from u8 representation
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            99 => Some(Structure::General),
            100 => Some(Structure::SymmetricLower),
            101 => Some(Structure::SymmetricUpper),
            102 => Some(Structure::HermitianLower),
            103 => Some(Structure::HermitianUpper),
            104 => Some(Structure::SkewSymmetricLower),
            105 => Some(Structure::SkewSymmetricUpper),
            _ => None,
        }
    }

    /// Convert to u8 representation
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Structure::General => "general",
            Structure::SymmetricLower => "symmetric_lower",
            Structure::SymmetricUpper => "symmetric_upper",
            Structure::HermitianLower => "hermitian_lower",
            Structure::HermitianUpper => "hermitian_upper",
            Structure::SkewSymmetricLower => "skew_symmetric_lower",
            Structure::SkewSymmetricUpper => "skew_symmetric_upper",
        }
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Structure {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Structure::ALL
            .into_iter()
            .find(|structure| structure.as_str() == s)
            .ok_or_else(|| Error::UnknownStructure(s.to_string()))
    }
}

impl_tag_serde!(Structure);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_strings() {
        for structure in Structure::ALL {
            assert_eq!(structure.as_str().parse::<Structure>().ok(), Some(structure));
            assert_eq!(Structure::from_u8(structure.to_u8()), Some(structure));
        }
        assert_eq!(Structure::default(), Structure::General);
    }

    #[test]
    fn test_unknown_structure() {
        // Matrix Market spellings are mapped by the text codec, not here
        assert!(matches!(
            "symmetric".parse::<Structure>(),
            Err(Error::UnknownStructure(s)) if s == "symmetric"
        ));
        assert_eq!(Structure::from_u8(106), None);
    }
}
