//! bsp-core - binsparse matrix model and algorithms
//!
//! This crate holds the in-memory side of the binsparse interchange format:
//! typed arrays, the matrix record with its format and structure tags, and
//! the pure algorithms on top of them (format conversion, value
//! minimization, declamping, equivalence checks). File formats live in the
//! `bsp` crate and reach storage through the [`ArrayStore`] traits.

/// String-tag serde impls for the closed tag enums
macro_rules! impl_tag_serde {
    ($ty:ty) => {
        #[cfg(feature = "serde")]
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(
                &self,
                serializer: S,
            ) -> core::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(
                deserializer: D,
            ) -> core::result::Result<Self, D::Error> {
                let tag = <String as serde::Deserialize>::deserialize(deserializer)?;
                tag.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pub mod array;
pub mod convert;
pub mod declamp;
pub mod equivalence;
pub mod error;
pub mod format;
pub mod locator;
pub mod matrix;
pub mod minimize;
pub mod store;
pub mod structure;
pub mod types;

pub use array::{ArrayView, Element, TypedArray, Value};
pub use convert::convert;
pub use declamp::{declamp_array, declamp_values};
pub use equivalence::{check_equivalence, Mismatch};
pub use error::{Error, Result};
pub use format::MatrixFormat;
pub use locator::{file_extension, FdatasetInfo};
pub use matrix::Matrix;
pub use minimize::{minimize_array, minimize_values};
pub use store::{ArrayStore, ArrayStoreMut, DatasetOptions};
pub use structure::Structure;
pub use types::{pick_integer_type, ElementType};
