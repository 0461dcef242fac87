//! Error types for binsparse operations

use crate::{ElementType, MatrixFormat};
use thiserror::Error;

/// Errors that can occur while building, converting or persisting matrices
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying file or stream failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata document could not be parsed or serialized
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Buffer allocation failed
    #[error("failed to allocate {len} elements of type {ty}")]
    Allocation { len: usize, ty: ElementType },

    /// Operation requires a different element type
    #[error("expected {expected} array, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: ElementType,
    },

    #[error("unknown element type tag \"{0}\"")]
    UnknownType(String),

    #[error("unknown matrix format \"{0}\"")]
    UnknownFormat(String),

    #[error("unknown matrix structure \"{0}\"")]
    UnknownStructure(String),

    /// Conversion precondition was violated
    #[error("conversion error: {0}")]
    Conversion(String),

    /// No conversion path exists between the two formats
    #[error("conversion from {from} to {to} is not supported")]
    UnsupportedConversion { from: MatrixFormat, to: MatrixFormat },

    /// Matrix record breaks a layout invariant
    #[error("invalid matrix: {0}")]
    InvalidMatrix(String),

    /// The "binsparse" metadata document is missing or malformed
    #[error("invalid binsparse metadata: {0}")]
    InvalidMetadata(String),

    /// Container file is corrupt or was not written by this library
    #[error("invalid container: {0}")]
    InvalidContainer(String),

    #[error("group \"{0}\" not found in container")]
    MissingGroup(String),

    #[error("dataset \"{name}\" not found in group \"{group}\"")]
    MissingDataset { group: String, name: String },

    /// Malformed Matrix Market input or unsupported output request
    #[error("Matrix Market error at line {line}: {message}")]
    MatrixMarket { line: usize, message: String },

    /// Path extension does not name a known file kind
    #[error("unsupported file extension for \"{0}\"")]
    UnsupportedExtension(String),
}

/// Result type for binsparse operations
pub type Result<T> = std::result::Result<T, Error>;
