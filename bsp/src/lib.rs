//! bsp - binsparse sparse matrix interchange
//!
//! Reads and writes [`Matrix`] values in two on-disk forms:
//!
//! - a chunked, optionally deflate-compressed container file where each
//!   matrix is a group of typed datasets described by a `binsparse` JSON
//!   attribute;
//! - Matrix Market text files.
//!
//! The in-memory model and the format-independent algorithms (conversion,
//! minimization, declamping, equivalence) come from `bsp-core` and are
//! re-exported here.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bsp::{convert, minimize_values, read_matrix, write_matrix, MatrixFormat, WriteOptions};
//!
//! fn example() -> bsp::Result<()> {
//!     let coo = read_matrix("graph.mtx", None)?;
//!     let csr = minimize_values(convert(&coo, MatrixFormat::Csr)?);
//!     write_matrix("graph.bsp", &csr, Some("/graphs/road"), &WriteOptions::default())?;
//!
//!     let back = read_matrix("graph.bsp", Some("/graphs/road"))?;
//!     println!("{back}");
//!     Ok(())
//! }
//! ```

/// Version written to every `binsparse` descriptor
pub const BINSPARSE_VERSION: &str = "0.1";

pub use bsp_core::{
    check_equivalence, convert, declamp_array, declamp_values, file_extension, minimize_array,
    minimize_values, pick_integer_type, ArrayStore, ArrayStoreMut, ArrayView, DatasetOptions,
    ElementType, Error, FdatasetInfo, Matrix, MatrixFormat, Mismatch, Result, Structure,
    TypedArray, Value,
};

pub mod codec;
pub mod container;
pub mod descriptor;
pub mod generate;
pub mod matrix_market;
pub mod options;

pub use codec::{
    list_matrices, read_from_store, read_matrix, read_matrix_at, read_matrix_parallel,
    write_matrix, write_matrix_at, write_to_store, MatrixSummary,
};
pub use container::{ContainerHeader, ContainerReader, ContainerWriter, Group, GroupWriter};
pub use descriptor::{Descriptor, BINSPARSE_KEY};
pub use generate::generate_coo;
pub use matrix_market::{MmFormat, MmMetadata, MmStructure, MmType};
pub use options::{ReadOptions, WriteOptions};
