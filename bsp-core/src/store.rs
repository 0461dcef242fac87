//! Storage traits for named typed arrays
//!
//! The matrix codec only needs to read and write named arrays and string
//! attributes within one group. These traits keep it independent of the
//! container file that implements them.

use crate::{ArrayView, Result, TypedArray};

/// Per-dataset layout settings applied when an array is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetOptions {
    /// Deflate level, 0 stores chunks uncompressed
    pub compression_level: u32,
    /// Upper bound on the size of one stored chunk
    pub chunk_bytes: usize,
}

impl DatasetOptions {
    pub const DEFAULT_CHUNK_BYTES: usize = 1024 * 1024;

    /// Set the deflate level, capped at 9
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }

    /// Chunk length in elements for an array of `len` elements of `width`
    /// bytes; never zero
    pub fn chunk_len(&self, len: usize, width: usize) -> usize {
        (self.chunk_bytes / width.max(1)).min(len).max(1)
    }
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            compression_level: 9,
            chunk_bytes: Self::DEFAULT_CHUNK_BYTES,
        }
    }
}

/// Read access to the arrays and attributes of one group
pub trait ArrayStore {
    /// Read the array stored under `name`
    fn read_array(&self, name: &str) -> Result<TypedArray>;

    /// Read the array stored under `name` using up to `num_threads` workers
    ///
    /// The result must equal [`ArrayStore::read_array`]. The default
    /// implementation reads serially.
    fn read_array_parallel(&self, name: &str, num_threads: usize) -> Result<TypedArray> {
        let _ = num_threads;
        self.read_array(name)
    }

    fn has_array(&self, name: &str) -> bool;

    /// String attribute `name`, or `None` when the group does not carry it
    fn attribute(&self, name: &str) -> Result<Option<String>>;
}

/// Write access to the arrays and attributes of one group
pub trait ArrayStoreMut {
    fn write_array(&mut self, name: &str, array: ArrayView<'_>, options: &DatasetOptions)
        -> Result<()>;

    fn set_attribute(&mut self, name: &str, value: &str) -> Result<()>;
}
