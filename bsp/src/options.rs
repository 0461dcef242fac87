//! Write and read configuration

use bsp_core::DatasetOptions;
use serde_json::{Map, Value};

/// Settings for writing a matrix into a container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOptions {
    /// Chunking and compression of each component dataset
    pub dataset: DatasetOptions,
    /// Extra top-level keys merged into the `binsparse` attribute document
    pub user_json: Option<Map<String, Value>>,
}

impl WriteOptions {
    /// Set the deflate level (0-9); 0 disables compression
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.dataset = self.dataset.with_compression_level(level);
        self
    }

    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.dataset = self.dataset.with_chunk_bytes(chunk_bytes);
        self
    }

    pub fn with_user_json(mut self, user_json: Map<String, Value>) -> Self {
        self.user_json = Some(user_json);
        self
    }

    /// Attach a free-form comment, as carried over from Matrix Market files
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.user_json
            .get_or_insert_with(Map::new)
            .insert("comment".to_string(), Value::String(comment.into()));
        self
    }
}

/// Settings for reading a matrix from a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Workers used to decode each component array
    pub num_threads: usize,
}

impl ReadOptions {
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads.max(1);
        self
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            num_threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_options_default() {
        let options = WriteOptions::default();
        assert_eq!(options.dataset.compression_level, 9);
        assert_eq!(options.dataset.chunk_bytes, 1024 * 1024);
        assert!(options.user_json.is_none());
    }

    #[test]
    fn test_write_options_builder() {
        let options = WriteOptions::default()
            .with_compression_level(0)
            .with_chunk_bytes(4096)
            .with_comment("% from a test");
        assert_eq!(options.dataset.compression_level, 0);
        assert_eq!(options.dataset.chunk_bytes, 4096);
        assert_eq!(
            options.user_json.map(Value::Object),
            Some(json!({"comment": "% from a test"}))
        );
    }

    #[test]
    fn test_read_options() {
        assert!(ReadOptions::default().num_threads >= 1);
        assert_eq!(ReadOptions::default().with_num_threads(0).num_threads, 1);
        assert_eq!(ReadOptions::default().with_num_threads(6).num_threads, 6);
    }
}
