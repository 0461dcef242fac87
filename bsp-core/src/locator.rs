//! `file[:dataset]` locator strings
//!
//! Command-line style locators name a file and, optionally, a group inside a
//! container file. The split happens on the last `:` so the group part never
//! contains one.

use core::fmt;

/// A file path with an optional group path inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdatasetInfo {
    pub fname: String,
    pub dataset: Option<String>,
}

impl FdatasetInfo {
    /// Split a locator on its last `:`
    ///
    /// An empty dataset after the separator is treated as no dataset.
    pub fn parse(locator: &str) -> Self {
        match locator.rfind(':') {
            Some(split) => {
                let dataset = &locator[split + 1..];
                Self {
                    fname: locator[..split].to_string(),
                    dataset: (!dataset.is_empty()).then(|| dataset.to_string()),
                }
            }
            None => Self {
                fname: locator.to_string(),
                dataset: None,
            },
        }
    }

    /// Extension of the file part, including the leading `.`
    pub fn extension(&self) -> Option<&str> {
        file_extension(&self.fname)
    }
}

impl fmt::Display for FdatasetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dataset {
            Some(dataset) => write!(f, "{}:{}", self.fname, dataset),
            None => f.write_str(&self.fname),
        }
    }
}

/// Suffix of `path` starting at its last `.`, if any
pub fn file_extension(path: &str) -> Option<&str> {
    path.rfind('.').map(|dot| &path[dot..])
}
