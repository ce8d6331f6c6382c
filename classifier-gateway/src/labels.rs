//! Class label table.

use std::path::Path;

use crate::error::{Error, Result};

/// Class names of the CIFAR-10 dataset, in model output order.
pub const CIFAR10_LABELS: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

/// Immutable mapping from class index to class name.
///
/// Built once at startup and shared read-only (behind an `Arc`) by everything
/// that needs to interpret backend output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// Build a table from class names in index order.
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(Error::Labels("label table is empty".to_string()));
        }
        Ok(Self { labels })
    }

    pub fn cifar10() -> Self {
        Self {
            labels: CIFAR10_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Parse a label file: one label per line, blank lines ignored.
    pub fn parse(contents: &str) -> Result<Self> {
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Labels(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&contents)
    }

    /// Load from `path` if given, otherwise fall back to the CIFAR-10 classes.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::cifar10()),
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}
