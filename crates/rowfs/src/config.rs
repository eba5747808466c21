//! Store configuration.
//!
//! Loaded from TOML or built in code:
//!
//! ```toml
//! default_chunk_size = 8192
//! busy_timeout_ms = 5000
//! list_page_size = 128
//! journal_mode = "wal"
//! ```
//!
//! Every field is optional; missing fields take the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FsError, FsResult};

/// Chunk size used by [`crate::Store::put`] unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Default SQLite busy timeout.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Page size used when a [`crate::DirLister`] is driven as an iterator.
pub const DEFAULT_LIST_PAGE_SIZE: usize = 128;

/// Configuration for opening a [`crate::Store`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Chunk size for writes that don't name one.
    pub default_chunk_size: usize,

    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout_ms: u64,

    /// Entries fetched per query when iterating a directory.
    pub list_page_size: usize,

    /// SQLite journal mode (e.g. "wal", "delete"); left untouched when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_mode: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: DEFAULT_CHUNK_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
            journal_mode: None,
        }
    }
}

impl StoreConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> FsResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| FsError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> FsResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Set the default chunk size.
    pub fn with_default_chunk_size(mut self, size: usize) -> Self {
        self.default_chunk_size = size;
        self
    }

    /// Set the busy timeout in milliseconds.
    pub fn with_busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    /// Set the iterator page size.
    pub fn with_list_page_size(mut self, size: usize) -> Self {
        self.list_page_size = size;
        self
    }

    /// Set the journal mode.
    pub fn with_journal_mode(mut self, mode: impl Into<String>) -> Self {
        self.journal_mode = Some(mode.into());
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Reject values the store cannot work with.
    pub fn validate(&self) -> FsResult<()> {
        if self.default_chunk_size == 0 {
            return Err(FsError::config("default_chunk_size must be greater than 0"));
        }
        if self.list_page_size == 0 {
            return Err(FsError::config("list_page_size must be greater than 0"));
        }
        if let Some(mode) = &self.journal_mode {
            let known = ["delete", "truncate", "persist", "memory", "wal", "off"];
            if !known.contains(&mode.to_ascii_lowercase().as_str()) {
                return Err(FsError::config(format!("unknown journal_mode {mode:?}")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = StoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.default_chunk_size, 8192);
    }

    #[test]
    fn test_partial_toml() {
        let config = StoreConfig::from_toml_str(
            r#"
            default_chunk_size = 32
            journal_mode = "WAL"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_chunk_size, 32);
        assert_eq!(config.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(config.journal_mode.as_deref(), Some("WAL"));
    }

    #[test]
    fn test_rejects_zero_sizes() {
        let err = StoreConfig::from_toml_str("default_chunk_size = 0").unwrap_err();
        assert!(matches!(err, FsError::Config(_)));

        let err = StoreConfig::new().with_list_page_size(0).validate().unwrap_err();
        assert!(matches!(err, FsError::Config(_)));
    }

    #[test]
    fn test_rejects_unknown_journal_mode() {
        let err = StoreConfig::new()
            .with_journal_mode("sideways")
            .validate()
            .unwrap_err();
        assert!(matches!(err, FsError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rowfs.toml");
        std::fs::write(&path, "busy_timeout_ms = 250\nlist_page_size = 2\n").unwrap();

        let config = StoreConfig::load(&path).unwrap();
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
        assert_eq!(config.list_page_size, 2);

        let missing = StoreConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, FsError::Io(_)));
    }
}
