//! Cached settings files
//!
//! Settings live in small TOML files, one table per section with string
//! values:
//!
//! ```toml
//! [sensors_config]
//! temperature_dht22_freq = "10"
//! ```
//!
//! [`ConfigStore`] caches each file's parsed table together with the
//! modification time it was read at and only re-reads when that time
//! changes. Writes merge into the current table and replace the file
//! atomically under an advisory lock. [`ConfigWatcher`] polls modification
//! times and tells listeners about external edits.

mod lock;
mod store;
mod watcher;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

pub use store::ConfigStore;
pub use watcher::{ConfigListener, ConfigWatcher};

/// Section holding the sensor polling periods
pub const SENSORS_SECTION: &str = "sensors_config";

/// Section holding the panel's own settings
pub const DISPLAY_SECTION: &str = "display_config";

/// Seconds each idle view page stays on screen
pub const VIEW_PERIOD_KEY: &str = "view_period";

/// Default idle page period, in seconds
pub const DEFAULT_VIEW_PERIOD: u64 = 5;

/// Parsed file content: section -> key -> value
pub type Table = BTreeMap<String, BTreeMap<String, String>>;

/// Settings errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File access failed
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// File content is not valid TOML
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// Merged table could not be serialized
    #[error("serialize: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Advisory lock could not be taken
    #[error("lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Temporary file could not be renamed over the target
    #[error("replace {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Check if the error means the file does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// One section of one file in a shared store
///
/// Handed to consumers that only care about their own keys, such as menu
/// settings and the sensor poller.
#[derive(Clone)]
pub struct ConfigSection {
    store: Arc<ConfigStore>,
    path: PathBuf,
    section: String,
}

impl ConfigSection {
    /// Create a new section handle
    pub fn new(store: Arc<ConfigStore>, path: impl Into<PathBuf>, section: &str) -> Self {
        Self {
            store,
            path: path.into(),
            section: section.to_string(),
        }
    }

    /// Backing store
    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// File path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Section name
    pub fn section(&self) -> &str {
        &self.section
    }

    /// Read one value; `None` when the file, section or key is absent
    pub fn get(&self, key: &str) -> Option<String> {
        self.store.get_value(&self.path, &self.section, key)
    }

    /// Read a positive integer, falling back to `default`
    pub fn get_u64(&self, key: &str, default: u64) -> u64 {
        parse_positive(self.get(key).as_deref()).unwrap_or(default)
    }

    /// Read an on/off flag ("0" or "false" is off, anything else or absent is on)
    pub fn get_flag(&self, key: &str) -> bool {
        self.get(key)
            .map_or(true, |value| !matches!(value.trim(), "0" | "false"))
    }

    /// Merge one key into the section
    pub fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.store
            .update_values(&self.path, &self.section, [(key, value)])
    }
}

/// Parse a positive decimal integer
pub fn parse_positive(value: Option<&str>) -> Option<u64> {
    value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|&value| value > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive(Some("10")), Some(10));
        assert_eq!(parse_positive(Some(" 7 ")), Some(7));
        assert_eq!(parse_positive(Some("0")), None);
        assert_eq!(parse_positive(Some("-3")), None);
        assert_eq!(parse_positive(Some("ten")), None);
        assert_eq!(parse_positive(None), None);
    }

    #[test]
    fn test_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let section = ConfigSection::new(
            Arc::new(ConfigStore::new()),
            dir.path().join("display_config.toml"),
            DISPLAY_SECTION,
        );
        assert_eq!(section.get_u64(VIEW_PERIOD_KEY, DEFAULT_VIEW_PERIOD), 5);
        assert!(section.get_flag("PM10"));

        section.set("PM10", "0").unwrap();
        section.set(VIEW_PERIOD_KEY, "20").unwrap();
        assert!(!section.get_flag("PM10"));
        assert_eq!(section.get_u64(VIEW_PERIOD_KEY, DEFAULT_VIEW_PERIOD), 20);
    }
}
