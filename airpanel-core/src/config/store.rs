//! Settings cache with atomic persistence

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use log::{debug, error, trace, warn};
use tempfile::NamedTempFile;

use super::lock::FileLock;
use super::{ConfigError, Table};
use crate::sync::lock;

/// Mode of a settings file created by the store
const NEW_FILE_MODE: u32 = 0o644;

/// Cached content of one file
#[derive(Debug)]
struct CacheEntry {
    path: PathBuf,
    /// Modification time the table was read at
    modified: Option<SystemTime>,
    table: Table,
}

impl CacheEntry {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            modified: None,
            table: Table::new(),
        }
    }

    fn is_loaded(&self) -> bool {
        self.modified.is_some()
    }
}

/// Cached, lock-protected settings store
///
/// Entries are created lazily per absolute path and live as long as the
/// store. Each entry has its own lock, so files do not serialize each
/// other.
#[derive(Default)]
pub struct ConfigStore {
    entries: Mutex<HashMap<PathBuf, Arc<Mutex<CacheEntry>>>>,
    /// Number of times a file was actually read from disk
    reads: AtomicU64,
}

impl ConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one value
    ///
    /// Served from the cache while the file's modification time matches
    /// the cached one. Returns `None` when the section or key is missing.
    /// If the file cannot be read, the previously cached table is used.
    pub fn get_value(&self, path: &Path, section: &str, key: &str) -> Option<String> {
        let entry = self.entry(path);
        let mut entry = lock(&entry);

        self.refresh_or_report(&mut entry);

        let value = entry
            .table
            .get(section)
            .and_then(|values| values.get(key))
            .cloned();
        if value.is_none() {
            debug!("{}: [{}] {} not set", entry.path.display(), section, key);
        }
        value
    }

    /// Copy of a whole section
    pub fn get_section(&self, path: &Path, section: &str) -> Option<std::collections::BTreeMap<String, String>> {
        let entry = self.entry(path);
        let mut entry = lock(&entry);
        self.refresh_or_report(&mut entry);
        entry.table.get(section).cloned()
    }

    /// Merge `values` into `section` and atomically replace the file
    ///
    /// Holds the entry lock and the advisory `<file>.lock` for the whole
    /// read-merge-write-rename sequence. A missing file is created. On
    /// success the cache is updated to the written content and timestamp.
    pub fn update_values<I, K, V>(
        &self,
        path: &Path,
        section: &str,
        values: I,
    ) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entry = self.entry(path);
        let mut entry = lock(&entry);
        let _file_lock = FileLock::acquire(&FileLock::path_for(&entry.path))?;

        let mut table = match self.refresh(&mut entry) {
            Ok(()) => entry.table.clone(),
            Err(e) if e.is_not_found() => {
                debug!("{} does not exist, creating", entry.path.display());
                Table::new()
            }
            Err(e) => return Err(e),
        };

        let merged = table.entry(section.to_string()).or_default();
        for (key, value) in values {
            merged.insert(key.into(), value.into());
        }

        let text = toml::to_string(&table)?;
        let modified = write_atomic(&entry.path, &text)?;
        entry.table = table;
        entry.modified = Some(modified);
        debug!("{}: [{}] updated", entry.path.display(), section);
        Ok(())
    }

    /// Check if the cached table of `path` matches the file on disk
    pub fn is_cache_current(&self, path: &Path) -> bool {
        let entry = self.entry(path);
        let entry = lock(&entry);
        entry.is_loaded() && modified(&entry.path).ok() == entry.modified
    }

    /// Modification time the cached table of `path` was read at
    pub fn cached_modified(&self, path: &Path) -> Option<SystemTime> {
        let entry = self.entry(path);
        let modified = lock(&entry).modified;
        modified
    }

    /// Number of files read from disk since the store was created
    pub fn disk_reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    fn entry(&self, path: &Path) -> Arc<Mutex<CacheEntry>> {
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let mut entries = lock(&self.entries);
        Arc::clone(
            entries
                .entry(path.clone())
                .or_insert_with(|| Arc::new(Mutex::new(CacheEntry::new(path)))),
        )
    }

    /// Refresh for a read; failures are logged and the cached table stays
    fn refresh_or_report(&self, entry: &mut CacheEntry) {
        if let Err(e) = self.refresh(entry) {
            if entry.is_loaded() {
                error!("{}; keeping cached settings", e);
            } else if e.is_not_found() {
                debug!("{} does not exist", entry.path.display());
            } else {
                error!("{}", e);
            }
        }
    }

    /// Re-read the file if its modification time moved
    ///
    /// On failure the entry keeps its previous table and timestamp.
    fn refresh(&self, entry: &mut CacheEntry) -> Result<(), ConfigError> {
        let current = modified(&entry.path)?;
        if entry.modified == Some(current) {
            trace!("{}: cache hit", entry.path.display());
            return Ok(());
        }
        if entry.is_loaded() {
            debug!("{}: modified on disk, reloading", entry.path.display());
        }

        let text =
            fs::read_to_string(&entry.path).map_err(|e| ConfigError::io(&entry.path, e))?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        entry.table = parse(&entry.path, &text)?;
        entry.modified = Some(current);
        Ok(())
    }
}

fn modified(path: &Path) -> Result<SystemTime, ConfigError> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|e| ConfigError::io(path, e))
}

/// Write `text` to a temporary file next to `path` and rename it over
/// `path`; returns the new modification time
fn write_atomic(path: &Path, text: &str) -> Result<SystemTime, ConfigError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(|e| ConfigError::io(dir, e))?;
    // The temp file is created 0600; the replaced file keeps its own mode
    let permissions = match fs::metadata(path) {
        Ok(metadata) => metadata.permissions(),
        Err(_) => fs::Permissions::from_mode(NEW_FILE_MODE),
    };
    file.as_file()
        .set_permissions(permissions)
        .and_then(|()| file.write_all(text.as_bytes()))
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| ConfigError::io(file.path(), e))?;
    file.persist(path).map_err(|e| ConfigError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    modified(path)
}

/// Parse TOML into string tables
///
/// Scalars are kept in their string form. Values that are not scalars, and
/// keys outside any section, are skipped.
fn parse(path: &Path, text: &str) -> Result<Table, ConfigError> {
    let raw: toml::Table = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut table = Table::new();
    for (name, value) in raw {
        let toml::Value::Table(values) = value else {
            warn!("{}: ignoring {} outside any section", path.display(), name);
            continue;
        };
        let section = table.entry(name.clone()).or_default();
        for (key, value) in values {
            let text = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Datetime(d) => d.to_string(),
                toml::Value::Array(_) | toml::Value::Table(_) => {
                    warn!("{}: ignoring nested value [{}] {}", path.display(), name, key);
                    continue;
                }
            };
            section.insert(key, text);
        }
    }
    Ok(table)
}
