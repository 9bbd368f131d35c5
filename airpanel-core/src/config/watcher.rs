//! Periodic detection of external settings edits

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use log::{debug, info};

use crate::sync::lock;
use crate::timer::{RepeatTimer, TimerControl, TimerError};

/// Called with the path of a file whose modification time changed
pub type ConfigListener = Arc<dyn Fn(&Path) + Send + Sync>;

#[derive(Default)]
struct Watched {
    /// Path and the modification time last seen by the watcher
    files: Vec<(PathBuf, Option<SystemTime>)>,
    listeners: Vec<ConfigListener>,
}

impl Watched {
    /// Record new modification times and return the paths that moved
    fn changed(&mut self) -> Vec<PathBuf> {
        let mut changed = Vec::new();
        for (path, seen) in &mut self.files {
            let current = modified(path);
            if current != *seen {
                *seen = current;
                changed.push(path.clone());
            }
        }
        changed
    }
}

/// Polls settings files and notifies listeners when one changes
///
/// The watcher keeps its own record of modification times, independent of
/// the [`ConfigStore`](super::ConfigStore) cache. It never loads the files;
/// listeners read through the store, which reloads lazily.
pub struct ConfigWatcher {
    watched: Arc<Mutex<Watched>>,
    timer: RepeatTimer,
}

impl ConfigWatcher {
    /// Create a watcher polling every `period`; call [`start`](Self::start)
    /// once files and listeners are registered
    pub fn new(period: Duration) -> Result<Self, TimerError> {
        let watched = Arc::new(Mutex::new(Watched::default()));
        let timer = {
            let watched = Arc::clone(&watched);
            RepeatTimer::new("config-watch", period, move || {
                poll(&watched);
            })?
        };
        Ok(Self { watched, timer })
    }

    /// Watch `path`; its current modification time is the baseline
    pub fn watch(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let seen = modified(&path);
        debug!("watching {}", path.display());
        lock(&self.watched).files.push((path, seen));
    }

    /// Register a change listener
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&Path) + Send + Sync + 'static,
    {
        lock(&self.watched).listeners.push(Arc::new(listener));
    }

    /// Start periodic polling
    pub fn start(&self) -> Result<(), TimerError> {
        self.timer.start()?;
        info!("config watcher started ({:?})", self.timer.interval());
        Ok(())
    }

    /// Poll once on the calling thread; returns the changed paths
    pub fn check(&self) -> Vec<PathBuf> {
        poll(&self.watched)
    }

    /// The polling timer
    pub fn timer(&self) -> &dyn TimerControl {
        &self.timer
    }

    /// Stop polling
    pub fn cancel(&self) {
        self.timer.cancel();
        info!("config watcher stopped");
    }
}

fn poll(watched: &Mutex<Watched>) -> Vec<PathBuf> {
    let (changed, listeners) = {
        let mut watched = lock(watched);
        let changed = watched.changed();
        (changed, watched.listeners.clone())
    };
    for path in &changed {
        info!("{} changed", path.display());
        for listener in &listeners {
            listener(path);
        }
    }
    changed
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
