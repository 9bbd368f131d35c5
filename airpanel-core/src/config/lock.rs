//! Cross-process advisory file lock

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use log::{trace, warn};

use super::ConfigError;

/// Exclusive `flock` held until dropped
pub(crate) struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Open (creating if needed) and lock `path`, blocking until granted
    pub(crate) fn acquire(path: &Path) -> Result<Self, ConfigError> {
        let lock_error = |source| ConfigError::Lock {
            path: path.to_path_buf(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(lock_error)?;
        loop {
            match flock(&file, libc::LOCK_EX) {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(lock_error(e)),
            }
        }
        trace!("locked {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Sibling lock file for a settings file: `<file>.lock`
    pub(crate) fn path_for(target: &Path) -> PathBuf {
        let mut name = target.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = flock(&self.file, libc::LOCK_UN) {
            warn!("unlock {}: {}", self.path.display(), e);
        }
    }
}

#[allow(unsafe_code)]
fn flock(file: &File, operation: libc::c_int) -> io::Result<()> {
    // SAFETY: the descriptor is owned by `file` and stays open for the call
    let rc = unsafe { libc::flock(file.as_raw_fd(), operation) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
