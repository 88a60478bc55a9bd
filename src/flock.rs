//! Exclusive ownership of the data directory.
//!
//! The engine assumes it is the only process mutating its data directory.
//! An advisory lock on a well-known file inside the directory turns that
//! assumption into a checked precondition: a second open of the same
//! directory fails instead of silently corrupting state.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// An exclusive advisory lock on the data directory, held for the lifetime
/// of the value. The lock file records the holder's PID for operators; it is
/// left in place on release since the OS drops the lock with the handle.
pub struct DirLock {
    _file: File,
    path: PathBuf,
}

impl DirLock {
    /// Acquire the lock, failing immediately if another process holds it.
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        try_flock(&file)?;

        writeln!(file, "{}", std::process::id())?;
        file.flush()?;

        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn try_flock(file: &File) -> Result<()> {
    use std::os::unix::io::AsRawFd;

    if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) } != 0 {
        return Err(Error::IO(format!(
            "data directory is locked by another process: {}",
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

// Advisory locking is not available here; opening still succeeds so the
// engine remains usable, just without the double-open guard.
#[cfg(not(unix))]
fn try_flock(_file: &File) -> Result<()> {
    Ok(())
}
