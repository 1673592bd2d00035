//! Atomic persistence for the backing file
//!
//! Commits write the full entry set to a temporary file in the store's
//! directory and rename it over the backing file; an in-place rewrite is
//! never performed, so a concurrent reader sees either the pre- or the
//! post-commit content, never a partial file. Writers serialize on an
//! advisory lock taken with a non-blocking probe; contention fails closed.
//! A losing writer's temporary file is discarded on drop.

use crate::config::Config;
use crate::store::Store;
use crate::{HopError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Exclusive advisory lock over the read-modify-write-commit window.
///
/// Released unconditionally when dropped, on every exit path.
pub struct StoreLock {
    file: File,
}

impl StoreLock {
    /// Probe the lock without blocking. Contention is [`HopError::StoreLocked`].
    pub fn acquire(data_path: &Path) -> Result<Self> {
        let lock_path = sidecar_path(data_path, ".lock");
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        file.try_lock_exclusive().map_err(|_| HopError::StoreLocked)?;
        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Write the full store atomically over the backing file.
pub fn commit(config: &Config, store: &Store) -> Result<()> {
    let data_path = &config.data_path;
    let dir = data_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(store.serialize().as_bytes())?;
    tmp.flush()?;
    // Rename is the only commit point; on failure the temp file is
    // discarded by drop rather than risking a half-written store.
    tmp.persist(data_path).map_err(|e| HopError::Io(e.error))?;

    if let Some(owner) = &config.owner {
        chown_to_owner(data_path, owner)?;
    }
    debug!("committed {} entries to {}", store.len(), data_path.display());
    Ok(())
}

/// Ownership guard: operating on another user's store file is a silent
/// no-op unless an owner override is configured. A missing file belongs to
/// whoever creates it.
#[cfg(unix)]
pub fn caller_owns_store(config: &Config) -> bool {
    use std::os::unix::fs::MetadataExt;
    if config.owner.is_some() {
        return true;
    }
    match std::fs::metadata(&config.data_path) {
        Ok(meta) => meta.uid() == unsafe { libc::geteuid() },
        Err(_) => true,
    }
}

#[cfg(not(unix))]
pub fn caller_owns_store(_config: &Config) -> bool {
    true
}

/// Chown the data file to the configured owner, for privilege-elevated
/// callers writing on behalf of an unprivileged user.
#[cfg(unix)]
fn chown_to_owner(path: &Path, owner: &str) -> Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let name =
        CString::new(owner).map_err(|_| HopError::UnknownOwner(owner.to_string()))?;
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| HopError::Io(std::io::ErrorKind::InvalidInput.into()))?;
    unsafe {
        let pw = libc::getpwnam(name.as_ptr());
        if pw.is_null() {
            return Err(HopError::UnknownOwner(owner.to_string()));
        }
        if libc::chown(c_path.as_ptr(), (*pw).pw_uid, (*pw).pw_gid) != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn chown_to_owner(_path: &Path, _owner: &str) -> Result<()> {
    Ok(())
}

/// Sibling file next to the data file: `<data><suffix>`.
pub(crate) fn sidecar_path(data_path: &Path, suffix: &str) -> PathBuf {
    let mut name = data_path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
