//! Crash-safe whole-file JSON persistence.
//!
//! Writes go to a temp file in the target's directory, are fsynced, then
//! renamed over the target. Readers therefore see either the old or the new
//! document, never a torn one. The directory is created owner-only (0700)
//! and the final file is owner read/write only (0600).

use std::io;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

#[cfg(unix)]
const DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Read a JSON document, falling back to `T::default()` when the file is
/// missing, unreadable or malformed.
pub async fn read_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match fs::read(path).await {
        Ok(bytes) => decode_or_default(path, &bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => T::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read data file, using empty collection");
            T::default()
        }
    }
}

/// Read a JSON document that is about to be rewritten.
///
/// A missing or malformed file still yields `T::default()`, but any other
/// I/O error is returned so the caller does not overwrite data it could not
/// read.
pub async fn read_json_for_update<T>(path: &Path) -> io::Result<T>
where
    T: DeserializeOwned + Default,
{
    match fs::read(path).await {
        Ok(bytes) => Ok(decode_or_default(path, &bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e),
    }
}

fn decode_or_default<T>(path: &Path, bytes: &[u8]) -> T
where
    T: DeserializeOwned + Default,
{
    match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "data file is corrupt, using empty collection");
            T::default()
        }
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub async fn write_json<T>(path: &Path, value: &T) -> Result<(), crate::errors::ServiceError>
where
    T: Serialize + ?Sized,
{
    let data = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &data).await?;
    Ok(())
}

/// Atomically replace `path` with `bytes`.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    stage(path, bytes).await?.commit().await
}

/// A fully written and fsynced temp file that has not replaced its target yet.
///
/// Dropping it without `commit` or `discard` removes the temp file, so a
/// save whose future is cancelled midway leaves nothing behind.
#[derive(Debug)]
pub struct StagedFile {
    tmp_path: PathBuf,
    final_path: PathBuf,
    armed: bool,
}

/// Write `bytes` to a fresh temp file next to `path` and flush it to disk.
pub async fn stage(path: &Path, bytes: &[u8]) -> io::Result<StagedFile> {
    let dir = parent_dir(path);
    ensure_private_dir(&dir).await?;

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target path has no file name"))?
        .to_string_lossy();
    let staged = StagedFile {
        tmp_path: dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4())),
        final_path: path.to_path_buf(),
        armed: true,
    };

    write_synced(&staged.tmp_path, bytes).await?;
    debug!(tmp = %staged.tmp_path.display(), len = bytes.len(), "staged data file");
    Ok(staged)
}

impl StagedFile {
    pub fn tmp_path(&self) -> &Path {
        &self.tmp_path
    }

    /// Rename over the target and restrict its permissions.
    pub async fn commit(mut self) -> io::Result<()> {
        fs::rename(&self.tmp_path, &self.final_path).await?;
        self.armed = false;
        set_private_file(&self.final_path).await?;
        sync_dir(&parent_dir(&self.final_path)).await;
        Ok(())
    }

    /// Drop the staged data, leaving the target untouched.
    pub async fn discard(mut self) -> io::Result<()> {
        self.armed = false;
        match fs::remove_file(&self.tmp_path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.tmp_path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.tmp_path.display(), error = %e, "failed to remove temp file");
            }
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

async fn write_synced(tmp_path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut opts = fs::OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    opts.mode(FILE_MODE);

    let mut file = opts.open(tmp_path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

async fn ensure_private_dir(dir: &Path) -> io::Result<()> {
    if fs::metadata(dir).await.is_ok() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);
    builder.create(dir).await
}

#[cfg(unix)]
async fn set_private_file(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(FILE_MODE)).await
}

#[cfg(not(unix))]
async fn set_private_file(_path: &Path) -> io::Result<()> {
    Ok(())
}

// Best effort: persists the rename itself on filesystems that need it.
#[cfg(unix)]
async fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir).await {
        if let Err(e) = handle.sync_all().await {
            debug!(dir = %dir.display(), error = %e, "directory fsync failed");
        }
    }
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) {}
