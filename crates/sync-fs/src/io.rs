//! Atomic I/O operations with file locking

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::{Error, Result};

/// Lock and durability settings for [`write_atomic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// How long to keep retrying the exclusive lock.
    pub lock_timeout: Duration,
    /// Flush file contents to disk before renaming.
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(10),
            enable_fsync: true,
        }
    }
}

const LOCK_POLL: Duration = Duration::from_millis(10);

fn lock_with_timeout(file: &fs::File, path: &Path, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(()),
            Err(_) if Instant::now() < deadline => std::thread::sleep(LOCK_POLL),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Timed out waiting for file lock"
                );
                return Err(Error::LockFailed {
                    path: path.to_path_buf(),
                });
            }
        }
    }
}

/// Write content atomically to a file with locking.
///
/// Writes a temporary sibling, then renames it over `path`, so readers see
/// either the old or the new content.
pub fn write_atomic(path: &Path, content: &[u8], robustness: RobustnessConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Same directory, so the rename stays on one filesystem.
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    let written = fill_locked(&mut temp_file, path, &temp_path, content, robustness)
        .and_then(|()| fs::rename(&temp_path, path).map_err(|e| Error::io(path, e)));
    if let Err(e) = written {
        drop(temp_file);
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            tracing::warn!(
                path = %temp_path.display(),
                error = %cleanup,
                "Failed to remove temp file"
            );
        }
        return Err(e);
    }

    tracing::debug!(path = %path.display(), bytes = content.len(), "Wrote file atomically");
    Ok(())
}

fn fill_locked(
    file: &mut fs::File,
    path: &Path,
    temp_path: &Path,
    content: &[u8],
    robustness: RobustnessConfig,
) -> Result<()> {
    lock_with_timeout(file, path, robustness.lock_timeout)?;

    file.write_all(content).map_err(|e| Error::io(temp_path, e))?;

    if robustness.enable_fsync {
        file.sync_all().map_err(|e| Error::io(temp_path, e))?;
    }

    FileExt::unlock(&*file).map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}
