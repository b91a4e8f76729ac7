//! Error types for sync-fs

use std::io::ErrorKind;
use std::path::PathBuf;

use crate::file::AsyncOp;

/// Result type for sync-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sync-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot stat {path} (retry: {retry}): {source}")]
    Stat {
        path: PathBuf,
        retry: bool,
        #[source]
        source: std::io::Error,
    },

    /// The cached (mtime, size) no longer matches the file on disk.
    #[error("File changed since it was opened: {path}")]
    Changed { path: PathBuf },

    #[error("No file has been opened")]
    NotOpen,

    #[error("Short read at {path}: wanted {wanted} bytes at offset {offset}")]
    ShortRead {
        path: PathBuf,
        wanted: usize,
        offset: u64,
    },

    #[error("Asynchronous {op:?} failed (retry: {retry})")]
    Async { op: AsyncOp, retry: bool },

    #[error("Change notification unavailable ({code}): {reason}")]
    NotifyUnavailable { code: i32, reason: String },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Failed to serialize {format} config for {path}: {message}")]
    ConfigSerialize {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a stat failure, classifying it as transient or permanent.
    pub fn stat(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Stat {
            path: path.into(),
            retry: is_transient(&source),
            source,
        }
    }

    /// Whether the caller may retry the same operation later.
    ///
    /// `false` means the failure is structural: the caller has to refresh its
    /// state before trying again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io { source, .. } => is_transient(source),
            Self::Stat { retry, .. } | Self::Async { retry, .. } => *retry,
            _ => false,
        }
    }
}

/// I/O error kinds worth retrying without refreshing any state.
pub fn is_transient(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::WouldBlock
            | ErrorKind::Interrupted
            | ErrorKind::TimedOut
            | ErrorKind::ResourceBusy
    )
}
