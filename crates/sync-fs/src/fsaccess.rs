//! Entry point tying the naming layer to the host filesystem.
//!
//! [`FileSystemAccess`] owns the platform capability, the host probes and
//! the backend factories, and hands out [`FileAccess`] and [`DirNotify`]
//! instances configured from one [`FsConfig`].

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::codec;
use crate::config::FsConfig;
use crate::file::{FileAccess, FileBackendFactory, StdBackendFactory};
use crate::fstype::FileSystemType;
use crate::notify::{DirNotify, Notification, NotificationDeque, NullWatch, WatchBackend};
use crate::path::LocalPath;
use crate::platform::{HostFs, NativePlatform, PathPlatform, Separator, StdHost};
use crate::waiter::{Clock, Waiter};
use crate::Result;

/// Creates the watch backend for a newly watched root.
pub trait WatchFactory: Send + Sync {
    fn new_watch(&self, base_path: &LocalPath) -> Box<dyn WatchBackend>;
}

impl WatchFactory for NullWatch {
    fn new_watch(&self, _base_path: &LocalPath) -> Box<dyn WatchBackend> {
        Box::new(NullWatch)
    }
}

pub struct FileSystemAccess {
    platform: Arc<dyn PathPlatform>,
    host: Arc<dyn HostFs>,
    files: Arc<dyn FileBackendFactory>,
    watches: Arc<dyn WatchFactory>,
    waiter: Option<Arc<Waiter>>,
    config: FsConfig,
    tmp_counter: AtomicU64,
}

impl FileSystemAccess {
    /// Portable defaults: native paths, `std::fs` I/O, no watcher.
    pub fn new(config: FsConfig) -> Self {
        Self {
            platform: Arc::new(NativePlatform::default()),
            host: Arc::new(StdHost::new(NativePlatform::default())),
            files: Arc::new(StdBackendFactory),
            watches: Arc::new(NullWatch),
            waiter: None,
            config,
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn with_platform(mut self, platform: Arc<dyn PathPlatform>) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_host(mut self, host: Arc<dyn HostFs>) -> Self {
        self.host = host;
        self
    }

    pub fn with_file_backends(mut self, files: Arc<dyn FileBackendFactory>) -> Self {
        self.files = files;
        self
    }

    pub fn with_watches(mut self, watches: Arc<dyn WatchFactory>) -> Self {
        self.watches = watches;
        self
    }

    /// Waiter notified by every async completion.
    pub fn with_waiter(mut self, waiter: Arc<Waiter>) -> Self {
        self.waiter = Some(waiter);
        self
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn separator(&self) -> Separator {
        self.platform.separator()
    }

    pub fn platform(&self) -> &dyn PathPlatform {
        self.platform.as_ref()
    }

    /// Filesystem type of `path`, or of its nearest existing ancestor.
    ///
    /// Falls back to `Unknown` once no ancestor is left.
    pub fn local_fs_type(&self, path: &LocalPath) -> FileSystemType {
        if let Some(forced) = self.config.fs_type_override {
            return forced;
        }

        let sep = self.separator();
        let mut current = path.clone();

        loop {
            if current.is_empty() {
                return FileSystemType::Unknown;
            }
            if let Some(fs_type) = self.host.fs_type(&current) {
                return fs_type;
            }

            current.trim_non_drive_trailing_separator(sep);
            let index = current.leaf_name_byte_index(sep);
            if index == 0 || index >= current.len() {
                return FileSystemType::Unknown;
            }
            current.truncate(index);
            if current.len() > 1 {
                current.trim_non_drive_trailing_separator(sep);
            }
        }
    }

    pub fn fs_type_label(&self, path: &LocalPath) -> &'static str {
        self.local_fs_type(path).label()
    }

    /// Local leaf name for `remote` inside `parent`, escaped for the
    /// parent's filesystem.
    pub fn local_name(&self, remote: &[u8], parent: &LocalPath) -> LocalPath {
        let fs_type = self.local_fs_type(parent);
        let escaped = codec::escape(remote, fs_type);
        if escaped != remote {
            tracing::debug!(
                fs_type = %fs_type,
                escaped = %String::from_utf8_lossy(&escaped),
                "Escaped remote name"
            );
        }
        LocalPath::from_platform_encoded(escaped)
    }

    /// Remote name of the leaf of `path`.
    pub fn remote_name(&self, path: &LocalPath) -> Vec<u8> {
        path.leaf_name(self.separator()).to_name()
    }

    pub fn canonicalize(&self, name: &[u8]) -> Vec<u8> {
        codec::canonicalize(name)
    }

    /// NFC-normalize `name`; empty if it cannot be normalized.
    pub fn normalize(&self, name: &[u8]) -> Vec<u8> {
        let normalized = codec::normalize(name, |s| self.host.normalize_nfc(s));
        if normalized.is_empty() && !name.is_empty() {
            tracing::warn!(name = %String::from_utf8_lossy(name), "Name could not be normalized");
        }
        normalized
    }

    /// Compare two paths with the case rule of the filesystem holding `at`.
    pub fn compare_at(&self, lhs: &LocalPath, rhs: &LocalPath, at: &LocalPath) -> CmpOrdering {
        lhs.fs_compare(rhs, self.local_fs_type(at))
    }

    pub fn short_name(&self, path: &LocalPath) -> Option<LocalPath> {
        let short = self.host.short_name(path);
        if let Some(short) = &short {
            tracing::debug!(path = %path, short = %short, "Resolved short name");
        }
        short
    }

    pub fn extended_length(&self, path: &LocalPath) -> LocalPath {
        self.platform.extended_length(path)
    }

    /// Fresh temporary leaf name, unique within this process.
    pub fn tmp_name_local(&self) -> LocalPath {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        LocalPath::from_path(format!(".getxfer.{}.{}.tmp", std::process::id(), n))
    }

    pub fn new_file_access(&self) -> FileAccess {
        FileAccess::new(self.files.new_backend(), self.waiter.clone(), self.config.nonblocking_open)
    }

    pub fn new_dir_notify(&self, base_path: LocalPath, ignore_path: LocalPath) -> DirNotify {
        let watch = self.watches.new_watch(&base_path);
        DirNotify::new(base_path, ignore_path, watch)
    }

    /// Read with the configured padding.
    pub fn read(&self, file: &mut FileAccess, len: usize, offset: u64) -> Result<Vec<u8>> {
        file.read(len, self.config.read_padding, offset)
    }

    /// Next notification whose debounce window has passed.
    pub fn next_notification(
        &self,
        queue: &NotificationDeque,
        clock: &dyn Clock,
    ) -> Option<Notification> {
        queue.pop_ready(clock.ticks(), self.config.notify_delay_ds)
    }
}

impl Default for FileSystemAccess {
    fn default() -> Self {
        Self::new(FsConfig::default())
    }
}

impl std::fmt::Debug for FileSystemAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystemAccess")
            .field("platform", &self.platform)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
