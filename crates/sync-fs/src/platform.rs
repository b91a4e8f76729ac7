//! Platform capabilities consumed by the path algebra and file access.
//!
//! Everything that differs between targets sits behind [`PathPlatform`]:
//! the separator, conversion to native paths and extended-length
//! prefixing. [`HostFs`] gathers the collaborator probes this layer calls
//! but does not implement (filesystem type, short names, NFC).

use std::path::{Path, PathBuf};

use crate::fstype::FileSystemType;
use crate::path::LocalPath;

/// The single byte separating path components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Separator(u8);

impl Separator {
    pub const SLASH: Separator = Separator(b'/');
    pub const BACKSLASH: Separator = Separator(b'\\');

    /// Separator of the compilation target.
    pub const fn native() -> Self {
        if cfg!(windows) {
            Self::BACKSLASH
        } else {
            Self::SLASH
        }
    }

    pub const fn new(byte: u8) -> Self {
        Self(byte)
    }

    pub const fn byte(self) -> u8 {
        self.0
    }
}

impl Default for Separator {
    fn default() -> Self {
        Self::native()
    }
}

/// Target-specific path handling.
pub trait PathPlatform: Send + Sync + std::fmt::Debug {
    fn separator(&self) -> Separator;

    /// Convert to a native path for I/O.
    fn to_native(&self, path: &LocalPath) -> PathBuf;

    /// Convert a native path into its local representation.
    fn from_native(&self, path: &Path) -> LocalPath;

    /// Form of `path` that lifts legacy length limits, if the platform has one.
    fn extended_length(&self, path: &LocalPath) -> LocalPath {
        path.clone()
    }
}

/// POSIX paths: raw bytes separated by `/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixPlatform;

impl PathPlatform for UnixPlatform {
    fn separator(&self) -> Separator {
        Separator::SLASH
    }

    #[cfg(unix)]
    fn to_native(&self, path: &LocalPath) -> PathBuf {
        use std::os::unix::ffi::OsStrExt;
        PathBuf::from(std::ffi::OsStr::from_bytes(path.as_bytes()))
    }

    #[cfg(not(unix))]
    fn to_native(&self, path: &LocalPath) -> PathBuf {
        PathBuf::from(path.to_path())
    }

    #[cfg(unix)]
    fn from_native(&self, path: &Path) -> LocalPath {
        use std::os::unix::ffi::OsStrExt;
        LocalPath::from_platform_encoded(path.as_os_str().as_bytes().to_vec())
    }

    #[cfg(not(unix))]
    fn from_native(&self, path: &Path) -> LocalPath {
        LocalPath::from_path(path.to_string_lossy())
    }
}

/// Windows paths: `\`-separated, drive roots, `\\?\` extended-length form.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsPlatform;

const EXTENDED_PREFIX: &[u8] = br"\\?\";

impl WindowsPlatform {
    fn is_absolute(path: &LocalPath) -> bool {
        match path.as_bytes() {
            [b'\\', ..] => true,
            [drive, b':', b'\\', ..] => drive.is_ascii_alphabetic(),
            _ => false,
        }
    }
}

impl PathPlatform for WindowsPlatform {
    fn separator(&self) -> Separator {
        Separator::BACKSLASH
    }

    fn to_native(&self, path: &LocalPath) -> PathBuf {
        PathBuf::from(path.to_path())
    }

    fn from_native(&self, path: &Path) -> LocalPath {
        LocalPath::from_path(path.to_string_lossy())
    }

    /// Prefix absolute paths with `\\?\` unless they already start with `\\`.
    fn extended_length(&self, path: &LocalPath) -> LocalPath {
        if !Self::is_absolute(path) || path.as_bytes().starts_with(br"\\") {
            return path.clone();
        }
        let mut extended = path.clone();
        extended.prepend_raw(EXTENDED_PREFIX);
        extended
    }
}

#[cfg(windows)]
pub type NativePlatform = WindowsPlatform;

#[cfg(not(windows))]
pub type NativePlatform = UnixPlatform;

/// Host probes supplied by the embedding application.
pub trait HostFs: Send + Sync {
    /// Filesystem type of an existing `path`, or `None` if it cannot be
    /// determined (typically because the path does not exist yet).
    fn fs_type(&self, path: &LocalPath) -> Option<FileSystemType>;

    /// Alternate short name of `path`, where the filesystem keeps one.
    fn short_name(&self, _path: &LocalPath) -> Option<LocalPath> {
        None
    }

    /// NFC form of `text`, or `None` if it cannot be normalized.
    fn normalize_nfc(&self, text: &str) -> Option<String> {
        Some(text.to_owned())
    }
}

/// Portable host: existing paths are of unknown type.
#[derive(Debug, Clone, Default)]
pub struct StdHost<P = NativePlatform> {
    platform: P,
}

impl<P: PathPlatform> StdHost<P> {
    pub fn new(platform: P) -> Self {
        Self { platform }
    }
}

impl<P: PathPlatform> HostFs for StdHost<P> {
    fn fs_type(&self, path: &LocalPath) -> Option<FileSystemType> {
        std::fs::symlink_metadata(self.platform.to_native(path))
            .ok()
            .map(|_| FileSystemType::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_separator_matches_target() {
        let expected = if cfg!(windows) { b'\\' } else { b'/' };
        assert_eq!(Separator::native().byte(), expected);
        assert_eq!(NativePlatform::default().separator(), Separator::native());
    }

    #[test]
    fn windows_extended_length_prefix() {
        let win = WindowsPlatform;
        let abs = LocalPath::from_path(r"C:\data\file");
        assert_eq!(win.extended_length(&abs).to_path(), r"\\?\C:\data\file");

        let rooted = LocalPath::from_path(r"\data");
        assert_eq!(win.extended_length(&rooted).to_path(), r"\\?\\data");

        let unc = LocalPath::from_path(r"\\server\share");
        assert_eq!(win.extended_length(&unc), unc);

        let relative = LocalPath::from_path(r"data\file");
        assert_eq!(win.extended_length(&relative), relative);
    }

    #[cfg(unix)]
    #[test]
    fn unix_native_round_trip_keeps_raw_bytes() {
        let unix = UnixPlatform;
        let local = LocalPath::from_platform_encoded(vec![b'/', b'a', 0xff]);
        let native = unix.to_native(&local);
        assert_eq!(unix.from_native(&native), local);
    }

    #[test]
    fn std_host_reports_unknown_for_existing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let host = StdHost::new(NativePlatform::default());
        let existing = NativePlatform::default().from_native(dir.path());
        let missing = NativePlatform::default().from_native(&dir.path().join("missing"));

        assert_eq!(host.fs_type(&existing), Some(FileSystemType::Unknown));
        assert_eq!(host.fs_type(&missing), None);
    }
}
