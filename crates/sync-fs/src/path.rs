//! Local path values and the separator-parameterized path algebra.

use std::cmp::Ordering;
use std::ops::{Deref, DerefMut};

use crate::codec;
use crate::compare::{Transform, local_compare, remote_compare};
use crate::fstype::FileSystemType;
use crate::platform::Separator;

/// A path encoded for the active local filesystem.
///
/// The bytes are opaque to this type: leaf names inside it are already
/// escaped, and escape tokens are never interpreted here. Conversion to a
/// native `PathBuf` happens at I/O boundaries through a
/// [`PathPlatform`](crate::platform::PathPlatform).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LocalPath {
    bytes: Vec<u8>,
}

impl LocalPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local path for a UTF-8 path string, taken verbatim.
    pub fn from_path(path: impl AsRef<str>) -> Self {
        Self {
            bytes: path.as_ref().as_bytes().to_vec(),
        }
    }

    /// Local leaf name for a remote `name`, escaped for `fs_type`.
    pub fn from_name(name: impl AsRef<[u8]>, fs_type: FileSystemType) -> Self {
        Self {
            bytes: codec::escape(name, fs_type),
        }
    }

    pub fn from_platform_encoded(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn platform_encoded(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Path string, with invalid UTF-8 replaced.
    pub fn to_path(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Remote name this (leaf) path encodes.
    pub fn to_name(&self) -> Vec<u8> {
        codec::unescape(&self.bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn erase(&mut self, pos: usize, count: usize) {
        let end = pos.saturating_add(count).min(self.bytes.len());
        if pos < end {
            self.bytes.drain(pos..end);
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    pub(crate) fn prepend_raw(&mut self, prefix: &[u8]) {
        self.bytes.splice(0..0, prefix.iter().copied());
    }

    pub fn ends_in_separator(&self, sep: Separator) -> bool {
        self.bytes.last() == Some(&sep.byte())
    }

    pub fn begins_with_separator(&self, sep: Separator) -> bool {
        self.bytes.first() == Some(&sep.byte())
    }

    /// Byte index where the leaf name starts.
    pub fn leaf_name_byte_index(&self, sep: Separator) -> usize {
        self.bytes
            .iter()
            .rposition(|b| *b == sep.byte())
            .map_or(0, |p| p + 1)
    }

    /// Everything after the last separator.
    pub fn leaf_name(&self, sep: Separator) -> LocalPath {
        self.subpath_from(self.leaf_name_byte_index(sep))
    }

    pub fn append(&mut self, other: &LocalPath) {
        self.bytes.extend_from_slice(&other.bytes);
    }

    /// Append `other` with exactly one separator between the two.
    ///
    /// An empty path only gets a leading separator if `separator_always` is
    /// set. A path already ending in a separator (`/`, `C:\`) gets none, and
    /// a separator at both ends of the join is merged into one.
    pub fn append_with_separator(
        &mut self,
        other: &LocalPath,
        separator_always: bool,
        sep: Separator,
    ) {
        let mut tail = other.bytes.as_slice();

        if separator_always || !self.is_empty() {
            match (self.ends_in_separator(sep), other.begins_with_separator(sep)) {
                (true, true) => tail = &tail[1..],
                (false, false) => self.bytes.push(sep.byte()),
                _ => {}
            }
        }
        self.bytes.extend_from_slice(tail);
    }

    /// Prepend `other` with exactly one separator between the two.
    pub fn prepend_with_separator(&mut self, other: &LocalPath, sep: Separator) {
        if !self.is_empty() && !self.begins_with_separator(sep) && !other.ends_in_separator(sep) {
            self.bytes.insert(0, sep.byte());
        }
        self.prepend_raw(&other.bytes);
    }

    /// Drop a trailing separator unless it terminates a drive root (`C:\`).
    pub fn trim_non_drive_trailing_separator(&mut self, sep: Separator) {
        if !self.ends_in_separator(sep) {
            return;
        }
        let len = self.bytes.len();
        if len > 1 && self.bytes[len - 2] == b':' {
            return;
        }
        self.bytes.pop();
    }

    /// First separator at or after `from`.
    pub fn find_next_separator(&self, from: usize, sep: Separator) -> Option<usize> {
        self.bytes
            .get(from..)?
            .iter()
            .position(|b| *b == sep.byte())
            .map(|p| p + from)
    }

    /// Last separator at or before `from`.
    pub fn find_prev_separator(&self, from: usize, sep: Separator) -> Option<usize> {
        let end = from.saturating_add(1).min(self.bytes.len());
        self.bytes[..end].iter().rposition(|b| *b == sep.byte())
    }

    /// Whether the bytes from `pos` to the end are exactly `other`.
    pub fn back_equal(&self, pos: usize, other: &LocalPath) -> bool {
        self.bytes.get(pos..) == Some(other.bytes.as_slice())
    }

    pub fn subpath_from(&self, pos: usize) -> LocalPath {
        Self {
            bytes: self.bytes.get(pos..).unwrap_or_default().to_vec(),
        }
    }

    pub fn subpath_to(&self, pos: usize) -> LocalPath {
        Self {
            bytes: self.bytes[..pos.min(self.bytes.len())].to_vec(),
        }
    }

    /// If `self` contains `path`, the byte index in `path` where the
    /// remaining subpath starts.
    ///
    /// Containment requires a separator boundary right after `self` (or at
    /// the end of `self`), or an exact match.
    pub fn is_containing_path_of(&self, path: &LocalPath, sep: Separator) -> Option<usize> {
        let len = self.bytes.len();
        if !path.bytes.starts_with(&self.bytes) {
            return None;
        }

        if path.bytes.len() == len {
            Some(len)
        } else if path.bytes[len] == sep.byte() {
            Some(len + 1)
        } else if len > 0 && path.bytes[len - 1] == sep.byte() {
            Some(len)
        } else {
            None
        }
    }

    /// Next component at or after `index`, skipping leading separators.
    ///
    /// On success `index` points at the separator ending the component, or
    /// at the end of the path.
    pub fn next_path_component(&self, index: &mut usize, sep: Separator) -> Option<LocalPath> {
        while *index < self.bytes.len() && self.bytes[*index] == sep.byte() {
            *index += 1;
        }

        let start = *index;
        if start >= self.bytes.len() {
            return None;
        }

        *index = self.find_next_separator(start, sep).unwrap_or(self.bytes.len());
        Some(Self {
            bytes: self.bytes[start..*index].to_vec(),
        })
    }

    /// Components from left to right.
    pub fn components(&self, sep: Separator) -> Components<'_> {
        Components {
            path: self,
            index: 0,
            sep,
        }
    }

    /// `name (N).ext`: insert ` (counter)` before the extension of the leaf.
    ///
    /// A dot inside an earlier component is not an extension.
    pub fn insert_filename_counter(&self, counter: u32, sep: Separator) -> LocalPath {
        let dot = self.bytes.iter().rposition(|b| *b == b'.');
        let last_sep = self.bytes.iter().rposition(|b| *b == sep.byte());

        let split = match dot {
            Some(dot) if last_sep.is_none_or(|s| s < dot) => dot,
            _ => self.bytes.len(),
        };

        let mut bytes = self.bytes[..split].to_vec();
        bytes.extend_from_slice(format!(" ({counter})").as_bytes());
        bytes.extend_from_slice(&self.bytes[split..]);
        Self { bytes }
    }

    /// Drive letter of a `X:` path.
    pub fn drive_letter(&self) -> Option<char> {
        let colon = self.bytes.iter().position(|b| *b == b':')?;
        let letter = *self.bytes.get(colon.checked_sub(1)?)?;
        letter.is_ascii_alphabetic().then_some(char::from(letter))
    }

    pub fn compare(&self, rhs: &LocalPath) -> Ordering {
        local_compare(&self.bytes, &rhs.bytes, Transform::Identity)
    }

    pub fn compare_remote(&self, rhs: &[u8]) -> Ordering {
        remote_compare(&self.bytes, rhs, Transform::Identity)
    }

    pub fn ci_compare(&self, rhs: &LocalPath) -> Ordering {
        local_compare(&self.bytes, &rhs.bytes, Transform::UpperCase)
    }

    pub fn ci_compare_remote(&self, rhs: &[u8]) -> Ordering {
        remote_compare(&self.bytes, rhs, Transform::UpperCase)
    }

    /// Compare under the case rule of `fs_type`.
    pub fn fs_compare(&self, rhs: &LocalPath, fs_type: FileSystemType) -> Ordering {
        local_compare(&self.bytes, &rhs.bytes, Transform::for_fs(fs_type))
    }

    pub fn fs_compare_remote(&self, rhs: &[u8], fs_type: FileSystemType) -> Ordering {
        remote_compare(&self.bytes, rhs, Transform::for_fs(fs_type))
    }

    /// Borrow the path so that its current length is restored on drop.
    pub fn length_guard(&mut self) -> LengthGuard<'_> {
        let length = self.bytes.len();
        LengthGuard { path: self, length }
    }
}

impl std::fmt::Display for LocalPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

impl From<&str> for LocalPath {
    fn from(s: &str) -> Self {
        Self::from_path(s)
    }
}

impl From<String> for LocalPath {
    fn from(s: String) -> Self {
        Self {
            bytes: s.into_bytes(),
        }
    }
}

/// Iterator over the components of a [`LocalPath`].
#[derive(Debug, Clone)]
pub struct Components<'a> {
    path: &'a LocalPath,
    index: usize,
    sep: Separator,
}

impl Iterator for Components<'_> {
    type Item = LocalPath;

    fn next(&mut self) -> Option<LocalPath> {
        self.path.next_path_component(&mut self.index, self.sep)
    }
}

/// Mutable borrow of a path that truncates it back to its original length
/// when dropped.
///
/// Appends made through the guard are undone; a path shortened through the
/// guard stays short.
#[derive(Debug)]
pub struct LengthGuard<'a> {
    path: &'a mut LocalPath,
    length: usize,
}

impl Deref for LengthGuard<'_> {
    type Target = LocalPath;

    fn deref(&self) -> &LocalPath {
        self.path
    }
}

impl DerefMut for LengthGuard<'_> {
    fn deref_mut(&mut self) -> &mut LocalPath {
        self.path
    }
}

impl Drop for LengthGuard<'_> {
    fn drop(&mut self) {
        self.path.truncate(self.length);
    }
}
