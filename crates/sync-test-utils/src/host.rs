//! [`FakeHost`]: scripted answers for the host probes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sync_fs::{FileSystemType, HostFs, LocalPath};

#[derive(Debug, Default)]
struct Tables {
    types: HashMap<Vec<u8>, FileSystemType>,
    short_names: HashMap<Vec<u8>, Vec<u8>>,
    compositions: Vec<(String, String)>,
    nfc_rejects: Option<char>,
}

/// Host whose filesystem types, short names and NFC behaviour are set by
/// the test. Only paths registered with [`FakeHost::mount`] exist.
#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    tables: Arc<Mutex<Tables>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `path` exist with type `fs_type`.
    pub fn mount(self, path: &str, fs_type: FileSystemType) -> Self {
        self.tables.lock().types.insert(path.as_bytes().to_vec(), fs_type);
        self
    }

    pub fn short_name(self, path: &str, short: &str) -> Self {
        self.tables
            .lock()
            .short_names
            .insert(path.as_bytes().to_vec(), short.as_bytes().to_vec());
        self
    }

    /// Replace `decomposed` with `composed` during normalization.
    pub fn compose(self, decomposed: &str, composed: &str) -> Self {
        self.tables
            .lock()
            .compositions
            .push((decomposed.to_owned(), composed.to_owned()));
        self
    }

    /// Fail normalization of any text containing `ch`.
    pub fn reject_nfc(self, ch: char) -> Self {
        self.tables.lock().nfc_rejects = Some(ch);
        self
    }
}

impl HostFs for FakeHost {
    fn fs_type(&self, path: &LocalPath) -> Option<FileSystemType> {
        self.tables.lock().types.get(path.as_bytes()).copied()
    }

    fn short_name(&self, path: &LocalPath) -> Option<LocalPath> {
        self.tables
            .lock()
            .short_names
            .get(path.as_bytes())
            .map(|s| LocalPath::from_platform_encoded(s.clone()))
    }

    fn normalize_nfc(&self, text: &str) -> Option<String> {
        let tables = self.tables.lock();
        if tables.nfc_rejects.is_some_and(|ch| text.contains(ch)) {
            return None;
        }
        let mut out = text.to_owned();
        for (from, to) in &tables.compositions {
            out = out.replace(from.as_str(), to);
        }
        Some(out)
    }
}
