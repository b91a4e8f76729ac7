//! [`MemoryFs`]: an in-memory file store implementing the backend traits.
//!
//! Async requests either complete inline or, with
//! [`MemoryFs::defer_async`], wait in a queue until the test completes them
//! with [`MemoryFs::complete_next`] or [`MemoryFs::fail_next`].

use std::collections::{HashMap, VecDeque};
use std::io::{Error as IoError, ErrorKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use sync_fs::{
    AccessMode, AsyncOp, AsyncRequest, FileBackend, FileBackendFactory, FileStat, LocalPath,
    NodeKind,
};

#[derive(Debug, Clone)]
struct Entry {
    data: Vec<u8>,
    mtime: i64,
    kind: NodeKind,
}

#[derive(Debug, Default)]
struct Shared {
    entries: Mutex<HashMap<Vec<u8>, Entry>>,
    stat_errors: Mutex<HashMap<Vec<u8>, ErrorKind>>,
    pending: Mutex<VecDeque<AsyncRequest>>,
    deferred: AtomicBool,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

/// Handle to one in-memory store; clones share it.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    shared: Arc<Shared>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: &str, data: &[u8], mtime: i64) {
        self.shared.entries.lock().insert(
            path.as_bytes().to_vec(),
            Entry {
                data: data.to_vec(),
                mtime,
                kind: NodeKind::File,
            },
        );
    }

    pub fn add_dir(&self, path: &str) {
        self.shared.entries.lock().insert(
            path.as_bytes().to_vec(),
            Entry {
                data: Vec::new(),
                mtime: 0,
                kind: NodeKind::Folder,
            },
        );
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.shared
            .entries
            .lock()
            .get(path.as_bytes())
            .map(|e| e.data.clone())
    }

    /// Make every stat of `path` fail with `kind`.
    pub fn fail_stat(&self, path: &str, kind: ErrorKind) {
        self.shared.stat_errors.lock().insert(path.as_bytes().to_vec(), kind);
    }

    pub fn clear_stat_failure(&self, path: &str) {
        self.shared.stat_errors.lock().remove(path.as_bytes());
    }

    /// Queue async requests instead of completing them inline.
    pub fn defer_async(&self, deferred: bool) {
        self.shared.deferred.store(deferred, Ordering::SeqCst);
    }

    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Execute the oldest queued request. Returns false if none was queued.
    pub fn complete_next(&self) -> bool {
        let request = self.shared.pending.lock().pop_front();
        match request {
            Some(request) => {
                self.execute(request);
                true
            }
            None => false,
        }
    }

    pub fn fail_next(&self, retry: bool) -> bool {
        let request = self.shared.pending.lock().pop_front();
        match request {
            Some(request) => {
                request.fail(retry);
                true
            }
            None => false,
        }
    }

    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    fn execute(&self, request: AsyncRequest) {
        let mut entries = self.shared.entries.lock();
        let key = request.path.as_bytes().to_vec();

        match request.op {
            AsyncOp::Open => {
                if !entries.contains_key(&key) && request.access.write {
                    entries.insert(
                        key.clone(),
                        Entry {
                            data: Vec::new(),
                            mtime: 0,
                            kind: NodeKind::File,
                        },
                    );
                }
                let exists = entries.contains_key(&key);
                drop(entries);
                if exists { request.succeed(Vec::new()) } else { request.fail(false) }
            }
            AsyncOp::Read => {
                let start = request.offset as usize;
                let slice = entries
                    .get(&key)
                    .and_then(|e| e.data.get(start..start + request.len))
                    .map(<[u8]>::to_vec);
                drop(entries);
                match slice {
                    Some(data) => request.succeed(data),
                    None => request.fail(false),
                }
            }
            AsyncOp::Write => {
                let written = match entries.get_mut(&key) {
                    Some(entry) => {
                        write_into(&mut entry.data, &request.data, request.offset);
                        true
                    }
                    None => false,
                };
                drop(entries);
                if written { request.succeed(Vec::new()) } else { request.fail(false) }
            }
        }
    }

    fn dispatch(&self, request: AsyncRequest) {
        if self.shared.deferred.load(Ordering::SeqCst) {
            self.shared.pending.lock().push_back(request);
        } else {
            self.execute(request);
        }
    }
}

fn write_into(data: &mut Vec<u8>, bytes: &[u8], offset: u64) {
    let start = offset as usize;
    if data.len() < start + bytes.len() {
        data.resize(start + bytes.len(), 0);
    }
    data[start..start + bytes.len()].copy_from_slice(bytes);
}

impl FileBackendFactory for MemoryFs {
    fn new_backend(&self) -> Box<dyn FileBackend> {
        Box::new(MemoryBackend {
            fs: self.clone(),
            open: None,
        })
    }
}

/// Per-file backend over a [`MemoryFs`].
#[derive(Debug)]
pub struct MemoryBackend {
    fs: MemoryFs,
    open: Option<Vec<u8>>,
}

impl MemoryBackend {
    fn open_key(&self) -> std::io::Result<&Vec<u8>> {
        self.open
            .as_ref()
            .ok_or_else(|| IoError::new(ErrorKind::NotConnected, "file is not open"))
    }
}

impl FileBackend for MemoryBackend {
    fn stat(&mut self, path: &LocalPath) -> std::io::Result<FileStat> {
        if let Some(kind) = self.fs.shared.stat_errors.lock().get(path.as_bytes()) {
            return Err(IoError::from(*kind));
        }
        self.fs
            .shared
            .entries
            .lock()
            .get(path.as_bytes())
            .map(|e| FileStat {
                mtime: e.mtime,
                size: e.data.len() as u64,
                kind: e.kind,
            })
            .ok_or_else(|| IoError::from(ErrorKind::NotFound))
    }

    fn open(&mut self, path: &LocalPath, mode: AccessMode) -> std::io::Result<()> {
        let key = path.as_bytes().to_vec();
        {
            let mut entries = self.fs.shared.entries.lock();
            if !entries.contains_key(&key) {
                if !mode.write {
                    return Err(IoError::from(ErrorKind::NotFound));
                }
                entries.insert(
                    key.clone(),
                    Entry {
                        data: Vec::new(),
                        mtime: 0,
                        kind: NodeKind::File,
                    },
                );
            }
        }
        self.fs.shared.opens.fetch_add(1, Ordering::SeqCst);
        self.open = Some(key);
        Ok(())
    }

    fn read_at(&mut self, dst: &mut [u8], offset: u64) -> std::io::Result<()> {
        let key = self.open_key()?;
        let entries = self.fs.shared.entries.lock();
        let data = &entries.get(key).ok_or_else(|| IoError::from(ErrorKind::NotFound))?.data;
        let start = offset as usize;
        let src = data
            .get(start..start + dst.len())
            .ok_or_else(|| IoError::from(ErrorKind::UnexpectedEof))?;
        dst.copy_from_slice(src);
        Ok(())
    }

    fn write_at(&mut self, bytes: &[u8], offset: u64) -> std::io::Result<()> {
        let key = self.open_key()?.clone();
        let mut entries = self.fs.shared.entries.lock();
        let entry = entries.get_mut(&key).ok_or_else(|| IoError::from(ErrorKind::NotFound))?;
        write_into(&mut entry.data, bytes, offset);
        Ok(())
    }

    fn close(&mut self) {
        if self.open.take().is_some() {
            self.fs.shared.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn async_open(&mut self, request: AsyncRequest) {
        self.fs.dispatch(request);
    }

    fn async_read(&mut self, request: AsyncRequest) {
        self.fs.dispatch(request);
    }

    fn async_write(&mut self, request: AsyncRequest) {
        self.fs.dispatch(request);
    }
}
