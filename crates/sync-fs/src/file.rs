//! Synchronous and asynchronous access to the contents of one local file.
//!
//! [`FileAccess`] caches the `(mtime, size)` seen when a file was opened.
//! In nonblocking mode the real handle is only opened around each blocking
//! operation, after checking that the cached metadata still matches; a
//! mismatch is reported as the permanent [`Error::Changed`].
//!
//! Asynchronous requests produce an [`AsyncIoContext`] that moves from
//! `Created` to `Pending` to `Finished` exactly once. The low-level
//! operations come from an injected [`FileBackend`]; its default async hooks
//! complete inline as permanent failures, so callers behave the same whether
//! or not the platform offers real asynchronous I/O.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant, UNIX_EPOCH};

use parking_lot::{Condvar, Mutex};

use crate::error::is_transient;
use crate::path::LocalPath;
use crate::platform::{NativePlatform, PathPlatform};
use crate::waiter::Waiter;
use crate::{Error, Result};

/// Clamp a timestamp into `[0, u32::MAX]`.
pub fn clamp_timestamp(t: i64) -> i64 {
    t.clamp(0, i64::from(u32::MAX))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeKind {
    #[default]
    File,
    Folder,
}

/// Metadata returned by [`FileBackend::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileStat {
    pub mtime: i64,
    pub size: u64,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessMode {
    pub read: bool,
    pub write: bool,
}

impl AccessMode {
    pub const NONE: AccessMode = AccessMode {
        read: false,
        write: false,
    };
    pub const READ: AccessMode = AccessMode {
        read: true,
        write: false,
    };
    pub const WRITE: AccessMode = AccessMode {
        read: false,
        write: true,
    };
    pub const READ_WRITE: AccessMode = AccessMode {
        read: true,
        write: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncOp {
    Open,
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncOutcome {
    Succeeded,
    Failed { retry: bool },
}

impl AsyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Convert into a `Result` for `op`.
    pub fn into_result(self, op: AsyncOp) -> Result<()> {
        match self {
            Self::Succeeded => Ok(()),
            Self::Failed { retry } => Err(Error::Async { op, retry }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AsyncState {
    #[default]
    Created,
    Pending,
    Finished(AsyncOutcome),
}

/// Low-level operations on one file, supplied per platform.
///
/// A backend instance belongs to a single [`FileAccess`] and may keep an
/// open handle between [`open`](FileBackend::open) and
/// [`close`](FileBackend::close).
pub trait FileBackend: Send {
    fn stat(&mut self, path: &LocalPath) -> std::io::Result<FileStat>;

    fn open(&mut self, path: &LocalPath, mode: AccessMode) -> std::io::Result<()>;

    /// Fill `dst` with exactly `dst.len()` bytes read at `offset`.
    fn read_at(&mut self, dst: &mut [u8], offset: u64) -> std::io::Result<()>;

    fn write_at(&mut self, data: &[u8], offset: u64) -> std::io::Result<()>;

    fn close(&mut self);

    fn async_open(&mut self, request: AsyncRequest) {
        request.fail(false);
    }

    fn async_read(&mut self, request: AsyncRequest) {
        request.fail(false);
    }

    fn async_write(&mut self, request: AsyncRequest) {
        request.fail(false);
    }
}

/// Creates a fresh [`FileBackend`] for each [`FileAccess`].
pub trait FileBackendFactory: Send + Sync {
    fn new_backend(&self) -> Box<dyn FileBackend>;
}

type CompletionCallback = Box<dyn FnOnce(AsyncOutcome) + Send>;

#[derive(Default)]
struct Completion {
    state: Mutex<AsyncState>,
    data: Mutex<Vec<u8>>,
    cond: Condvar,
    callback: Mutex<Option<CompletionCallback>>,
    waiter: Option<Arc<Waiter>>,
}

impl Completion {
    fn new(waiter: Option<Arc<Waiter>>) -> Self {
        Self {
            waiter,
            ..Self::default()
        }
    }

    fn mark_pending(&self) {
        let mut state = self.state.lock();
        if *state == AsyncState::Created {
            *state = AsyncState::Pending;
        }
    }

    fn finish(&self, outcome: AsyncOutcome, data: Vec<u8>) {
        {
            let mut state = self.state.lock();
            if matches!(*state, AsyncState::Finished(_)) {
                tracing::warn!(?outcome, "Ignoring second completion of an async request");
                return;
            }
            *self.data.lock() = data;
            *state = AsyncState::Finished(outcome);
        }

        self.cond.notify_all();
        if let Some(waiter) = &self.waiter {
            waiter.notify();
        }

        let callback = self.callback.lock().take();
        if let Some(callback) = callback {
            callback(outcome);
        }
    }
}

/// Work handed to a [`FileBackend`] async hook.
///
/// Completing consumes the request, so each request finishes exactly once.
/// A request dropped without completing finishes as a permanent failure.
pub struct AsyncRequest {
    pub op: AsyncOp,
    pub access: AccessMode,
    pub path: LocalPath,
    pub offset: u64,
    pub len: usize,
    pub pad: usize,
    /// Payload of a write.
    pub data: Vec<u8>,
    completion: Option<Arc<Completion>>,
}

impl AsyncRequest {
    /// Finish successfully. For reads, `data` must hold at least `len` bytes;
    /// it is cut to `len` and followed by `pad` zero bytes.
    pub fn succeed(mut self, mut data: Vec<u8>) {
        if self.op == AsyncOp::Read {
            if data.len() < self.len {
                tracing::warn!(wanted = self.len, got = data.len(), "Short async read");
                return self.fail(false);
            }
            data.truncate(self.len);
            data.resize(self.len + self.pad, 0);
        } else {
            data.clear();
        }
        self.complete(AsyncOutcome::Succeeded, data);
    }

    pub fn fail(mut self, retry: bool) {
        self.complete(AsyncOutcome::Failed { retry }, Vec::new());
    }

    fn complete(&mut self, outcome: AsyncOutcome, data: Vec<u8>) {
        if let Some(completion) = self.completion.take() {
            completion.finish(outcome, data);
        }
    }
}

impl Drop for AsyncRequest {
    fn drop(&mut self) {
        if self.completion.is_some() {
            tracing::warn!(op = ?self.op, "Async request dropped without completion");
            self.complete(AsyncOutcome::Failed { retry: false }, Vec::new());
        }
    }
}

impl std::fmt::Debug for AsyncRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncRequest")
            .field("op", &self.op)
            .field("access", &self.access)
            .field("path", &self.path)
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("pad", &self.pad)
            .finish_non_exhaustive()
    }
}

/// One asynchronous request and its completion state.
///
/// Dropping a context that is not finished blocks until it is. Dropping a
/// read context releases its share of the file's async handle.
pub struct AsyncIoContext {
    op: AsyncOp,
    access: AccessMode,
    offset: u64,
    len: usize,
    pad: usize,
    completion: Arc<Completion>,
    file: Weak<FileShared>,
}

impl AsyncIoContext {
    pub fn op(&self) -> AsyncOp {
        self.op
    }

    pub fn access(&self) -> AccessMode {
        self.access
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn pad(&self) -> usize {
        self.pad
    }

    pub fn state(&self) -> AsyncState {
        *self.completion.state.lock()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome().is_some()
    }

    pub fn outcome(&self) -> Option<AsyncOutcome> {
        match self.state() {
            AsyncState::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Block until finished.
    pub fn wait(&self) -> AsyncOutcome {
        let mut state = self.completion.state.lock();
        loop {
            if let AsyncState::Finished(outcome) = *state {
                return outcome;
            }
            self.completion.cond.wait(&mut state);
        }
    }

    /// Block until finished or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<AsyncOutcome> {
        let deadline = Instant::now() + timeout;
        let mut state = self.completion.state.lock();
        loop {
            if let AsyncState::Finished(outcome) = *state {
                return Some(outcome);
            }
            if self.completion.cond.wait_until(&mut state, deadline).timed_out() {
                return None;
            }
        }
    }

    /// Run `callback` on completion, immediately if already finished.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(AsyncOutcome) + Send + 'static,
    {
        let state = self.completion.state.lock();
        if let AsyncState::Finished(outcome) = *state {
            drop(state);
            callback(outcome);
            return;
        }
        *self.completion.callback.lock() = Some(Box::new(callback));
    }

    /// Take the buffer of a finished read: `len` bytes then `pad` zeros.
    pub fn take_data(&self) -> Vec<u8> {
        std::mem::take(&mut *self.completion.data.lock())
    }
}

impl Drop for AsyncIoContext {
    fn drop(&mut self) {
        if !self.is_finished() {
            self.wait();
            // The wait may have swallowed a wake-up meant for the owner's loop.
            if let Some(waiter) = &self.completion.waiter {
                waiter.notify();
            }
        }

        if self.op == AsyncOp::Read {
            match self.file.upgrade() {
                Some(shared) => shared.async_close(),
                None => tracing::warn!("Read context outlived its file access"),
            }
        }
    }
}

impl std::fmt::Debug for AsyncIoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncIoContext")
            .field("op", &self.op)
            .field("access", &self.access)
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("pad", &self.pad)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct AsyncReaders {
    count: usize,
    opened: bool,
}

struct FileShared {
    backend: Mutex<Box<dyn FileBackend>>,
    // Locked before `backend`. Counting and the open/close of the shared
    // handle happen under this lock.
    readers: Mutex<AsyncReaders>,
}

impl FileShared {
    fn async_close(&self) {
        let mut readers = self.readers.lock();
        let Some(count) = readers.count.checked_sub(1) else {
            tracing::warn!("Async close without a matching open");
            return;
        };
        readers.count = count;

        if count == 0 && readers.opened {
            readers.opened = false;
            tracing::debug!("Closing async file handle");
            self.backend.lock().close();
        }
    }
}

/// How the handle used by a blocking read was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockingHandle {
    None,
    Owned,
    /// Borrowed from outstanding async reads, counted as one more reader.
    Shared,
}

/// Access to one local file.
///
/// Not safe for concurrent open/close from several threads; only the count
/// of outstanding async reads is shared with live contexts.
pub struct FileAccess {
    shared: Arc<FileShared>,
    waiter: Option<Arc<Waiter>>,
    nonblocking: bool,
    local_name: LocalPath,
    nonblocking_name: Option<LocalPath>,
    blocking: BlockingHandle,
    mtime: i64,
    size: u64,
    kind: NodeKind,
    retry: bool,
}

impl FileAccess {
    /// Wrap `backend`. Completions notify `waiter`, if given.
    pub fn new(
        backend: Box<dyn FileBackend>,
        waiter: Option<Arc<Waiter>>,
        nonblocking: bool,
    ) -> Self {
        Self {
            shared: Arc::new(FileShared {
                backend: Mutex::new(backend),
                readers: Mutex::new(AsyncReaders::default()),
            }),
            waiter,
            nonblocking,
            local_name: LocalPath::new(),
            nonblocking_name: None,
            blocking: BlockingHandle::None,
            mtime: 0,
            size: 0,
            kind: NodeKind::File,
            retry: false,
        }
    }

    pub fn mtime(&self) -> i64 {
        self.mtime
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Whether the last failure was transient.
    pub fn retry(&self) -> bool {
        self.retry
    }

    pub fn local_name(&self) -> &LocalPath {
        &self.local_name
    }

    /// Number of async reads not yet released by their contexts.
    pub fn outstanding_async_reads(&self) -> usize {
        self.shared.readers.lock().count
    }

    pub fn is_async_opened(&self) -> bool {
        self.shared.readers.lock().opened
    }

    fn error_path(&self) -> PathBuf {
        PathBuf::from(self.local_name.to_path())
    }

    fn record(&mut self, stat: FileStat) {
        self.mtime = clamp_timestamp(stat.mtime);
        self.size = stat.size;
        self.kind = stat.kind;
    }

    fn stat_current(&mut self) -> Result<FileStat> {
        let result = self.shared.backend.lock().stat(&self.local_name);
        result.map_err(|e| {
            self.retry = is_transient(&e);
            Error::stat(self.error_path(), e)
        })
    }

    /// Stat `path` and remember its metadata.
    ///
    /// In nonblocking mode no handle is kept: blocking operations open one
    /// through [`open_blocking`](FileAccess::open_blocking). Otherwise the
    /// file is opened for reading right away.
    pub fn open(&mut self, path: &LocalPath) -> Result<()> {
        self.local_name = path.clone();
        self.nonblocking_name = self.nonblocking.then(|| path.clone());

        let stat = self.stat_current()?;
        self.record(stat);

        if !self.nonblocking {
            let result = self.shared.backend.lock().open(path, AccessMode::READ);
            result.map_err(|e| {
                self.retry = is_transient(&e);
                Error::io(self.error_path(), e)
            })?;
        }
        Ok(())
    }

    /// Open a handle on `path` with `mode` immediately, creating the file
    /// when writing.
    pub fn open_with(&mut self, path: &LocalPath, mode: AccessMode) -> Result<()> {
        self.local_name = path.clone();
        self.nonblocking_name = None;

        let result = self.shared.backend.lock().open(path, mode);
        result.map_err(|e| {
            self.retry = is_transient(&e);
            Error::io(self.error_path(), e)
        })?;

        let stat = self.stat_current()?;
        self.record(stat);
        Ok(())
    }

    /// Close a handle opened by [`open`](FileAccess::open) or
    /// [`open_with`](FileAccess::open_with).
    pub fn close(&mut self) {
        self.nonblocking_name = None;
        if self.blocking == BlockingHandle::Shared {
            self.close_blocking();
            return;
        }
        self.blocking = BlockingHandle::None;

        let readers = self.shared.readers.lock();
        if !readers.opened {
            self.shared.backend.lock().close();
        }
    }

    /// Whether `path` is a folder.
    pub fn is_folder(&mut self, path: &LocalPath) -> bool {
        self.local_name = path.clone();
        match self.stat_current() {
            Ok(stat) => {
                self.record(stat);
                stat.kind == NodeKind::Folder
            }
            Err(_) => false,
        }
    }

    /// Check that metadata is unchanged, then open the handle.
    ///
    /// Does nothing unless the file was opened in nonblocking mode. While
    /// async reads hold the shared handle open, that handle is reused and
    /// stays open until [`close_blocking`](FileAccess::close_blocking).
    pub fn open_blocking(&mut self) -> Result<()> {
        let Some(name) = self.nonblocking_name.clone() else {
            return Ok(());
        };
        if self.blocking != BlockingHandle::None {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let mut readers = shared.readers.lock();

        self.verify_unchanged("sync")?;

        if readers.opened {
            readers.count += 1;
            self.blocking = BlockingHandle::Shared;
            return Ok(());
        }

        let result = shared.backend.lock().open(&name, AccessMode::READ);
        match result {
            Ok(()) => {
                self.blocking = BlockingHandle::Owned;
                Ok(())
            }
            Err(e) => {
                self.retry = is_transient(&e);
                Err(Error::io(self.error_path(), e))
            }
        }
    }

    pub fn close_blocking(&mut self) {
        match std::mem::replace(&mut self.blocking, BlockingHandle::None) {
            BlockingHandle::None => {}
            BlockingHandle::Owned => self.shared.backend.lock().close(),
            BlockingHandle::Shared => self.shared.async_close(),
        }
    }

    fn verify_unchanged(&mut self, handle: &str) -> Result<()> {
        let current = self.stat_current().inspect_err(|e| {
            tracing::warn!(
                handle,
                mtime = self.mtime,
                size = self.size,
                error = %e,
                "Error opening file handle (stat)"
            );
        })?;

        let mtime = clamp_timestamp(current.mtime);
        if mtime != self.mtime || current.size != self.size {
            self.mtime = mtime;
            self.size = current.size;
            self.retry = false;
            return Err(Error::Changed {
                path: self.error_path(),
            });
        }
        Ok(())
    }

    fn io_error(&mut self, e: std::io::Error) -> Error {
        self.retry = is_transient(&e);
        if e.kind() == ErrorKind::NotConnected {
            return Error::NotOpen;
        }
        Error::io(self.error_path(), e)
    }

    fn read_error(&mut self, e: std::io::Error, wanted: usize, offset: u64) -> Error {
        if e.kind() == ErrorKind::UnexpectedEof {
            self.retry = false;
            return Error::ShortRead {
                path: self.error_path(),
                wanted,
                offset,
            };
        }
        self.io_error(e)
    }

    /// Read exactly `len` bytes at `offset`, followed by `pad` zero bytes.
    pub fn read(&mut self, len: usize, pad: usize, offset: u64) -> Result<Vec<u8>> {
        self.open_blocking()?;

        let mut buf = vec![0; len + pad];
        let result = self.shared.backend.lock().read_at(&mut buf[..len], offset);
        self.close_blocking();

        result.map_err(|e| self.read_error(e, len, offset))?;
        Ok(buf)
    }

    /// Read into `dst` at `offset`, opening around the read unless the
    /// caller already holds the handle open.
    pub fn raw_read(&mut self, dst: &mut [u8], offset: u64, caller_opened: bool) -> Result<()> {
        if !caller_opened {
            self.open_blocking()?;
        }

        let wanted = dst.len();
        let result = self.shared.backend.lock().read_at(dst, offset);

        if !caller_opened {
            self.close_blocking();
        }
        result.map_err(|e| self.read_error(e, wanted, offset))
    }

    /// Write `data` at `offset` through a handle from
    /// [`open_with`](FileAccess::open_with).
    pub fn write(&mut self, data: &[u8], offset: u64) -> Result<()> {
        let result = self.shared.backend.lock().write_at(data, offset);
        result.map_err(|e| self.io_error(e))
    }

    fn new_context(
        &self,
        op: AsyncOp,
        access: AccessMode,
        offset: u64,
        len: usize,
        pad: usize,
    ) -> AsyncIoContext {
        AsyncIoContext {
            op,
            access,
            offset,
            len,
            pad,
            completion: Arc::new(Completion::new(self.waiter.clone())),
            file: Arc::downgrade(&self.shared),
        }
    }

    fn request(context: &AsyncIoContext, path: LocalPath, data: Vec<u8>) -> AsyncRequest {
        context.completion.mark_pending();
        AsyncRequest {
            op: context.op,
            access: context.access,
            path,
            offset: context.offset,
            len: context.len,
            pad: context.pad,
            data,
            completion: Some(Arc::clone(&context.completion)),
        }
    }

    /// Stat `path` as an async open that finishes before returning.
    pub fn async_stat_open(&mut self, path: &LocalPath) -> AsyncIoContext {
        self.local_name = path.clone();
        self.nonblocking_name = self.nonblocking.then(|| path.clone());
        tracing::trace!("Async open start");

        let context = self.new_context(AsyncOp::Open, AccessMode::READ, self.size, 0, 0);
        let request = Self::request(&context, path.clone(), Vec::new());

        match self.stat_current() {
            Ok(stat) => {
                self.record(stat);
                request.succeed(Vec::new());
            }
            Err(_) => request.fail(self.retry),
        }
        context
    }

    pub fn async_open(
        &mut self,
        path: &LocalPath,
        mode: AccessMode,
        offset: u64,
    ) -> AsyncIoContext {
        tracing::trace!("Async open start");
        let context = self.new_context(AsyncOp::Open, mode, offset, 0, 0);
        let request = Self::request(&context, path.clone(), Vec::new());
        self.shared.backend.lock().async_open(request);
        context
    }

    /// Read `len` bytes at `offset` asynchronously; the result buffer carries
    /// `pad` trailing zeros.
    pub fn async_read(&mut self, len: usize, pad: usize, offset: u64) -> AsyncIoContext {
        tracing::trace!("Async read start");
        let context = self.new_context(AsyncOp::Read, AccessMode::READ, offset, len, pad);
        let request = Self::request(&context, self.local_name.clone(), Vec::new());

        if let Err(e) = self.async_open_read() {
            tracing::error!(error = %e, "Error opening file for async read");
            request.fail(self.retry);
            return context;
        }

        self.shared.backend.lock().async_read(request);
        context
    }

    pub fn async_write(&mut self, data: &[u8], offset: u64) -> AsyncIoContext {
        tracing::trace!("Async write start");
        let context = self.new_context(AsyncOp::Write, AccessMode::WRITE, offset, data.len(), 0);
        let request = Self::request(&context, self.local_name.clone(), data.to_vec());
        self.shared.backend.lock().async_write(request);
        context
    }

    /// Register one async reader, opening the shared handle for the first.
    fn async_open_read(&mut self) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        let mut readers = shared.readers.lock();
        readers.count += 1;

        let Some(name) = self.nonblocking_name.clone() else {
            return Ok(());
        };
        if readers.opened {
            return Ok(());
        }

        self.verify_unchanged("async")?;

        tracing::debug!("Opening async file handle for reading");
        let result = shared.backend.lock().open(&name, AccessMode::READ);
        match result {
            Ok(()) => {
                readers.opened = true;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error opening async file handle");
                self.retry = is_transient(&e);
                Err(Error::io(self.error_path(), e))
            }
        }
    }
}

impl Drop for FileAccess {
    fn drop(&mut self) {
        self.close_blocking();
        let outstanding = self.outstanding_async_reads();
        if outstanding > 0 || self.is_async_opened() {
            tracing::warn!(outstanding, "File access dropped with live async reads");
        }
    }
}

impl std::fmt::Debug for FileAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAccess")
            .field("local_name", &self.local_name)
            .field("nonblocking", &self.nonblocking)
            .field("mtime", &self.mtime)
            .field("size", &self.size)
            .field("kind", &self.kind)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Sequential reader over a [`FileAccess`] whose handle is already open.
#[derive(Debug)]
pub struct FileInputStream<'a> {
    file: &'a mut FileAccess,
    offset: u64,
}

impl<'a> FileInputStream<'a> {
    pub fn new(file: &'a mut FileAccess) -> Self {
        Self { file, offset: 0 }
    }

    pub fn size(&self) -> u64 {
        self.file.size()
    }

    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Fill `buf` from the current position.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.file.raw_read(buf, self.offset, true)?;
        self.offset += buf.len() as u64;
        Ok(())
    }

    /// Advance by `count` bytes without reading; fails past the end.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        let end = self.offset.saturating_add(count);
        if end > self.file.size() {
            tracing::warn!(offset = self.offset, count, "Invalid seek on file input stream");
            return Err(Error::ShortRead {
                path: self.file.error_path(),
                wanted: usize::try_from(count).unwrap_or(usize::MAX),
                offset: self.offset,
            });
        }
        self.offset = end;
        Ok(())
    }
}

/// [`FileBackend`] on top of `std::fs`, without asynchronous support.
#[derive(Debug, Default)]
pub struct StdFileBackend<P = NativePlatform> {
    platform: P,
    file: Option<File>,
}

impl<P: PathPlatform> StdFileBackend<P> {
    pub fn new(platform: P) -> Self {
        Self { platform, file: None }
    }

    fn handle(&mut self) -> std::io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| std::io::Error::new(ErrorKind::NotConnected, "file is not open"))
    }
}

impl<P: PathPlatform + 'static> FileBackend for StdFileBackend<P> {
    fn stat(&mut self, path: &LocalPath) -> std::io::Result<FileStat> {
        let metadata = std::fs::metadata(self.platform.to_native(path))?;
        let mtime = match metadata.modified()?.duration_since(UNIX_EPOCH) {
            Ok(since) => i64::try_from(since.as_secs()).unwrap_or(i64::MAX),
            Err(before) => -i64::try_from(before.duration().as_secs()).unwrap_or(i64::MAX),
        };

        Ok(FileStat {
            mtime,
            size: metadata.len(),
            kind: if metadata.is_dir() {
                NodeKind::Folder
            } else {
                NodeKind::File
            },
        })
    }

    fn open(&mut self, path: &LocalPath, mode: AccessMode) -> std::io::Result<()> {
        let file = OpenOptions::new()
            .read(mode.read || !mode.write)
            .write(mode.write)
            .create(mode.write)
            .truncate(false)
            .open(self.platform.to_native(path))?;
        self.file = Some(file);
        Ok(())
    }

    fn read_at(&mut self, dst: &mut [u8], offset: u64) -> std::io::Result<()> {
        let file = self.handle()?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(dst)
    }

    fn write_at(&mut self, data: &[u8], offset: u64) -> std::io::Result<()> {
        let file = self.handle()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)
    }

    fn close(&mut self) {
        self.file = None;
    }
}

/// Factory for [`StdFileBackend`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdBackendFactory;

impl FileBackendFactory for StdBackendFactory {
    fn new_backend(&self) -> Box<dyn FileBackend> {
        Box::new(StdFileBackend::new(NativePlatform::default()))
    }
}
