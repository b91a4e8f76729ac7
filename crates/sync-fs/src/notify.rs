//! Change notifications flowing from a directory watcher to the sync loop.
//!
//! A watcher thread pushes [`Notification`]s through [`DirNotify::notify`]
//! into a [`NotificationDeque`]; the sync loop drains them. The queue lock
//! and the failure lock are separate and never held together.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::path::LocalPath;
use crate::waiter::Clock;
use crate::{Error, Result};

/// Generational handle to a node in a table owned by the sync engine.
///
/// A handle may be stale by the time its notification is consumed; resolve
/// it through [`NodeLiveness`] before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

impl NodeHandle {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub const fn index(self) -> u32 {
        self.index
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Node table check, implemented by whoever owns the nodes.
pub trait NodeLiveness {
    fn is_live(&self, node: NodeHandle) -> bool;
}

/// Opaque reference to the sync context that owns a watched root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncHandle(pub u64);

/// One filesystem change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub node: NodeHandle,
    /// Path relative to the node.
    pub path: LocalPath,
    /// Arrival tick; 0 means process immediately.
    pub timestamp: u64,
}

impl Notification {
    pub fn is_immediate(&self) -> bool {
        self.timestamp == 0
    }

    /// Whether the debounce window of `delay` ticks has passed at `now`.
    pub fn is_ready(&self, now: u64, delay: u64) -> bool {
        self.is_immediate() || now.saturating_sub(self.timestamp) >= delay
    }

    /// The node, if it still exists.
    pub fn live_node(&self, nodes: &impl NodeLiveness) -> Option<NodeHandle> {
        nodes.is_live(self.node).then_some(self.node)
    }
}

/// Unbounded thread-safe FIFO of notifications.
#[derive(Debug, Default)]
pub struct NotificationDeque {
    inner: Mutex<VecDeque<Notification>>,
}

impl NotificationDeque {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&self, notification: Notification) {
        self.inner.lock().push_back(notification);
    }

    pub fn pop_front(&self) -> Option<Notification> {
        self.inner.lock().pop_front()
    }

    /// Put back a notification the consumer could not handle yet.
    pub fn unpop_front(&self, notification: Notification) {
        self.inner.lock().push_front(notification);
    }

    pub fn peek_front(&self) -> Option<Notification> {
        self.inner.lock().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Pop the head if it is immediate or at least `delay` ticks old.
    pub fn pop_ready(&self, now: u64, delay: u64) -> Option<Notification> {
        let mut queue = self.inner.lock();
        if queue.front()?.is_ready(now, delay) {
            queue.pop_front()
        } else {
            None
        }
    }

    /// Drop every notification for `node`, returning how many were removed.
    pub fn purge_node(&self, node: NodeHandle) -> usize {
        let mut queue = self.inner.lock();
        let before = queue.len();
        queue.retain(|n| n.node != node);
        before - queue.len()
    }
}

/// Why change notification stopped working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyFailure {
    pub code: i32,
    pub reason: String,
}

/// Platform watch mechanism behind a [`DirNotify`].
pub trait WatchBackend: Send + Sync {
    /// Whether notifications will actually be delivered.
    fn is_available(&self) -> bool {
        false
    }

    /// Identifier of the watched root that survives restarts, if any.
    fn fingerprint(&self) -> Option<u64> {
        None
    }

    /// Whether file identities are stable across restarts.
    fn stable_ids(&self) -> bool {
        true
    }
}

/// Watch backend for platforms without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullWatch;

impl WatchBackend for NullWatch {}

/// Per-root watcher state.
pub struct DirNotify {
    base_path: LocalPath,
    ignore_path: LocalPath,
    sync: Option<SyncHandle>,
    failure: Mutex<Option<NotifyFailure>>,
    error_count: AtomicU32,
    backend: Box<dyn WatchBackend>,
}

impl DirNotify {
    pub fn new(
        base_path: LocalPath,
        ignore_path: LocalPath,
        backend: Box<dyn WatchBackend>,
    ) -> Self {
        let failure = (!backend.is_available()).then(|| NotifyFailure {
            code: 1,
            reason: "Not initialized".into(),
        });

        Self {
            base_path,
            ignore_path,
            sync: None,
            failure: Mutex::new(failure),
            error_count: AtomicU32::new(0),
            backend,
        }
    }

    pub fn with_sync(mut self, sync: SyncHandle) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn sync(&self) -> Option<SyncHandle> {
        self.sync
    }

    pub fn base_path(&self) -> &LocalPath {
        &self.base_path
    }

    pub fn ignore_path(&self) -> &LocalPath {
        &self.ignore_path
    }

    /// Queue a change to `path` under `node`. Immediate notifications get
    /// tick 0; others are stamped with the current tick for debouncing.
    pub fn notify(
        &self,
        queue: &NotificationDeque,
        node: NodeHandle,
        path: LocalPath,
        immediate: bool,
        clock: &dyn Clock,
    ) {
        let timestamp = if immediate { 0 } else { clock.ticks() };
        tracing::trace!(path = %path, timestamp, "Filesystem notification");
        queue.push_back(Notification {
            node,
            path,
            timestamp,
        });
    }

    pub fn set_failed(&self, code: i32, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(
            base = %self.base_path,
            code,
            reason = %reason,
            "Change notification unavailable"
        );
        *self.failure.lock() = Some(NotifyFailure { code, reason });
    }

    pub fn clear_failed(&self) {
        *self.failure.lock() = None;
    }

    /// Snapshot of the failure state.
    pub fn failed(&self) -> Option<NotifyFailure> {
        self.failure.lock().clone()
    }

    /// Consumers must fall back to full rescans while this holds.
    pub fn needs_full_rescan(&self) -> bool {
        self.failure.lock().is_some()
    }

    pub fn check_available(&self) -> Result<()> {
        match self.failed() {
            Some(NotifyFailure { code, reason }) => Err(Error::NotifyUnavailable { code, reason }),
            None => Ok(()),
        }
    }

    pub fn record_error(&self) -> u32 {
        self.error_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn fingerprint(&self) -> Option<u64> {
        self.backend.fingerprint()
    }

    pub fn stable_ids(&self) -> bool {
        self.backend.stable_ids()
    }
}

impl std::fmt::Debug for DirNotify {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirNotify")
            .field("base_path", &self.base_path)
            .field("ignore_path", &self.ignore_path)
            .field("sync", &self.sync)
            .field("failure", &self.failed())
            .field("error_count", &self.error_count())
            .finish_non_exhaustive()
    }
}
