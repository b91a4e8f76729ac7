//! Filesystem abstraction layer for the sync client
//!
//! Escapes remote names into filesystem-safe local names and back, compares
//! names and paths by codepoint, composes local paths around a single
//! separator, and provides file I/O and change notification behind
//! injectable platform backends.

pub mod codec;
pub mod compare;
pub mod config;
pub mod error;
pub mod file;
pub mod fsaccess;
pub mod fstype;
pub mod io;
pub mod logging;
pub mod notify;
pub mod path;
pub mod platform;
pub mod waiter;

pub use compare::{RemoteNameOrder, Transform, local_compare, remote_compare};
pub use config::{ConfigStore, FsConfig};
pub use error::{Error, Result};
pub use file::{
    AccessMode, AsyncIoContext, AsyncOp, AsyncOutcome, AsyncRequest, AsyncState, FileAccess,
    FileBackend, FileBackendFactory, FileInputStream, FileStat, NodeKind, StdBackendFactory,
    StdFileBackend, clamp_timestamp,
};
pub use fsaccess::{FileSystemAccess, WatchFactory};
pub use fstype::FileSystemType;
pub use io::RobustnessConfig;
pub use notify::{
    DirNotify, NodeHandle, NodeLiveness, Notification, NotificationDeque, NotifyFailure, NullWatch,
    SyncHandle, WatchBackend,
};
pub use path::{LengthGuard, LocalPath};
pub use platform::{
    HostFs, NativePlatform, PathPlatform, Separator, StdHost, UnixPlatform, WindowsPlatform,
};
pub use waiter::{Clock, MonotonicClock, Waiter};
