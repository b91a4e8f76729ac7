//! Shared test utilities for the cloudsync workspace.
//!
//! Stand-ins for the collaborators `sync-fs` consumes but does not
//! implement. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`host`] — [`FakeHost`] with a scripted filesystem-type table
//! - [`memory`] — [`MemoryFs`] file backend with deferred async completion
//! - [`nodes`] — [`NodeTable`] of generational node handles
//! - [`clock`] — [`FixedClock`] driven by the test

pub mod clock;
pub mod host;
pub mod memory;
pub mod nodes;

pub use clock::FixedClock;
pub use host::FakeHost;
pub use memory::MemoryFs;
pub use nodes::NodeTable;
