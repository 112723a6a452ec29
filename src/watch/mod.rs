//! Filesystem watching.
//!
//! A [`Watcher`] monitors every content directory of the gallery and turns
//! raw OS notifications into [`ChangeEvent`]s on a bounded queue. The
//! consumer side is the [`Dispatcher`](crate::dispatch::Dispatcher).
//!
//! ## Feedback loops
//!
//! Rebuilds write index documents and thumbnails inside the very tree being
//! watched. Every path whose base name matches an exclusion pattern
//! (the index filename, the thumbnail directory, the overview filename) is
//! dropped before it becomes an event, and excluded directories are never
//! registered, so the watcher never reacts to its own output.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──start──▶ Watching ──stop──▶ Stopped
//!   └───────────────stop──────────────▲
//! ```
//!
//! `Stopped` is terminal. A second `stop` is a no-op.

mod event;
mod exclude;
mod fs_watcher;
mod shutdown;

pub use event::{ChangeEvent, ChangeKind};
pub use exclude::ExclusionPatterns;
pub use fs_watcher::{FsWatcher, WatcherOptions, WatcherState};
pub use shutdown::Shutdown;

use crossbeam_channel::Receiver;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watch root is not a directory: {0}")]
    InvalidRoot(PathBuf),
    #[error("Invalid exclude pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("Notification setup failed: {0}")]
    Notify(#[from] notify::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Watcher is {0:?}, expected Idle")]
    InvalidState(WatcherState),
    #[error("Watch loop panicked")]
    LoopPanicked,
}

/// A source of change events that can be started once and stopped.
pub trait Watcher {
    /// Register the tree and begin delivering events.
    ///
    /// The returned queue closes when the watcher stops or `shutdown` is
    /// triggered.
    fn start(&mut self, shutdown: &Shutdown) -> Result<Receiver<ChangeEvent>, WatchError>;

    /// Stop delivering events and release the OS notification handle.
    fn stop(&mut self) -> Result<(), WatchError>;

    fn state(&self) -> WatcherState;
}
