//! Watcher backed by the `notify` crate.
//!
//! Directories are registered one by one, non-recursively, so excluded
//! directories (the thumbnail directory above all) never produce OS
//! notifications in the first place. New directories are registered by the
//! event loop as their creation is observed; the loop thread is the only
//! writer of the watch set once it runs.
//!
//! The notify callback only forwards raw results into an unbounded channel.
//! Filtering, stat calls and the blocking send into the bounded queue all
//! happen on the loop thread:
//!
//! ```text
//! notify thread ──raw──▶ loop thread ──ChangeEvent (bounded)──▶ dispatcher
//! ```

use super::event::{ChangeEvent, ChangeKind};
use super::exclude::ExclusionPatterns;
use super::shutdown::Shutdown;
use super::{WatchError, Watcher};
use crate::config::{DEFAULT_QUEUE_CAPACITY, GalleryConfig, WatchBackend};
use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use notify::{PollWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

type RawEvent = notify::Result<notify::Event>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Watching,
    Stopped,
}

/// How to watch a gallery.
#[derive(Debug, Clone)]
pub struct WatcherOptions {
    pub root: PathBuf,
    /// Zero means [`DEFAULT_QUEUE_CAPACITY`].
    pub queue_capacity: usize,
    /// Glob patterns matched against base names.
    pub exclude: Vec<String>,
    pub backend: WatchBackend,
    pub poll_interval: Duration,
}

impl WatcherOptions {
    /// Options for watching `root` with the generated names excluded.
    pub fn from_config(root: impl Into<PathBuf>, config: &GalleryConfig) -> Self {
        Self {
            root: root.into(),
            queue_capacity: config.watch.effective_capacity(),
            exclude: config.watch_exclusions(),
            backend: config.watch.backend,
            poll_interval: config.watch.poll_interval(),
        }
    }

    fn capacity(&self) -> usize {
        if self.queue_capacity == 0 {
            DEFAULT_QUEUE_CAPACITY
        } else {
            self.queue_capacity
        }
    }
}

/// Native or polling filesystem watcher.
pub struct FsWatcher {
    root: PathBuf,
    capacity: usize,
    exclusions: ExclusionPatterns,
    state: WatcherState,
    os_watcher: Option<Box<dyn NotifyWatcher + Send>>,
    raw: Option<Receiver<RawEvent>>,
    stop: Shutdown,
    worker: Option<JoinHandle<()>>,
}

impl FsWatcher {
    /// Validate the root and set up the OS notification handle.
    ///
    /// Nothing is registered until [`Watcher::start`].
    pub fn new(options: WatcherOptions) -> Result<Self, WatchError> {
        // Backends may report resolved paths, so the root is resolved too
        let root = std::path::absolute(&options.root)?;
        let root = match root.canonicalize() {
            Ok(resolved) if resolved.is_dir() => resolved,
            _ => return Err(WatchError::InvalidRoot(root)),
        };
        let exclusions = ExclusionPatterns::new(&options.exclude)?;

        let (raw_tx, raw_rx) = unbounded();
        let handler = move |res: RawEvent| {
            // Receiver gone means the loop has exited
            raw_tx.send(res).ok();
        };
        let os_watcher: Box<dyn NotifyWatcher + Send> = match options.backend {
            WatchBackend::Native => Box::new(notify::recommended_watcher(handler)?),
            WatchBackend::Poll => Box::new(PollWatcher::new(
                handler,
                notify::Config::default().with_poll_interval(options.poll_interval),
            )?),
        };

        Ok(Self {
            root,
            capacity: options.capacity(),
            exclusions,
            state: WatcherState::Idle,
            os_watcher: Some(os_watcher),
            raw: Some(raw_rx),
            stop: Shutdown::new(),
            worker: None,
        })
    }

    /// The canonical root being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Register `dir` and every non-excluded directory below it.
///
/// Symlinks are not followed. Registration errors are logged and skipped.
fn register_tree(
    watcher: &mut dyn NotifyWatcher,
    dir: &Path,
    exclusions: &ExclusionPatterns,
) -> usize {
    let mut registered = 0;
    let entries = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !exclusions.is_excluded(e.path()));
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cannot traverse for watching: {e}");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        match watcher.watch(entry.path(), RecursiveMode::NonRecursive) {
            Ok(()) => {
                trace!("Watching {}", entry.path().display());
                registered += 1;
            }
            Err(e) => warn!("Failed to watch {}: {e}", entry.path().display()),
        }
    }
    registered
}

impl Watcher for FsWatcher {
    fn start(&mut self, shutdown: &Shutdown) -> Result<Receiver<ChangeEvent>, WatchError> {
        if self.state != WatcherState::Idle {
            return Err(WatchError::InvalidState(self.state));
        }
        let (Some(mut os_watcher), Some(raw)) = (self.os_watcher.take(), self.raw.take()) else {
            return Err(WatchError::InvalidState(self.state));
        };

        let registered = register_tree(os_watcher.as_mut(), &self.root, &self.exclusions);
        info!(
            "Watching {} ({registered} directories)",
            self.root.display()
        );

        let (events_tx, events_rx) = bounded(self.capacity);
        let event_loop = EventLoop {
            os_watcher,
            raw,
            events: events_tx,
            exclusions: self.exclusions.clone(),
            external: shutdown.clone(),
            internal: self.stop.clone(),
        };
        let worker = std::thread::Builder::new()
            .name("image-archive-watch".to_string())
            .spawn(move || event_loop.run())?;

        self.worker = Some(worker);
        self.state = WatcherState::Watching;
        Ok(events_rx)
    }

    fn stop(&mut self) -> Result<(), WatchError> {
        match self.state {
            WatcherState::Stopped => Ok(()),
            WatcherState::Idle => {
                self.os_watcher = None;
                self.raw = None;
                self.state = WatcherState::Stopped;
                Ok(())
            }
            WatcherState::Watching => {
                self.stop.trigger();
                self.state = WatcherState::Stopped;
                match self.worker.take() {
                    Some(worker) => worker.join().map_err(|_| WatchError::LoopPanicked),
                    None => Ok(()),
                }?;
                info!("Stopped watching {}", self.root.display());
                Ok(())
            }
        }
    }

    fn state(&self) -> WatcherState {
        self.state
    }
}

impl Drop for FsWatcher {
    fn drop(&mut self) {
        // Let a still running loop exit and release its OS handle
        self.stop.trigger();
    }
}

/// State owned by the loop thread.
struct EventLoop {
    os_watcher: Box<dyn NotifyWatcher + Send>,
    raw: Receiver<RawEvent>,
    events: Sender<ChangeEvent>,
    exclusions: ExclusionPatterns,
    external: Shutdown,
    internal: Shutdown,
}

impl EventLoop {
    fn run(mut self) {
        loop {
            let msg = select! {
                recv(self.external.signal()) -> _ => None,
                recv(self.internal.signal()) -> _ => None,
                recv(self.raw) -> msg => msg.ok(),
            };
            match msg {
                Some(Ok(event)) => {
                    if !self.handle(event) {
                        break;
                    }
                }
                Some(Err(e)) => warn!("Watch error: {e}"),
                None => break,
            }
        }
        debug!("Watch loop exiting");
        // Dropping self closes the OS handle and the outbound queue
    }

    /// Process one raw notification. Returns false once the loop must end.
    fn handle(&mut self, event: notify::Event) -> bool {
        let kind = ChangeKind::from_notify(&event.kind);
        for path in event.paths {
            if self.exclusions.is_excluded(&path) {
                trace!("Excluded {}", path.display());
                continue;
            }
            if kind.is_some_and(ChangeKind::may_add_directory) && path.is_dir() {
                let added = register_tree(self.os_watcher.as_mut(), &path, &self.exclusions);
                debug!("Registered {added} new directories under {}", path.display());
            }
            let kind = match kind {
                None | Some(ChangeKind::Metadata) => continue,
                Some(kind) => kind,
            };

            let change = ChangeEvent::observe(kind, path);
            // A directory's own mtime moves with its entries, which report themselves
            if change.kind == ChangeKind::Write && change.is_dir {
                trace!("Ignoring directory write {}", change.path.display());
                continue;
            }
            trace!("Queueing {} {}", change.kind, change.path.display());
            // Blocks while the queue is full, unless cancelled
            let delivered = select! {
                send(self.events, change) -> res => res.is_ok(),
                recv(self.external.signal()) -> _ => false,
                recv(self.internal.signal()) -> _ => false,
            };
            if !delivered {
                return false;
            }
        }
        true
    }
}
