//! Turning change events into targeted rebuilds.
//!
//! Events are handled one at a time in delivery order. There is no
//! coalescing: five writes to one file mean five rebuilds of its directory.
//!
//! | Event | Rebuild root | Extra |
//! |---|---|---|
//! | file created/written/removed | the file's directory | |
//! | directory removed | its parent | |
//! | directory created or renamed in | the directory | parent re-indexed (non-recursive) |
//!
//! The parent refresh makes the new directory appear in the parent's sidebar
//! right away. Rebuild roots are clamped to the gallery root, so an event can
//! never cause writes outside it.

use crate::config::IndexConfig;
use crate::imaging::ImageBackend;
use crate::overview::write_overview;
use crate::walk::{TreeWalker, WalkError, WalkSummary};
use crate::watch::{ChangeEvent, Shutdown};
use crossbeam_channel::{Receiver, select};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Where one event's rebuild happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildPlan {
    /// Recursive walk root.
    pub root: PathBuf,
    /// Directory to re-index on its own afterwards.
    pub refresh_parent: Option<PathBuf>,
}

/// Counters for one dispatcher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub events: usize,
    pub rebuilds: usize,
    pub failed: usize,
}

pub struct Dispatcher<B: ImageBackend> {
    root: PathBuf,
    walker: TreeWalker<B>,
    overview: Option<IndexConfig>,
}

impl<B: ImageBackend> Dispatcher<B> {
    /// `root` must be the canonical gallery root the watcher reports paths under.
    pub fn new(root: impl Into<PathBuf>, walker: TreeWalker<B>) -> Self {
        Self {
            root: root.into(),
            walker,
            overview: None,
        }
    }

    /// Also regenerate the overview document after every rebuild.
    pub fn with_overview(mut self, index: IndexConfig) -> Self {
        self.overview = Some(index);
        self
    }

    fn clamp(&self, dir: &Path) -> PathBuf {
        if dir.starts_with(&self.root) {
            dir.to_path_buf()
        } else {
            self.root.clone()
        }
    }

    /// Decide what to rebuild for `event`.
    pub fn plan(&self, event: &ChangeEvent) -> RebuildPlan {
        let target = if event.is_dir {
            event.path.as_path()
        } else {
            event.path.parent().unwrap_or(&self.root)
        };
        let root = self.clamp(target);

        let refresh_parent = if event.is_dir && event.kind.may_add_directory() && root != self.root
        {
            root.parent().map(Path::to_path_buf)
        } else {
            None
        };

        RebuildPlan {
            root,
            refresh_parent,
        }
    }

    /// Run the rebuild for one event.
    pub fn dispatch(&self, event: &ChangeEvent) -> Result<WalkSummary, WalkError> {
        let plan = self.plan(event);
        info!(
            "{} {} -> rebuilding {}",
            event.kind,
            event.path.display(),
            plan.root.display()
        );

        let summary = self.walker.walk(&plan.root)?;
        if let Some(parent) = &plan.refresh_parent {
            self.walker.index_directory(parent)?;
        }

        if let Some(index) = &self.overview
            && let Err(e) = write_overview(&self.root, self.walker.layout(), index)
        {
            warn!("Overview not updated: {e}");
        }
        Ok(summary)
    }

    /// Consume `events` until the queue closes or `shutdown` is triggered.
    ///
    /// A failed rebuild is logged and counted; it never ends the loop.
    pub fn run(&self, events: &Receiver<ChangeEvent>, shutdown: &Shutdown) -> DispatchStats {
        let mut stats = DispatchStats::default();
        loop {
            if shutdown.is_triggered() {
                break;
            }
            let next = select! {
                recv(shutdown.signal()) -> _ => None,
                recv(events) -> event => event.ok(),
            };
            let Some(event) = next else { break };

            stats.events += 1;
            match self.dispatch(&event) {
                Ok(_) => stats.rebuilds += 1,
                Err(e) => {
                    error!("Rebuild for {} failed: {e}", event.path.display());
                    stats.failed += 1;
                }
            }
        }
        info!(
            "Dispatcher done: {} events, {} failed rebuilds",
            stats.events, stats.failed
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Layout;
    use crate::imaging::backend::tests::MockBackend;
    use crate::watch::ChangeKind;
    use chrono::Utc;
    use crossbeam_channel::bounded;
    use std::fs;
    use tempfile::TempDir;

    fn event(kind: ChangeKind, path: &Path, is_dir: bool) -> ChangeEvent {
        ChangeEvent {
            kind,
            path: path.to_path_buf(),
            size: 0,
            timestamp: Utc::now(),
            is_dir,
        }
    }

    fn dispatcher<'a>(root: &Path, backend: &'a MockBackend) -> Dispatcher<&'a MockBackend> {
        Dispatcher::new(root, TreeWalker::new(backend, Layout::default()))
    }

    #[test]
    fn file_event_rebuilds_its_directory() {
        let backend = MockBackend::new();
        let d = dispatcher(Path::new("/g"), &backend);

        let plan = d.plan(&event(ChangeKind::Create, Path::new("/g/b/new.jpg"), false));
        assert_eq!(plan.root, PathBuf::from("/g/b"));
        assert_eq!(plan.refresh_parent, None);
    }

    #[test]
    fn directory_event_rebuilds_directory_and_refreshes_parent() {
        let backend = MockBackend::new();
        let d = dispatcher(Path::new("/g"), &backend);

        let plan = d.plan(&event(ChangeKind::Create, Path::new("/g/a/new"), true));
        assert_eq!(plan.root, PathBuf::from("/g/a/new"));
        assert_eq!(plan.refresh_parent, Some(PathBuf::from("/g/a")));

        // Writes into a directory do not add it anywhere
        let plan = d.plan(&event(ChangeKind::Write, Path::new("/g/a/new"), true));
        assert_eq!(plan.refresh_parent, None);
    }

    #[test]
    fn removed_directory_rebuilds_parent() {
        let backend = MockBackend::new();
        let d = dispatcher(Path::new("/g"), &backend);
        // Gone paths stat as non-directories
        let plan = d.plan(&event(ChangeKind::Remove, Path::new("/g/a/old"), false));
        assert_eq!(plan.root, PathBuf::from("/g/a"));
    }

    #[test]
    fn plans_never_escape_root() {
        let backend = MockBackend::new();
        let d = dispatcher(Path::new("/g"), &backend);

        let plan = d.plan(&event(ChangeKind::Remove, Path::new("/g"), false));
        assert_eq!(plan.root, PathBuf::from("/g"));

        let plan = d.plan(&event(ChangeKind::Create, Path::new("/g"), true));
        assert_eq!(plan.root, PathBuf::from("/g"));
        assert_eq!(plan.refresh_parent, None);

        let plan = d.plan(&event(ChangeKind::Write, Path::new("/elsewhere/x.jpg"), false));
        assert_eq!(plan.root, PathBuf::from("/g"));
    }

    #[test]
    fn dispatch_rebuilds_only_target_subtree() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("b")).unwrap();
        fs::write(tmp.path().join("b/new.jpg"), b"").unwrap();
        let backend = MockBackend::touching();
        let d = dispatcher(tmp.path(), &backend);

        d.dispatch(&event(
            ChangeKind::Create,
            &tmp.path().join("b/new.jpg"),
            false,
        ))
        .unwrap();

        let html = fs::read_to_string(tmp.path().join("b/index.html")).unwrap();
        assert!(html.contains("new.jpg"));
        assert!(!tmp.path().join("index.html").exists());
    }

    #[test]
    fn new_directory_appears_in_parent_index() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/fresh")).unwrap();
        let backend = MockBackend::touching();
        let d = dispatcher(tmp.path(), &backend);

        d.dispatch(&event(ChangeKind::Create, &tmp.path().join("a/fresh"), true))
            .unwrap();

        assert!(tmp.path().join("a/fresh/index.html").exists());
        let parent = fs::read_to_string(tmp.path().join("a/index.html")).unwrap();
        assert!(parent.contains(r#"href="fresh/index.html""#));
        assert!(!tmp.path().join("index.html").exists());
    }

    #[test]
    fn overview_is_refreshed_after_rebuild() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("b")).unwrap();
        fs::write(tmp.path().join("b/new.jpg"), b"").unwrap();
        let backend = MockBackend::touching();
        let d = dispatcher(tmp.path(), &backend).with_overview(IndexConfig::default());

        d.dispatch(&event(ChangeKind::Create, &tmp.path().join("b/new.jpg"), false))
            .unwrap();

        let overview = fs::read_to_string(tmp.path().join("gallery.html")).unwrap();
        assert!(overview.contains("new.jpg"));
    }

    #[test]
    fn run_survives_failed_rebuilds_and_ends_when_queue_closes() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("b")).unwrap();
        let backend = MockBackend::touching();
        let d = dispatcher(tmp.path(), &backend);
        let (tx, rx) = bounded(4);

        // Parent directory does not exist: the rebuild fails
        tx.send(event(ChangeKind::Remove, &tmp.path().join("gone/x.jpg"), false))
            .unwrap();
        tx.send(event(ChangeKind::Create, &tmp.path().join("b/x.jpg"), false))
            .unwrap();
        drop(tx);

        let stats = d.run(&rx, &Shutdown::new());

        assert_eq!(
            stats,
            DispatchStats {
                events: 2,
                rebuilds: 1,
                failed: 1
            }
        );
        assert!(tmp.path().join("b/index.html").exists());
    }

    #[test]
    fn run_exits_on_shutdown() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let d = dispatcher(tmp.path(), &backend);
        let (_tx, rx) = bounded::<ChangeEvent>(1);
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let stats = d.run(&rx, &shutdown);
        assert_eq!(stats.events, 0);
    }
}
