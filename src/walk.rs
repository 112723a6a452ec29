//! Recursive re-indexing of a directory tree.
//!
//! [`TreeWalker::walk`] visits every directory under a root in pre-order and,
//! at each one, runs the full single-directory pipeline:
//!
//! ```text
//! ensure <thumb dir>/ → scan → generate missing thumbnails → write index
//! ```
//!
//! The reserved thumbnail directory is never scanned, indexed or descended
//! into. Nothing is incremental: every call regenerates every index document
//! of the subtree, while thumbnails are skipped when they already exist.
//!
//! ## Failure model
//!
//! Directory read, create and write errors abort the walk and are returned to
//! the caller. Directories finished before the failure keep their new
//! documents. Thumbnail failures are not errors here: they are logged,
//! reported as events, and the index document is written anyway.
//!
//! Progress is reported through an optional [`WalkEvent`] channel, the same
//! way the binary's printer thread consumes it.

use crate::config::Layout;
use crate::imaging::ImageBackend;
use crate::render::{RenderError, write_index};
use crate::scan::{DirectoryNode, ScanError, scan_directory};
use crate::thumbnails::{ThumbnailReport, generate_thumbnails, plan_thumbnails};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Progress reported while walking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    /// A directory's index document was written.
    DirectoryIndexed {
        path: PathBuf,
        subdirs: usize,
        images: usize,
        thumbnails_generated: usize,
        thumbnail_failures: usize,
    },
    /// One thumbnail could not be produced. Its tile will be broken.
    ThumbnailFailed { source: PathBuf, message: String },
}

/// Totals for one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub directories: usize,
    pub images: usize,
    pub thumbnails_generated: usize,
    pub thumbnail_failures: usize,
}

impl WalkSummary {
    fn record(&mut self, outcome: &DirectoryOutcome) {
        self.directories += 1;
        self.images += outcome.node.images.len();
        self.thumbnails_generated += outcome.thumbnails.generated();
        self.thumbnail_failures += outcome.thumbnails.failures.len();
    }
}

/// Result of indexing a single directory.
#[derive(Debug)]
pub struct DirectoryOutcome {
    pub node: DirectoryNode,
    pub index_path: PathBuf,
    pub thumbnails: ThumbnailReport,
}

/// Runs scan, thumbnail generation and rendering over directories.
pub struct TreeWalker<B: ImageBackend> {
    backend: B,
    layout: Layout,
    events: Option<Sender<WalkEvent>>,
}

impl<B: ImageBackend> TreeWalker<B> {
    pub fn new(backend: B, layout: Layout) -> Self {
        Self {
            backend,
            layout,
            events: None,
        }
    }

    /// Report progress on `events` from now on.
    pub fn with_events(mut self, events: Sender<WalkEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    fn emit(&self, event: WalkEvent) {
        if let Some(tx) = &self.events {
            // The printer may already be gone at shutdown
            tx.send(event).ok();
        }
    }

    /// Index `root` and every directory below it.
    pub fn walk(&self, root: &Path) -> Result<WalkSummary, WalkError> {
        let mut summary = WalkSummary::default();
        if root
            .file_name()
            .is_some_and(|name| self.layout.is_thumb_dir(&name.to_string_lossy()))
        {
            debug!("Not walking reserved directory {}", root.display());
            return Ok(summary);
        }

        let mut visited = HashSet::new();
        self.walk_dir(root, &mut visited, &mut summary)?;
        Ok(summary)
    }

    fn walk_dir(
        &self,
        dir: &Path,
        visited: &mut HashSet<PathBuf>,
        summary: &mut WalkSummary,
    ) -> Result<(), WalkError> {
        let key = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        if !visited.insert(key) {
            debug!("Skipping already visited {}", dir.display());
            return Ok(());
        }

        let outcome = self.index_directory(dir)?;
        summary.record(&outcome);

        for subdir in &outcome.node.subdirs {
            self.walk_dir(&dir.join(subdir), visited, summary)?;
        }
        Ok(())
    }

    /// Index one directory without descending into its subdirectories.
    pub fn index_directory(&self, dir: &Path) -> Result<DirectoryOutcome, WalkError> {
        if self.layout.thumbnails_enabled {
            let thumb_dir = dir.join(&self.layout.thumb_dir);
            // Not create_dir_all: a vanished directory must not be recreated
            match fs::create_dir(&thumb_dir) {
                Err(e) if e.kind() != std::io::ErrorKind::AlreadyExists => {
                    return Err(WalkError::Io {
                        path: thumb_dir,
                        source: e,
                    });
                }
                _ => {}
            }
        }

        let node = scan_directory(dir, &self.layout)?;

        let thumbnails = if node.thumbnails_enabled {
            let jobs = plan_thumbnails(&node, &self.layout);
            generate_thumbnails(&self.backend, &jobs)
        } else {
            ThumbnailReport::default()
        };
        for failure in &thumbnails.failures {
            warn!(
                "Thumbnail for {} failed: {}",
                failure.source.display(),
                failure.error
            );
            self.emit(WalkEvent::ThumbnailFailed {
                source: failure.source.clone(),
                message: failure.error.to_string(),
            });
        }

        let index_path = write_index(&node, &self.layout)?;
        debug!("Wrote {}", index_path.display());

        self.emit(WalkEvent::DirectoryIndexed {
            path: node.path.clone(),
            subdirs: node.subdirs.len(),
            images: node.images.len(),
            thumbnails_generated: thumbnails.generated(),
            thumbnail_failures: thumbnails.failures.len(),
        });

        Ok(DirectoryOutcome {
            node,
            index_path,
            thumbnails,
        })
    }
}
