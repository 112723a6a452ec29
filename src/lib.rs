//! # Image Archive
//!
//! Keeps a browsable static HTML gallery in sync with a directory tree of
//! images. The filesystem is the only data source: every directory gets an
//! `index.html` listing its subfolders and images, and every image gets a
//! thumbnail in a reserved `.thumbs/` folder next to it.
//!
//! # Architecture: Change-Driven Re-indexing
//!
//! ```text
//! Watcher ──ChangeEvent──▶ Dispatcher ──root──▶ TreeWalker
//!                                                  │ per directory
//!                                                  ▼
//!                          scan → thumbnails (parallel) → render index
//! ```
//!
//! A one-shot run is just the TreeWalker over the gallery root. Watch mode
//! keeps the same walker and lets the dispatcher aim it at the directory an
//! event touched, so a new photo costs one directory rebuild instead of a
//! full pass.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Lists and classifies one directory: subfolders, images, everything else |
//! | [`thumbnails`] | Plans and generates missing thumbnails for one directory on the rayon pool |
//! | [`render`] | Self-contained per-directory `index.html`, rendered with Maud |
//! | [`walk`] | Recursive scan → thumbnails → render, with progress events and a summary |
//! | [`watch`] | `notify`-backed watcher with exclusions, bounded queue and cancellation |
//! | [`dispatch`] | Maps change events to rebuild roots and drives the walker |
//! | [`overview`] | Optional single-page `gallery.html` with the whole folder tree |
//! | [`config`] | `image-archive.toml` loading, merging onto stock defaults, validation |
//! | [`imaging`] | Pure-Rust decode, resize and encode behind the [`imaging::ImageBackend`] trait |
//! | [`output`] | CLI output formatting for walk and watch progress |
//!
//! # Design Decisions
//!
//! ## Existence Is the Cache
//!
//! A thumbnail is generated only when nothing exists at its path. There is no
//! manifest and no hash: re-running over an unchanged tree performs zero image
//! work, and deleting `.thumbs/` forces regeneration. An edited source image
//! keeps its stale thumbnail until that file is removed.
//!
//! ## Never React to Our Own Writes
//!
//! Rebuilds write inside the watched tree. The index filename, the thumbnail
//! directory and the overview filename are excluded by base name, and
//! excluded directories are never registered with the OS, so a rebuild cannot
//! trigger another rebuild.
//!
//! ## No Debounce
//!
//! Every event is its own rebuild, in delivery order. Bursts cost repeated
//! work but never reorder or lose an update. The queue between watcher and
//! dispatcher is bounded: a slow dispatcher stalls the watcher rather than
//! growing memory.

pub mod config;
pub mod dispatch;
pub mod imaging;
pub mod output;
pub mod overview;
pub mod render;
pub mod scan;
pub mod thumbnails;
pub mod walk;
pub mod watch;
