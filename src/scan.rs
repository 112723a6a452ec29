//! Single-directory scanning.
//!
//! The scanner lists the immediate contents of one directory and classifies
//! every entry as a subdirectory, an image, or something to ignore. It never
//! recurses; [`walk`](crate::walk) drives it over a whole tree.
//!
//! ## Classification
//!
//! ```text
//! holiday/
//! ├── .thumbs/          # reserved, never listed
//! ├── beach/            # subdirectory
//! ├── index.html        # generated, ignored (not an image)
//! ├── IMG_0001.JPG      # image (extension match is case-insensitive)
//! ├── sunset.png        # image
//! └── notes.txt         # ignored
//! ```
//!
//! Entries are returned sorted by file name, so two scans of an unchanged
//! directory produce identical nodes. Symlinks are classified by their target.

use crate::config::Layout;
use crate::imaging::supported_input_extensions;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to list {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One directory of the gallery, as it is on disk right now.
///
/// Not persisted: rebuilt on every scan, the filesystem is the only source
/// of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub path: PathBuf,
    /// Last path segment, used as the page title.
    pub name: String,
    /// Child directory names in scan order.
    pub subdirs: Vec<String>,
    /// Image file names in scan order.
    pub images: Vec<String>,
    pub thumbnails_enabled: bool,
}

impl DirectoryNode {
    /// The reserved thumbnail directory next to this directory's images.
    pub fn thumb_dir(&self, layout: &Layout) -> PathBuf {
        self.path.join(&layout.thumb_dir)
    }

    /// `(source, thumbnail)` path pairs for every image, in scan order.
    pub fn thumbnail_pairs(&self, layout: &Layout) -> Vec<(PathBuf, PathBuf)> {
        let thumb_dir = self.thumb_dir(layout);
        self.images
            .iter()
            .map(|name| (self.path.join(name), thumb_dir.join(name)))
            .collect()
    }
}

/// Display name for a directory: its last segment, or the whole path for
/// roots like `/` or `.`.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Case-insensitive check against the decodable image extensions.
pub fn is_image_name(name: &str) -> bool {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    supported_input_extensions().contains(&ext.as_str())
}

/// List and classify the immediate entries of `dir`.
pub fn scan_directory(dir: &Path, layout: &Layout) -> Result<DirectoryNode, ScanError> {
    let read_error = |source| ScanError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        match entry.file_name().into_string() {
            Ok(name) => names.push((name, entry.path())),
            Err(raw) => warn!("Skipping non UTF-8 entry {:?} in {}", raw, dir.display()),
        }
    }
    names.sort_by(|a, b| a.0.cmp(&b.0));

    let mut subdirs = Vec::new();
    let mut images = Vec::new();
    for (name, path) in names {
        // The index document's name is reserved whatever occupies it
        if name == layout.index_file {
            continue;
        }
        // is_dir follows symlinks, matching how browsers resolve the links
        if path.is_dir() {
            if layout.is_thumb_dir(&name) {
                continue;
            }
            subdirs.push(name);
        } else if is_image_name(&name) {
            images.push(name);
        } else {
            debug!("Ignoring {}", path.display());
        }
    }

    Ok(DirectoryNode {
        path: dir.to_path_buf(),
        name: display_name(dir),
        subdirs,
        images,
        thumbnails_enabled: layout.thumbnails_enabled,
    })
}
