//! Single-page overview of the whole gallery.
//!
//! Optional companion to the per-directory index documents: one file at the
//! gallery root holding the full folder tree as a nested list. Clicking a
//! folder fills the grid with that folder's images. Hidden directories (a
//! leading `.`) are left out, which also covers the default thumbnail
//! directory.

use crate::config::{IndexConfig, Layout};
use crate::render::encode_path_segment;
use crate::scan::{ScanError, display_name, scan_directory};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CSS: &str = include_str!("../static/overview.css");
const JS: &str = include_str!("../static/overview.js");

#[derive(Error, Debug)]
pub enum OverviewError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One folder of the overview tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub name: String,
    /// Path from the gallery root, `/`-separated and percent-encoded per
    /// segment. Empty for the root itself.
    pub rel_path: String,
    pub images: Vec<String>,
    pub children: Vec<FolderEntry>,
}

/// Scan the tree under `root` into nested folder entries.
pub fn build_tree(root: &Path, layout: &Layout) -> Result<FolderEntry, OverviewError> {
    let mut visited = HashSet::new();
    build_entry(root, String::new(), layout, &mut visited)
}

fn build_entry(
    dir: &Path,
    rel_path: String,
    layout: &Layout,
    visited: &mut HashSet<PathBuf>,
) -> Result<FolderEntry, OverviewError> {
    if let Ok(canonical) = dir.canonicalize() {
        visited.insert(canonical);
    }
    let node = scan_directory(dir, layout)?;

    let mut children = Vec::new();
    for subdir in node.subdirs.iter().filter(|name| !name.starts_with('.')) {
        let child = dir.join(subdir);
        // Symlinked folders pointing back up the tree are listed once
        if let Ok(canonical) = child.canonicalize()
            && visited.contains(&canonical)
        {
            continue;
        }
        let child_rel = if rel_path.is_empty() {
            encode_path_segment(subdir)
        } else {
            format!("{rel_path}/{}", encode_path_segment(subdir))
        };
        children.push(build_entry(&child, child_rel, layout, visited)?);
    }

    Ok(FolderEntry {
        name: display_name(dir),
        rel_path,
        images: node.images,
        children,
    })
}

fn render_folder(entry: &FolderEntry) -> Markup {
    html! {
        li.folder data-path=(entry.rel_path) data-images=(entry.images.join("/")) {
            span { (entry.name) " (" (entry.images.len()) ")" }
            @if !entry.children.is_empty() {
                ul {
                    @for child in &entry.children {
                        (render_folder(child))
                    }
                }
            }
        }
    }
}

/// Build the overview document for a scanned tree.
pub fn render_overview(tree: &FolderEntry, layout: &Layout, title: &str) -> Markup {
    let thumb_dir = if layout.thumbnails_enabled {
        layout.thumb_dir.as_str()
    } else {
        ""
    };

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body data-thumb-dir=(thumb_dir) {
                nav.sidebar {
                    ul { (render_folder(tree)) }
                }
                main.content id="content" {}
                script { (PreEscaped(JS)) }
            }
        }
    }
}

/// Scan `root`, render the overview and write it next to the root index.
pub fn write_overview(
    root: &Path,
    layout: &Layout,
    index: &IndexConfig,
) -> Result<PathBuf, OverviewError> {
    let tree = build_tree(root, layout)?;
    let path = root.join(&index.overview_filename);
    let html = render_overview(&tree, layout, &index.title).into_string();
    fs::write(&path, html).map_err(|source| OverviewError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
