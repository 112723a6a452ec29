//! Per-directory index documents.
//!
//! Every indexed directory gets one self-contained HTML page (inline style
//! and script, no external assets) written to the configured index filename:
//!
//! ```text
//! holiday/
//! ├── index.html      # sidebar: "..", beach/; grid: sunset.png
//! ├── .thumbs/
//! │   └── sunset.png
//! ├── beach/
//! │   └── index.html
//! └── sunset.png
//! ```
//!
//! The sidebar links the parent and each subdirectory's own index document.
//! The grid shows one tile per image, using the thumbnail when thumbnails are
//! enabled and the image itself otherwise; clicking a tile opens a full-size
//! overlay. The renderer does not check that a thumbnail was actually written,
//! so a failed generation shows up as a broken tile.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.

use crate::config::Layout;
use crate::scan::DirectoryNode;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CSS: &str = include_str!("../static/index.css");
const JS: &str = include_str!("../static/index.js");

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Percent-encode one path segment for use in an `href` or `src`.
pub(crate) fn encode_path_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Whether a page for `dir` gets a ".." link.
///
/// The parent must be a different, non-empty path and must not be the
/// filesystem root.
pub fn has_parent_link(dir: &Path) -> bool {
    match dir.parent() {
        Some(parent) => {
            !parent.as_os_str().is_empty() && parent != dir && parent.parent().is_some()
        }
        None => false,
    }
}

fn image_src(node: &DirectoryNode, layout: &Layout, name: &str) -> String {
    if node.thumbnails_enabled {
        format!(
            "{}/{}",
            encode_path_segment(&layout.thumb_dir),
            encode_path_segment(name)
        )
    } else {
        encode_path_segment(name)
    }
}

fn sidebar(node: &DirectoryNode, layout: &Layout) -> Markup {
    html! {
        nav.sidebar {
            ul {
                @if has_parent_link(&node.path) {
                    li { a.parent href={ "../" (layout.index_file) } { ".." } }
                }
                @for subdir in &node.subdirs {
                    li {
                        a href={ (encode_path_segment(subdir)) "/" (layout.index_file) } {
                            (subdir)
                        }
                    }
                }
            }
        }
    }
}

fn image_grid(node: &DirectoryNode, layout: &Layout) -> Markup {
    html! {
        @if node.images.is_empty() {
            p.empty { "No images in this folder." }
        } @else {
            div.grid {
                @for (i, name) in node.images.iter().enumerate() {
                    a href={ "#modal-" (i) } {
                        img src=(image_src(node, layout, name)) alt=(name) loading="lazy";
                    }
                }
            }
            @for (i, name) in node.images.iter().enumerate() {
                div.modal id={ "modal-" (i) } {
                    img src=(encode_path_segment(name)) alt=(name);
                }
            }
        }
    }
}

/// Build the index document for one scanned directory.
pub fn render_index(node: &DirectoryNode, layout: &Layout) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (node.name) }
                style { (PreEscaped(CSS)) }
            }
            body {
                (sidebar(node, layout))
                main.content {
                    h1 { (node.name) }
                    (image_grid(node, layout))
                }
                script { (PreEscaped(JS)) }
            }
        }
    }
}

/// Render and write the index document into the node's directory, replacing
/// any previous version. Returns the written path.
pub fn write_index(node: &DirectoryNode, layout: &Layout) -> Result<PathBuf, RenderError> {
    let path = node.path.join(&layout.index_file);
    fs::write(&path, render_index(node, layout).into_string()).map_err(|source| {
        RenderError::Io {
            path: path.clone(),
            source,
        }
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn node(path: &str, subdirs: &[&str], images: &[&str]) -> DirectoryNode {
        DirectoryNode {
            path: PathBuf::from(path),
            name: crate::scan::display_name(Path::new(path)),
            subdirs: subdirs.iter().map(|s| s.to_string()).collect(),
            images: images.iter().map(|s| s.to_string()).collect(),
            thumbnails_enabled: true,
        }
    }

    #[test]
    fn parent_link_rules() {
        assert!(has_parent_link(Path::new("/g/a")));
        assert!(has_parent_link(Path::new("g/a")));
        // Parent is the filesystem root
        assert!(!has_parent_link(Path::new("/g")));
        assert!(!has_parent_link(Path::new("/")));
        assert!(!has_parent_link(Path::new("g")));
        assert!(!has_parent_link(Path::new(".")));
    }

    #[test]
    fn document_is_self_contained() {
        let html = render_index(&node("/g/a", &[], &["a1.jpg"]), &Layout::default()).into_string();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<style>"));
        assert!(html.contains("<script>"));
        assert!(!html.contains("<link"));
        assert!(!html.contains("script src"));
    }

    #[test]
    fn images_only_directory_lists_each_image_once() {
        let html = render_index(&node("/g", &[], &["a.jpg", "b.png"]), &Layout::default())
            .into_string();
        assert_eq!(html.matches(r#"src=".thumbs/a.jpg""#).count(), 1);
        assert_eq!(html.matches(r#"src=".thumbs/b.png""#).count(), 1);
        assert!(!html.contains("/index.html\""));
    }

    #[test]
    fn subdirectories_link_their_index() {
        let html = render_index(&node("/g", &["a", "b"], &[]), &Layout::default()).into_string();
        assert!(html.contains(r#"href="a/index.html""#));
        assert!(html.contains(r#"href="b/index.html""#));
        assert!(html.contains("No images in this folder."));
    }

    #[test]
    fn parent_link_present_below_root_dir() {
        let html = render_index(&node("/g/a", &[], &[]), &Layout::default()).into_string();
        assert!(html.contains(r#"href="../index.html""#));

        let top = render_index(&node("/g", &[], &[]), &Layout::default()).into_string();
        assert!(!top.contains(r#"href="../index.html""#));
    }

    #[test]
    fn direct_image_path_without_thumbnails() {
        let mut n = node("/g", &[], &["a.jpg"]);
        n.thumbnails_enabled = false;
        let html = render_index(&n, &Layout::default()).into_string();
        assert!(html.contains(r#"src="a.jpg""#));
        assert!(!html.contains(".thumbs/"));
    }

    #[test]
    fn every_image_gets_an_overlay() {
        let html =
            render_index(&node("/g", &[], &["a.jpg", "b.jpg"]), &Layout::default()).into_string();
        assert!(html.contains(r##"href="#modal-0""##));
        assert!(html.contains(r#"id="modal-1""#));
    }

    #[test]
    fn names_are_escaped_and_encoded() {
        let html = render_index(&node("/g", &["a b"], &["x&y.jpg"]), &Layout::default())
            .into_string();
        assert!(html.contains(r#"href="a%20b/index.html""#));
        assert!(html.contains(r#"src=".thumbs/x%26y.jpg""#));
        assert!(html.contains(r#"alt="x&amp;y.jpg""#));
    }

    #[test]
    fn custom_index_filename_is_used_for_links() {
        let layout = Layout {
            index_file: "gallery-index.html".to_string(),
            ..Layout::default()
        };
        let html = render_index(&node("/g/a", &["b"], &[]), &layout).into_string();
        assert!(html.contains(r#"href="b/gallery-index.html""#));
        assert!(html.contains(r#"href="../gallery-index.html""#));
    }

    #[test]
    fn write_index_overwrites_previous_document() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("index.html");
        fs::write(&target, "stale").unwrap();
        let mut n = node("/unused", &[], &["a.jpg"]);
        n.path = tmp.path().to_path_buf();

        let written = write_index(&n, &Layout::default()).unwrap();

        assert_eq!(written, target);
        let content = fs::read_to_string(&target).unwrap();
        assert!(content.contains("a.jpg"));
        assert!(!content.contains("stale"));
    }

    #[test]
    fn write_index_into_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let mut n = node("/unused", &[], &[]);
        n.path = tmp.path().join("gone");
        let result = write_index(&n, &Layout::default());
        assert!(matches!(result, Err(RenderError::Io { .. })));
    }
}
