//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Walk
//!
//! One line per indexed directory, relative to the gallery root, followed by
//! indented context for anything that went wrong:
//!
//! ```text
//! . (2 folders, 1 image) → index.html
//! holiday (14 images, 3 new thumbnails) → holiday/index.html
//!     Thumbnail failed: holiday/broken.jpg
//! holiday/beach (0 images) → holiday/beach/index.html
//!
//! Indexed 3 folders, 15 images, 3 thumbnails generated, 1 failed
//! ```
//!
//! ## Watch
//!
//! ```text
//! Watching /photos (queue 100)
//! Stopped after 12 events, 12 rebuilds, 0 failed
//! ```
//!
//! # Architecture
//!
//! Every `format_*` function returns lines for testability; the binary's
//! printer thread writes them to stdout. Format functions are pure: no I/O,
//! no side effects.

use crate::dispatch::DispatchStats;
use crate::walk::{WalkEvent, WalkSummary};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// `path` relative to `root` for display, `.` for the root itself.
fn relative(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.display().to_string(),
        Err(_) => path.display().to_string(),
    }
}

/// Format one walk progress event as display lines.
pub fn format_walk_event(event: &WalkEvent, root: &Path, index_file: &str) -> Vec<String> {
    match event {
        WalkEvent::DirectoryIndexed {
            path,
            subdirs,
            images,
            thumbnails_generated,
            thumbnail_failures: _,
        } => {
            let rel = relative(path, root);
            let mut details = Vec::new();
            if *subdirs > 0 {
                details.push(plural(*subdirs, "folder", "folders"));
            }
            details.push(plural(*images, "image", "images"));
            if *thumbnails_generated > 0 {
                details.push(plural(*thumbnails_generated, "new thumbnail", "new thumbnails"));
            }
            let target = if rel == "." {
                index_file.to_string()
            } else {
                format!("{rel}/{index_file}")
            };
            vec![format!("{} ({}) \u{2192} {}", rel, details.join(", "), target)]
        }
        WalkEvent::ThumbnailFailed { source, message } => vec![
            format!("{}Thumbnail failed: {}", indent(1), relative(source, root)),
            format!("{}{}", indent(2), message),
        ],
    }
}

/// Final line after a full walk.
pub fn format_walk_summary(summary: &WalkSummary) -> Vec<String> {
    let mut line = format!(
        "Indexed {}, {}, {} generated",
        plural(summary.directories, "folder", "folders"),
        plural(summary.images, "image", "images"),
        plural(summary.thumbnails_generated, "thumbnail", "thumbnails"),
    );
    if summary.thumbnail_failures > 0 {
        line.push_str(&format!(", {} failed", summary.thumbnail_failures));
    }
    vec![String::new(), line]
}

pub fn format_watch_started(root: &Path, capacity: usize) -> String {
    format!("Watching {} (queue {})", root.display(), capacity)
}

pub fn format_dispatch_stats(stats: &DispatchStats) -> String {
    format!(
        "Stopped after {}, {}, {} failed",
        plural(stats.events, "event", "events"),
        plural(stats.rebuilds, "rebuild", "rebuilds"),
        stats.failed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn indexed(path: &str, subdirs: usize, images: usize, generated: usize) -> WalkEvent {
        WalkEvent::DirectoryIndexed {
            path: PathBuf::from(path),
            subdirs,
            images,
            thumbnails_generated: generated,
            thumbnail_failures: 0,
        }
    }

    #[test]
    fn root_directory_line() {
        let lines = format_walk_event(&indexed("/g", 2, 1, 0), Path::new("/g"), "index.html");
        assert_eq!(lines, vec![". (2 folders, 1 image) \u{2192} index.html"]);
    }

    #[test]
    fn nested_directory_line_with_new_thumbnails() {
        let lines = format_walk_event(
            &indexed("/g/holiday", 0, 14, 3),
            Path::new("/g"),
            "index.html",
        );
        assert_eq!(
            lines,
            vec!["holiday (14 images, 3 new thumbnails) \u{2192} holiday/index.html"]
        );
    }

    #[test]
    fn empty_directory_still_reports_images() {
        let lines = format_walk_event(&indexed("/g/e", 0, 0, 0), Path::new("/g"), "index.html");
        assert_eq!(lines, vec!["e (0 images) \u{2192} e/index.html"]);
    }

    #[test]
    fn thumbnail_failure_is_indented_context() {
        let event = WalkEvent::ThumbnailFailed {
            source: PathBuf::from("/g/a/broken.jpg"),
            message: "Failed to decode".to_string(),
        };
        let lines = format_walk_event(&event, Path::new("/g"), "index.html");
        assert_eq!(
            lines,
            vec![
                "    Thumbnail failed: a/broken.jpg".to_string(),
                "        Failed to decode".to_string(),
            ]
        );
    }

    #[test]
    fn summary_mentions_failures_only_when_present() {
        let mut summary = WalkSummary {
            directories: 3,
            images: 15,
            thumbnails_generated: 3,
            thumbnail_failures: 0,
        };
        assert_eq!(
            format_walk_summary(&summary)[1],
            "Indexed 3 folders, 15 images, 3 thumbnails generated"
        );
        summary.thumbnail_failures = 1;
        assert!(format_walk_summary(&summary)[1].ends_with(", 1 failed"));
    }

    #[test]
    fn dispatch_stats_line() {
        let stats = DispatchStats {
            events: 1,
            rebuilds: 1,
            failed: 0,
        };
        assert_eq!(
            format_dispatch_stats(&stats),
            "Stopped after 1 event, 1 rebuild, 0 failed"
        );
    }

    #[test]
    fn relative_falls_back_to_full_path() {
        assert_eq!(relative(Path::new("/x/y"), Path::new("/g")), "/x/y");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }
}
