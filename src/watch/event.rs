//! Structured change events.

use chrono::{DateTime, Utc};
use notify::EventKind;
use notify::event::{MetadataKind, ModifyKind};
use std::fmt;
use std::path::PathBuf;

/// What happened to a path, reduced to what matters for re-indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Write,
    Remove,
    Rename,
    /// Permissions, timestamps and similar. Never queued.
    Metadata,
}

impl ChangeKind {
    /// Map a raw notification kind. `None` for notifications with no content
    /// meaning (access, backend-specific noise).
    pub fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Create),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Rename),
            // The poll backend reports content changes as a new mtime
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)) => Some(Self::Write),
            EventKind::Modify(ModifyKind::Metadata(_)) => Some(Self::Metadata),
            EventKind::Modify(_) => Some(Self::Write),
            EventKind::Remove(_) => Some(Self::Remove),
            // Poll watcher and some backends report unspecific changes
            EventKind::Any => Some(Self::Write),
            EventKind::Access(_) | EventKind::Other => None,
        }
    }

    /// Whether this kind can introduce a new directory to the tree.
    pub fn may_add_directory(self) -> bool {
        matches!(self, Self::Create | Self::Rename)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Create => "create",
            Self::Write => "write",
            Self::Remove => "remove",
            Self::Rename => "rename",
            Self::Metadata => "metadata",
        };
        f.write_str(label)
    }
}

/// One change delivered to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
    /// Size at observation time, 0 when the path could not be stat'ed.
    pub size: u64,
    pub timestamp: DateTime<Utc>,
    pub is_dir: bool,
}

impl ChangeEvent {
    /// Stamp `path` with the current time and a best-effort stat.
    ///
    /// A path that is already gone (removed, renamed away) gets zeroed fields.
    pub fn observe(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (size, is_dir) = path
            .metadata()
            .map(|m| (m.len(), m.is_dir()))
            .unwrap_or((0, false));
        Self {
            kind,
            path,
            size,
            timestamp: Utc::now(),
            is_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind, RenameMode};
    use tempfile::TempDir;

    #[test]
    fn maps_notify_kinds() {
        let cases = [
            (EventKind::Create(CreateKind::File), Some(ChangeKind::Create)),
            (
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                Some(ChangeKind::Write),
            ),
            (
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                Some(ChangeKind::Rename),
            ),
            (
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                Some(ChangeKind::Metadata),
            ),
            (
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Ownership)),
                Some(ChangeKind::Metadata),
            ),
            (
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
                Some(ChangeKind::Write),
            ),
            (EventKind::Remove(RemoveKind::Folder), Some(ChangeKind::Remove)),
            (EventKind::Any, Some(ChangeKind::Write)),
            (EventKind::Access(AccessKind::Any), None),
            (EventKind::Other, None),
        ];
        for (raw, expected) in cases {
            assert_eq!(ChangeKind::from_notify(&raw), expected, "{raw:?}");
        }
    }

    #[test]
    fn observe_stats_existing_paths() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.jpg");
        std::fs::write(&file, b"12345").unwrap();

        let event = ChangeEvent::observe(ChangeKind::Create, &file);
        assert_eq!(event.size, 5);
        assert!(!event.is_dir);

        let dir = ChangeEvent::observe(ChangeKind::Create, tmp.path());
        assert!(dir.is_dir);
    }

    #[test]
    fn observe_zeroes_missing_paths() {
        let tmp = TempDir::new().unwrap();
        let event = ChangeEvent::observe(ChangeKind::Remove, tmp.path().join("gone.jpg"));
        assert_eq!(event.size, 0);
        assert!(!event.is_dir);
    }

    #[test]
    fn display_is_lowercase_label() {
        assert_eq!(ChangeKind::Rename.to_string(), "rename");
    }
}
