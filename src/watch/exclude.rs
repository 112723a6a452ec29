//! Base-name exclusion patterns.

use super::WatchError;
use glob::Pattern;
use std::path::Path;

/// Glob patterns matched against the final path segment only.
///
/// `index.html` excludes `/g/index.html` and `/g/a/index.html` alike, while a
/// directory merely containing an excluded file is unaffected.
#[derive(Debug, Clone, Default)]
pub struct ExclusionPatterns {
    patterns: Vec<Pattern>,
}

impl ExclusionPatterns {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, WatchError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p.as_ref()).map_err(|source| WatchError::InvalidPattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy();
        self.patterns.iter().any(|p| p.matches(&name))
    }
}
