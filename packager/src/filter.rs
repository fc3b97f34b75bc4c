//! Glob-based include/exclude path selection.
//!
//! Patterns match the `/`-separated path relative to a walk root. `*` stays
//! within one path component and `**/` spans zero or more directories, so
//! `**/*.png` selects PNG files at any depth including the root.

use crate::error::{PackagerError, Result};
use camino::Utf8Path;
use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Selects relative paths by include and exclude globs.
///
/// A path is selected when it matches at least one include pattern (or the
/// include list is empty) and matches no exclude pattern. Excludes always
/// win.
///
/// # Examples
///
/// ```
/// use addon_packager::filter::PathFilter;
/// use camino::Utf8Path;
///
/// let filter = PathFilter::new(&["**/*.gd", "**/*.png"], &["**/*.import"])?;
/// assert!(filter.allows(Utf8Path::new("export/ShareExport.gd")));
/// assert!(filter.allows(Utf8Path::new("icon.png")));
/// assert!(!filter.allows(Utf8Path::new("icon.png.import")));
/// assert!(!filter.allows(Utf8Path::new("README.md")));
/// # Ok::<(), addon_packager::error::PackagerError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PathFilter {
    /// Compile include and exclude patterns.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidPattern`] for the first pattern that
    /// fails to compile.
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// A filter that selects everything except `exclude` matches.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidPattern`] for an invalid pattern.
    pub fn excluding<S: AsRef<str>>(exclude: &[S]) -> Result<Self> {
        Ok(Self {
            include: Vec::new(),
            exclude: compile(exclude)?,
        })
    }

    /// Whether `relative` is selected.
    #[must_use]
    pub fn allows(&self, relative: &Utf8Path) -> bool {
        let candidate = normalise(relative);
        let included = self.include.is_empty()
            || self
                .include
                .iter()
                .any(|p| p.matches_with(&candidate, MATCH_OPTIONS));
        included && !self.is_excluded(relative)
    }

    /// Whether `relative` matches any exclude pattern.
    #[must_use]
    pub fn is_excluded(&self, relative: &Utf8Path) -> bool {
        let candidate = normalise(relative);
        self.exclude
            .iter()
            .any(|p| p.matches_with(&candidate, MATCH_OPTIONS))
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|raw| {
            let text = raw.as_ref();
            Pattern::new(text).map_err(|e| PackagerError::InvalidPattern {
                pattern: text.to_owned(),
                reason: e.msg.to_owned(),
            })
        })
        .collect()
}

/// Join path components with `/` regardless of the host separator.
fn normalise(relative: &Utf8Path) -> String {
    relative
        .components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/")
}
