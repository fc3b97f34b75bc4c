//! Token substitution for staged script and config files.
//!
//! Only files whose extension is on the allow-list are read; everything else
//! (images, binaries) is never opened, so it stays byte-for-byte identical.
//! Substitution is purely textual: a mapped placeholder is replaced by its
//! value, an unmapped one is left exactly as written. Platform-conditional
//! scripts rely on that pass-through, so it is reported but never an error.

use crate::error::{PackagerError, Result};
use crate::walk::walk_files;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;

/// Extensions templated when the manifest does not override them.
pub const DEFAULT_TEMPLATED_EXTENSIONS: &[&str] = &["gd", "cfg"];

/// Placeholder delimiters, e.g. `{{` and `}}` or Ant-style `@` and `@`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    begin: String,
    end: String,
}

impl Delimiters {
    /// Create delimiters. Empty delimiters fall back to the defaults.
    #[must_use]
    pub fn new(begin: impl Into<String>, end: impl Into<String>) -> Self {
        let begin = begin.into();
        let end = end.into();
        if begin.is_empty() || end.is_empty() {
            return Self::default();
        }
        Self { begin, end }
    }

    /// Render `name` as a placeholder.
    #[must_use]
    pub fn placeholder(&self, name: &str) -> String {
        format!("{}{name}{}", self.begin, self.end)
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            begin: "{{".to_owned(),
            end: "}}".to_owned(),
        }
    }
}

/// Token name to replacement value.
pub type TokenMap = BTreeMap<String, String>;

/// Format list entries as comma-joined quoted strings.
///
/// ```
/// use addon_packager::templater::format_list;
///
/// let entries = ["Foo".to_owned(), "Bar".to_owned()];
/// assert_eq!(format_list(&entries), r#""Foo", "Bar""#);
/// assert_eq!(format_list(&[]), "");
/// ```
#[must_use]
pub fn format_list(entries: &[String]) -> String {
    entries
        .iter()
        .map(|entry| format!("\"{entry}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of substituting tokens in one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    /// The rewritten text.
    pub text: String,
    /// How many placeholders were replaced.
    pub replaced: usize,
    /// Names of well-formed placeholders with no mapping.
    pub unmapped: BTreeSet<String>,
}

/// What happened to a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The extension is not on the allow-list; the file was not read.
    Skipped,
    /// The file was read but contained no mapped placeholder.
    Unchanged,
    /// The file was rewritten with `replaced` substitutions.
    Rewritten {
        /// Number of substitutions.
        replaced: usize,
    },
}

/// Summary of templating a staged tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateReport {
    /// Files that were rewritten, relative to the templated root.
    pub rewritten: Vec<Utf8PathBuf>,
    /// Templated files left unchanged.
    pub unchanged: Vec<Utf8PathBuf>,
    /// Unmapped placeholder names per file.
    pub unmapped: BTreeMap<Utf8PathBuf, BTreeSet<String>>,
}

/// Applies a [`TokenMap`] to allow-listed files.
#[derive(Debug, Clone)]
pub struct Templater {
    tokens: TokenMap,
    delimiters: Delimiters,
    extensions: BTreeSet<String>,
}

impl Templater {
    /// Create a templater for the given tokens and extension allow-list.
    ///
    /// Extensions are compared case-insensitively and may be given with or
    /// without a leading dot.
    #[must_use]
    pub fn new<S: AsRef<str>>(tokens: TokenMap, delimiters: Delimiters, extensions: &[S]) -> Self {
        Self {
            tokens,
            delimiters,
            extensions: extensions
                .iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// The token map.
    #[must_use]
    pub fn tokens(&self) -> &TokenMap {
        &self.tokens
    }

    /// Whether `path` has an allow-listed extension.
    #[must_use]
    pub fn is_templated(&self, path: &Utf8Path) -> bool {
        path.extension()
            .is_some_and(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
    }

    /// Substitute placeholders in `text`.
    #[must_use]
    pub fn substitute(&self, text: &str) -> Substitution {
        let Delimiters { begin, end } = &self.delimiters;
        let mut result = Substitution {
            text: String::with_capacity(text.len()),
            ..Substitution::default()
        };
        let mut rest = text;

        while let Some((before, after)) = rest.split_once(begin.as_str()) {
            result.text.push_str(before);
            if let Some((name, tail)) = after.split_once(end.as_str()) {
                if let Some(value) = self.tokens.get(name) {
                    result.text.push_str(value);
                    result.replaced += 1;
                    rest = tail;
                    continue;
                }
                if is_token_name(name) {
                    result.unmapped.insert(name.to_owned());
                }
            }
            // Not a mapped placeholder: keep the opening delimiter verbatim
            // and resume scanning right after it.
            result.text.push_str(begin);
            rest = after;
        }

        result.text.push_str(rest);
        result
    }

    /// Apply tokens to one file, rewriting it only when something changed.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::FileSystem`] when an allow-listed file cannot
    /// be read as UTF-8 text or written back.
    pub fn apply_tokens(&self, path: &Utf8Path) -> Result<(FileOutcome, BTreeSet<String>)> {
        if !self.is_templated(path) {
            return Ok((FileOutcome::Skipped, BTreeSet::new()));
        }

        let text = fs::read_to_string(path).map_err(PackagerError::file_system(path))?;
        let substitution = self.substitute(&text);
        if substitution.replaced == 0 {
            return Ok((FileOutcome::Unchanged, substitution.unmapped));
        }

        fs::write(path, &substitution.text).map_err(PackagerError::file_system(path))?;
        Ok((
            FileOutcome::Rewritten {
                replaced: substitution.replaced,
            },
            substitution.unmapped,
        ))
    }

    /// Apply tokens to every allow-listed file under `root`.
    ///
    /// Files are visited in sorted order. Unmapped placeholders are logged at
    /// debug level and collected in the report.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::FileSystem`] on the first unreadable entry or
    /// failed rewrite.
    pub fn apply_tree(&self, root: &Utf8Path) -> Result<TemplateReport> {
        let mut report = TemplateReport::default();

        for relative in walk_files(root)? {
            let path = root.join(&relative);
            let (outcome, unmapped) = self.apply_tokens(&path)?;
            match outcome {
                FileOutcome::Skipped => continue,
                FileOutcome::Unchanged => report.unchanged.push(relative.clone()),
                FileOutcome::Rewritten { replaced } => {
                    debug!("templated {relative} ({replaced} substitutions)");
                    report.rewritten.push(relative.clone());
                }
            }
            if !unmapped.is_empty() {
                debug!("{relative} leaves unmapped placeholders: {unmapped:?}");
                report.unmapped.insert(relative, unmapped);
            }
        }

        Ok(report)
    }
}

/// Whether `name` looks like a placeholder name rather than stray text.
fn is_token_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
#[path = "templater_tests.rs"]
mod tests;
