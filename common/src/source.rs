//! Property source abstraction.
//!
//! Resolution only ever sees [`PropertySource`] values, so unit tests can
//! layer [`InMemorySource`] fixtures without touching the filesystem while
//! production code reads [`FileSource`] property files.

use crate::error::{ConfigError, Result};
use crate::properties::parse_properties;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// A named, ordered collection of key/value pairs.
pub trait PropertySource {
    /// Human-readable name used in log output.
    fn name(&self) -> &str;

    /// Load the `(key, value)` pairs in source order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SourceUnreadable`] when the backing store
    /// cannot be read.
    fn load(&self) -> Result<Vec<(String, String)>>;
}

/// A property file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: Utf8PathBuf,
}

impl FileSource {
    /// Create a source reading the property file at `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Return the path of the property file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl PropertySource for FileSource {
    fn name(&self) -> &str {
        self.path.as_str()
    }

    fn load(&self) -> Result<Vec<(String, String)>> {
        let text = fs::read_to_string(&self.path).map_err(|source| ConfigError::SourceUnreadable {
            path: self.path.clone(),
            source,
        })?;
        Ok(parse_properties(&text))
    }
}

/// An in-memory property source.
///
/// # Examples
///
/// ```
/// use addon_packager_common::{InMemorySource, PropertySource};
///
/// let source = InMemorySource::new("defaults").with("platform", "Android");
/// let pairs = source.load().expect("in-memory sources always load");
/// assert_eq!(pairs, vec![("platform".to_owned(), "Android".to_owned())]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemorySource {
    name: String,
    entries: Vec<(String, String)>,
}

impl InMemorySource {
    /// Create an empty source with the given display name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Append an entry and return the source.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Build a source from property text, e.g. a fixture file's contents.
    #[must_use]
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Self {
            name: name.into(),
            entries: parse_properties(text),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for InMemorySource
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            name: "inline".to_owned(),
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl PropertySource for InMemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vec<(String, String)>> {
        Ok(self.entries.clone())
    }
}
