//! Layered configuration resolution.
//!
//! [`resolve`] is a pure function: it loads each source in order, lets later
//! sources overwrite earlier keys, then evaluates derivations one at a time
//! against the accumulating map. A derivation may only see keys that already
//! exist at the point it is evaluated.

use crate::error::{ConfigError, Result};
use crate::keys;
use crate::source::PropertySource;
use log::debug;
use std::collections::BTreeMap;

/// A derived key computed from a `${key}` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    key: String,
    template: String,
}

impl Derivation {
    /// Create a derivation of `key` from `template`.
    #[must_use]
    pub fn new(key: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            template: template.into(),
        }
    }

    /// The key this derivation defines.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The `${key}` template text.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }
}

/// The derivations every packaging run evaluates before project-specific ones.
///
/// ```
/// use addon_packager_common::standard_derivations;
///
/// let keys: Vec<String> = standard_derivations()
///     .iter()
///     .map(|d| d.key().to_owned())
///     .collect();
/// assert_eq!(keys, ["pluginName", "archiveName", "artefactUrl"]);
/// ```
#[must_use]
pub fn standard_derivations() -> Vec<Derivation> {
    vec![
        Derivation::new(keys::PLUGIN_NAME, "${pluginNodeName}Plugin"),
        Derivation::new(
            keys::ARCHIVE_NAME,
            "${pluginName}-${platform}-v${pluginVersion}.zip",
        ),
        Derivation::new(
            keys::ARTEFACT_URL,
            "${artefactHost}/${artefactVersion}-${artefactChannel}/${artefactFileName}",
        ),
    ]
}

/// An immutable, fully resolved configuration map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    values: BTreeMap<String, String>,
}

impl Configuration {
    /// Look up a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Look up a key that `required_by` cannot do without.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingConfigKey`] when the key is absent.
    pub fn require(&self, key: &str, required_by: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| ConfigError::MissingConfigKey {
            key: key.to_owned(),
            required_by: required_by.to_owned(),
        })
    }

    /// Return a comma-separated value pre-split, trimmed, and without empty
    /// entries. A missing key yields an empty list.
    #[must_use]
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key).map(split_list).unwrap_or_default()
    }

    /// Interpolate `${key}` references in `template` against this map.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingConfigKey`] or
    /// [`ConfigError::MalformedTemplate`] as [`interpolate`] does.
    pub fn interpolate(&self, template: &str, required_by: &str) -> Result<String> {
        interpolate(template, &self.values, required_by)
    }

    /// Iterate over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of resolved keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no key was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Configuration
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Merge `sources` in order and evaluate `derivations` against the result.
///
/// # Errors
///
/// Returns the first source load error, or the first derivation that
/// references an unresolved key. No partial configuration is returned.
///
/// # Examples
///
/// ```
/// use addon_packager_common::{Derivation, InMemorySource, PropertySource, resolve};
///
/// let common = InMemorySource::new("common").with("pluginNodeName", "Share");
/// let platform = InMemorySource::new("android").with("pluginNodeName", "Sharing");
/// let sources: [&dyn PropertySource; 2] = [&common, &platform];
/// let derivations = [Derivation::new("pluginName", "${pluginNodeName}Plugin")];
///
/// let config = resolve(&sources, &derivations)?;
/// assert_eq!(config.get("pluginName"), Some("SharingPlugin"));
/// # Ok::<(), addon_packager_common::ConfigError>(())
/// ```
pub fn resolve(
    sources: &[&dyn PropertySource],
    derivations: &[Derivation],
) -> Result<Configuration> {
    let mut values = BTreeMap::new();

    for source in sources {
        let pairs = source.load()?;
        debug!("layering {} entries from {}", pairs.len(), source.name());
        for (key, value) in pairs {
            if let Some(previous) = values.insert(key.clone(), value) {
                debug!("{} overrides `{key}` (was {previous:?})", source.name());
            }
        }
    }

    for derivation in derivations {
        let value = interpolate(&derivation.template, &values, &derivation.key)?;
        debug!("derived `{}` = {value:?}", derivation.key);
        values.insert(derivation.key.clone(), value);
    }

    Ok(Configuration { values })
}

/// Substitute every `${key}` in `template` with its value from `values`.
///
/// Text outside placeholders is copied verbatim; there is no nesting and no
/// escaping.
///
/// # Errors
///
/// Returns [`ConfigError::MissingConfigKey`] when a referenced key is absent
/// and [`ConfigError::MalformedTemplate`] when a `${` is never closed.
pub fn interpolate(
    template: &str,
    values: &BTreeMap<String, String>,
    required_by: &str,
) -> Result<String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some((before, after)) = rest.split_once("${") {
        output.push_str(before);
        let Some((name, tail)) = after.split_once('}') else {
            return Err(ConfigError::MalformedTemplate {
                key: required_by.to_owned(),
                template: template.to_owned(),
            });
        };
        let value = values
            .get(name)
            .ok_or_else(|| ConfigError::MissingConfigKey {
                key: name.to_owned(),
                required_by: required_by.to_owned(),
            })?;
        output.push_str(value);
        rest = tail;
    }

    output.push_str(rest);
    Ok(output)
}

/// Split a comma-separated value into trimmed, non-empty entries.
///
/// ```
/// use addon_packager_common::split_list;
///
/// assert_eq!(split_list(" Foo, ,Bar ,"), vec!["Foo", "Bar"]);
/// ```
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
