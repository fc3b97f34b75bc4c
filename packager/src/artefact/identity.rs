//! Artefact identity and cache naming.
//!
//! An artefact is identified by its name, version, and release channel. The
//! local cache file name is derived from that triple alone, e.g.
//! `godot-lib-4.5.beta3.aar`, so switching the configured version or
//! channel always points at a different cache entry.

use std::fmt;

/// The (name, version, channel) triple identifying a cached artefact.
///
/// # Examples
///
/// ```
/// use addon_packager::artefact::ArtefactIdentity;
///
/// let identity = ArtefactIdentity::new("godot-lib", "4.5", "beta3");
/// assert_eq!(
///     identity.cache_file_name("godot-lib.4.5.beta3.template_release.aar"),
///     "godot-lib-4.5.beta3.aar"
/// );
/// assert_eq!(identity.to_string(), "godot-lib 4.5-beta3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtefactIdentity {
    name: String,
    version: String,
    channel: String,
}

impl ArtefactIdentity {
    /// Create an identity from its three components.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            channel: channel.into(),
        }
    }

    /// Artefact name, e.g. `godot-lib`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Artefact version, e.g. `4.5`.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Release channel, e.g. `stable` or `beta3`.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Local cache file name: `{name}-{version}.{channel}` followed by the
    /// extension of `remote_file_name`, if it has one.
    #[must_use]
    pub fn cache_file_name(&self, remote_file_name: &str) -> String {
        let stem = format!("{}-{}.{}", self.name, self.version, self.channel);
        remote_extension(remote_file_name)
            .map_or_else(|| stem.clone(), |ext| format!("{stem}.{ext}"))
    }
}

impl fmt::Display for ArtefactIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{}", self.name, self.version, self.channel)
    }
}

/// The final extension of a remote file name, ignoring any URL query.
fn remote_extension(file_name: &str) -> Option<&str> {
    let without_query = file_name.split(['?', '#']).next().unwrap_or(file_name);
    let base = without_query.rsplit('/').next().unwrap_or(without_query);
    base.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::aar("godot-lib.4.5.beta3.template_release.aar", "godot-lib-4.5.beta3.aar")]
    #[case::zip("engine.zip", "godot-lib-4.5.beta3.zip")]
    #[case::query("lib.aar?download=1", "godot-lib-4.5.beta3.aar")]
    #[case::no_extension("engine", "godot-lib-4.5.beta3")]
    #[case::trailing_dot("engine.", "godot-lib-4.5.beta3")]
    fn cache_file_name_uses_identity_and_remote_extension(
        #[case] remote: &str,
        #[case] expected: &str,
    ) {
        let identity = ArtefactIdentity::new("godot-lib", "4.5", "beta3");
        assert_eq!(identity.cache_file_name(remote), expected);
    }

    #[test]
    fn distinct_channels_never_share_a_cache_file() {
        let beta = ArtefactIdentity::new("godot-lib", "4.5", "beta3");
        let stable = ArtefactIdentity::new("godot-lib", "4.5", "stable");
        assert_ne!(
            beta.cache_file_name("lib.aar"),
            stable.cache_file_name("lib.aar")
        );
    }
}
