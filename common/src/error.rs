//! Error types for configuration resolution.
//!
//! Every variant is fatal: a pipeline never continues with a partially
//! resolved configuration.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A derivation or consumer referenced a key that has not been resolved.
    #[error("missing configuration key `{key}` (required by {required_by})")]
    MissingConfigKey {
        /// The key that could not be found.
        key: String,
        /// The derived key or consumer that needed it.
        required_by: String,
    },

    /// A derivation template contains an unterminated `${` placeholder.
    #[error("malformed template for `{key}`: unterminated placeholder in {template:?}")]
    MalformedTemplate {
        /// The derived key whose template is malformed.
        key: String,
        /// The offending template text.
        template: String,
    },

    /// A property file could not be read.
    #[error("failed to read property source {path}")]
    SourceUnreadable {
        /// Path of the property file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
