//! Error types for the addon packager.
//!
//! Every variant is fatal to the current pipeline invocation. Messages name
//! the offending path, task, or key so the user can act on them; re-running
//! the pipeline is the recovery path.

use crate::artefact::DownloadError;
use addon_packager_common::ConfigError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while staging or packaging a plugin.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// Configuration could not be resolved, e.g. a missing key.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The project manifest could not be read or parsed.
    #[error("invalid project manifest {path}: {reason}")]
    InvalidManifest {
        /// Path to the manifest.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// The binary dependency could not be downloaded.
    #[error("failed to download {artefact}")]
    Download {
        /// Display form of the artefact identity.
        artefact: String,
        /// The underlying download failure.
        #[source]
        source: DownloadError,
    },

    /// A filesystem operation failed on the given path.
    #[error("filesystem error at {path}: {source}")]
    FileSystem {
        /// The path being read, written, or removed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the distributable archive failed.
    #[error("failed to write archive {archive}: {reason}")]
    Packaging {
        /// Destination archive path.
        archive: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A glob pattern in the manifest is invalid.
    #[error("invalid glob pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The pattern text.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The external build command for a variant failed.
    #[error("build failed for variant {variant}: {reason}")]
    BuildFailed {
        /// Variant name, e.g. `debug`.
        variant: String,
        /// Captured stderr or spawn failure.
        reason: String,
    },

    /// A requested variant is not declared in the manifest.
    #[error("unknown build variant {name}")]
    UnknownVariant {
        /// The requested variant name.
        name: String,
    },

    /// A task name was requested or referenced but never registered.
    #[error("unknown task {name}")]
    UnknownTask {
        /// The unknown task name.
        name: String,
    },

    /// Two tasks were registered under the same name.
    #[error("task {name} registered twice")]
    DuplicateTask {
        /// The duplicated task name.
        name: String,
    },

    /// Command output could not be written, e.g. a closed stdout.
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),

    /// The task graph contains a dependency cycle.
    #[error("task graph contains a cycle through {task}")]
    TaskCycle {
        /// A task on the cycle.
        task: String,
    },
}

impl PackagerError {
    /// Build a [`PackagerError::FileSystem`] for `path`.
    ///
    /// Intended for `map_err` closures:
    ///
    /// ```
    /// use addon_packager::error::PackagerError;
    ///
    /// let err = std::fs::read("/nonexistent/file")
    ///     .map_err(PackagerError::file_system("/nonexistent/file"))
    ///     .expect_err("file is missing");
    /// assert!(err.to_string().contains("/nonexistent/file"));
    /// ```
    pub fn file_system(
        path: impl Into<Utf8PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::FileSystem { path, source }
    }

    /// Return the configuration error if this is one.
    #[must_use]
    pub fn as_config(&self) -> Option<&ConfigError> {
        match self {
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias using [`PackagerError`].
pub type Result<T> = std::result::Result<T, PackagerError>;
