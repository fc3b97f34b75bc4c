//! Idempotent local cache for the binary dependency.
//!
//! [`ArtefactCache::ensure`] never touches the network when the cache file
//! already exists. Downloads land in a temporary file inside the cache
//! directory and are renamed into place only on success, so a failed or
//! interrupted download never leaves a partial file at the final path.

use super::download::ArtefactFetcher;
use super::identity::ArtefactIdentity;
use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs;

/// Whether an existing cache entry may be replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Re-download even when the cache file exists.
    pub overwrite: bool,
}

/// Result of [`ArtefactCache::ensure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// The artefact was already cached; nothing was fetched.
    Hit(Utf8PathBuf),
    /// The artefact was downloaded to the cache.
    Downloaded(Utf8PathBuf),
}

impl CacheOutcome {
    /// Path of the cached artefact.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::Hit(path) | Self::Downloaded(path) => path,
        }
    }

    /// Whether a download happened.
    #[must_use]
    pub const fn downloaded(&self) -> bool {
        matches!(self, Self::Downloaded(_))
    }
}

/// A directory of downloaded artefacts keyed by identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactCache {
    root: Utf8PathBuf,
}

impl ArtefactCache {
    /// Create a cache rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Return the cache directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Deterministic cache path for `identity` and its remote file name.
    #[must_use]
    pub fn path_for(&self, identity: &ArtefactIdentity, remote_file_name: &str) -> Utf8PathBuf {
        self.root.join(identity.cache_file_name(remote_file_name))
    }

    /// Make sure the artefact exists at `cache_path`, downloading `url` if not.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Download`] when the fetch fails and
    /// [`PackagerError::FileSystem`] when the cache directory or the final
    /// rename cannot be written.
    pub fn ensure(
        &self,
        identity: &ArtefactIdentity,
        url: &str,
        cache_path: &Utf8Path,
        policy: CachePolicy,
        fetcher: &dyn ArtefactFetcher,
    ) -> Result<CacheOutcome> {
        if cache_path.is_file() && !policy.overwrite {
            debug!("{identity} already cached at {cache_path}");
            return Ok(CacheOutcome::Hit(cache_path.to_owned()));
        }

        let parent = cache_path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(PackagerError::file_system(parent))?;

        let partial = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(parent)
            .map_err(PackagerError::file_system(parent))?;

        info!("downloading {identity} from {url}");
        fetcher
            .fetch(url, partial.path())
            .map_err(|source| PackagerError::Download {
                artefact: identity.to_string(),
                source,
            })?;

        partial
            .persist(cache_path)
            .map_err(|err| PackagerError::FileSystem {
                path: cache_path.to_owned(),
                source: err.error,
            })?;
        info!("cached {identity} at {cache_path}");
        Ok(CacheOutcome::Downloaded(cache_path.to_owned()))
    }
}
