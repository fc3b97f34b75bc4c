//! Fetching the engine library over HTTP(S).
//!
//! The cache talks to the network only through [`ArtefactFetcher`], so cache
//! behaviour is testable offline.

use log::debug;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Overall time allowed for one engine library download.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Time allowed to establish the connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Writes the body found at a URL into a local file.
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactFetcher {
    /// Download `url` into `dest`.
    ///
    /// `dest` is always a temporary path owned by the cache, which discards
    /// it on failure.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] when the server cannot be reached, answers
    /// with a non-success status, or the body cannot be written.
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;
}

/// Why an engine library download failed.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The request failed in transit or the server refused it.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// Requested URL.
        url: String,
        /// Transport or status description.
        reason: String,
    },

    /// The server has no file at the URL.
    #[error("no engine library at {url}")]
    NotFound {
        /// Requested URL.
        url: String,
    },

    /// The body could not be written locally.
    #[error("could not write downloaded body: {0}")]
    Io(#[from] io::Error),
}

impl DownloadError {
    fn from_ureq(url: &str, err: &ureq::Error) -> Self {
        if matches!(err, ureq::Error::StatusCode(404)) {
            return Self::NotFound {
                url: url.to_owned(),
            };
        }
        Self::HttpError {
            url: url.to_owned(),
            reason: err.to_string(),
        }
    }
}

/// Blocking `ureq` fetcher.
///
/// One agent is reused for every request made through the same fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// A fetcher that gives up after `total`, or after `connect` when the
    /// host does not answer.
    #[must_use]
    pub fn with_timeouts(total: Duration, connect: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(total))
            .timeout_connect(Some(connect))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::with_timeouts(DOWNLOAD_TIMEOUT, CONNECT_TIMEOUT)
    }
}

impl ArtefactFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|err| DownloadError::from_ureq(url, &err))?;

        let mut body = response.into_body().into_reader();
        let mut writer = BufWriter::new(File::create(dest)?);
        let written = io::copy(&mut body, &mut writer).map_err(|err| DownloadError::HttpError {
            url: url.to_owned(),
            reason: format!("body interrupted: {err}"),
        })?;
        writer.flush()?;
        let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.sync_all()?;

        debug!("fetched {written} bytes from {url}");
        Ok(())
    }
}
