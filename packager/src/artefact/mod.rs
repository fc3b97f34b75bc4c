//! Binary dependency caching.
//!
//! The host engine library the plugin compiles against is large and
//! versioned, so it is downloaded once into a local cache and reused on every
//! later run. A file present at the cache path is trusted without checksum
//! verification.
//!
//! # Modules
//!
//! - [`cache`] - Idempotent `ensure` with atomic temp-file writes
//! - [`download`] - HTTP fetcher abstraction and `ureq` implementation
//! - [`identity`] - Name/version/channel identity and cache file naming

pub mod cache;
pub mod download;
pub mod identity;

pub use cache::{ArtefactCache, CacheOutcome, CachePolicy};
pub use download::{ArtefactFetcher, DownloadError, HttpFetcher};
pub use identity::ArtefactIdentity;
