//! Layered property configuration for the addon packager.
//!
//! Property sources are merged in precedence order into an immutable
//! [`Configuration`], after which `${key}` derivations are evaluated against
//! the accumulating map. Nothing in this crate writes to the filesystem.
//!
//! # Modules
//!
//! - [`config`] - Layered resolution, derivations, and the resolved map
//! - [`error`] - Configuration error types
//! - [`keys`] - Well-known configuration key names
//! - [`properties`] - Key/value property text parsing
//! - [`source`] - Property source abstraction (file and in-memory)

pub mod config;
pub mod error;
pub mod keys;
pub mod properties;
pub mod source;

pub use config::{Configuration, Derivation, interpolate, resolve, split_list, standard_derivations};
pub use error::{ConfigError, Result};
pub use properties::parse_properties;
pub use source::{FileSource, InMemorySource, PropertySource};
