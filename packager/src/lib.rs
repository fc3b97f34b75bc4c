//! Addon packager library.
//!
//! This crate stages, templates and packages a host-application plugin. It is
//! used by the `addon-packager` CLI binary and can be consumed
//! programmatically for testing or custom packaging workflows.
//!
//! # Modules
//!
//! - [`artefact`] - Binary dependency download and cache
//! - [`builder`] - External build commands for plugin variants
//! - [`cli`] - Command-line argument definitions
//! - [`error`] - Semantic error types
//! - [`filter`] - Include/exclude glob filtering of relative paths
//! - [`manifest`] - Project manifest (`packager.toml`) parsing
//! - [`orchestrator`] - Generic task graph with deterministic execution
//! - [`output`] - Stderr logging and progress formatting
//! - [`packaging`] - Deterministic zip archive assembly
//! - [`pipeline`] - The concrete packaging tasks and lifecycle hooks
//! - [`plan`] - Resolution of manifest and configuration into a plan
//! - [`stager`] - Copying resources and build outputs into the addons tree
//! - [`templater`] - Token substitution in staged text files

pub mod artefact;
pub mod builder;
pub mod cli;
pub mod error;
pub mod filter;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod packaging;
pub mod pipeline;
pub mod plan;
pub mod stager;
pub mod templater;
mod walk;

#[cfg(test)]
mod test_utils;
