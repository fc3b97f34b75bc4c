//! CLI argument definitions for the addon packager.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::manifest::DEFAULT_MANIFEST;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Stage, template and package a host-application plugin.
#[derive(Parser, Debug)]
#[command(name = "addon-packager")]
#[command(version, about)]
#[command(long_about = concat!(
    "Stage, template and package a host-application plugin.\n\n",
    "The packager merges layered property files into one configuration, caches ",
    "the host engine library, runs the external build for each variant, stages ",
    "resources and build outputs into the host project's addons directory, and ",
    "zips the staged tree into a distributable archive.",
))]
#[command(after_help = concat!(
    "TASKS:\n",
    "  downloadArtifact              Cache the host engine library\n",
    "  cleanStaged                   Delete the staging tree\n",
    "  copyResourcesToStaged         Copy resources into the staging tree\n",
    "  applyTemplateTokens           Substitute tokens in staged text files\n",
    "  copyBinaryToStaged:<variant>  Stage one variant's build output\n",
    "  stageAll                      Stage everything\n",
    "  packageDistribution           Write the distributable archive\n",
    "  clean                         Remove the staging tree and archives\n\n",
    "EXAMPLES:\n",
    "  Build every variant and stage the plugin:\n",
    "    $ addon-packager build\n\n",
    "  Build the debug variant and write the archive:\n",
    "    $ addon-packager build --variant debug --package\n\n",
    "  Package outputs from an earlier build:\n",
    "    $ addon-packager package\n\n",
    "  Show the resolved configuration:\n",
    "    $ addon-packager config --json",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Project manifest.
    #[arg(
        short,
        long,
        global = true,
        value_name = "PATH",
        default_value = DEFAULT_MANIFEST
    )]
    pub manifest: Utf8PathBuf,

    /// Increase log output (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbose: u8,

    /// Only report errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Build variants, then stage the plugin.
    Build(BuildArgs),

    /// Stage existing build outputs and write the archive.
    Package,

    /// Run named tasks and everything they depend on.
    Run(RunArgs),

    /// List registered tasks.
    Tasks,

    /// Print the resolved configuration.
    Config(ConfigArgs),

    /// Remove the staging tree and the archive output directory.
    Clean,
}

/// Arguments for the build command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildArgs {
    /// Build only this variant (repeatable) [default: every variant].
    #[arg(long = "variant", value_name = "NAME")]
    pub variants: Vec<String>,

    /// Write the distributable archive after staging.
    #[arg(long)]
    pub package: bool,

    /// Download the engine library even when it is cached.
    #[arg(long)]
    pub refresh_artefact: bool,
}

/// Arguments for the run command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// Task names, e.g. `stageAll`.
    #[arg(required = true, value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Register `assemble:<variant>` tasks so binary copies build first.
    #[arg(long)]
    pub build: bool,
}

/// Arguments for the config command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigArgs {
    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
