//! External builds of plugin variants.
//!
//! The packager never compiles anything itself. Each variant names an
//! external command (for example `./gradlew assembleDebug`) that is run in the
//! project directory, and the path of the binary it produces.

use crate::error::{PackagerError, Result};
use crate::manifest::Variant;
use addon_packager_common::Configuration;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Run `program` with `args` in `cwd` and return the captured output.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::BuildFailed`] if the command cannot be
    /// spawned.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use addon_packager::builder::{CommandExecutor, SystemCommandExecutor};
    /// use camino::Utf8Path;
    ///
    /// let executor = SystemCommandExecutor;
    /// let args = ["assembleDebug".to_owned()];
    /// let output = executor.run("./gradlew", &args, Utf8Path::new("android"))?;
    /// assert!(output.status.success());
    /// # Ok::<(), addon_packager::error::PackagerError>(())
    /// ```
    fn run(&self, program: &str, args: &[String], cwd: &Utf8Path) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, program: &str, args: &[String], cwd: &Utf8Path) -> Result<Output> {
        Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|err| PackagerError::BuildFailed {
                variant: program.to_owned(),
                reason: format!("failed to spawn {program}: {err}"),
            })
    }
}

/// Run the external build for `variant` in `project_dir`.
///
/// Returns the path of the produced binary, with `${key}` references in the
/// variant's output path resolved against `config`.
///
/// # Errors
///
/// Returns [`PackagerError::BuildFailed`] when the command cannot be spawned,
/// exits unsuccessfully, or leaves no file at the output path, and
/// [`PackagerError::Config`] when the output path references an unknown key.
pub fn build_variant(
    executor: &dyn CommandExecutor,
    variant: &Variant,
    project_dir: &Utf8Path,
    config: &Configuration,
) -> Result<Utf8PathBuf> {
    let output_path = variant_output(variant, project_dir, config)?;
    let Some((program, args)) = variant.command.split_first() else {
        return Err(build_failed(variant, "no build command configured".to_owned()));
    };

    info!("building variant {} with {}", variant.name, variant.command.join(" "));
    let output = executor
        .run(program, args, project_dir)
        .map_err(|err| match err {
            PackagerError::BuildFailed { reason, .. } => build_failed(variant, reason),
            other => other,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(build_failed(
            variant,
            format!("{} ({})", output.status, stderr.trim()),
        ));
    }

    if !output_path.is_file() {
        return Err(build_failed(
            variant,
            format!("build succeeded but produced no {output_path}"),
        ));
    }
    debug!("variant {} produced {output_path}", variant.name);
    Ok(output_path)
}

/// Resolve the output path of `variant` without building it.
///
/// # Errors
///
/// Returns [`PackagerError::Config`] when the path references an unknown key.
pub fn variant_output(
    variant: &Variant,
    project_dir: &Utf8Path,
    config: &Configuration,
) -> Result<Utf8PathBuf> {
    let required_by = format!("variant {} output", variant.name);
    let resolved = Utf8PathBuf::from(config.interpolate(&variant.output, &required_by)?);
    if resolved.is_relative() {
        Ok(project_dir.join(resolved))
    } else {
        Ok(resolved)
    }
}

fn build_failed(variant: &Variant, reason: String) -> PackagerError {
    PackagerError::BuildFailed {
        variant: variant.name.clone(),
        reason,
    }
}
