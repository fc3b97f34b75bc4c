//! User-facing output for the packager CLI.
//!
//! Progress and diagnostics go to stderr: through [`write_stderr_line`] for
//! summaries, and through a `tracing-subscriber` formatter that also receives
//! the libraries' `log` records. Stdout is reserved for machine-readable
//! output such as `config --json`.

use crate::orchestrator::{RunReport, TaskInfo, TaskStatus};
use crate::packaging::PackageOutput;
use log::LevelFilter;
use std::fmt::Display;
use std::io::Write;
use tracing_subscriber::EnvFilter;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Map `-v` count and `-q` to a maximum log level.
///
/// ```
/// use addon_packager::output::level_filter;
/// use log::LevelFilter;
///
/// assert_eq!(level_filter(0, false), LevelFilter::Warn);
/// assert_eq!(level_filter(1, false), LevelFilter::Info);
/// assert_eq!(level_filter(3, true), LevelFilter::Error);
/// ```
#[must_use]
pub const fn level_filter(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Filter showing the packager crates at `level`.
///
/// Other crates, such as the HTTP client, never log below `warn`.
#[must_use]
pub fn env_filter(level: LevelFilter) -> EnvFilter {
    let ours = level.as_str().to_ascii_lowercase();
    let others = level.min(LevelFilter::Warn).as_str().to_ascii_lowercase();
    EnvFilter::new(format!("{others},addon_packager={ours},addon_packager_common={ours}"))
}

/// Install the stderr subscriber for `level`.
///
/// A subscriber installed earlier, for example by a test harness, is kept.
pub fn init_logging(level: LevelFilter) {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
    if installed.is_err() {
        log::debug!("log subscriber already installed");
    }
}

/// One line per registered task: name, description and predecessors.
#[must_use]
pub fn task_lines<'a>(tasks: impl IntoIterator<Item = TaskInfo<'a>>) -> Vec<String> {
    tasks
        .into_iter()
        .map(|task| {
            if task.predecessors.is_empty() {
                format!("{:<32} {}", task.name, task.description)
            } else {
                format!(
                    "{:<32} {} (after {})",
                    task.name,
                    task.description,
                    task.predecessors.join(", ")
                )
            }
        })
        .collect()
}

/// One line per task in a run report.
#[must_use]
pub fn report_lines(report: &RunReport) -> Vec<String> {
    report
        .outcomes()
        .map(|(name, status)| {
            let marker = match status {
                TaskStatus::Succeeded => "ok",
                TaskStatus::Failed(_) => "FAILED",
                TaskStatus::Skipped { .. } => "skipped",
            };
            format!("  {marker:<8}{name}: {status}")
        })
        .collect()
}

/// Summary printed after the archive is written.
#[must_use]
pub fn package_message(output: &PackageOutput) -> String {
    format!(
        "Packaged {} entries into {}\n  sha256 {}",
        output.entries.len(),
        output.archive_path,
        output.sha256
    )
}
