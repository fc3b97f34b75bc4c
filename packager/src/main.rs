//! Addon packager CLI entrypoint.
//!
//! This binary loads the project manifest, resolves the layered
//! configuration, and runs the requested part of the packaging task graph.
//! Progress goes to stderr; `config` output goes to stdout.

use addon_packager::artefact::{CachePolicy, HttpFetcher};
use addon_packager::builder::SystemCommandExecutor;
use addon_packager::cli::{BuildArgs, Cli, Command, ConfigArgs};
use addon_packager::error::{PackagerError, Result};
use addon_packager::manifest::ProjectManifest;
use addon_packager::output::{
    init_logging, level_filter, package_message, report_lines, task_lines, write_stderr_line,
};
use addon_packager::pipeline::{CLEAN, Hook, Mode, PipelineState, task_graph};
use addon_packager::plan::{PackagingPlan, load_configuration};
use clap::Parser;
use std::collections::BTreeMap;
use std::io::Write;

/// What one invocation runs.
struct Invocation<'a> {
    mode: Mode,
    variants: Vec<&'a str>,
    targets: Vec<String>,
    policy: CachePolicy,
}

fn main() {
    let cli = Cli::parse();
    init_logging(level_filter(cli.verbose, cli.quiet));
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    let manifest = ProjectManifest::load(&cli.manifest)?;

    match &cli.command {
        Command::Tasks => list_tasks(&manifest, stdout),
        Command::Config(args) => print_config(&manifest, args, stdout),
        Command::Build(args) => {
            let invocation = build_invocation(&manifest, args)?;
            execute(&manifest, &invocation, cli.quiet, stderr)
        }
        Command::Package => {
            let invocation = package_invocation(&manifest);
            execute(&manifest, &invocation, cli.quiet, stderr)
        }
        Command::Run(args) => {
            let invocation = Invocation {
                mode: if args.build { Mode::Build } else { Mode::Package },
                variants: variant_names(&manifest),
                targets: args.tasks.clone(),
                policy: CachePolicy::default(),
            };
            execute(&manifest, &invocation, cli.quiet, stderr)
        }
        Command::Clean => {
            let invocation = Invocation {
                mode: Mode::Package,
                variants: variant_names(&manifest),
                targets: vec![CLEAN.to_owned()],
                policy: CachePolicy::default(),
            };
            execute(&manifest, &invocation, cli.quiet, stderr)
        }
    }
}

/// Selects the variants to build and the hooks to fire.
fn build_invocation<'a>(
    manifest: &'a ProjectManifest,
    args: &'a BuildArgs,
) -> Result<Invocation<'a>> {
    let variants = if args.variants.is_empty() {
        variant_names(manifest)
    } else {
        args.variants
            .iter()
            .map(|name| manifest.variant(name).map(|_| name.as_str()))
            .collect::<Result<Vec<_>>>()?
    };

    let mut hooks = vec![Hook::PreBuild, Hook::PostBuild];
    if args.package {
        hooks.push(Hook::Distribute);
    }

    Ok(Invocation {
        mode: Mode::Build,
        variants,
        targets: hook_targets(&hooks),
        policy: CachePolicy {
            overwrite: args.refresh_artefact,
        },
    })
}

/// Stages existing build outputs and writes the archive.
///
/// Only `Distribute` fires: packaging never needs the engine library.
fn package_invocation(manifest: &ProjectManifest) -> Invocation<'_> {
    Invocation {
        mode: Mode::Package,
        variants: variant_names(manifest),
        targets: hook_targets(&[Hook::Distribute]),
        policy: CachePolicy::default(),
    }
}

fn variant_names(manifest: &ProjectManifest) -> Vec<&str> {
    manifest
        .variants
        .iter()
        .map(|variant| variant.name.as_str())
        .collect()
}

fn hook_targets(hooks: &[Hook]) -> Vec<String> {
    hooks
        .iter()
        .flat_map(|hook| hook.targets())
        .map(|target| (*target).to_owned())
        .collect()
}

/// Resolves the plan and runs the invocation's targets.
fn execute(
    manifest: &ProjectManifest,
    invocation: &Invocation<'_>,
    quiet: bool,
    stderr: &mut dyn Write,
) -> Result<()> {
    let config = load_configuration(manifest)?;
    let plan = PackagingPlan::new(manifest, config)?;
    let graph = task_graph(invocation.mode, &invocation.variants)?;
    let mut state = PipelineState::new(
        plan,
        Box::new(HttpFetcher::default()),
        Box::new(SystemCommandExecutor),
    )
    .with_cache_policy(invocation.policy);

    let targets: Vec<&str> = invocation.targets.iter().map(String::as_str).collect();
    let report = graph.run(&targets, &mut state)?;

    if !quiet {
        for line in report_lines(&report) {
            write_stderr_line(stderr, line);
        }
        if let Some(output) = state.package() {
            write_stderr_line(stderr, package_message(output));
        }
    }
    report.into_result()
}

fn list_tasks(manifest: &ProjectManifest, stdout: &mut dyn Write) -> Result<()> {
    let graph = task_graph(Mode::Build, &variant_names(manifest))?;
    for line in task_lines(graph.tasks()) {
        writeln!(stdout, "{line}").map_err(PackagerError::Output)?;
    }
    Ok(())
}

fn print_config(
    manifest: &ProjectManifest,
    args: &ConfigArgs,
    stdout: &mut dyn Write,
) -> Result<()> {
    let config = load_configuration(manifest)?;
    if args.json {
        let values: BTreeMap<&str, &str> = config.iter().collect();
        serde_json::to_writer_pretty(&mut *stdout, &values)
            .map_err(|err| PackagerError::Output(err.into()))?;
        writeln!(stdout).map_err(PackagerError::Output)?;
    } else {
        for (key, value) in config.iter() {
            writeln!(stdout, "{key}={value}").map_err(PackagerError::Output)?;
        }
    }
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format_args!("error: {err}"));
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                write_stderr_line(stderr, format_args!("  caused by: {cause}"));
                source = cause.source();
            }
            1
        }
    }
}
