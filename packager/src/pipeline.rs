//! The packaging task graph and its lifecycle hooks.
//!
//! [`task_graph`] registers the concrete tasks over a [`PipelineState`]. The
//! graph never reads the plan while it is being built, so listing tasks is
//! cheap and every action sees the same resolved plan at run time.
//!
//! Hooks are named trigger points that map to task targets. Running a hook
//! runs its targets together with everything they depend on.

use crate::artefact::{ArtefactFetcher, CacheOutcome, CachePolicy};
use crate::builder::{CommandExecutor, build_variant};
use crate::error::{PackagerError, Result};
use crate::orchestrator::{RunReport, TaskGraph};
use crate::packaging::{PackageOutput, PackageRequest, package};
use crate::plan::PackagingPlan;
use crate::stager::StageReport;
use crate::templater::TemplateReport;
use camino::Utf8PathBuf;
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;

/// Downloads the binary dependency into the cache.
pub const DOWNLOAD_ARTIFACT: &str = "downloadArtifact";
/// Deletes the staging tree.
pub const CLEAN_STAGED: &str = "cleanStaged";
/// Copies resources into the staging tree.
pub const COPY_RESOURCES: &str = "copyResourcesToStaged";
/// Substitutes tokens in staged text files.
pub const APPLY_TEMPLATE_TOKENS: &str = "applyTemplateTokens";
/// Aggregate of every staging task.
pub const STAGE_ALL: &str = "stageAll";
/// Writes the distributable archive.
pub const PACKAGE_DISTRIBUTION: &str = "packageDistribution";
/// Removes the staging tree and the archive output directory.
pub const CLEAN: &str = "clean";

/// Name of the external build task for `variant`.
#[must_use]
pub fn assemble_task(variant: &str) -> String {
    format!("assemble:{variant}")
}

/// Name of the task copying the build output of `variant`.
#[must_use]
pub fn copy_binary_task(variant: &str) -> String {
    format!("copyBinaryToStaged:{variant}")
}

/// Trigger points of a packaging run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// Before any variant is built.
    PreBuild,
    /// After every selected variant built successfully.
    PostBuild,
    /// When a distributable archive is requested.
    Distribute,
}

impl Hook {
    /// Tasks the hook triggers.
    #[must_use]
    pub const fn targets(self) -> &'static [&'static str] {
        match self {
            Self::PreBuild => &[DOWNLOAD_ARTIFACT],
            Self::PostBuild => &[STAGE_ALL],
            Self::Distribute => &[PACKAGE_DISTRIBUTION],
        }
    }
}

/// Whether variants are built or only their existing outputs staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Register `assemble:{variant}` tasks ahead of each binary copy.
    Build,
    /// Stage outputs left by an earlier build.
    Package,
}

/// Shared state every task reads and writes.
pub struct PipelineState {
    plan: PackagingPlan,
    fetcher: Box<dyn ArtefactFetcher>,
    executor: Box<dyn CommandExecutor>,
    cache_policy: CachePolicy,
    artefact: Option<CacheOutcome>,
    built: BTreeMap<String, Utf8PathBuf>,
    staged: StageReport,
    templates: Option<TemplateReport>,
    package: Option<PackageOutput>,
}

impl fmt::Debug for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineState")
            .field("plugin", &self.plan.plugin_name)
            .field("cache_policy", &self.cache_policy)
            .field("artefact", &self.artefact)
            .field("built", &self.built)
            .field("package", &self.package)
            .finish_non_exhaustive()
    }
}

impl PipelineState {
    /// Create the state for one run of `plan`.
    #[must_use]
    pub fn new(
        plan: PackagingPlan,
        fetcher: Box<dyn ArtefactFetcher>,
        executor: Box<dyn CommandExecutor>,
    ) -> Self {
        Self {
            plan,
            fetcher,
            executor,
            cache_policy: CachePolicy::default(),
            artefact: None,
            built: BTreeMap::new(),
            staged: StageReport::default(),
            templates: None,
            package: None,
        }
    }

    /// Replace the cache policy used by `downloadArtifact`.
    #[must_use]
    pub const fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    /// The resolved plan.
    #[must_use]
    pub const fn plan(&self) -> &PackagingPlan {
        &self.plan
    }

    /// Outcome of `downloadArtifact`, once it has run.
    #[must_use]
    pub const fn artefact(&self) -> Option<&CacheOutcome> {
        self.artefact.as_ref()
    }

    /// Build outputs by variant name.
    #[must_use]
    pub const fn built(&self) -> &BTreeMap<String, Utf8PathBuf> {
        &self.built
    }

    /// Files staged so far, relative to the staging tree.
    #[must_use]
    pub const fn staged(&self) -> &StageReport {
        &self.staged
    }

    /// Report of `applyTemplateTokens`, once it has run.
    #[must_use]
    pub const fn templates(&self) -> Option<&TemplateReport> {
        self.templates.as_ref()
    }

    /// Result of `packageDistribution`, once it has run.
    #[must_use]
    pub const fn package(&self) -> Option<&PackageOutput> {
        self.package.as_ref()
    }
}

/// Register the packaging tasks for `variants`.
///
/// In [`Mode::Build`] each variant gets an `assemble:{variant}` task after
/// `downloadArtifact`, and its binary copy waits for it.
///
/// # Errors
///
/// Returns [`PackagerError::DuplicateTask`] when a variant is listed twice.
pub fn task_graph(mode: Mode, variants: &[&str]) -> Result<TaskGraph<PipelineState>> {
    let mut graph = TaskGraph::new();

    graph.register(
        DOWNLOAD_ARTIFACT,
        "Download the host engine library into the local cache",
        &[],
        download_artifact,
    )?;

    if mode == Mode::Build {
        for variant in variants {
            let name = (*variant).to_owned();
            graph.register(
                assemble_task(variant),
                format!("Run the external build for the {variant} variant"),
                &[DOWNLOAD_ARTIFACT],
                move |state: &mut PipelineState| assemble(state, &name),
            )?;
        }
    }

    graph.register(
        CLEAN_STAGED,
        "Delete the staging tree in the addons directory",
        &[],
        clean_staged,
    )?;
    graph.register(
        COPY_RESOURCES,
        "Copy plugin resources into the staging tree",
        &[CLEAN_STAGED],
        copy_resources,
    )?;
    graph.register(
        APPLY_TEMPLATE_TOKENS,
        "Substitute configuration tokens in staged text files",
        &[COPY_RESOURCES],
        apply_template_tokens,
    )?;

    let mut stage_predecessors = vec![COPY_RESOURCES.to_owned(), APPLY_TEMPLATE_TOKENS.to_owned()];
    for variant in variants {
        let name = (*variant).to_owned();
        let task = copy_binary_task(variant);
        let build_task = assemble_task(variant);
        let predecessors: Vec<&str> = match mode {
            Mode::Build => vec![CLEAN_STAGED, build_task.as_str()],
            Mode::Package => vec![CLEAN_STAGED],
        };
        graph.register(
            task.clone(),
            format!("Copy the {variant} build output into the staging tree"),
            &predecessors,
            move |state: &mut PipelineState| copy_binary(state, &name),
        )?;
        stage_predecessors.push(task);
    }

    let stage_refs: Vec<&str> = stage_predecessors.iter().map(String::as_str).collect();
    graph.register(
        STAGE_ALL,
        "Stage resources, templates and every build output",
        &stage_refs,
        stage_all,
    )?;
    graph.register(
        PACKAGE_DISTRIBUTION,
        "Zip the staging tree into the distributable archive",
        &[STAGE_ALL],
        package_distribution,
    )?;
    graph.register(
        CLEAN,
        "Delete the staging tree and the archive output directory",
        &[CLEAN_STAGED],
        clean_output,
    )?;

    Ok(graph)
}

/// Run the targets of `hooks` in one pass over `graph`.
///
/// # Errors
///
/// Returns an error only when the graph cannot be scheduled; task failures
/// are recorded in the report.
pub fn fire(
    graph: &TaskGraph<PipelineState>,
    hooks: &[Hook],
    state: &mut PipelineState,
) -> Result<RunReport> {
    let targets: Vec<&str> = hooks.iter().flat_map(|hook| hook.targets()).copied().collect();
    debug!("firing {hooks:?}: {targets:?}");
    graph.run(&targets, state)
}

fn download_artifact(state: &mut PipelineState) -> Result<()> {
    let artefact = &state.plan.artefact;
    let outcome = artefact.cache.ensure(
        &artefact.identity,
        &artefact.url,
        &artefact.cache_path,
        state.cache_policy,
        state.fetcher.as_ref(),
    )?;
    state.artefact = Some(outcome);
    Ok(())
}

fn assemble(state: &mut PipelineState, variant: &str) -> Result<()> {
    let plan = &state.plan;
    let planned = plan.variant(variant)?;
    let output = build_variant(
        state.executor.as_ref(),
        &planned.variant,
        &plan.project_dir,
        &plan.config,
    )?;
    state.built.insert(variant.to_owned(), output);
    Ok(())
}

fn clean_staged(state: &mut PipelineState) -> Result<()> {
    state.plan.stager.clean()?;
    state.staged = StageReport::default();
    Ok(())
}

fn copy_resources(state: &mut PipelineState) -> Result<()> {
    let plan = &state.plan;
    let report = plan
        .stager
        .stage(&plan.resource_roots, &plan.resource_filter)?;
    info!(
        "staged {} resource file(s) into {}",
        report.staged.len(),
        plan.stager.destination()
    );
    state.staged.staged.extend(report.staged);
    state.staged.overridden.extend(report.overridden);
    Ok(())
}

fn apply_template_tokens(state: &mut PipelineState) -> Result<()> {
    let plan = &state.plan;
    let report = plan.templater.apply_tree(&plan.stager.destination())?;
    info!("templated {} file(s)", report.rewritten.len());
    state.templates = Some(report);
    Ok(())
}

fn copy_binary(state: &mut PipelineState, variant: &str) -> Result<()> {
    let planned = state.plan.variant(variant)?;
    let relative = planned.staged_path();
    let source = state
        .built
        .get(variant)
        .cloned()
        .unwrap_or_else(|| planned.output.clone());
    state.plan.stager.stage_file(&source, &relative)?;
    debug!("staged {source} as {relative}");
    state.staged.staged.insert(relative);
    Ok(())
}

fn stage_all(state: &mut PipelineState) -> Result<()> {
    let destination = state.plan.stager.destination();
    if !destination.is_dir() {
        return Err(PackagerError::FileSystem {
            path: destination,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "staging tree is missing"),
        });
    }
    info!(
        "staged {} file(s) for {} at {destination}",
        state.staged.staged.len(),
        state.plan.plugin_name
    );
    Ok(())
}

fn package_distribution(state: &mut PipelineState) -> Result<()> {
    let plan = &state.plan;
    let staging_dir = plan.stager.destination();
    let output = package(&PackageRequest {
        staging_dir: &staging_dir,
        archive_path: &plan.archive_path,
        internal_prefix: &plan.internal_prefix,
        plugin_name: &plan.plugin_name,
        exclude: &plan.package_exclude,
    })?;
    info!("wrote {} (sha256 {})", output.archive_path, output.sha256);
    state.package = Some(output);
    Ok(())
}

fn clean_output(state: &mut PipelineState) -> Result<()> {
    let output_dir = &state.plan.output_dir;
    if output_dir.exists() {
        fs::remove_dir_all(output_dir).map_err(PackagerError::file_system(output_dir))?;
        debug!("removed {output_dir}");
    }
    state.package = None;
    Ok(())
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
