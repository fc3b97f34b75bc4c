//! Resolution of a manifest and its configuration into a packaging plan.
//!
//! The plan is computed once per invocation, before any task runs, so a
//! missing configuration key aborts the run before a single file is touched.

use crate::artefact::{ArtefactCache, ArtefactIdentity};
use crate::builder::variant_output;
use crate::error::Result;
use crate::filter::PathFilter;
use crate::manifest::{ProjectManifest, Variant};
use crate::packaging::internal_prefix;
use crate::stager::Stager;
use crate::templater::{Templater, TokenMap, format_list};
use addon_packager_common::{
    Configuration, FileSource, InMemorySource, PropertySource, keys, resolve,
    standard_derivations,
};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::collections::BTreeMap;

/// Name of the inline-defaults layer in log output.
const DEFAULTS_SOURCE: &str = "manifest defaults";

/// Requirement label for scalar template tokens.
const TEMPLATE_TOKENS: &str = "template tokens";

/// Resolve the configuration declared by `manifest`.
///
/// Inline defaults form the lowest layer, followed by each property file in
/// declaration order. The standard derivations run before the manifest's own.
///
/// # Errors
///
/// Returns [`crate::error::PackagerError::Config`] for an unreadable property
/// file or an unresolvable derivation.
pub fn load_configuration(manifest: &ProjectManifest) -> Result<Configuration> {
    let defaults = manifest
        .config
        .defaults
        .iter()
        .fold(InMemorySource::new(DEFAULTS_SOURCE), |source, (key, value)| {
            source.with(key.as_str(), value.as_str())
        });
    let files: Vec<FileSource> = manifest
        .config
        .sources
        .iter()
        .map(|path| FileSource::new(path.clone()))
        .collect();

    let sources: Vec<&dyn PropertySource> = std::iter::once(&defaults as &dyn PropertySource)
        .chain(files.iter().map(|file| file as &dyn PropertySource))
        .collect();
    let derivations: Vec<_> = standard_derivations()
        .into_iter()
        .chain(manifest.config.derivations())
        .collect();

    Ok(resolve(&sources, &derivations)?)
}

/// Build the template token map.
///
/// Scalar tokens are required; list tokens are formatted with
/// [`format_list`] and default to an empty list.
///
/// # Errors
///
/// Returns [`crate::error::PackagerError::Config`] when a scalar key is
/// missing.
pub fn token_map(
    config: &Configuration,
    list_tokens: &BTreeMap<String, String>,
) -> Result<TokenMap> {
    let scalar = [
        ("pluginName", keys::PLUGIN_NAME),
        ("pluginNodeName", keys::PLUGIN_NODE_NAME),
        ("pluginVersion", keys::PLUGIN_VERSION),
        ("pluginPackage", keys::PLUGIN_PACKAGE_NAME),
    ];

    let mut tokens = TokenMap::new();
    for (token, key) in scalar {
        tokens.insert(token.to_owned(), config.require(key, TEMPLATE_TOKENS)?.to_owned());
    }
    tokens.insert(
        "pluginDependencies".to_owned(),
        format_list(&config.list(keys::PLUGIN_DEPENDENCIES)),
    );
    for (token, key) in list_tokens {
        tokens.insert(token.clone(), format_list(&config.list(key)));
    }
    Ok(tokens)
}

/// Where the binary dependency comes from and where it is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactPlan {
    /// The artefact identity.
    pub identity: ArtefactIdentity,
    /// Download URL.
    pub url: String,
    /// The cache holding it.
    pub cache: ArtefactCache,
    /// Deterministic cache file path.
    pub cache_path: Utf8PathBuf,
}

/// A variant together with its resolved build output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPlan {
    /// The manifest variant.
    pub variant: Variant,
    /// Absolute path of the binary the build produces.
    pub output: Utf8PathBuf,
}

impl VariantPlan {
    /// Path of the binary inside the staging tree: `bin/{variant}/{file}`.
    #[must_use]
    pub fn staged_path(&self) -> Utf8PathBuf {
        let file_name = self.output.file_name().unwrap_or(self.output.as_str());
        Utf8PathBuf::from("bin").join(&self.variant.name).join(file_name)
    }
}

/// Everything one packaging run needs, fully resolved.
#[derive(Debug, Clone)]
pub struct PackagingPlan {
    /// Directory external builds run in.
    pub project_dir: Utf8PathBuf,
    /// The resolved configuration.
    pub config: Configuration,
    /// Plugin name, e.g. `SharePlugin`.
    pub plugin_name: String,
    /// Staging tree writer.
    pub stager: Stager,
    /// Resource roots, lowest precedence first.
    pub resource_roots: Vec<Utf8PathBuf>,
    /// Selects resource files to stage.
    pub resource_filter: PathFilter,
    /// Applies tokens to staged text files.
    pub templater: Templater,
    /// The binary dependency.
    pub artefact: ArtefactPlan,
    /// Declared variants in order.
    pub variants: Vec<VariantPlan>,
    /// Directory receiving the archive.
    pub output_dir: Utf8PathBuf,
    /// Full archive path.
    pub archive_path: Utf8PathBuf,
    /// Directory inside the archive holding the plugin directory.
    pub internal_prefix: String,
    /// Paths kept out of the archive.
    pub package_exclude: PathFilter,
}

impl PackagingPlan {
    /// Resolve `manifest` against `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PackagerError::Config`] for missing keys and
    /// [`crate::error::PackagerError::InvalidPattern`] for bad globs.
    pub fn new(manifest: &ProjectManifest, config: Configuration) -> Result<Self> {
        let plugin_name = config.require(keys::PLUGIN_NAME, "staging")?.to_owned();
        let archive_name = config.require(keys::ARCHIVE_NAME, "packaging")?;
        let output_dir = manifest.package.output_dir.clone();
        let archive_path = output_dir.join(archive_name);

        let templater = Templater::new(
            token_map(&config, &manifest.staging.list_tokens)?,
            manifest.staging.delimiters(),
            &manifest.staging.templated_extensions,
        );
        let resource_filter =
            PathFilter::new(&manifest.staging.include(), &manifest.staging.exclude)?;
        let package_exclude = PathFilter::excluding(&manifest.package.exclude)?;

        let artefact = artefact_plan(&config, &manifest.artefact.cache_dir)?;
        let variants = manifest
            .variants
            .iter()
            .map(|variant| {
                Ok(VariantPlan {
                    output: variant_output(variant, &manifest.project_dir, &config)?,
                    variant: variant.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("plan for {plugin_name}: archive {archive_path}");
        Ok(Self {
            project_dir: manifest.project_dir.clone(),
            stager: Stager::new(manifest.staging.addons_dir.clone(), plugin_name.clone()),
            internal_prefix: internal_prefix(&plugin_name),
            plugin_name,
            resource_roots: manifest.staging.sources.clone(),
            resource_filter,
            templater,
            artefact,
            variants,
            output_dir,
            archive_path,
            package_exclude,
            config,
        })
    }

    /// Look up a planned variant by name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PackagerError::UnknownVariant`] if none
    /// matches.
    pub fn variant(&self, name: &str) -> Result<&VariantPlan> {
        self.variants
            .iter()
            .find(|plan| plan.variant.name == name)
            .ok_or_else(|| crate::error::PackagerError::UnknownVariant {
                name: name.to_owned(),
            })
    }
}

fn artefact_plan(config: &Configuration, cache_dir: &Utf8Path) -> Result<ArtefactPlan> {
    const REQUIRED_BY: &str = "downloadArtifact";
    let identity = ArtefactIdentity::new(
        config.require(keys::ARTEFACT_NAME, REQUIRED_BY)?,
        config.require(keys::ARTEFACT_VERSION, REQUIRED_BY)?,
        config.require(keys::ARTEFACT_CHANNEL, REQUIRED_BY)?,
    );
    let url = config.require(keys::ARTEFACT_URL, REQUIRED_BY)?.to_owned();
    let remote_file_name = config.require(keys::ARTEFACT_FILE_NAME, REQUIRED_BY)?;
    let cache = ArtefactCache::new(cache_dir);
    let cache_path = cache.path_for(&identity, remote_file_name);
    Ok(ArtefactPlan {
        identity,
        url,
        cache,
        cache_path,
    })
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
