//! Project manifest (`packager.toml`) parsing.
//!
//! The manifest says where the property files, resources and build outputs
//! live and how they are staged and packaged. Every relative path is
//! resolved against the directory that contains the manifest.
//!
//! ```toml
//! [config]
//! sources = ["common/config.properties", "android/config.properties"]
//!
//! [config.defaults]
//! platform = "Android"
//!
//! [[config.derive]]
//! key = "pluginArchiveStem"
//! template = "${pluginName}-v${pluginVersion}"
//!
//! [artefact]
//! cache_dir = "android/libs"
//!
//! [staging]
//! addons_dir = "demo/addons"
//! sources = ["addon"]
//! template_include = ["**/*.gd", "**/*.cfg"]
//! resource_include = ["**/*.png"]
//!
//! [staging.list_tokens]
//! iosFrameworks = "frameworks"
//!
//! [[variants]]
//! name = "debug"
//! command = ["./gradlew", "assembleDebug"]
//! output = "android/build/outputs/aar/${pluginName}-debug.aar"
//!
//! [package]
//! output_dir = "android/build/dist"
//! ```

use crate::error::{PackagerError, Result};
use crate::packaging::DEFAULT_PACKAGE_EXCLUDES;
use crate::templater::{DEFAULT_TEMPLATED_EXTENSIONS, Delimiters};
use addon_packager_common::Derivation;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;

/// Default manifest file name.
pub const DEFAULT_MANIFEST: &str = "packager.toml";

/// A parsed project manifest with paths resolved against its directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectManifest {
    /// Directory containing the manifest; external builds run here.
    pub project_dir: Utf8PathBuf,
    /// Property layering and derivations.
    pub config: ConfigSection,
    /// Binary dependency cache.
    pub artefact: ArtefactSection,
    /// Staging layout and templating.
    pub staging: StagingSection,
    /// Build variants in declaration order.
    pub variants: Vec<Variant>,
    /// Archive output.
    pub package: PackageSection,
}

/// `[config]`: property sources, inline defaults and extra derivations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigSection {
    /// Property files, lowest precedence first.
    pub sources: Vec<Utf8PathBuf>,
    /// Inline values layered below every property file.
    pub defaults: BTreeMap<String, String>,
    /// Derivations evaluated after the standard ones.
    pub derive: Vec<DerivationEntry>,
}

impl ConfigSection {
    /// The manifest derivations in declaration order.
    #[must_use]
    pub fn derivations(&self) -> Vec<Derivation> {
        self.derive
            .iter()
            .map(|entry| Derivation::new(&entry.key, &entry.template))
            .collect()
    }
}

/// One `[[config.derive]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DerivationEntry {
    /// Key to define.
    pub key: String,
    /// `${key}` template.
    pub template: String,
}

/// `[artefact]`: where the binary dependency is cached.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtefactSection {
    /// Cache directory.
    pub cache_dir: Utf8PathBuf,
}

impl Default for ArtefactSection {
    fn default() -> Self {
        Self {
            cache_dir: Utf8PathBuf::from("libs"),
        }
    }
}

/// Placeholder delimiters as written in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelimiterEntry {
    /// Opening delimiter.
    pub begin: String,
    /// Closing delimiter.
    pub end: String,
}

/// `[staging]`: the staging tree and its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StagingSection {
    /// Host project addons directory; the tree is `{addons_dir}/{pluginName}`.
    pub addons_dir: Utf8PathBuf,
    /// Resource roots, copied in order; later roots win per file.
    pub sources: Vec<Utf8PathBuf>,
    /// Globs selecting text files to template.
    pub template_include: Vec<String>,
    /// Globs selecting other resources such as images.
    pub resource_include: Vec<String>,
    /// Globs never staged.
    pub exclude: Vec<String>,
    /// Extensions the templater rewrites.
    pub templated_extensions: Vec<String>,
    /// Placeholder delimiters; `{{` and `}}` when absent.
    pub delimiters: Option<DelimiterEntry>,
    /// Extra list tokens: token name to configuration key.
    pub list_tokens: BTreeMap<String, String>,
}

impl Default for StagingSection {
    fn default() -> Self {
        Self {
            addons_dir: Utf8PathBuf::from("addons"),
            sources: Vec::new(),
            template_include: Vec::new(),
            resource_include: Vec::new(),
            exclude: Vec::new(),
            templated_extensions: DEFAULT_TEMPLATED_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_owned())
                .collect(),
            delimiters: None,
            list_tokens: BTreeMap::new(),
        }
    }
}

impl StagingSection {
    /// Include globs for resource staging: template and resource globs
    /// together. Empty means every file.
    #[must_use]
    pub fn include(&self) -> Vec<String> {
        self.template_include
            .iter()
            .chain(&self.resource_include)
            .cloned()
            .collect()
    }

    /// The configured delimiters.
    #[must_use]
    pub fn delimiters(&self) -> Delimiters {
        self.delimiters
            .as_ref()
            .map(|d| Delimiters::new(d.begin.as_str(), d.end.as_str()))
            .unwrap_or_default()
    }
}

/// A build flavour with its own external command and output binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Variant {
    /// Variant name, e.g. `debug`.
    pub name: String,
    /// Program and arguments of the external build.
    pub command: Vec<String>,
    /// Build output path; may contain `${key}` references.
    pub output: String,
}

/// `[package]`: archive destination and exclusions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageSection {
    /// Directory receiving the archive.
    pub output_dir: Utf8PathBuf,
    /// Globs kept out of the archive.
    pub exclude: Vec<String>,
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            output_dir: Utf8PathBuf::from("dist"),
            exclude: DEFAULT_PACKAGE_EXCLUDES
                .iter()
                .map(|glob| (*glob).to_owned())
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawManifest {
    config: ConfigSection,
    artefact: ArtefactSection,
    staging: StagingSection,
    variants: Vec<Variant>,
    package: PackageSection,
}

impl ProjectManifest {
    /// Read and parse the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::FileSystem`] if the file cannot be read and
    /// [`PackagerError::InvalidManifest`] if it does not parse.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(PackagerError::file_system(path))?;
        let project_dir = path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .map_or_else(|| Utf8PathBuf::from("."), Utf8Path::to_path_buf);
        Self::parse(&text, path, project_dir)
    }

    /// Parse manifest `text`, resolving paths against `project_dir`.
    ///
    /// `origin` only names the manifest in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidManifest`] when the TOML is malformed,
    /// has unknown keys, or declares a variant twice or with no command.
    pub fn parse(text: &str, origin: &Utf8Path, project_dir: Utf8PathBuf) -> Result<Self> {
        let raw: RawManifest = toml::from_str(text).map_err(|err| PackagerError::InvalidManifest {
            path: origin.to_owned(),
            reason: err.message().to_owned(),
        })?;
        validate_variants(&raw.variants, origin)?;

        let mut manifest = Self {
            project_dir,
            config: raw.config,
            artefact: raw.artefact,
            staging: raw.staging,
            variants: raw.variants,
            package: raw.package,
        };
        manifest.resolve_paths();
        Ok(manifest)
    }

    /// Look up a variant by name.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::UnknownVariant`] if none matches.
    pub fn variant(&self, name: &str) -> Result<&Variant> {
        self.variants
            .iter()
            .find(|variant| variant.name == name)
            .ok_or_else(|| PackagerError::UnknownVariant {
                name: name.to_owned(),
            })
    }

    fn resolve_paths(&mut self) {
        let dir = self.project_dir.clone();
        let anchor = |path: &mut Utf8PathBuf| {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        };
        self.config.sources.iter_mut().for_each(anchor);
        anchor(&mut self.artefact.cache_dir);
        anchor(&mut self.staging.addons_dir);
        self.staging.sources.iter_mut().for_each(anchor);
        anchor(&mut self.package.output_dir);
    }
}

fn validate_variants(variants: &[Variant], origin: &Utf8Path) -> Result<()> {
    let invalid = |reason: String| PackagerError::InvalidManifest {
        path: origin.to_owned(),
        reason,
    };
    for (i, variant) in variants.iter().enumerate() {
        if variant.command.is_empty() {
            return Err(invalid(format!("variant {} has an empty command", variant.name)));
        }
        if variants.iter().take(i).any(|earlier| earlier.name == variant.name) {
            return Err(invalid(format!("variant {} declared twice", variant.name)));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
