//! Well-known configuration keys read by the packaging pipeline.

/// Short node name of the plugin, e.g. `Share`.
pub const PLUGIN_NODE_NAME: &str = "pluginNodeName";
/// Full plugin name, derived as `${pluginNodeName}Plugin` by default.
pub const PLUGIN_NAME: &str = "pluginName";
/// Plugin package identifier, e.g. `org.godotengine.plugin.android.share`.
pub const PLUGIN_PACKAGE_NAME: &str = "pluginPackageName";
/// Plugin release version.
pub const PLUGIN_VERSION: &str = "pluginVersion";
/// Comma-separated native library dependencies.
pub const PLUGIN_DEPENDENCIES: &str = "pluginDependencies";
/// Target platform label used in archive names, e.g. `Android`.
pub const PLATFORM: &str = "platform";
/// File name of the distributable archive.
pub const ARCHIVE_NAME: &str = "archiveName";

/// Name of the cached binary dependency, e.g. `godot-lib`.
pub const ARTEFACT_NAME: &str = "artefactName";
/// Version of the cached binary dependency.
pub const ARTEFACT_VERSION: &str = "artefactVersion";
/// Release channel of the cached binary dependency, e.g. `stable`.
pub const ARTEFACT_CHANNEL: &str = "artefactChannel";
/// Base URL of the release host.
pub const ARTEFACT_HOST: &str = "artefactHost";
/// Remote file name of the binary dependency.
pub const ARTEFACT_FILE_NAME: &str = "artefactFileName";
/// Full download URL, derived from host, version, channel and file name.
pub const ARTEFACT_URL: &str = "artefactUrl";
