//! Distributable archive assembly.
//!
//! Creates the plugin zip from the staging tree. Entries are written in
//! sorted order with a fixed timestamp and fixed permissions, so two runs over
//! the same tree produce byte-identical archives and the same SHA-256 digest.

use crate::error::{PackagerError, Result};
use crate::filter::PathFilter;
use crate::walk::{non_empty_dirs, walk_files};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Build-tool metadata never shipped in the archive.
pub const DEFAULT_PACKAGE_EXCLUDES: &[&str] = &["**/*.import", "**/*.uid"];

const FILE_PERMISSIONS: u32 = 0o644;
const DIR_PERMISSIONS: u32 = 0o755;

/// Internal directory under which the plugin directory is placed, e.g.
/// `SharePlugin-root/addons`.
#[must_use]
pub fn internal_prefix(plugin_name: &str) -> String {
    format!("{plugin_name}-root/addons")
}

/// Inputs for [`package`].
#[derive(Debug, Clone, Copy)]
pub struct PackageRequest<'a> {
    /// The staging tree, `{addons_dir}/{plugin_name}`.
    pub staging_dir: &'a Utf8Path,
    /// Destination archive path.
    pub archive_path: &'a Utf8Path,
    /// Directory inside the archive that receives the plugin directory.
    pub internal_prefix: &'a str,
    /// Plugin directory name inside the prefix.
    pub plugin_name: &'a str,
    /// Paths to leave out, relative to the staging tree.
    pub exclude: &'a PathFilter,
}

/// Result of [`package`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutput {
    /// Path to the written archive.
    pub archive_path: Utf8PathBuf,
    /// Entry names in archive order; directories end with `/`.
    pub entries: Vec<String>,
    /// Lowercase hex SHA-256 of the archive.
    pub sha256: String,
}

/// Zip the staging tree into `request.archive_path`.
///
/// The archive is first written to a temporary file beside the destination
/// and renamed into place once complete.
///
/// # Errors
///
/// Returns [`PackagerError::FileSystem`] when the staging tree cannot be read
/// and [`PackagerError::Packaging`] when the archive cannot be written.
pub fn package(request: &PackageRequest<'_>) -> Result<PackageOutput> {
    let files: Vec<Utf8PathBuf> = walk_files(request.staging_dir)?
        .into_iter()
        .filter(|relative| !request.exclude.is_excluded(relative))
        .collect();
    let plan = entry_plan(request, &files);

    let archive = request.archive_path;
    let parent = archive
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    fs::create_dir_all(parent).map_err(PackagerError::file_system(parent))?;

    let partial = tempfile::Builder::new()
        .prefix(".partial-")
        .suffix(".zip")
        .tempfile_in(parent)
        .map_err(PackagerError::file_system(parent))?;

    write_entries(partial.as_file(), request.staging_dir, &plan)
        .map_err(|reason| packaging_error(archive, reason))?;

    partial
        .persist(archive)
        .map_err(|err| packaging_error(archive, err.error.to_string()))?;

    let sha256 = compute_sha256(archive)?;
    info!("packaged {} entries into {archive}", plan.len());
    debug!("{archive} sha256 {sha256}");

    Ok(PackageOutput {
        archive_path: archive.to_owned(),
        entries: plan.into_iter().map(|entry| entry.name).collect(),
        sha256,
    })
}

/// Compute the lowercase hex SHA-256 digest of a file.
///
/// # Errors
///
/// Returns [`PackagerError::FileSystem`] if the file cannot be read.
pub fn compute_sha256(path: &Utf8Path) -> Result<String> {
    let mut file = fs::File::open(path).map_err(PackagerError::file_system(path))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(PackagerError::file_system(path))?;
        let Some(chunk) = buffer.get(..bytes_read).filter(|c| !c.is_empty()) else {
            break;
        };
        hasher.update(chunk);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// One archive entry: a directory, or a file copied from the staging tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    name: String,
    source: Option<Utf8PathBuf>,
}

fn entry_plan(request: &PackageRequest<'_>, files: &[Utf8PathBuf]) -> Vec<Entry> {
    let root = format!(
        "{}/{}",
        request.internal_prefix.trim_end_matches('/'),
        request.plugin_name
    );

    let prefix_dirs = Utf8Path::new(&root)
        .ancestors()
        .filter(|dir| !dir.as_str().is_empty())
        .map(|dir| Entry {
            name: format!("{dir}/"),
            source: None,
        });
    let tree_dirs = non_empty_dirs(files).into_iter().map(|dir| Entry {
        name: format!("{root}/{}/", slash_separated(&dir)),
        source: None,
    });
    let tree_files = files.iter().map(|file| Entry {
        name: format!("{root}/{}", slash_separated(file)),
        source: Some(file.clone()),
    });

    let mut entries: Vec<Entry> = prefix_dirs.chain(tree_dirs).chain(tree_files).collect();
    entries.sort();
    entries
}

fn write_entries(
    file: &fs::File,
    staging_dir: &Utf8Path,
    plan: &[Entry],
) -> std::result::Result<(), String> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    let mut zip = ZipWriter::new(file);

    for entry in plan {
        let Some(relative) = &entry.source else {
            zip.add_directory(entry.name.as_str(), options.unix_permissions(DIR_PERMISSIONS))
                .map_err(|e| format!("{}: {e}", entry.name))?;
            continue;
        };
        zip.start_file(entry.name.as_str(), options.unix_permissions(FILE_PERMISSIONS))
            .map_err(|e| format!("{}: {e}", entry.name))?;
        let source = staging_dir.join(relative);
        let mut reader = fs::File::open(&source).map_err(|e| format!("{source}: {e}"))?;
        io::copy(&mut reader, &mut zip).map_err(|e| format!("{source}: {e}"))?;
    }

    zip.finish().map_err(|e| e.to_string())?;
    Ok(())
}

fn slash_separated(path: &Utf8Path) -> String {
    path.components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

fn packaging_error(archive: &Utf8Path, reason: String) -> PackagerError {
    PackagerError::Packaging {
        archive: archive.to_owned(),
        reason,
    }
}

#[cfg(test)]
#[path = "packaging_tests.rs"]
mod tests;
