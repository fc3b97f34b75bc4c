//! Deterministic directory walks over UTF-8 trees.

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// List regular files under `root`, relative to it, in sorted path order.
///
/// # Errors
///
/// Returns [`PackagerError::FileSystem`] if `root` is missing, an entry
/// cannot be read, or a path is not valid UTF-8.
pub(crate) fn walk_files(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|err| walk_error(root, err))?;
        if !entry.file_type().is_file() {
            continue;
        }
        files.push(relative_to(root, entry.path())?);
    }
    Ok(files)
}

/// List regular files under `root` breadth-first: by depth, then path.
///
/// # Errors
///
/// Same as [`walk_files`].
pub(crate) fn walk_files_breadth_first(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let mut files = walk_files(root)?;
    files.sort_by(|a, b| {
        let depth = |p: &Utf8PathBuf| p.components().count();
        depth(a).cmp(&depth(b)).then_with(|| a.cmp(b))
    });
    Ok(files)
}

/// Every ancestor directory of the given relative file paths, sorted and
/// deduplicated. The walk root itself is not listed.
#[must_use]
pub(crate) fn non_empty_dirs(files: &[Utf8PathBuf]) -> Vec<Utf8PathBuf> {
    let mut dirs: Vec<Utf8PathBuf> = files
        .iter()
        .flat_map(|file| file.ancestors().skip(1))
        .filter(|dir| !dir.as_str().is_empty())
        .map(Utf8Path::to_path_buf)
        .collect();
    dirs.sort();
    dirs.dedup();
    dirs
}

fn relative_to(root: &Utf8Path, path: &Path) -> Result<Utf8PathBuf> {
    let utf8 = utf8_path(path)?;
    utf8.strip_prefix(root)
        .map(Utf8Path::to_path_buf)
        .map_err(|_| PackagerError::FileSystem {
            source: io::Error::other(format!("{utf8} escaped the walk root")),
            path: utf8.clone(),
        })
}

/// Convert a std path from a walk into a UTF-8 path.
pub(crate) fn utf8_path(path: &Path) -> Result<Utf8PathBuf> {
    Utf8PathBuf::try_from(path.to_path_buf()).map_err(|err| {
        let lossy = Utf8PathBuf::from(err.as_path().to_string_lossy().into_owned());
        PackagerError::FileSystem {
            path: lossy,
            source: err.into_io_error(),
        }
    })
}

fn walk_error(root: &Utf8Path, err: walkdir::Error) -> PackagerError {
    let path = err
        .path()
        .map(|p| Utf8PathBuf::from(p.to_string_lossy().into_owned()))
        .unwrap_or_else(|| root.to_owned());
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
    PackagerError::FileSystem { path, source }
}
