//! Staging of plugin files into the addons directory.
//!
//! The staging tree is `{addons_dir}/{plugin_name}`. It is deleted and
//! repopulated on every packaging run, then left on disk so the host project
//! can load the plugin directly.

use crate::error::{PackagerError, Result};
use crate::filter::PathFilter;
use crate::walk::walk_files_breadth_first;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::collections::BTreeSet;
use std::fs;

/// Files copied by one [`Stager::stage`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Relative paths now present in the staging tree from this call.
    pub staged: BTreeSet<Utf8PathBuf>,
    /// Relative paths written by more than one source root; the last root won.
    pub overridden: BTreeSet<Utf8PathBuf>,
}

/// Copies resources and build outputs into the staging tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stager {
    addons_dir: Utf8PathBuf,
    plugin_name: String,
}

impl Stager {
    /// Create a stager for `plugin_name` under `addons_dir`.
    #[must_use]
    pub fn new(addons_dir: impl Into<Utf8PathBuf>, plugin_name: impl Into<String>) -> Self {
        Self {
            addons_dir: addons_dir.into(),
            plugin_name: plugin_name.into(),
        }
    }

    /// Return the staging tree root, `{addons_dir}/{plugin_name}`.
    #[must_use]
    pub fn destination(&self) -> Utf8PathBuf {
        self.addons_dir.join(&self.plugin_name)
    }

    /// Delete the staging tree.
    ///
    /// Returns `false` when there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::FileSystem`] if the tree exists but cannot be
    /// removed.
    pub fn clean(&self) -> Result<bool> {
        let destination = self.destination();
        if !destination.exists() {
            debug!("nothing to clean at {destination}");
            return Ok(false);
        }
        fs::remove_dir_all(&destination).map_err(PackagerError::file_system(&destination))?;
        debug!("removed {destination}");
        Ok(true)
    }

    /// Copy every file selected by `filter` from each root into the tree.
    ///
    /// Roots are processed in order and each root is walked breadth-first.
    /// A later root overwrites a file at the same relative path; otherwise
    /// roots only add files.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::FileSystem`] if a root is missing or a copy
    /// fails.
    pub fn stage(&self, roots: &[Utf8PathBuf], filter: &PathFilter) -> Result<StageReport> {
        let mut report = StageReport::default();

        for root in roots {
            for relative in walk_files_breadth_first(root)? {
                if !filter.allows(&relative) {
                    continue;
                }
                self.copy_into_tree(&root.join(&relative), &relative)?;
                if !report.staged.insert(relative.clone()) {
                    debug!("{root} overrides {relative}");
                    report.overridden.insert(relative);
                }
            }
        }

        Ok(report)
    }

    /// Copy one file to `relative` inside the tree, e.g. `bin/debug/x.aar`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::FileSystem`] if `source` is missing or the
    /// copy fails.
    pub fn stage_file(&self, source: &Utf8Path, relative: &Utf8Path) -> Result<Utf8PathBuf> {
        if !source.is_file() {
            return Err(PackagerError::FileSystem {
                path: source.to_owned(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "build output not found"),
            });
        }
        self.copy_into_tree(source, relative)
    }

    fn copy_into_tree(&self, source: &Utf8Path, relative: &Utf8Path) -> Result<Utf8PathBuf> {
        let dest = self.destination().join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(PackagerError::file_system(parent))?;
        }
        fs::copy(source, &dest).map_err(PackagerError::file_system(&dest))?;
        Ok(dest)
    }
}
