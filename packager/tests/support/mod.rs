//! Test support utilities for packager behavioural tests.
//!
//! This module provides a throwaway plugin project laid out like the Share
//! plugin, plus a fetcher and an executor that stand in for the network and
//! the external build tool.

use addon_packager::artefact::{ArtefactFetcher, DownloadError};
use addon_packager::builder::CommandExecutor;
use addon_packager::error::{PackagerError, Result};
use addon_packager::manifest::ProjectManifest;
use addon_packager::pipeline::PipelineState;
use addon_packager::plan::{PackagingPlan, load_configuration};
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::Cell;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{ExitStatus, Output};
use std::rc::Rc;
use tempfile::TempDir;

/// Manifest of the Share plugin project.
pub const SHARE_MANIFEST: &str = r#"
[config]
sources = ["common/config.properties", "android/config.properties"]

[config.defaults]
artefactName = "godot-lib"
artefactHost = "https://example.test/releases"

[artefact]
cache_dir = "android/libs"

[staging]
addons_dir = "demo/addons"
sources = ["addon"]
template_include = ["**/*.gd", "**/*.cfg"]
resource_include = ["**/*.png"]
exclude = ["**/.DS_Store"]

[staging.list_tokens]
frameworks = "frameworks"
iosFrameworks = "frameworks"
iosLinkerFlags = "flags"

[[variants]]
name = "debug"
command = ["./gradlew", "assembleDebug"]
output = "android/build/outputs/aar/${pluginName}-debug.aar"

[[variants]]
name = "release"
command = ["./gradlew", "assembleRelease"]
output = "android/build/outputs/aar/${pluginName}-release.aar"

[package]
output_dir = "android/build/dist"
"#;

/// A plugin project in a temporary directory.
pub struct ShareProject {
    _temp: TempDir,
    /// Project root, containing `packager.toml`.
    pub dir: Utf8PathBuf,
}

impl ShareProject {
    /// Create the project with its property files and addon resources.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf8 path");
        let project = Self { _temp: temp, dir };
        project.write("packager.toml", SHARE_MANIFEST);
        project.write(
            "common/config.properties",
            "# shared by every platform\n\
             pluginNodeName=Share\n\
             pluginVersion=5.0\n\
             pluginPackageName=org.godotengine.plugin.android.share\n\
             platform=Generic\n",
        );
        project.write(
            "android/config.properties",
            "platform=Android\n\
             artefactVersion=4.5\n\
             artefactChannel=stable\n\
             artefactFileName=godot-lib.4.5.stable.template_release.aar\n\
             frameworks=Foo,Bar\n",
        );
        project.write(
            "addon/plugin.cfg",
            "[plugin]\nname=\"{{pluginName}}\"\nversion=\"{{pluginVersion}}\"\n",
        );
        project.write(
            "addon/ShareScript.gd",
            "const PLUGIN = \"{{pluginName}}\"\nconst FRAMEWORKS = [{{iosFrameworks}}]\n\
             const EXPORT_FRAMEWORKS = [{{frameworks}}]\n\
             const IOS_ONLY = \"{{iosSdkVersion}}\"\n",
        );
        project.write("addon/icon.png", "\u{89}PNG {{pluginName}}");
        project.write("addon/icon.png.import", "[remap]\n");
        project.write("addon/.DS_Store", "junk");
        project
    }

    /// Write `contents` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.dir.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, contents).expect("write");
    }

    /// Load the project manifest.
    pub fn manifest(&self) -> ProjectManifest {
        ProjectManifest::load(&self.dir.join("packager.toml")).expect("manifest")
    }

    /// Resolve the configuration and plan.
    pub fn plan(&self) -> Result<PackagingPlan> {
        let manifest = self.manifest();
        let config = load_configuration(&manifest)?;
        PackagingPlan::new(&manifest, config)
    }

    /// Absolute path of `relative` inside the staging tree.
    pub fn staged(&self, relative: &str) -> Utf8PathBuf {
        self.dir.join("demo/addons/SharePlugin").join(relative)
    }

    /// Cache path of the engine library.
    pub fn cached_engine(&self) -> Utf8PathBuf {
        self.dir.join("android/libs/godot-lib-4.5.stable.aar")
    }

    /// Pipeline state with the given stubs.
    pub fn state(&self, fetcher: CountingFetcher, executor: FakeGradle) -> PipelineState {
        let plan = self.plan().expect("plan");
        PipelineState::new(plan, Box::new(fetcher), Box::new(executor))
    }
}

/// Fetcher that writes fixed bytes and counts its calls.
#[derive(Clone, Default)]
pub struct CountingFetcher {
    calls: Rc<Cell<usize>>,
}

impl CountingFetcher {
    /// Number of fetches so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ArtefactFetcher for CountingFetcher {
    fn fetch(&self, _url: &str, dest: &Path) -> std::result::Result<(), DownloadError> {
        self.calls.set(self.calls.get() + 1);
        fs::write(dest, b"engine library")?;
        Ok(())
    }
}

/// Executor standing in for Gradle.
///
/// A successful build writes the variant's `.aar` where the manifest says it
/// appears; a failing one writes nothing and exits with status 1.
pub struct FakeGradle {
    project_dir: Utf8PathBuf,
    failing_task: Option<String>,
}

impl FakeGradle {
    /// Every build succeeds.
    pub fn succeeding(project: &ShareProject) -> Self {
        Self {
            project_dir: project.dir.clone(),
            failing_task: None,
        }
    }

    /// `task` (e.g. `assembleDebug`) fails; every other build succeeds.
    pub fn failing(project: &ShareProject, task: &str) -> Self {
        Self {
            project_dir: project.dir.clone(),
            failing_task: Some(task.to_owned()),
        }
    }
}

impl CommandExecutor for FakeGradle {
    fn run(&self, _program: &str, args: &[String], cwd: &Utf8Path) -> Result<Output> {
        assert_eq!(cwd, self.project_dir);
        let task = args.first().cloned().unwrap_or_default();
        if self.failing_task.as_deref() == Some(task.as_str()) {
            return Ok(output(1, "FAILURE: Build failed with an exception."));
        }
        let variant = task.trim_start_matches("assemble").to_ascii_lowercase();
        let aar = self
            .project_dir
            .join(format!("android/build/outputs/aar/SharePlugin-{variant}.aar"));
        fs::create_dir_all(aar.parent().expect("parent"))
            .map_err(PackagerError::file_system(&aar))?;
        fs::write(&aar, format!("{variant} aar")).map_err(PackagerError::file_system(&aar))?;
        Ok(output(0, ""))
    }
}

#[cfg(unix)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

fn output(code: i32, stderr: &str) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Entry names of a zip archive, in archive order.
pub fn archive_entries(archive: &Utf8Path) -> Vec<String> {
    let file = fs::File::open(archive).expect("open archive");
    let mut zip = zip::ZipArchive::new(file).expect("read archive");
    (0..zip.len())
        .map(|i| zip.by_index(i).expect("entry").name().to_owned())
        .collect()
}

/// Text of one archive entry.
pub fn archive_text(archive: &Utf8Path, name: &str) -> String {
    let file = fs::File::open(archive).expect("open archive");
    let mut zip = zip::ZipArchive::new(file).expect("read archive");
    let mut entry = zip.by_name(name).expect("entry");
    let mut text = String::new();
    entry.read_to_string(&mut text).expect("read entry");
    text
}
