//! Scripted Gradle stand-in for unit tests.

use crate::builder::CommandExecutor;
use crate::error::Result;
use camino::Utf8Path;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{ExitStatus, Output};

const GRADLE_WRAPPER: &str = "./gradlew";

/// One Gradle task the script expects to be asked for, in order.
#[derive(Debug)]
pub struct GradleStep {
    task: &'static str,
    exit_code: i32,
    log: &'static str,
}

impl GradleStep {
    /// `task` runs and exits cleanly.
    pub const fn passes(task: &'static str) -> Self {
        Self {
            task,
            exit_code: 0,
            log: "",
        }
    }

    /// `task` exits with status 1, printing `log` on stderr.
    pub const fn fails(task: &'static str, log: &'static str) -> Self {
        Self {
            task,
            exit_code: 1,
            log,
        }
    }
}

/// Executor that answers `./gradlew <task>` from a fixed script.
///
/// Any invocation the script does not list, or lists in another order,
/// fails the test.
#[derive(Debug, Default)]
pub struct ScriptedGradle {
    steps: RefCell<VecDeque<GradleStep>>,
}

impl ScriptedGradle {
    /// Expect exactly `steps`.
    pub fn new(steps: impl IntoIterator<Item = GradleStep>) -> Self {
        Self {
            steps: RefCell::new(steps.into_iter().collect()),
        }
    }

    /// Expect no builds at all.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Panics unless every scripted step was consumed.
    pub fn assert_exhausted(&self) {
        let remaining: Vec<&str> = self.steps.borrow().iter().map(|step| step.task).collect();
        assert!(remaining.is_empty(), "Gradle tasks never requested: {remaining:?}");
    }
}

impl CommandExecutor for ScriptedGradle {
    fn run(&self, program: &str, args: &[String], _cwd: &Utf8Path) -> Result<Output> {
        let step = self
            .steps
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted build: {program} {args:?}"));

        assert_eq!(program, GRADLE_WRAPPER);
        assert_eq!(args, [step.task]);

        Ok(Output {
            status: exit_status(step.exit_code),
            stdout: Vec::new(),
            stderr: step.log.as_bytes().to_vec(),
        })
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

    ExitStatus::from_raw(code.unsigned_abs())
}
