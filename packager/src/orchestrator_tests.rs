//! Unit tests for the task graph.

use super::*;
use rstest::{fixture, rstest};

/// Records the order in which actions ran.
type Journal = Vec<String>;

fn record(name: &'static str) -> impl Fn(&mut Journal) -> Result<()> {
    move |journal| {
        journal.push(name.to_owned());
        Ok(())
    }
}

fn fail(name: &'static str) -> impl Fn(&mut Journal) -> Result<()> {
    move |journal| {
        journal.push(name.to_owned());
        Err(PackagerError::BuildFailed {
            variant: name.to_owned(),
            reason: "exit status 1".to_owned(),
        })
    }
}

/// `download -> assemble -> copyBinary -> stageAll <- applyTemplates <- copyResources <- clean`
#[fixture]
fn pipeline_shape() -> TaskGraph<Journal> {
    let mut graph = TaskGraph::new();
    graph
        .register("download", "fetch", &[], record("download"))
        .expect("register");
    graph
        .register("assemble", "build", &["download"], record("assemble"))
        .expect("register");
    graph
        .register("clean", "wipe", &[], record("clean"))
        .expect("register");
    graph
        .register("copyResources", "copy", &["clean"], record("copyResources"))
        .expect("register");
    graph
        .register(
            "applyTemplates",
            "template",
            &["copyResources"],
            record("applyTemplates"),
        )
        .expect("register");
    graph
        .register(
            "copyBinary",
            "copy binary",
            &["clean", "assemble"],
            record("copyBinary"),
        )
        .expect("register");
    graph
        .register(
            "stageAll",
            "aggregate",
            &["copyResources", "applyTemplates", "copyBinary"],
            record("stageAll"),
        )
        .expect("register");
    graph
}

#[rstest]
fn runs_closure_in_deterministic_topological_order(pipeline_shape: TaskGraph<Journal>) {
    let mut journal = Journal::new();
    let report = pipeline_shape.run(&["stageAll"], &mut journal).expect("run");

    assert!(report.is_success());
    assert_eq!(
        journal,
        vec![
            "download",
            "assemble",
            "clean",
            "copyResources",
            "applyTemplates",
            "copyBinary",
            "stageAll",
        ]
    );
    assert_eq!(report.succeeded(), journal);
}

#[rstest]
fn only_the_transitive_closure_runs(pipeline_shape: TaskGraph<Journal>) {
    let mut journal = Journal::new();
    pipeline_shape
        .run(&["applyTemplates"], &mut journal)
        .expect("run");
    assert_eq!(journal, vec!["clean", "copyResources", "applyTemplates"]);
}

#[rstest]
fn execution_order_matches_run(pipeline_shape: TaskGraph<Journal>) {
    let order = pipeline_shape
        .execution_order(&["copyBinary"])
        .expect("order");
    assert_eq!(order, vec!["download", "assemble", "clean", "copyBinary"]);
}

#[test]
fn failure_skips_successors_but_not_independent_branches() {
    let mut graph = TaskGraph::new();
    graph.register("clean", "", &[], record("clean")).expect("register");
    graph
        .register("assemble", "", &[], fail("assemble"))
        .expect("register");
    graph
        .register("copyResources", "", &["clean"], record("copyResources"))
        .expect("register");
    graph
        .register("copyBinary", "", &["assemble", "clean"], record("copyBinary"))
        .expect("register");
    graph
        .register(
            "stageAll",
            "",
            &["copyResources", "copyBinary"],
            record("stageAll"),
        )
        .expect("register");

    let mut journal = Journal::new();
    let report = graph.run(&["stageAll"], &mut journal).expect("run");

    assert_eq!(journal, vec!["clean", "assemble", "copyResources"]);
    assert!(matches!(
        report.status("assemble"),
        Some(TaskStatus::Failed(_))
    ));
    assert!(matches!(
        report.status("copyBinary"),
        Some(TaskStatus::Skipped { blocked_by }) if blocked_by == "assemble"
    ));
    assert!(matches!(
        report.status("stageAll"),
        Some(TaskStatus::Skipped { blocked_by }) if blocked_by == "assemble"
    ));
    assert!(report.status("copyResources").is_some_and(TaskStatus::is_success));

    let err = report.into_result().expect_err("run failed");
    assert!(matches!(err, PackagerError::BuildFailed { .. }));
}

#[rstest]
fn duplicate_registration_is_rejected(mut pipeline_shape: TaskGraph<Journal>) {
    let err = pipeline_shape
        .register("clean", "again", &[], record("clean"))
        .expect_err("duplicate");
    assert!(matches!(err, PackagerError::DuplicateTask { name } if name == "clean"));
}

#[rstest]
fn unknown_target_is_rejected_before_running(pipeline_shape: TaskGraph<Journal>) {
    let mut journal = Journal::new();
    let err = pipeline_shape
        .run(&["clean", "publish"], &mut journal)
        .expect_err("unknown target");
    assert!(matches!(err, PackagerError::UnknownTask { name } if name == "publish"));
    assert!(journal.is_empty());
}

#[test]
fn dangling_predecessor_fails_validation() {
    let mut graph: TaskGraph<Journal> = TaskGraph::new();
    graph
        .register("stageAll", "", &["copyBinary"], record("stageAll"))
        .expect("register");
    let err = graph.validate().expect_err("dangling predecessor");
    assert!(matches!(err, PackagerError::UnknownTask { name } if name == "copyBinary"));
}

#[test]
fn cycle_fails_validation_and_run() {
    let mut graph: TaskGraph<Journal> = TaskGraph::new();
    graph.register("a", "", &["c"], record("a")).expect("register");
    graph.register("b", "", &["a"], record("b")).expect("register");
    graph.register("c", "", &["b"], record("c")).expect("register");
    graph.register("d", "", &[], record("d")).expect("register");

    assert!(matches!(
        graph.validate(),
        Err(PackagerError::TaskCycle { .. })
    ));

    let mut journal = Journal::new();
    assert!(matches!(
        graph.run(&["b"], &mut journal),
        Err(PackagerError::TaskCycle { .. })
    ));
    assert!(journal.is_empty());
    assert_eq!(graph.execution_order(&["d"]).expect("order"), vec!["d"]);
}

#[rstest]
fn tasks_lists_registration_order(pipeline_shape: TaskGraph<Journal>) {
    let names: Vec<&str> = pipeline_shape.tasks().map(|t| t.name).collect();
    assert_eq!(names.first(), Some(&"download"));
    assert_eq!(names.last(), Some(&"stageAll"));
    let copy_binary = pipeline_shape
        .tasks()
        .find(|t| t.name == "copyBinary")
        .expect("registered");
    assert_eq!(copy_binary.predecessors, ["clean", "assemble"]);
    assert!(pipeline_shape.contains("assemble"));
    assert!(!pipeline_shape.contains("publish"));
}
