//! In-memory task graph with deterministic topological execution.
//!
//! Tasks are registered with a name, a description, the names of their
//! predecessors, and an action over a shared context `C`. Running a set of
//! targets executes the targets and everything they transitively depend on,
//! one task at a time, in topological order with registration order as the
//! tie-break.
//!
//! A failed task never stops unrelated work: its transitive successors are
//! skipped, every independent task still runs, and nothing is rolled back.

use crate::error::{PackagerError, Result};
use log::{info, warn};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

type Action<C> = Box<dyn Fn(&mut C) -> Result<()>>;

struct Task<C> {
    name: String,
    description: String,
    predecessors: Vec<String>,
    action: Action<C>,
}

/// Name, description and predecessors of a registered task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskInfo<'a> {
    /// Task name, e.g. `stageAll`.
    pub name: &'a str,
    /// One-line description.
    pub description: &'a str,
    /// Names of the tasks that must finish first.
    pub predecessors: &'a [String],
}

/// How a task ended in a [`RunReport`].
#[derive(Debug)]
pub enum TaskStatus {
    /// The action returned `Ok`.
    Succeeded,
    /// The action returned an error.
    Failed(PackagerError),
    /// A predecessor failed, so the action never ran.
    Skipped {
        /// The failed task that blocked this one.
        blocked_by: String,
    },
}

impl TaskStatus {
    /// Whether the task succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(err) => write!(f, "failed: {err}"),
            Self::Skipped { blocked_by } => write!(f, "skipped (blocked by {blocked_by})"),
        }
    }
}

/// Outcome of every task selected by [`TaskGraph::run`], in execution order.
#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: Vec<(String, TaskStatus)>,
}

impl RunReport {
    /// Task names and statuses in execution order.
    pub fn outcomes(&self) -> impl Iterator<Item = (&str, &TaskStatus)> {
        self.outcomes
            .iter()
            .map(|(name, status)| (name.as_str(), status))
    }

    /// Status of `name`, if it was selected.
    #[must_use]
    pub fn status(&self, name: &str) -> Option<&TaskStatus> {
        self.outcomes
            .iter()
            .find(|(task, _)| task == name)
            .map(|(_, status)| status)
    }

    /// Names of the tasks that ran successfully, in execution order.
    #[must_use]
    pub fn succeeded(&self) -> Vec<&str> {
        self.outcomes()
            .filter(|(_, status)| status.is_success())
            .map(|(name, _)| name)
            .collect()
    }

    /// Whether every selected task succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|(_, status)| status.is_success())
    }

    /// Convert into the first failure, if any.
    ///
    /// # Errors
    ///
    /// Returns the error of the first task that failed.
    pub fn into_result(self) -> Result<()> {
        for (_, status) in self.outcomes {
            if let TaskStatus::Failed(err) = status {
                return Err(err);
            }
        }
        Ok(())
    }
}

/// A directed acyclic graph of named tasks over a context `C`.
pub struct TaskGraph<C> {
    tasks: Vec<Task<C>>,
    index: HashMap<String, usize>,
}

impl<C> Default for TaskGraph<C> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<C> fmt::Debug for TaskGraph<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tasks()).finish()
    }
}

impl<C> TaskGraph<C> {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task.
    ///
    /// Predecessors may name tasks registered later; [`TaskGraph::validate`]
    /// checks them once the graph is complete.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::DuplicateTask`] if `name` is already taken.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        predecessors: &[&str],
        action: F,
    ) -> Result<()>
    where
        F: Fn(&mut C) -> Result<()> + 'static,
    {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(PackagerError::DuplicateTask { name });
        }
        self.index.insert(name.clone(), self.tasks.len());
        self.tasks.push(Task {
            name,
            description: description.into(),
            predecessors: predecessors.iter().map(|p| (*p).to_owned()).collect(),
            action: Box::new(action),
        });
        Ok(())
    }

    /// Whether a task called `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered tasks in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = TaskInfo<'_>> {
        self.tasks.iter().map(|task| TaskInfo {
            name: &task.name,
            description: &task.description,
            predecessors: &task.predecessors,
        })
    }

    /// Check that every predecessor exists and the graph has no cycle.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::UnknownTask`] for a dangling predecessor and
    /// [`PackagerError::TaskCycle`] when tasks depend on each other.
    pub fn validate(&self) -> Result<()> {
        let all: Vec<usize> = (0..self.tasks.len()).collect();
        self.predecessor_indices(&all)?;
        self.topological_order(&all.into_iter().collect())?;
        Ok(())
    }

    /// The tasks `run(targets)` would execute, in execution order.
    ///
    /// # Errors
    ///
    /// Same as [`TaskGraph::validate`], plus [`PackagerError::UnknownTask`]
    /// for an unknown target.
    pub fn execution_order(&self, targets: &[&str]) -> Result<Vec<&str>> {
        let selected = self.closure(targets)?;
        let order = self.topological_order(&selected)?;
        Ok(order
            .into_iter()
            .filter_map(|i| self.tasks.get(i))
            .map(|task| task.name.as_str())
            .collect())
    }

    /// Run `targets` and their transitive predecessors against `ctx`.
    ///
    /// Task failures are recorded in the returned report; the graph itself
    /// only errors when it cannot be scheduled.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::UnknownTask`] or [`PackagerError::TaskCycle`]
    /// before any task runs.
    pub fn run(&self, targets: &[&str], ctx: &mut C) -> Result<RunReport> {
        let selected = self.closure(targets)?;
        let order = self.topological_order(&selected)?;
        let mut report = RunReport::default();
        let mut blocked: HashMap<usize, String> = HashMap::new();

        for i in order {
            let Some(task) = self.tasks.get(i) else {
                continue;
            };
            let blocker = self
                .predecessor_indices(&[i])?
                .into_iter()
                .find_map(|p| blocked.get(&p).cloned());

            if let Some(blocked_by) = blocker {
                warn!("skipping {}: blocked by {blocked_by}", task.name);
                blocked.insert(i, blocked_by.clone());
                report
                    .outcomes
                    .push((task.name.clone(), TaskStatus::Skipped { blocked_by }));
                continue;
            }

            info!("> {}", task.name);
            let status = match (task.action)(ctx) {
                Ok(()) => TaskStatus::Succeeded,
                Err(err) => {
                    warn!("{} failed: {err}", task.name);
                    blocked.insert(i, task.name.clone());
                    TaskStatus::Failed(err)
                }
            };
            report.outcomes.push((task.name.clone(), status));
        }

        Ok(report)
    }

    fn lookup(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| PackagerError::UnknownTask {
                name: name.to_owned(),
            })
    }

    /// Predecessor indices of the given tasks, in declaration order.
    fn predecessor_indices(&self, tasks: &[usize]) -> Result<Vec<usize>> {
        tasks
            .iter()
            .filter_map(|i| self.tasks.get(*i))
            .flat_map(|task| task.predecessors.iter())
            .map(|name| self.lookup(name))
            .collect()
    }

    /// Targets plus everything they transitively depend on.
    fn closure(&self, targets: &[&str]) -> Result<BTreeSet<usize>> {
        let mut selected = BTreeSet::new();
        let mut pending = targets
            .iter()
            .map(|name| self.lookup(name))
            .collect::<Result<Vec<_>>>()?;

        while let Some(i) = pending.pop() {
            if selected.insert(i) {
                pending.extend(self.predecessor_indices(&[i])?);
            }
        }
        Ok(selected)
    }

    /// Kahn's algorithm over `selected`, lowest registration index first.
    fn topological_order(&self, selected: &BTreeSet<usize>) -> Result<Vec<usize>> {
        let mut in_degree: HashMap<usize, usize> = HashMap::new();
        let mut successors: HashMap<usize, Vec<usize>> = HashMap::new();
        for &i in selected {
            let preds: BTreeSet<usize> = self
                .predecessor_indices(&[i])?
                .into_iter()
                .filter(|p| selected.contains(p))
                .collect();
            in_degree.insert(i, preds.len());
            for p in preds {
                successors.entry(p).or_default().push(i);
            }
        }

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(i, _)| *i)
            .collect();
        let mut order = Vec::with_capacity(selected.len());

        while let Some(i) = ready.pop_first() {
            order.push(i);
            for s in successors.get(&i).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(s) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*s);
                    }
                }
            }
        }

        if order.len() < selected.len() {
            let stuck = selected
                .iter()
                .find(|i| !order.contains(i))
                .and_then(|i| self.tasks.get(*i))
                .map(|task| task.name.clone())
                .unwrap_or_default();
            return Err(PackagerError::TaskCycle { task: stuck });
        }
        Ok(order)
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
