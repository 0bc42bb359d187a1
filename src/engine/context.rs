// ABOUTME: Run state owned by the coordinating loop and the skip policy
// ABOUTME: Tracks running/completed/failed/skipped sets and computes the ready set

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use super::dependency::DependencyGraph;
use super::result::{TaskExecutionState, TaskStatus};
use crate::parser::Workflow;
use crate::tasks::RunnerResult;

/// Whether a skipped task satisfies the tasks that depend on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipPolicy {
    /// Dependents of a skipped task never become ready
    #[default]
    Block,
    /// A skipped task counts as satisfied, like a completed one
    Propagate,
}

impl SkipPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipPolicy::Block => "block",
            SkipPolicy::Propagate => "propagate",
        }
    }
}

impl FromStr for SkipPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(SkipPolicy::Block),
            "propagate" => Ok(SkipPolicy::Propagate),
            other => Err(format!(
                "invalid skip policy '{}', expected 'block' or 'propagate'",
                other
            )),
        }
    }
}

impl std::fmt::Display for SkipPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping for one run. Only the coordinating loop mutates it.
#[derive(Debug)]
pub struct RunState {
    order: Vec<String>,
    dependencies: HashMap<String, Vec<String>>,
    states: IndexMap<String, TaskExecutionState>,
    running: HashSet<String>,
    completed: HashSet<String>,
    failed: HashSet<String>,
    skipped: HashSet<String>,
    skip_policy: SkipPolicy,
}

impl RunState {
    pub fn new(workflow: &Workflow, graph: &DependencyGraph, skip_policy: SkipPolicy) -> Self {
        let states = workflow
            .tasks
            .iter()
            .map(|task| {
                (
                    task.id.clone(),
                    TaskExecutionState::new(
                        task.id.clone(),
                        task.display_name().to_string(),
                        task.task_type(),
                    ),
                )
            })
            .collect();

        let dependencies = workflow
            .tasks
            .iter()
            .map(|task| (task.id.clone(), graph.get_dependencies(&task.id)))
            .collect();

        Self {
            order: graph.topological_order(),
            dependencies,
            states,
            running: HashSet::new(),
            completed: HashSet::new(),
            failed: HashSet::new(),
            skipped: HashSet::new(),
            skip_policy,
        }
    }

    fn is_satisfied(&self, dependency: &str) -> bool {
        self.completed.contains(dependency)
            || (self.skip_policy == SkipPolicy::Propagate && self.skipped.contains(dependency))
    }

    /// Pending tasks whose dependencies are all satisfied, in topological order
    pub fn ready_tasks(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| {
                self.states
                    .get(*id)
                    .map(|state| state.status == TaskStatus::Pending)
                    .unwrap_or(false)
            })
            .filter(|id| {
                self.dependencies
                    .get(*id)
                    .map(|deps| deps.iter().all(|dep| self.is_satisfied(dep)))
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    pub fn mark_running(&mut self, task_id: &str) -> bool {
        let moved = self
            .states
            .get_mut(task_id)
            .map(|state| state.mark_running())
            .unwrap_or(false);
        if moved {
            self.running.insert(task_id.to_string());
        }
        moved
    }

    pub fn mark_skipped(&mut self, task_id: &str, reason: String) -> bool {
        let moved = self
            .states
            .get_mut(task_id)
            .map(|state| state.mark_skipped(reason))
            .unwrap_or(false);
        if moved {
            self.skipped.insert(task_id.to_string());
        }
        moved
    }

    /// Apply a runner outcome to a running task
    pub fn record_outcome(&mut self, task_id: &str, outcome: RunnerResult, attempts: u32) -> bool {
        let success = outcome.success;
        let moved = self
            .states
            .get_mut(task_id)
            .map(|state| state.mark_finished(outcome, attempts))
            .unwrap_or(false);
        if !moved {
            return false;
        }

        self.running.remove(task_id);
        if success {
            self.completed.insert(task_id.to_string());
        } else {
            self.failed.insert(task_id.to_string());
        }
        true
    }

    pub fn in_flight(&self) -> usize {
        self.running.len()
    }

    pub fn is_finished(&self) -> bool {
        self.states.values().all(TaskExecutionState::is_terminal)
    }

    /// Pending tasks that can no longer become ready
    pub fn blocked_tasks(&self) -> Vec<String> {
        self.states
            .values()
            .filter(|state| state.status == TaskStatus::Pending)
            .map(|state| state.task_id.clone())
            .collect()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn into_states(self) -> IndexMap<String, TaskExecutionState> {
        self.states
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain() -> (Workflow, DependencyGraph) {
        let workflow: Workflow = serde_json::from_value(json!({
            "name": "chain",
            "tasks": [
                {"id": "a", "type": "shell", "command": "true"},
                {"id": "b", "type": "shell", "command": "true", "depends_on": ["a"]},
                {"id": "c", "type": "shell", "command": "true", "depends_on": ["b"]},
                {"id": "d", "type": "shell", "command": "true"}
            ]
        }))
        .unwrap();
        let graph = DependencyGraph::from_workflow(&workflow).unwrap();
        (workflow, graph)
    }

    #[test]
    fn test_ready_set_follows_completion() {
        let (workflow, graph) = chain();
        let mut run = RunState::new(&workflow, &graph, SkipPolicy::Block);

        assert_eq!(run.ready_tasks(), vec!["a", "d"]);

        assert!(run.mark_running("a"));
        assert_eq!(run.ready_tasks(), vec!["d"]);
        assert_eq!(run.in_flight(), 1);

        assert!(run.record_outcome("a", RunnerResult::success(json!(null)), 1));
        assert_eq!(run.ready_tasks(), vec!["d", "b"]);
        assert_eq!(run.completed_count(), 1);
    }

    #[test]
    fn test_failed_dependency_blocks_dependents() {
        let (workflow, graph) = chain();
        let mut run = RunState::new(&workflow, &graph, SkipPolicy::Propagate);

        run.mark_running("a");
        run.record_outcome("a", RunnerResult::failure("boom"), 1);
        run.mark_running("d");
        run.record_outcome("d", RunnerResult::success(json!(null)), 1);

        assert!(run.ready_tasks().is_empty());
        assert_eq!(run.in_flight(), 0);
        assert!(!run.is_finished());
        assert_eq!(run.blocked_tasks(), vec!["b", "c"]);
        assert_eq!(run.failed_count(), 1);
    }

    #[test]
    fn test_skip_policy_controls_dependents() {
        let (workflow, graph) = chain();

        let mut blocking = RunState::new(&workflow, &graph, SkipPolicy::Block);
        blocking.mark_skipped("a", "Condition not met".to_string());
        assert_eq!(blocking.ready_tasks(), vec!["d"]);

        let mut propagating = RunState::new(&workflow, &graph, SkipPolicy::Propagate);
        propagating.mark_skipped("a", "Condition not met".to_string());
        assert_eq!(propagating.ready_tasks(), vec!["d", "b"]);
        assert_eq!(propagating.skipped_count(), 1);
    }

    #[test]
    fn test_transitions_happen_once() {
        let (workflow, graph) = chain();
        let mut run = RunState::new(&workflow, &graph, SkipPolicy::Block);

        assert!(!run.record_outcome("a", RunnerResult::success(json!(1)), 1));
        assert!(run.mark_running("a"));
        assert!(!run.mark_running("a"));
        assert!(!run.mark_skipped("a", "too late".to_string()));
        assert!(!run.mark_running("missing"));
        assert_eq!(run.in_flight(), 1);

        assert!(run.record_outcome("a", RunnerResult::failure("exit 1"), 2));
        assert!(!run.record_outcome("a", RunnerResult::success(json!(1)), 1));
        assert_eq!(run.in_flight(), 0);
        assert_eq!(run.failed_count(), 1);
        assert_eq!(run.completed_count(), 0);

        assert!(run.mark_skipped("d", "Condition not met".to_string()));
        assert!(!run.mark_skipped("d", "again".to_string()));

        let states = run.into_states();
        let a = &states["a"];
        assert_eq!(a.status, TaskStatus::Failed);
        assert_eq!(a.error.as_deref(), Some("exit 1"));
        assert_eq!(a.attempts, 2);
        assert_eq!(states["d"].skip_reason.as_deref(), Some("Condition not met"));
    }

    #[test]
    fn test_skip_policy_parsing() {
        assert_eq!("block".parse::<SkipPolicy>(), Ok(SkipPolicy::Block));
        assert_eq!(" Propagate ".parse::<SkipPolicy>(), Ok(SkipPolicy::Propagate));
        assert!("sometimes".parse::<SkipPolicy>().is_err());
        assert_eq!(SkipPolicy::default(), SkipPolicy::Block);
    }
}
