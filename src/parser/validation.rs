// ABOUTME: Workflow validation logic and dependency checking
// ABOUTME: Rejects duplicate ids, unknown or self dependencies and cycles before execution

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

use super::error::ValidationError;
use super::task::TaskKind;
use super::workflow::{TriggerType, Workflow};
use crate::template;

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowValidator {
    strict_mode: bool,
}

impl WorkflowValidator {
    pub fn new() -> Self {
        Self { strict_mode: false }
    }

    /// In strict mode warnings are promoted to errors by [`WorkflowValidator::report`]
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Validate a workflow, returning the first configuration error found
    pub fn validate(&self, workflow: &Workflow) -> Result<(), ValidationError> {
        match self.report(workflow).errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Collect every error and warning for a workflow
    pub fn report(&self, workflow: &Workflow) -> ValidationReport {
        let mut report = ValidationReport::default();

        if workflow.name.trim().is_empty() {
            report
                .errors
                .push(ValidationError::MissingField("name".to_string()));
        }

        if workflow.tasks.is_empty() {
            report.errors.push(ValidationError::EmptyWorkflow);
        }

        self.validate_task_ids(workflow, &mut report);
        self.validate_task_configs(workflow, &mut report);
        let dependencies_known = self.validate_dependencies(workflow, &mut report);

        // Cycle detection needs a well-formed graph
        if dependencies_known {
            if let Some(cycle) = find_cycle(workflow) {
                report
                    .errors
                    .push(ValidationError::CircularDependency { tasks: cycle });
            }
        }

        self.collect_warnings(workflow, &mut report);

        if self.strict_mode {
            for warning in report.warnings.drain(..) {
                report.errors.push(ValidationError::InvalidTaskConfig {
                    task: workflow.name.clone(),
                    reason: warning,
                });
            }
        }

        report.is_valid = report.errors.is_empty();
        report
    }

    fn validate_task_ids(&self, workflow: &Workflow, report: &mut ValidationReport) {
        let mut seen = HashSet::new();
        for task in &workflow.tasks {
            if !seen.insert(task.id.as_str()) {
                report.errors.push(ValidationError::DuplicateTask {
                    task: task.id.clone(),
                });
            }
        }
    }

    fn validate_task_configs(&self, workflow: &Workflow, report: &mut ValidationReport) {
        for task in &workflow.tasks {
            if let Err(error) = task.validate() {
                report.errors.push(error);
            }
        }
    }

    /// Returns true when every dependency edge points at a known, distinct task
    fn validate_dependencies(&self, workflow: &Workflow, report: &mut ValidationReport) -> bool {
        let task_ids: HashSet<&str> = workflow.tasks.iter().map(|t| t.id.as_str()).collect();
        let mut well_formed = true;

        for task in &workflow.tasks {
            for dep in &task.depends_on {
                if dep == &task.id {
                    well_formed = false;
                    report.errors.push(ValidationError::SelfDependency {
                        task: task.id.clone(),
                    });
                } else if !task_ids.contains(dep.as_str()) {
                    well_formed = false;
                    report.errors.push(ValidationError::UnknownDependency {
                        task: task.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        well_formed
    }

    fn collect_warnings(&self, workflow: &Workflow, report: &mut ValidationReport) {
        for task in &workflow.tasks {
            if let TaskKind::Script(_) = task.kind {
                report.warnings.push(format!(
                    "Task '{}' uses the javascript runner, which always fails",
                    task.id
                ));
            }

            if let Some(ref condition) = task.condition {
                for key in template::referenced_keys(condition) {
                    if !workflow.environment.contains_key(&key) {
                        report.warnings.push(format!(
                            "Task '{}' condition references undefined environment key '{}'",
                            task.id, key
                        ));
                    }
                }
            }
        }

        if let Some(ref trigger) = workflow.trigger {
            if trigger.trigger_type != TriggerType::Manual {
                report.warnings.push(format!(
                    "Trigger type {:?} is not handled; the workflow only runs when invoked",
                    trigger.trigger_type
                ));
            }
        }
    }
}

/// Find the members of one dependency cycle, if any
fn find_cycle(workflow: &Workflow) -> Option<Vec<String>> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

    for task in &workflow.tasks {
        nodes
            .entry(task.id.as_str())
            .or_insert_with(|| graph.add_node(task.id.as_str()));
    }

    for task in &workflow.tasks {
        let task_node = nodes[task.id.as_str()];
        for dep in &task.depends_on {
            if let Some(&dep_node) = nodes.get(dep.as_str()) {
                graph.add_edge(dep_node, task_node, ());
            }
        }
    }

    tarjan_scc(&graph)
        .into_iter()
        .find(|component| component.len() > 1)
        .map(|component| {
            let mut tasks: Vec<String> = component
                .into_iter()
                .map(|node| graph[node].to_string())
                .collect();
            tasks.sort();
            tasks
        })
}
