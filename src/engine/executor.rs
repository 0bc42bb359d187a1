// ABOUTME: Workflow orchestrator driving a run from validation to the final report
// ABOUTME: A single coordinating loop owns all run state and reacts to task completions

use chrono::Utc;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::condition::ConditionEvaluator;
use super::context::{RunState, SkipPolicy};
use super::dependency::{DependencyGraph, ExecutionPlan};
use super::error::{ExecutionError, Result};
use super::result::ExecutionReport;
use super::scheduler::{DefaultTimeouts, TaskOutcome, TaskScheduler};
use crate::parser::{TaskConfig, Workflow, WorkflowValidator};
use crate::reporting::WorkflowMonitor;
use crate::tasks::RunnerRegistry;

pub struct WorkflowOrchestrator {
    registry: Arc<RunnerRegistry>,
    timeouts: DefaultTimeouts,
    skip_policy: SkipPolicy,
    monitor: Option<Arc<WorkflowMonitor>>,
}

impl WorkflowOrchestrator {
    /// Orchestrator with the built-in runners, default timeouts and the blocking skip policy
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RunnerRegistry::new()),
            timeouts: DefaultTimeouts::default(),
            skip_policy: SkipPolicy::default(),
            monitor: None,
        }
    }

    pub fn with_registry(mut self, registry: RunnerRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_skip_policy(mut self, skip_policy: SkipPolicy) -> Self {
        self.skip_policy = skip_policy;
        self
    }

    pub fn with_default_timeouts(mut self, timeouts: DefaultTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Record every produced report in the given monitor
    pub fn with_monitor(mut self, monitor: Arc<WorkflowMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Validate a workflow and return its execution levels without running anything
    pub fn plan(&self, workflow: &Workflow) -> Result<ExecutionPlan> {
        WorkflowValidator::new().validate(workflow)?;
        let graph = DependencyGraph::from_workflow(workflow)?;
        Ok(graph.create_execution_plan())
    }

    /// Run a workflow to completion. Errors only for configuration problems found before dispatch.
    #[instrument(skip(self, workflow), fields(workflow_name = %workflow.name))]
    pub async fn execute(&self, workflow: &Workflow) -> Result<ExecutionReport> {
        WorkflowValidator::new().validate(workflow)?;
        let graph = DependencyGraph::from_workflow(workflow)?;

        let tasks: HashMap<&str, &TaskConfig> = workflow
            .tasks
            .iter()
            .map(|task| (task.id.as_str(), task))
            .collect();
        let environment = Arc::new(workflow.environment.clone());
        let scheduler = TaskScheduler::new(Arc::clone(&self.registry), self.timeouts);
        let mut run = RunState::new(workflow, &graph, self.skip_policy);
        let mut in_flight: FuturesUnordered<BoxFuture<'static, TaskOutcome>> =
            FuturesUnordered::new();

        let started_at = Utc::now();
        info!(
            "Starting workflow {} v{} with {} tasks (skip policy: {})",
            workflow.name,
            workflow.version,
            workflow.tasks.len(),
            self.skip_policy
        );

        loop {
            // Skips can make more tasks ready, so keep going until the ready set is empty
            loop {
                let ready = run.ready_tasks();
                if ready.is_empty() {
                    break;
                }

                for task_id in ready {
                    let task = *tasks
                        .get(task_id.as_str())
                        .ok_or_else(|| ExecutionError::TaskNotFound {
                            task_id: task_id.clone(),
                        })?;

                    if let Some(ref condition) = task.condition {
                        if !ConditionEvaluator::evaluate(condition, &environment) {
                            info!("Task {} condition not met, skipping", task_id);
                            run.mark_skipped(&task_id, format!("Condition not met: {}", condition));
                            continue;
                        }
                    }

                    if run.mark_running(&task_id) {
                        info!("Dispatching task {} ({})", task_id, task.task_type());
                        in_flight.push(scheduler.dispatch(task, Arc::clone(&environment)));
                    }
                }
            }

            match in_flight.next().await {
                Some(outcome) => {
                    let TaskOutcome {
                        task_id,
                        result,
                        attempts,
                    } = outcome;
                    run.record_outcome(&task_id, result, attempts);
                }
                None => break,
            }
        }

        if !run.is_finished() {
            warn!(
                "Workflow {} deadlocked; tasks that can never run: {:?}",
                workflow.name,
                run.blocked_tasks()
            );
        }

        info!(
            "Workflow {} finished: {} completed, {} failed, {} skipped",
            workflow.name,
            run.completed_count(),
            run.failed_count(),
            run.skipped_count()
        );

        let report = ExecutionReport::new(
            workflow.name.clone(),
            workflow.version.clone(),
            started_at,
            Utc::now(),
            run.into_states(),
        );

        if let Some(ref monitor) = self.monitor {
            monitor.record_execution(&report).await;
        }

        Ok(report)
    }
}

impl Default for WorkflowOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}
