// ABOUTME: Per-task dispatch: runner lookup, retries, timeout guard and panic capture
// ABOUTME: Every dispatched task resolves to a TaskOutcome, never to an error

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::parser::{TaskConfig, TaskKind, TaskType};
use crate::tasks::{RunnerContext, RunnerRegistry, RunnerResult, TaskRunner};

/// Extra time a runner gets past its own timeout before the scheduler gives up on it
const TIMEOUT_GRACE: Duration = Duration::from_secs(2);

/// Timeouts used when a task does not declare one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultTimeouts {
    #[serde(with = "crate::parser::duration::millis", rename = "shell_ms")]
    pub shell: Duration,
    #[serde(with = "crate::parser::duration::millis", rename = "http_ms")]
    pub http: Duration,
    #[serde(with = "crate::parser::duration::millis", rename = "script_ms")]
    pub script: Duration,
}

impl Default for DefaultTimeouts {
    fn default() -> Self {
        Self {
            shell: Duration::from_millis(300_000),
            http: Duration::from_millis(30_000),
            script: Duration::from_millis(30_000),
        }
    }
}

impl DefaultTimeouts {
    pub fn for_type(&self, task_type: TaskType) -> Duration {
        match task_type {
            TaskType::Shell => self.shell,
            TaskType::Http => self.http,
            TaskType::Script => self.script,
        }
    }
}

/// Final result of dispatching one task, including retries
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task_id: String,
    pub result: RunnerResult,
    pub attempts: u32,
}

#[derive(Clone)]
pub struct TaskScheduler {
    registry: Arc<RunnerRegistry>,
    timeouts: DefaultTimeouts,
    grace: Duration,
}

impl TaskScheduler {
    pub fn new(registry: Arc<RunnerRegistry>, timeouts: DefaultTimeouts) -> Self {
        Self {
            registry,
            timeouts,
            grace: TIMEOUT_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn resolve_timeout(&self, task: &TaskConfig) -> Duration {
        task.timeout
            .unwrap_or_else(|| self.timeouts.for_type(task.task_type()))
    }

    /// Start a task. The returned future owns everything it needs.
    pub fn dispatch(
        &self,
        task: &TaskConfig,
        environment: Arc<HashMap<String, String>>,
    ) -> BoxFuture<'static, TaskOutcome> {
        let scheduler = self.clone();
        let task = task.clone();
        async move { scheduler.execute_task_with_retry(task, environment).await }.boxed()
    }

    async fn execute_task_with_retry(
        &self,
        task: TaskConfig,
        environment: Arc<HashMap<String, String>>,
    ) -> TaskOutcome {
        let task_type = task.task_type();
        let runner = match self.registry.get(task_type) {
            Some(runner) => runner,
            None => {
                error!("No runner registered for task {} ({})", task.id, task_type);
                return TaskOutcome {
                    task_id: task.id,
                    result: RunnerResult::failure(format!(
                        "No runner registered for task type '{}'",
                        task_type
                    )),
                    attempts: 0,
                };
            }
        };

        let task_timeout = self.resolve_timeout(&task);
        let context = RunnerContext::new(task.id.clone(), task_timeout, environment);
        let max_attempts = task.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                "Running task {} (attempt {}/{})",
                task.id, attempt, max_attempts
            );

            let result = self
                .run_attempt(Arc::clone(&runner), &task.kind, &context)
                .await;

            if result.success || attempt >= max_attempts {
                if result.success {
                    info!("Task {} completed after {} attempt(s)", task.id, attempt);
                } else {
                    warn!(
                        "Task {} failed after {} attempt(s): {}",
                        task.id,
                        attempt,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
                return TaskOutcome {
                    task_id: task.id,
                    result,
                    attempts: attempt,
                };
            }

            let delay = task
                .retry
                .as_ref()
                .map(|retry| retry.calculate_delay(attempt - 1))
                .unwrap_or_default();
            warn!(
                "Task {} attempt {} failed, retrying in {:?}: {}",
                task.id,
                attempt,
                delay,
                result.error.as_deref().unwrap_or("unknown error")
            );
            sleep(delay).await;
        }
    }

    /// One runner invocation on its own tokio task so panics and hangs stay contained
    async fn run_attempt(
        &self,
        runner: Arc<dyn TaskRunner>,
        kind: &TaskKind,
        context: &RunnerContext,
    ) -> RunnerResult {
        let kind = kind.clone();
        let runner_context = context.clone();
        let mut handle =
            tokio::spawn(async move { runner.execute(&kind, &runner_context).await });

        match timeout(context.timeout + self.grace, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) if join_error.is_panic() => {
                let message = panic_message(join_error.into_panic());
                error!("Runner for task {} panicked: {}", context.task_id, message);
                RunnerResult::failure(format!("Task panicked: {}", message))
            }
            Ok(Err(join_error)) => {
                RunnerResult::failure(format!("Task was cancelled: {}", join_error))
            }
            Err(_) => {
                handle.abort();
                error!(
                    "Runner for task {} ignored its {}ms timeout",
                    context.task_id,
                    context.timeout.as_millis()
                );
                RunnerResult::failure(format!(
                    "Task timeout after {}ms",
                    context.timeout.as_millis()
                ))
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
