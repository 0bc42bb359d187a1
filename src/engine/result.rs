// ABOUTME: Per-task execution state and the execution report returned for a run
// ABOUTME: Encodes the pending -> running -> completed/failed (or skipped) lifecycle

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::parser::TaskType;
use crate::tasks::RunnerResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskExecutionState {
    pub task_id: String,
    pub name: String,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(rename = "duration")]
    pub duration_ms: Option<u64>,
    pub result: Option<JsonValue>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl TaskExecutionState {
    pub fn new(task_id: String, name: String, task_type: TaskType) -> Self {
        Self {
            task_id,
            name,
            task_type,
            status: TaskStatus::Pending,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            result: None,
            error: None,
            skip_reason: None,
            attempts: 0,
            stdout: None,
            stderr: None,
            exit_code: None,
        }
    }

    /// pending -> running. Returns false if the task already left pending.
    pub fn mark_running(&mut self) -> bool {
        if self.status != TaskStatus::Pending {
            return false;
        }
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
        true
    }

    /// running -> completed or failed, depending on the runner's verdict
    pub fn mark_finished(&mut self, outcome: RunnerResult, attempts: u32) -> bool {
        if self.status != TaskStatus::Running {
            return false;
        }

        let finished_at = Utc::now();
        self.finished_at = Some(finished_at);
        self.duration_ms = self
            .started_at
            .map(|started| (finished_at - started).num_milliseconds().max(0) as u64);
        self.attempts = attempts;
        self.stdout = outcome.stdout;
        self.stderr = outcome.stderr;
        self.exit_code = outcome.exit_code;

        if outcome.success {
            self.status = TaskStatus::Completed;
            self.result = Some(outcome.payload.unwrap_or(JsonValue::Null));
        } else {
            self.status = TaskStatus::Failed;
            self.error = Some(
                outcome
                    .error
                    .unwrap_or_else(|| "Task failed without an error message".to_string()),
            );
        }
        true
    }

    /// pending -> skipped, without ever running. Skipped tasks carry no timestamps or duration.
    pub fn mark_skipped(&mut self, reason: String) -> bool {
        if self.status != TaskStatus::Pending {
            return false;
        }
        self.status = TaskStatus::Skipped;
        self.skip_reason = Some(reason);
        true
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub id: Uuid,
    pub workflow: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub status: RunStatus,
    pub tasks: IndexMap<String, TaskExecutionState>,
}

impl ExecutionReport {
    pub fn new(
        workflow: String,
        version: String,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        tasks: IndexMap<String, TaskExecutionState>,
    ) -> Self {
        let failed = tasks
            .values()
            .any(|state| state.status == TaskStatus::Failed || !state.is_terminal());

        Self {
            id: Uuid::new_v4(),
            workflow,
            version,
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
            status: if failed {
                RunStatus::Failed
            } else {
                RunStatus::Completed
            },
            tasks,
        }
    }

    pub fn task(&self, task_id: &str) -> Option<&TaskExecutionState> {
        self.tasks.get(task_id)
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Tasks that never left pending because their dependencies could not be met
    pub fn blocked_tasks(&self) -> Vec<String> {
        self.tasks
            .values()
            .filter(|state| state.status == TaskStatus::Pending)
            .map(|state| state.task_id.clone())
            .collect()
    }

    pub fn is_deadlocked(&self) -> bool {
        self.tasks.values().any(|state| !state.is_terminal())
    }

    pub fn summary(&self) -> ExecutionSummary {
        let mut summary = ExecutionSummary {
            total: self.tasks.len(),
            ..Default::default()
        };

        for state in self.tasks.values() {
            match state.status {
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Failed => summary.failed += 1,
                TaskStatus::Skipped => summary.skipped += 1,
                TaskStatus::Pending | TaskStatus::Running => summary.pending += 1,
            }
        }

        summary
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}
