// ABOUTME: Task runners for each task kind and the registry that dispatches to them
// ABOUTME: Runners report every outcome as a RunnerResult value, never as an error

pub mod http;
pub mod script;
pub mod shell;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::parser::{TaskKind, TaskType};

pub use http::HttpRunner;
pub use script::ScriptRunner;
pub use shell::ShellRunner;

/// What a runner needs to know about the task it is executing
#[derive(Debug, Clone)]
pub struct RunnerContext {
    pub task_id: String,
    pub timeout: Duration,
    pub environment: Arc<HashMap<String, String>>,
}

impl RunnerContext {
    pub fn new(
        task_id: impl Into<String>,
        timeout: Duration,
        environment: Arc<HashMap<String, String>>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            timeout,
            environment,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerResult {
    pub success: bool,
    pub payload: Option<JsonValue>,
    pub error: Option<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_code: Option<i32>,
}

impl RunnerResult {
    pub fn success(payload: JsonValue) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
            stdout: None,
            stderr: None,
            exit_code: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.into()),
            stdout: None,
            stderr: None,
            exit_code: None,
        }
    }

    /// Attach captured process output; empty streams are dropped
    pub fn with_output(mut self, stdout: String, stderr: String, exit_code: Option<i32>) -> Self {
        self.stdout = Some(stdout).filter(|s| !s.is_empty());
        self.stderr = Some(stderr).filter(|s| !s.is_empty());
        self.exit_code = exit_code;
        self
    }
}

#[async_trait]
pub trait TaskRunner: Send + Sync {
    fn task_type(&self) -> TaskType;

    async fn execute(&self, task: &TaskKind, context: &RunnerContext) -> RunnerResult;
}

/// Failure returned when a runner is handed a task of another kind
pub(crate) fn wrong_kind(runner: TaskType, task: &TaskKind) -> RunnerResult {
    RunnerResult::failure(format!(
        "The {} runner cannot execute a {} task",
        runner,
        task.task_type()
    ))
}

#[derive(Clone)]
pub struct RunnerRegistry {
    runners: HashMap<TaskType, Arc<dyn TaskRunner>>,
}

impl RunnerRegistry {
    /// Registry with the built-in shell, http and javascript runners
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register(Arc::new(ShellRunner));
        registry.register(Arc::new(HttpRunner::new()));
        registry.register(Arc::new(ScriptRunner));

        registry
    }

    pub fn empty() -> Self {
        Self {
            runners: HashMap::new(),
        }
    }

    /// Add a runner, replacing any existing runner for the same task type
    pub fn register(&mut self, runner: Arc<dyn TaskRunner>) {
        self.runners.insert(runner.task_type(), runner);
    }

    pub fn get(&self, task_type: TaskType) -> Option<Arc<dyn TaskRunner>> {
        self.runners.get(&task_type).cloned()
    }

    pub fn supports(&self, task_type: TaskType) -> bool {
        self.runners.contains_key(&task_type)
    }

    pub fn supported_types(&self) -> Vec<TaskType> {
        TaskType::all()
            .into_iter()
            .filter(|task_type| self.supports(*task_type))
            .collect()
    }
}

impl Default for RunnerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RunnerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerRegistry")
            .field("runners", &self.supported_types())
            .finish()
    }
}
