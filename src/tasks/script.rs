// ABOUTME: Placeholder runner for javascript/script tasks
// ABOUTME: No script engine is embedded, so every script task fails

use async_trait::async_trait;
use tracing::warn;

use super::{wrong_kind, RunnerContext, RunnerResult, TaskRunner};
use crate::parser::{TaskKind, TaskType};

pub struct ScriptRunner;

#[async_trait]
impl TaskRunner for ScriptRunner {
    fn task_type(&self) -> TaskType {
        TaskType::Script
    }

    async fn execute(&self, task: &TaskKind, context: &RunnerContext) -> RunnerResult {
        match task {
            TaskKind::Script(_) => {
                warn!("Script task {} cannot run: no script engine", context.task_id);
                RunnerResult::failure("JavaScript runner is not implemented")
            }
            other => wrong_kind(TaskType::Script, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ScriptTask;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_script_tasks_always_fail() {
        let task = TaskKind::Script(ScriptTask {
            script: Some("return 1 + 1".to_string()),
        });
        let context = RunnerContext::new("js", Duration::from_secs(1), Arc::new(HashMap::new()));

        let result = ScriptRunner.execute(&task, &context).await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("JavaScript runner is not implemented")
        );
        assert!(result.payload.is_none());
    }
}
