// ABOUTME: Error types for workflow execution engine operations
// ABOUTME: Only configuration problems detected before dispatch surface as errors

use thiserror::Error;

use crate::parser::ValidationError;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Invalid workflow configuration: {0}")]
    Configuration(#[from] ValidationError),

    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
