// ABOUTME: Error types for workflow parsing and validation
// ABOUTME: Configuration errors are raised here, before any task is executed

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to read workflow file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Circular dependency detected in tasks: {tasks:?}")]
    CircularDependency { tasks: Vec<String> },

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Task '{task}' depends on itself")]
    SelfDependency { task: String },

    #[error("Invalid task configuration for '{task}': {reason}")]
    InvalidTaskConfig { task: String, reason: String },

    #[error("Duplicate task id: {task}")]
    DuplicateTask { task: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Empty workflow: no tasks defined")]
    EmptyWorkflow,
}

pub type Result<T> = std::result::Result<T, ParserError>;
