// ABOUTME: Parser module for JSON and YAML workflow definitions
// ABOUTME: Exports workflow parsing, validation, and data structures

pub mod duration;
pub mod error;
pub mod task;
pub mod validation;
pub mod workflow;

pub use error::{ParserError, ValidationError};
pub use task::{
    HttpAuth, HttpTask, RetryConfig, ScriptTask, ShellTask, TaskConfig, TaskKind, TaskType,
};
pub use validation::{ValidationReport, WorkflowValidator};
pub use workflow::{
    NotificationConfig, TriggerConfig, TriggerType, Workflow, WorkflowFormat, WorkflowParser,
};
