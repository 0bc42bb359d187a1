// ABOUTME: Main library module for the leadflow workflow orchestrator
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod engine;
pub mod parser;
pub mod reporting;
pub mod tasks;
pub mod template;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use engine::{
    ExecutionReport, RunStatus, SkipPolicy, TaskExecutionState, TaskStatus, WorkflowOrchestrator,
};
pub use parser::{TaskConfig, TaskKind, Workflow, WorkflowParser, WorkflowValidator};
pub use reporting::{HealthReport, WorkflowMonitor};
pub use tasks::{RunnerRegistry, TaskRunner};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
