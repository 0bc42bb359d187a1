// ABOUTME: Workflow execution engine for the lead-generation orchestrator
// ABOUTME: Handles dependency resolution, conditions, task dispatch and run bookkeeping

pub mod condition;
pub mod context;
pub mod dependency;
pub mod error;
pub mod executor;
pub mod result;
pub mod scheduler;

pub use condition::{Comparison, ConditionEvaluator, Operator};
pub use context::{RunState, SkipPolicy};
pub use dependency::{DependencyGraph, ExecutionPlan};
pub use error::{ExecutionError, Result};
pub use executor::WorkflowOrchestrator;
pub use result::{ExecutionReport, ExecutionSummary, RunStatus, TaskExecutionState, TaskStatus};
pub use scheduler::{DefaultTimeouts, TaskOutcome, TaskScheduler};
