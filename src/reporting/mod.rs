// ABOUTME: Reporting for workflow runs: rolling health metrics and terminal summaries
// ABOUTME: The monitor aggregates execution reports; the renderer formats them for people

pub mod metrics;
pub mod summary;

pub use metrics::{HealthReport, OverallHealth, TaskMetrics, WorkflowMetrics, WorkflowMonitor};
pub use summary::SummaryRenderer;
