// ABOUTME: Rolling execution metrics across workflow runs
// ABOUTME: Aggregates run and per-task statistics and renders a health report

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::engine::{ExecutionReport, RunStatus, TaskStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMetrics {
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    /// Mean run duration in milliseconds
    #[serde(rename = "averageDuration")]
    pub average_duration_ms: f64,
    pub task_metrics: IndexMap<String, TaskMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetrics {
    /// Runs of the workflow this task appeared in
    pub runs: u64,
    pub failures: u64,
    /// Runs in which the task actually executed
    pub executions: u64,
    /// Mean duration over executions, in milliseconds
    #[serde(rename = "averageDuration")]
    pub average_duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallHealth {
    pub success_rate: String,
    pub total_runs: u64,
    pub average_duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall: OverallHealth,
    pub tasks: IndexMap<String, TaskMetrics>,
}

/// Collects metrics from execution reports. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct WorkflowMonitor {
    metrics: Arc<RwLock<WorkflowMetrics>>,
}

fn running_mean(current: f64, sample: f64, count: u64) -> f64 {
    current + (sample - current) / count as f64
}

impl WorkflowMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_execution(&self, report: &ExecutionReport) {
        let mut metrics = self.metrics.write().await;

        metrics.total_runs += 1;
        match report.status {
            RunStatus::Completed => metrics.successful_runs += 1,
            RunStatus::Failed => metrics.failed_runs += 1,
        }
        let total_runs = metrics.total_runs;
        metrics.average_duration_ms = running_mean(
            metrics.average_duration_ms,
            report.duration_ms as f64,
            total_runs,
        );

        for (task_id, state) in &report.tasks {
            let task = metrics.task_metrics.entry(task_id.clone()).or_default();
            task.runs += 1;
            if state.status == TaskStatus::Failed {
                task.failures += 1;
            }
            if let Some(duration_ms) = state.duration_ms {
                task.executions += 1;
                task.average_duration_ms =
                    running_mean(task.average_duration_ms, duration_ms as f64, task.executions);
            }
        }

        debug!(
            "Recorded run {} of {} ({} total runs)",
            report.id, report.workflow, metrics.total_runs
        );
    }

    /// Snapshot of the accumulated metrics
    pub async fn metrics(&self) -> WorkflowMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn health_report(&self) -> HealthReport {
        let metrics = self.metrics.read().await;

        let success_rate = if metrics.total_runs > 0 {
            metrics.successful_runs as f64 / metrics.total_runs as f64 * 100.0
        } else {
            0.0
        };

        HealthReport {
            overall: OverallHealth {
                success_rate: format!("{:.2}%", success_rate),
                total_runs: metrics.total_runs,
                average_duration: format!("{:.2}s", metrics.average_duration_ms / 1000.0),
            },
            tasks: metrics.task_metrics.clone(),
        }
    }

    pub async fn reset(&self) {
        *self.metrics.write().await = WorkflowMetrics::default();
    }
}
