// ABOUTME: Human-readable rendering of workflow runs for the terminal
// ABOUTME: Formats the run header, per-task lines, the overall result and the health report

use std::fmt::Write;

use super::metrics::HealthReport;
use crate::engine::{ExecutionPlan, ExecutionReport, TaskExecutionState, TaskStatus};
use crate::parser::Workflow;

#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryRenderer {
    plain: bool,
}

impl SummaryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use ASCII markers instead of emoji
    pub fn plain(mut self, plain: bool) -> Self {
        self.plain = plain;
        self
    }

    fn marker(&self, status: TaskStatus) -> &'static str {
        match (self.plain, status) {
            (false, TaskStatus::Completed) => "✅",
            (false, TaskStatus::Failed) => "❌",
            (false, TaskStatus::Skipped) => "⏭️ ",
            (false, TaskStatus::Pending) => "⏸️ ",
            (false, TaskStatus::Running) => "⏳",
            (true, TaskStatus::Completed) => "[ok]",
            (true, TaskStatus::Failed) => "[failed]",
            (true, TaskStatus::Skipped) => "[skipped]",
            (true, TaskStatus::Pending) => "[blocked]",
            (true, TaskStatus::Running) => "[running]",
        }
    }

    pub fn render_header(&self, workflow: &Workflow) -> String {
        let mut out = String::new();
        let rocket = if self.plain { "==>" } else { "🚀" };
        let _ = writeln!(
            out,
            "{} Running workflow: {} (v{})",
            rocket, workflow.name, workflow.version
        );
        if let Some(ref description) = workflow.description {
            let _ = writeln!(out, "   {}", description);
        }
        out
    }

    fn render_task(&self, out: &mut String, state: &TaskExecutionState) {
        let detail = match state.status {
            TaskStatus::Completed | TaskStatus::Failed => state
                .duration_ms
                .map(|ms| format!("{:.2}s", ms as f64 / 1000.0))
                .unwrap_or_default(),
            TaskStatus::Skipped => "skipped".to_string(),
            TaskStatus::Pending => "blocked".to_string(),
            TaskStatus::Running => "running".to_string(),
        };

        let _ = writeln!(
            out,
            "{} {} ({}) - {}",
            self.marker(state.status),
            state.name,
            state.task_id,
            detail
        );

        if state.attempts > 1 {
            let _ = writeln!(out, "   └─ Attempts: {}", state.attempts);
        }
        if let Some(ref error) = state.error {
            let _ = writeln!(out, "   └─ Error: {}", error);
        }
        if let Some(ref reason) = state.skip_reason {
            let _ = writeln!(out, "   └─ {}", reason);
        }
    }

    pub fn render_report(&self, report: &ExecutionReport) -> String {
        let mut out = String::new();

        for state in report.tasks.values() {
            self.render_task(&mut out, state);
        }

        let summary = report.summary();
        let seconds = report.duration_ms as f64 / 1000.0;
        let _ = writeln!(out);
        if report.is_success() {
            let done = if self.plain { "[ok]" } else { "✅" };
            let _ = writeln!(out, "{} Workflow completed in {:.2}s", done, seconds);
        } else {
            let failed = if self.plain { "[failed]" } else { "❌" };
            let _ = writeln!(out, "{} Workflow failed in {:.2}s", failed, seconds);
        }
        let _ = writeln!(
            out,
            "   {} tasks: {} completed, {} failed, {} skipped, {} blocked",
            summary.total, summary.completed, summary.failed, summary.skipped, summary.pending
        );

        if report.is_deadlocked() {
            let _ = writeln!(
                out,
                "   Deadlocked: {} could not run",
                report.blocked_tasks().join(", ")
            );
        }

        out
    }

    pub fn render_health(&self, health: &HealthReport) -> String {
        let mut out = String::new();
        let chart = if self.plain { "==>" } else { "📊" };
        let _ = writeln!(out, "{} Health report", chart);
        let _ = writeln!(out, "   Success rate: {}", health.overall.success_rate);
        let _ = writeln!(out, "   Total runs: {}", health.overall.total_runs);
        let _ = writeln!(
            out,
            "   Average duration: {}",
            health.overall.average_duration
        );
        out
    }

    pub fn render_plan(&self, plan: &ExecutionPlan) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Workflow is valid: {} tasks in {} levels (max parallelism {})",
            plan.total_tasks,
            plan.depth(),
            plan.max_parallelism()
        );
        for (index, level) in plan.levels.iter().enumerate() {
            let _ = writeln!(out, "   {}. {}", index + 1, level.join(", "));
        }
        out
    }
}
