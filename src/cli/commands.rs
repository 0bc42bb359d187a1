// ABOUTME: Command implementations for the leadflow CLI
// ABOUTME: Handles execution of the run command, including dry runs

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::args::Args;
use super::config::Config;
use crate::engine::{SkipPolicy, WorkflowOrchestrator};
use crate::parser::{Workflow, WorkflowParser, WorkflowValidator};
use crate::reporting::{SummaryRenderer, WorkflowMonitor};

/// Options for the run command beyond the workflow path
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub vars: Vec<String>,
    pub output: Option<PathBuf>,
    pub skip_policy: Option<SkipPolicy>,
    pub dry_run: bool,
    pub plain: bool,
}

/// Load a workflow and layer config defaults and --var overrides onto its environment
async fn load_workflow(
    workflow_path: &Path,
    vars: &[String],
    config: &Config,
) -> Result<Workflow> {
    let variables = Args::parse_variables(vars)?;
    info!("Parsed {} environment overrides", variables.len());

    let mut workflow = WorkflowParser::new()
        .parse_file(workflow_path)
        .await
        .with_context(|| format!("Failed to load workflow {}", workflow_path.display()))?;

    let mut environment: HashMap<String, String> = config.environment.clone();
    environment.extend(std::mem::take(&mut workflow.environment));
    environment.extend(variables);
    workflow.environment = environment;

    info!("Loaded workflow: {} v{}", workflow.name, workflow.version);
    Ok(workflow)
}

/// Execute a workflow command
pub async fn run_workflow(
    workflow_path: PathBuf,
    options: RunOptions,
    config: &Config,
) -> Result<()> {
    let workflow = load_workflow(&workflow_path, &options.vars, config).await?;
    let renderer = SummaryRenderer::new().plain(options.plain);
    let skip_policy = options.skip_policy.unwrap_or(config.skip_policy);

    let monitor = Arc::new(WorkflowMonitor::new());
    let orchestrator = WorkflowOrchestrator::new()
        .with_skip_policy(skip_policy)
        .with_default_timeouts(config.default_timeouts)
        .with_monitor(Arc::clone(&monitor));

    print!("{}", renderer.render_header(&workflow));

    if options.dry_run {
        let plan = orchestrator
            .plan(&workflow)
            .context("Workflow validation failed")?;
        println!();
        print!("{}", renderer.render_plan(&plan));
        for warning in WorkflowValidator::new().report(&workflow).warnings {
            println!("   warning: {}", warning);
        }
        info!("Dry run - workflow validation successful");
        return Ok(());
    }

    println!();
    let report = orchestrator
        .execute(&workflow)
        .await
        .context("Workflow could not be started")?;

    print!("{}", renderer.render_report(&report));
    println!();
    print!("{}", renderer.render_health(&monitor.health_report().await));

    if let Some(output_path) = options.output {
        let json_content = report
            .to_json()
            .context("Failed to serialize the execution report")?;
        tokio::fs::write(&output_path, json_content)
            .await
            .with_context(|| format!("Failed to write report to {}", output_path.display()))?;
        info!("Execution report written to: {}", output_path.display());
    }

    if !report.is_success() {
        anyhow::bail!("Workflow '{}' failed", report.workflow);
    }

    Ok(())
}
