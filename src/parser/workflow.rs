// ABOUTME: Core workflow data structures and parsing functionality
// ABOUTME: Loads JSON or YAML workflow definitions into the Workflow model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

use super::error::{ParserError, Result};
use super::task::TaskConfig;
use super::validation::WorkflowValidator;

fn default_version() -> String {
    "1.0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub trigger: Option<TriggerConfig>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    pub tasks: Vec<TaskConfig>,
    #[serde(default)]
    pub notifications: Option<NotificationConfig>,
}

/// How a workflow is meant to be started. Only manual runs are executed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(rename = "type", default)]
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub config: TriggerOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    #[default]
    Manual,
    Schedule,
    Webhook,
    FileChange,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TriggerOptions {
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub webhook: Option<String>,
}

/// Notification settings are carried through untouched; delivery lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotificationConfig {
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub on_completion: bool,
    #[serde(default)]
    pub on_failure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkflowFormat {
    Json,
    Yaml,
}

impl WorkflowFormat {
    /// Pick a format from a file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => WorkflowFormat::Yaml,
            _ => WorkflowFormat::Json,
        }
    }
}

impl Workflow {
    /// Parse workflow from a JSON or YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ParserError::IoError)?;
        Self::from_str_with_format(&content, WorkflowFormat::from_path(path.as_ref()))
    }

    /// Parse workflow from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        Self::from_str_with_format(content, WorkflowFormat::Json)
    }

    /// Parse workflow from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        Self::from_str_with_format(content, WorkflowFormat::Yaml)
    }

    fn from_str_with_format(content: &str, format: WorkflowFormat) -> Result<Self> {
        let mut workflow: Workflow = match format {
            WorkflowFormat::Json => serde_json::from_str(content).map_err(ParserError::JsonError)?,
            WorkflowFormat::Yaml => serde_yaml::from_str(content).map_err(ParserError::YamlError)?,
        };

        // Task names default to their ids
        for task in &mut workflow.tasks {
            if task.name.is_none() {
                task.name = Some(task.id.clone());
            }
        }

        workflow.validate()?;

        Ok(workflow)
    }

    /// Reject configuration errors before anything runs
    pub fn validate(&self) -> Result<()> {
        WorkflowValidator::new()
            .validate(self)
            .map_err(ParserError::ValidationError)
    }

    /// Get all task IDs in declaration order
    pub fn task_ids(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.id.clone()).collect()
    }

    pub fn get_task(&self, task_id: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn has_task(&self, task_id: &str) -> bool {
        self.get_task(task_id).is_some()
    }

    pub fn get_task_dependencies(&self, task_id: &str) -> Vec<String> {
        self.get_task(task_id)
            .map(|task| task.depends_on.clone())
            .unwrap_or_default()
    }

    /// Get all tasks that directly depend on a specific task
    pub fn get_dependent_tasks(&self, task_id: &str) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|task| task.depends_on.iter().any(|dep| dep == task_id))
            .map(|task| task.id.clone())
            .collect()
    }

    /// Overlay environment entries, e.g. from the command line
    pub fn merge_environment(&mut self, vars: HashMap<String, String>) {
        self.environment.extend(vars);
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(ParserError::JsonError)
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowParser;

impl WorkflowParser {
    pub fn new() -> Self {
        Self
    }

    pub async fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Workflow> {
        let content = fs::read_to_string(path.as_ref())
            .await
            .map_err(ParserError::IoError)?;
        Workflow::from_str_with_format(&content, WorkflowFormat::from_path(path.as_ref()))
    }

    pub fn parse_string(&self, content: &str, format: WorkflowFormat) -> Result<Workflow> {
        Workflow::from_str_with_format(content, format)
    }
}

impl Default for WorkflowParser {
    fn default() -> Self {
        Self::new()
    }
}
