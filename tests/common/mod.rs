// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Builds workflow definitions and temporary directories for test runs

#![allow(dead_code)]

use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;

use leadflow_orchestrator::parser::Workflow;

pub struct TestWorkflowBuilder {
    name: String,
    description: String,
    version: String,
    environment: Map<String, Value>,
    tasks: Vec<Value>,
}

impl TestWorkflowBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: format!("Test workflow: {}", name),
            version: "1.0".to_string(),
            environment: Map::new(),
            tasks: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_variable(mut self, key: &str, value: &str) -> Self {
        self.environment
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a raw task definition
    pub fn with_task(mut self, task: Value) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn add_shell_task(self, id: &str, command: &str, depends_on: &[&str]) -> Self {
        self.with_task(json!({
            "id": id,
            "type": "shell",
            "command": command,
            "depends_on": depends_on,
        }))
    }

    pub fn add_echo_task(self, id: &str, message: &str) -> Self {
        self.add_shell_task(id, &format!("echo {}", message), &[])
    }

    pub fn add_dependent_task(self, id: &str, message: &str, depends_on: &[&str]) -> Self {
        self.add_shell_task(id, &format!("echo {}", message), depends_on)
    }

    pub fn add_failing_task(self, id: &str) -> Self {
        self.add_shell_task(id, "exit 1", &[])
    }

    pub fn add_conditional_task(self, id: &str, condition: &str, depends_on: &[&str]) -> Self {
        self.with_task(json!({
            "id": id,
            "type": "shell",
            "command": "true",
            "depends_on": depends_on,
            "condition": condition,
        }))
    }

    pub fn to_value(&self) -> Value {
        json!({
            "name": self.name,
            "version": self.version,
            "description": self.description,
            "environment": self.environment,
            "tasks": self.tasks,
        })
    }

    pub fn build(&self) -> Workflow {
        serde_json::from_value(self.to_value()).expect("Test workflow should deserialize")
    }

    pub async fn write_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_json::to_string_pretty(&self.to_value())?;
        fs::write(path, content).await?;
        Ok(())
    }
}

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn workflow_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}.json", name))
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}_report.json", name))
    }

    pub async fn create_workflow_file(&self, name: &str, builder: &TestWorkflowBuilder) -> PathBuf {
        let workflow_file = self.workflow_file(name);
        builder
            .write_to_file(&workflow_file)
            .await
            .expect("Failed to write workflow file");
        workflow_file
    }

    pub async fn write_raw(&self, file_name: &str, content: &str) -> PathBuf {
        let path = self.path().join(file_name);
        fs::write(&path, content)
            .await
            .expect("Failed to write file");
        path
    }
}

pub async fn read_json_output(path: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path).await?;
    let json: Value = serde_json::from_str(&content)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_builder() {
        let workflow = TestWorkflowBuilder::new("test_workflow")
            .with_description("Test workflow description")
            .with_variable("MODE", "test")
            .add_echo_task("task1", "hello")
            .add_dependent_task("task2", "world", &["task1"])
            .build();

        assert_eq!(workflow.name, "test_workflow");
        assert_eq!(workflow.environment.get("MODE").map(String::as_str), Some("test"));
        assert_eq!(workflow.tasks.len(), 2);
        assert_eq!(workflow.tasks[1].depends_on, vec!["task1".to_string()]);
    }

    #[test]
    fn test_environment_setup() {
        let env = TestEnvironment::new();
        assert!(env.path().exists());
        assert!(env.workflow_file("test").ends_with("test.json"));
    }
}
