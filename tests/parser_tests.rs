// ABOUTME: Integration tests specifically for the workflow parser module
// ABOUTME: Tests parsing of JSON and YAML workflow files and configuration error handling

use std::time::Duration;
use tempfile::TempDir;
use tokio::fs;

use leadflow_orchestrator::engine::DependencyGraph;
use leadflow_orchestrator::parser::{
    HttpAuth, ParserError, TaskKind, TaskType, TriggerType, ValidationError, WorkflowFormat,
    WorkflowParser, WorkflowValidator,
};

mod common;

const LEAD_WORKFLOW_YAML: &str = r#"
name: lead_enrichment
description: Pull new leads, enrich them and notify sales
version: "2.0"
trigger:
  type: schedule
  config:
    schedule: "0 * * * *"
environment:
  CRM_URL: "https://crm.example.com"
  MIN_SCORE: "60"
tasks:
  - id: fetch_leads
    name: Fetch leads
    type: http
    url: "${env.CRM_URL}/leads"
    headers:
      Accept: application/json
    auth:
      token: "secret"
    timeout: 10s
  - id: score_leads
    type: shell
    command: "echo scoring"
    working_dir: /tmp
    env:
      LOG_LEVEL: debug
    depends_on:
      - fetch_leads
    retry:
      max_attempts: 3
      initial_delay: 500
      backoff_multiplier: 2.0
  - id: notify_sales
    type: javascript
    code: "notify()"
    condition: "${env.MIN_SCORE} >= 50"
    depends_on: [score_leads]
notifications:
  channels: [slack]
  on_failure: true
"#;

#[tokio::test]
async fn test_parse_valid_yaml_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let workflow_file = temp_dir.path().join("lead_enrichment.yaml");
    fs::write(&workflow_file, LEAD_WORKFLOW_YAML).await.unwrap();

    let workflow = WorkflowParser::new().parse_file(&workflow_file).await.unwrap();

    assert_eq!(workflow.name, "lead_enrichment");
    assert_eq!(workflow.version, "2.0");
    assert_eq!(workflow.tasks.len(), 3);
    assert_eq!(
        workflow.trigger.as_ref().unwrap().trigger_type,
        TriggerType::Schedule
    );
    assert_eq!(workflow.notifications.as_ref().unwrap().channels, vec!["slack"]);

    let fetch = workflow.get_task("fetch_leads").unwrap();
    assert_eq!(fetch.task_type(), TaskType::Http);
    assert_eq!(fetch.timeout, Some(Duration::from_secs(10)));
    match &fetch.kind {
        TaskKind::Http(http) => {
            assert_eq!(http.method, "GET");
            assert_eq!(
                http.auth,
                Some(HttpAuth::Bearer {
                    token: "secret".to_string()
                })
            );
        }
        other => panic!("expected an http task, got {:?}", other),
    }

    let score = workflow.get_task("score_leads").unwrap();
    assert_eq!(score.display_name(), "score_leads");
    assert_eq!(score.max_attempts(), 3);
    assert_eq!(
        score.retry.as_ref().unwrap().delay,
        Duration::from_millis(500)
    );
    match &score.kind {
        TaskKind::Shell(shell) => {
            assert_eq!(shell.cwd.as_deref(), Some(std::path::Path::new("/tmp")));
            assert_eq!(shell.environment.get("LOG_LEVEL").unwrap(), "debug");
        }
        other => panic!("expected a shell task, got {:?}", other),
    }

    let notify = workflow.get_task("notify_sales").unwrap();
    assert_eq!(notify.task_type(), TaskType::Script);
    assert_eq!(workflow.get_dependent_tasks("score_leads"), vec!["notify_sales"]);
}

#[tokio::test]
async fn test_parse_minimal_json_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let workflow_file = temp_dir.path().join("minimal.json");
    fs::write(
        &workflow_file,
        r#"{"name": "minimal", "tasks": [{"id": "only", "type": "shell", "command": "true"}]}"#,
    )
    .await
    .unwrap();

    let workflow = WorkflowParser::new().parse_file(&workflow_file).await.unwrap();

    assert_eq!(workflow.version, "1.0");
    assert!(workflow.environment.is_empty());
    assert!(workflow.trigger.is_none());
    assert_eq!(workflow.tasks[0].name.as_deref(), Some("only"));
}

#[test]
fn test_parse_missing_name_is_rejected() {
    let result = WorkflowParser::new().parse_string(
        r#"{"tasks": [{"id": "a", "type": "shell", "command": "true"}]}"#,
        WorkflowFormat::Json,
    );

    assert!(matches!(result, Err(ParserError::JsonError(_))));
}

#[test]
fn test_parse_empty_tasks_is_rejected() {
    let result =
        WorkflowParser::new().parse_string("name: empty\ntasks: []\n", WorkflowFormat::Yaml);

    assert!(matches!(
        result,
        Err(ParserError::ValidationError(ValidationError::EmptyWorkflow))
    ));
}

#[test]
fn test_parse_unknown_task_type_is_rejected() {
    let result = WorkflowParser::new().parse_string(
        r#"{"name": "bad", "tasks": [{"id": "a", "type": "ftp", "url": "ftp://x"}]}"#,
        WorkflowFormat::Json,
    );

    assert!(matches!(result, Err(ParserError::JsonError(_))));
}

#[test]
fn test_parse_workflow_with_unknown_dependency() {
    let yaml = r#"
name: unknown_dep
tasks:
  - id: a
    type: shell
    command: "true"
    depends_on: [ghost]
"#;

    match WorkflowParser::new().parse_string(yaml, WorkflowFormat::Yaml) {
        Err(ParserError::ValidationError(ValidationError::UnknownDependency {
            task,
            dependency,
        })) => {
            assert_eq!(task, "a");
            assert_eq!(dependency, "ghost");
        }
        other => panic!("expected unknown dependency, got {:?}", other.map(|w| w.name)),
    }
}

#[test]
fn test_parse_workflow_with_circular_dependencies() {
    let yaml = r#"
name: cycle
tasks:
  - id: a
    type: shell
    command: "true"
    depends_on: [c]
  - id: b
    type: shell
    command: "true"
    depends_on: [a]
  - id: c
    type: shell
    command: "true"
    depends_on: [b]
  - id: outside
    type: shell
    command: "true"
"#;

    match WorkflowParser::new().parse_string(yaml, WorkflowFormat::Yaml) {
        Err(ParserError::ValidationError(ValidationError::CircularDependency { tasks })) => {
            assert_eq!(tasks, vec!["a", "b", "c"]);
        }
        other => panic!("expected a cycle, got {:?}", other.map(|w| w.name)),
    }
}

#[test]
fn test_parse_workflow_with_self_dependency() {
    let json = r#"{"name": "self", "tasks": [
        {"id": "loop", "type": "shell", "command": "true", "depends_on": ["loop"]}
    ]}"#;

    assert!(matches!(
        WorkflowParser::new().parse_string(json, WorkflowFormat::Json),
        Err(ParserError::ValidationError(ValidationError::SelfDependency { .. }))
    ));
}

#[test]
fn test_parse_workflow_with_duplicate_task_ids() {
    let json = r#"{"name": "dupes", "tasks": [
        {"id": "same", "type": "shell", "command": "true"},
        {"id": "same", "type": "shell", "command": "false"}
    ]}"#;

    match WorkflowParser::new().parse_string(json, WorkflowFormat::Json) {
        Err(ParserError::ValidationError(ValidationError::DuplicateTask { task })) => {
            assert_eq!(task, "same");
        }
        other => panic!("expected a duplicate id, got {:?}", other.map(|w| w.name)),
    }
}

#[test]
fn test_parse_invalid_yaml() {
    let result = WorkflowParser::new().parse_string(
        "name: broken\ntasks:\n  - id: [unclosed\n",
        WorkflowFormat::Yaml,
    );

    assert!(matches!(result, Err(ParserError::YamlError(_))));
}

#[tokio::test]
async fn test_parse_nonexistent_file() {
    let result = WorkflowParser::new()
        .parse_file("/definitely/not/here/workflow.json")
        .await;

    assert!(matches!(result, Err(ParserError::IoError(_))));
}

#[test]
fn test_dependency_plan_from_parsed_workflow() {
    let workflow = WorkflowParser::new()
        .parse_string(LEAD_WORKFLOW_YAML, WorkflowFormat::Yaml)
        .unwrap();

    let graph = DependencyGraph::from_workflow(&workflow).unwrap();
    let plan = graph.create_execution_plan();

    assert_eq!(
        plan.levels,
        vec![
            vec!["fetch_leads".to_string()],
            vec!["score_leads".to_string()],
            vec!["notify_sales".to_string()],
        ]
    );
    assert_eq!(graph.get_root_tasks(), vec!["fetch_leads"]);
}

#[test]
fn test_validator_report_collects_warnings() {
    let workflow = WorkflowParser::new()
        .parse_string(LEAD_WORKFLOW_YAML, WorkflowFormat::Yaml)
        .unwrap();

    let report = WorkflowValidator::new().report(&workflow);
    assert!(report.is_valid);
    assert!(report.warnings.iter().any(|w| w.contains("notify_sales")));
    assert!(report.warnings.iter().any(|w| w.contains("Schedule")));

    let strict = WorkflowValidator::new().with_strict_mode(true).report(&workflow);
    assert!(!strict.is_valid);
}
