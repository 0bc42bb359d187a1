// ABOUTME: Task configuration structures and parameter definitions
// ABOUTME: Defines the closed set of task kinds and their kind-specific parameters

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::duration;
use super::error::ValidationError;
use crate::template;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: TaskKind,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default, with = "duration::option_millis")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

/// Kind-specific task parameters, selected by the `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TaskKind {
    Shell(ShellTask),
    Http(HttpTask),
    #[serde(rename = "javascript", alias = "script")]
    Script(ScriptTask),
}

/// Discriminant of [`TaskKind`], used to key the runner registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Shell,
    Http,
    #[serde(rename = "javascript")]
    Script,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellTask {
    pub command: String,

    /// Working directory, defaults to the orchestrator's current directory
    #[serde(default, alias = "working_dir")]
    pub cwd: Option<PathBuf>,

    /// Extra environment variables layered over the process environment
    #[serde(default, alias = "env")]
    pub environment: HashMap<String, String>,

    /// Forward stdout/stderr to the orchestrator's own streams while running
    #[serde(default, alias = "stream_output")]
    pub live_output: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpTask {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default, alias = "body")]
    pub data: Option<JsonValue>,
    #[serde(default)]
    pub auth: Option<HttpAuth>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HttpAuth {
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        #[serde(default)]
        password: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScriptTask {
    #[serde(default, alias = "code")]
    pub script: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    #[serde(default = "default_attempts", alias = "max_attempts")]
    pub attempts: u32,
    #[serde(
        default = "default_retry_delay",
        alias = "initial_delay",
        with = "duration::millis"
    )]
    pub delay: Duration,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

fn default_method() -> String {
    "GET".to_string()
}

fn default_attempts() -> u32 {
    1
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay: default_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Delay before the retry that follows attempt number `attempt` (0-indexed)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms =
            self.delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);

        if !delay_ms.is_finite() || delay_ms < 0.0 {
            return MAX_RETRY_DELAY;
        }

        Duration::from_millis(delay_ms as u64).min(MAX_RETRY_DELAY)
    }
}

impl TaskConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn task_type(&self) -> TaskType {
        self.kind.task_type()
    }

    pub fn max_attempts(&self) -> u32 {
        self.retry.as_ref().map(|r| r.attempts.max(1)).unwrap_or(1)
    }

    /// Check kind-specific parameters that serde cannot express
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidTaskConfig {
            task: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingField("tasks[].id".to_string()));
        }

        if self.timeout == Some(Duration::ZERO) {
            return Err(invalid("timeout must be greater than 0"));
        }

        if let Some(ref retry) = self.retry {
            if retry.attempts == 0 {
                return Err(invalid("retry.attempts must be at least 1"));
            }
            if !(retry.backoff_multiplier.is_finite() && retry.backoff_multiplier >= 1.0) {
                return Err(invalid("retry.backoff_multiplier must be >= 1.0"));
            }
        }

        match &self.kind {
            TaskKind::Shell(shell) => {
                if shell.command.trim().is_empty() {
                    return Err(invalid("shell command cannot be empty"));
                }
            }
            TaskKind::Http(http) => {
                if http.url.trim().is_empty() {
                    return Err(invalid("http url cannot be empty"));
                }
                if reqwest::Method::from_bytes(http.method.to_uppercase().as_bytes()).is_err() {
                    return Err(invalid(&format!("invalid http method '{}'", http.method)));
                }
                // URLs built from placeholders are only checked once interpolated
                if template::referenced_keys(&http.url).is_empty() {
                    let url = reqwest::Url::parse(&http.url)
                        .map_err(|e| invalid(&format!("invalid url '{}': {}", http.url, e)))?;
                    if !matches!(url.scheme(), "http" | "https") {
                        return Err(invalid(&format!(
                            "unsupported url scheme '{}'",
                            url.scheme()
                        )));
                    }
                }
            }
            TaskKind::Script(_) => {}
        }

        Ok(())
    }
}

impl TaskKind {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskKind::Shell(_) => TaskType::Shell,
            TaskKind::Http(_) => TaskType::Http,
            TaskKind::Script(_) => TaskType::Script,
        }
    }
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Shell => "shell",
            TaskType::Http => "http",
            TaskType::Script => "javascript",
        }
    }

    pub fn all() -> [TaskType; 3] {
        [TaskType::Shell, TaskType::Http, TaskType::Script]
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
