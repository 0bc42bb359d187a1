// ABOUTME: HTTP task runner issuing a single request per task
// ABOUTME: Any response counts as success; only transport problems fail the task

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Map, Value as JsonValue};
use tracing::{debug, info};

use super::{wrong_kind, RunnerContext, RunnerResult, TaskRunner};
use crate::parser::{HttpAuth, HttpTask, TaskKind, TaskType};
use crate::template;

pub struct HttpRunner {
    client: Client,
}

impl HttpRunner {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn run(&self, http: &HttpTask, context: &RunnerContext) -> RunnerResult {
        let environment = &context.environment;
        let url = template::interpolate(&http.url, environment);

        let method = match Method::from_bytes(http.method.to_uppercase().as_bytes()) {
            Ok(method) => method,
            Err(_) => {
                return RunnerResult::failure(format!(
                    "HTTP request failed: invalid method '{}'",
                    http.method
                ))
            }
        };

        info!("Executing http task: {} - {} {}", context.task_id, method, url);

        let mut request = self
            .client
            .request(method, &url)
            .timeout(context.timeout);

        for (name, value) in &http.headers {
            request = request.header(name.as_str(), template::interpolate(value, environment));
        }

        if let Some(ref data) = http.data {
            request = request.json(&template::interpolate_json(data, environment));
        }

        request = match http.auth {
            Some(HttpAuth::Basic {
                ref username,
                ref password,
            }) => request.basic_auth(
                template::interpolate(username, environment),
                password
                    .as_ref()
                    .map(|password| template::interpolate(password, environment)),
            ),
            Some(HttpAuth::Bearer { ref token }) => {
                request.bearer_auth(template::interpolate(token, environment))
            }
            None => request,
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return RunnerResult::failure(format!("HTTP request failed: {}", e)),
        };

        let status = response.status().as_u16();
        let headers: Map<String, JsonValue> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    JsonValue::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
                )
            })
            .collect();

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return RunnerResult::failure(format!("HTTP request failed: {}", e)),
        };

        debug!(
            "Http task {} received status {} ({} bytes)",
            context.task_id,
            status,
            body.len()
        );

        let data = match serde_json::from_str::<JsonValue>(&body) {
            Ok(parsed) => parsed,
            Err(_) => JsonValue::String(body),
        };

        RunnerResult::success(json!({
            "status": status,
            "headers": headers,
            "data": data,
        }))
    }
}

impl Default for HttpRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRunner for HttpRunner {
    fn task_type(&self) -> TaskType {
        TaskType::Http
    }

    async fn execute(&self, task: &TaskKind, context: &RunnerContext) -> RunnerResult {
        match task {
            TaskKind::Http(http) => self.run(http, context).await,
            other => wrong_kind(TaskType::Http, other),
        }
    }
}
