// ABOUTME: Environment placeholder substitution for task parameters and conditions
// ABOUTME: Replaces ${env.KEY} references with values from the workflow environment

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

static ENV_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{\s*env\.([A-Za-z0-9_.\-]+)\s*\}").expect("placeholder pattern is valid")
});

/// Substitute every `${env.KEY}` placeholder in `input`.
///
/// Keys missing from `environment` are replaced with an empty string rather
/// than treated as an error.
pub fn interpolate(input: &str, environment: &HashMap<String, String>) -> String {
    if !input.contains("${") {
        return input.to_string();
    }

    ENV_PLACEHOLDER
        .replace_all(input, |caps: &Captures| {
            environment
                .get(&caps[1])
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

/// Apply [`interpolate`] to every string inside a JSON value, keys included.
pub fn interpolate_json(value: &JsonValue, environment: &HashMap<String, String>) -> JsonValue {
    match value {
        JsonValue::String(s) => JsonValue::String(interpolate(s, environment)),
        JsonValue::Array(items) => JsonValue::Array(
            items
                .iter()
                .map(|item| interpolate_json(item, environment))
                .collect(),
        ),
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .map(|(k, v)| (interpolate(k, environment), interpolate_json(v, environment)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Interpolate both keys and values of a string map.
pub fn interpolate_map(
    map: &HashMap<String, String>,
    environment: &HashMap<String, String>,
) -> HashMap<String, String> {
    map.iter()
        .map(|(k, v)| (interpolate(k, environment), interpolate(v, environment)))
        .collect()
}

/// Environment keys referenced by `input`, in order of appearance.
pub fn referenced_keys(input: &str) -> Vec<String> {
    ENV_PLACEHOLDER
        .captures_iter(input)
        .map(|caps| caps[1].to_string())
        .collect()
}
