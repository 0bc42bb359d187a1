// ABOUTME: Configuration management for the leadflow application
// ABOUTME: Handles loading configuration from YAML files and LEADFLOW_* environment variables

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::{DefaultTimeouts, SkipPolicy};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub skip_policy: SkipPolicy,

    #[serde(default)]
    pub default_timeouts: DefaultTimeouts,

    /// Environment defaults; workflow entries and --var override them
    #[serde(default)]
    pub environment: HashMap<String, String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path or the default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("Config file not found: {}", p.display());
                }
                Some(p)
            }
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(ref config_path) => Self::from_file(config_path)?,
            None => Config::default(),
        };

        config.merge_env()?;
        Ok(config)
    }

    /// Parse a YAML config file without applying environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Find configuration file in the current directory, then the home directory
    fn find_config_file() -> Option<PathBuf> {
        let local = [
            "leadflow.yaml",
            "leadflow.yml",
            ".leadflow.yaml",
            ".leadflow.yml",
        ]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists());

        local.or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".leadflow").join("config.yaml"))
                .filter(|path| path.exists())
        })
    }

    /// Merge LEADFLOW_* environment variables into configuration
    fn merge_env(&mut self) -> Result<()> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    fn merge_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("LEADFLOW_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LEADFLOW_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(policy) = lookup("LEADFLOW_SKIP_POLICY") {
            self.skip_policy = policy
                .parse()
                .map_err(|e: String| anyhow::anyhow!("LEADFLOW_SKIP_POLICY: {}", e))?;
        }
        if let Some(ms) = lookup("LEADFLOW_SHELL_TIMEOUT_MS") {
            let ms: u64 = ms.parse().context("LEADFLOW_SHELL_TIMEOUT_MS must be milliseconds")?;
            self.default_timeouts.shell = Duration::from_millis(ms);
        }
        if let Some(ms) = lookup("LEADFLOW_HTTP_TIMEOUT_MS") {
            let ms: u64 = ms.parse().context("LEADFLOW_HTTP_TIMEOUT_MS must be milliseconds")?;
            self.default_timeouts.http = Duration::from_millis(ms);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("leadflow.yaml");

        fs::write(
            &config_path,
            r#"
skip_policy: propagate
default_timeouts:
  shell_ms: 1000
environment:
  REGION: eu
logging:
  level: debug
"#,
        )
        .unwrap();

        let config = Config::from_file(&config_path).unwrap();

        assert_eq!(config.skip_policy, SkipPolicy::Propagate);
        assert_eq!(config.default_timeouts.shell, Duration::from_millis(1000));
        assert_eq!(config.default_timeouts.http, Duration::from_millis(30_000));
        assert_eq!(config.environment.get("REGION"), Some(&"eu".to_string()));
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let temp_dir = tempdir().unwrap();
        assert!(Config::load(Some(temp_dir.path().join("nope.yaml"))).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("LEADFLOW_LOG_LEVEL", "warn"),
            ("LEADFLOW_SKIP_POLICY", "propagate"),
            ("LEADFLOW_HTTP_TIMEOUT_MS", "2500"),
        ]);

        let mut config = Config::default();
        config
            .merge_env_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.skip_policy, SkipPolicy::Propagate);
        assert_eq!(config.default_timeouts.http, Duration::from_millis(2500));
        assert_eq!(config.default_timeouts.shell, Duration::from_millis(300_000));
    }

    #[test]
    fn test_invalid_env_values() {
        let mut config = Config::default();
        assert!(config
            .merge_env_from(|key| (key == "LEADFLOW_SKIP_POLICY").then(|| "sometimes".to_string()))
            .is_err());
        assert!(config
            .merge_env_from(|key| (key == "LEADFLOW_SHELL_TIMEOUT_MS").then(|| "soon".to_string()))
            .is_err());
    }
}
