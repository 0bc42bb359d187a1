// ABOUTME: Main application orchestration for the leadflow CLI
// ABOUTME: Coordinates between CLI arguments, configuration, and command execution

use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use super::commands::{self, RunOptions};
use super::{Args, Commands, Config};

pub struct App {
    config: Config,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Initialize logging to stderr so stdout only carries the run summary
    pub fn init_logging(&self, verbose: bool, no_color: bool) -> Result<()> {
        let log_level: &str = if verbose {
            "debug"
        } else {
            &self.config.logging.level
        };

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let result = match self.config.logging.format.as_str() {
            "compact" => tracing_subscriber::fmt()
                .compact()
                .with_env_filter(env_filter)
                .with_ansi(!no_color)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init(),
            _ => tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_ansi(!no_color)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init(),
        };
        result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

        debug!("Logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Run the application with parsed arguments
    pub async fn run(&self, args: Args) -> Result<()> {
        self.init_logging(args.verbose, args.no_color)?;

        info!("Starting leadflow v{}", env!("CARGO_PKG_VERSION"));
        debug!("Configuration loaded from: {:?}", args.config);

        match args.command {
            Commands::Run {
                workflow,
                vars,
                output,
                skip_policy,
                dry_run,
            } => {
                let options = RunOptions {
                    vars,
                    output,
                    skip_policy,
                    dry_run,
                    plain: args.no_color,
                };
                commands::run_workflow(workflow, options, &self.config).await
            }
        }
    }

    /// Create application from parsed command line arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        let config = Config::load(args.config.clone())?;
        Ok(Self::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SkipPolicy;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_app_creation() {
        let app = App::new(Config::default());
        assert_eq!(app.config().skip_policy, SkipPolicy::Block);
        assert_eq!(app.config().logging.level, "info");
    }

    #[test]
    fn test_app_from_args_with_config_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("leadflow.yaml");
        fs::write(&config_path, "logging:\n  format: compact\n").unwrap();

        let args = <Args as clap::Parser>::try_parse_from([
            "leadflow",
            "--config",
            config_path.to_str().unwrap(),
            "run",
            "flow.json",
        ])
        .unwrap();

        let app = App::from_args(&args).unwrap();
        assert_eq!(app.config().logging.format, "compact");
    }
}
