// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the leadflow CLI structure and its run subcommand

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::engine::SkipPolicy;

#[derive(Parser, Debug)]
#[command(name = "leadflow")]
#[command(about = "Dependency-aware workflow orchestrator for lead-generation pipelines")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output and emoji markers")]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a workflow from a JSON or YAML file
    Run {
        #[arg(help = "Path to workflow file (.json, .yaml or .yml)")]
        workflow: PathBuf,

        #[arg(long = "var", value_name = "KEY=VALUE", help = "Override workflow environment entries")]
        vars: Vec<String>,

        #[arg(short, long, help = "Write the execution report as JSON to this file")]
        output: Option<PathBuf>,

        #[arg(long, value_name = "POLICY", help = "Whether skipped tasks satisfy dependents: block or propagate")]
        skip_policy: Option<SkipPolicy>,

        #[arg(long, help = "Dry run - validate and show the execution plan without running")]
        dry_run: bool,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse variables from KEY=VALUE format
    pub fn parse_variables(vars: &[String]) -> anyhow::Result<HashMap<String, String>> {
        let mut variables = HashMap::new();

        for var in vars {
            match var.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    variables.insert(key.trim().to_string(), value.to_string());
                }
                _ => {
                    return Err(anyhow::anyhow!(
                        "Invalid variable format '{}'. Expected 'KEY=VALUE'",
                        var
                    ));
                }
            }
        }

        Ok(variables)
    }
}
