// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for runflow.

pub mod graph;
pub mod init;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::errors::RecoverySuggestion;
use crate::workflow::Workflow;

/// Workflow file used when none is given
pub const DEFAULT_WORKFLOW: &str = ".github/workflows/ci.yml";

/// Local CI workflow runner
///
/// Run GitHub-Actions-style workflows on this machine.
#[derive(Parser, Debug)]
#[clap(
    name = "runflow",
    version,
    about = "Run CI workflows locally: triggers, matrix, steps and timeouts",
    long_about = None,
    after_help = "Examples:\n\
        runflow init                     Create .github/workflows/ci.yml\n\
        runflow run                      Run the workflow for a push on the current branch\n\
        runflow run -e pull_request      Run it as a pull request\n\
        runflow run --dry-run -b main    Show the job runs a push to main would create\n\n\
        See 'runflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a workflow file from a template
    Init {
        /// Template (python-uv, rust-cargo)
        #[clap(short, long, default_value = "python-uv")]
        template: String,

        /// Overwrite an existing workflow file
        #[clap(long)]
        force: bool,
    },

    /// Run the workflow for an event
    Run {
        /// Workflow file
        #[clap(short, long, default_value = DEFAULT_WORKFLOW)]
        workflow: PathBuf,

        /// Event kind (push, pull_request, workflow_dispatch, ...)
        #[clap(short, long, default_value = "push")]
        event: String,

        /// Branch of the event; base branch for pull_request (defaults to the current git branch)
        #[clap(short, long)]
        branch: Option<String>,

        /// Run only these jobs
        #[clap(short, long = "job", value_name = "JOB")]
        jobs: Vec<String>,

        /// Show the job runs without executing them
        #[clap(long)]
        dry_run: bool,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,

        /// Override every job's timeout-minutes
        #[clap(long, value_name = "MINUTES")]
        timeout_minutes: Option<f64>,

        /// Run each job in a copy of the project
        #[clap(long)]
        isolated: bool,

        /// Upper bound on concurrently running job runs
        #[clap(long, value_name = "N")]
        max_parallel: Option<usize>,
    },

    /// Validate a workflow file
    Validate {
        /// Workflow file to validate
        #[clap(default_value = DEFAULT_WORKFLOW)]
        workflow: PathBuf,
    },

    /// Show the job dependency graph
    Graph {
        /// Workflow file
        #[clap(default_value = DEFAULT_WORKFLOW)]
        workflow: PathBuf,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,
    },
}

/// Output format for the run command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}

/// Load a workflow, pointing at `runflow init` when the file is missing
pub(crate) fn load_workflow(path: &Path) -> miette::Result<Workflow> {
    if !path.exists() {
        return Err(miette::miette!(
            "Workflow file not found: {}\n\n{}",
            path.display(),
            RecoverySuggestion::create_workflow()
        ));
    }

    Workflow::from_file(path).map_err(|e| miette::miette!("Failed to load workflow: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from([
            "runflow", "run", "-e", "pull_request", "-b", "main", "-j", "test", "-j", "lint",
            "--dry-run", "--format", "json", "--timeout-minutes", "0.5",
        ]);

        match cli.command {
            Commands::Run {
                event,
                branch,
                jobs,
                dry_run,
                format,
                timeout_minutes,
                workflow,
                ..
            } => {
                assert_eq!(event, "pull_request");
                assert_eq!(branch.as_deref(), Some("main"));
                assert_eq!(jobs, vec!["test", "lint"]);
                assert!(dry_run);
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(timeout_minutes, Some(0.5));
                assert_eq!(workflow, PathBuf::from(DEFAULT_WORKFLOW));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_graph_format() {
        assert_eq!("DOT".parse::<GraphFormat>().unwrap(), GraphFormat::Dot);
        assert!("svg".parse::<GraphFormat>().is_err());
    }
}
