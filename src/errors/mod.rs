// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Error types with actionable help
//!
//! Every error carries a diagnostic code and, where one exists, a hint
//! telling the user how to get unstuck.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for runflow operations
pub type RunflowResult<T> = Result<T, RunflowError>;

/// Main error type for runflow
#[derive(Error, Debug, Diagnostic)]
pub enum RunflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Tool Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Tool '{tool}' not found")]
    #[diagnostic(code(runflow::tool_not_found), help("{suggestion}"))]
    ToolNotFound { tool: String, suggestion: String },

    #[error("Tool '{tool}' execution failed: {error}")]
    #[diagnostic(code(runflow::tool_execution_failed))]
    ToolExecutionFailed {
        tool: String,
        error: String,
        #[help]
        help: Option<String>,
    },

    #[error("No executor for action: {action}")]
    #[diagnostic(
        code(runflow::executor_not_found),
        help("Built-in actions: actions/checkout, actions/setup-python, astral-sh/setup-uv")
    )]
    ExecutorNotFound { action: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Workflow Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Workflow file not found: {path}")]
    #[diagnostic(
        code(runflow::workflow_not_found),
        help("Create one with 'runflow init' or pass --workflow <FILE>")
    )]
    WorkflowNotFound { path: PathBuf },

    #[error("Invalid workflow: {reason}")]
    #[diagnostic(code(runflow::invalid_workflow))]
    InvalidWorkflow {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Step '{step}' in job '{job}' is invalid: {reason}")]
    #[diagnostic(code(runflow::invalid_step))]
    InvalidStep {
        job: String,
        step: String,
        reason: String,
    },

    #[error("Circular job dependency detected")]
    #[diagnostic(
        code(runflow::circular_dependency),
        help("Review the 'needs' lists of your jobs to remove the cycle")
    )]
    CircularDependency { jobs: Vec<String> },

    #[error("Job '{job}' needs unknown job '{dependency}'")]
    #[diagnostic(
        code(runflow::unknown_dependency),
        help("Check that '{dependency}' is defined under 'jobs:'")
    )]
    UnknownDependency { job: String, dependency: String },

    #[error("Job '{job}' not found in workflow")]
    #[diagnostic(code(runflow::job_not_found))]
    JobNotFound { job: String },

    #[error("Invalid expression '{expression}': {reason}")]
    #[diagnostic(
        code(runflow::invalid_expression),
        help("Supported contexts: matrix, env, github, runner")
    )]
    InvalidExpression { expression: String, reason: String },

    #[error("Unknown event kind: {kind}")]
    #[diagnostic(code(runflow::invalid_event))]
    InvalidEvent { kind: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Execution failed: {message}")]
    #[diagnostic(code(runflow::execution_failed))]
    ExecutionFailed {
        message: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(runflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(runflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("Invalid configuration in '{path}': {message}")]
    #[diagnostic(code(runflow::config_error))]
    Config { path: PathBuf, message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(runflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(runflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(runflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(runflow::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(runflow::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for RunflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for RunflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for RunflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for RunflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for RunflowError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl RunflowError {
    /// Create a tool not found error with an installation hint
    pub fn tool_not_found(tool: &str) -> Self {
        let suggestion = match tool {
            "uv" => "Install uv: https://docs.astral.sh/uv/getting-started/installation/".to_string(),
            t if t.starts_with("python") => {
                "Install the requested Python and make sure it is on PATH".to_string()
            }
            _ => format!("Install {} and ensure it's in your PATH", tool),
        };

        Self::ToolNotFound {
            tool: tool.to_string(),
            suggestion,
        }
    }

    /// Create an invalid step error
    pub fn invalid_step(job: &str, step: &str, reason: impl Into<String>) -> Self {
        Self::InvalidStep {
            job: job.to_string(),
            step: step.to_string(),
            reason: reason.into(),
        }
    }
}
