// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Shell executor
//!
//! Executes inline `run:` commands.

use async_trait::async_trait;
use tokio::process::Command;

use super::{run_captured, Executor, StepResult};
use crate::errors::{RunflowError, RunflowResult};
use crate::runner::JobContext;
use crate::workflow::{Step, StepKind};

/// Shell executor
pub struct ShellExecutor;

impl ShellExecutor {
    /// Create a new shell executor
    pub fn new() -> Self {
        Self
    }

    /// Arguments that make `shell` run `script` and stop at the first error
    pub fn shell_args(shell: &str, script: &str) -> Vec<String> {
        let program = std::path::Path::new(shell)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut args: Vec<String> = match program.as_str() {
            "bash" => vec!["--noprofile", "--norc", "-eo", "pipefail", "-c"],
            "sh" | "dash" | "zsh" => vec!["-e", "-c"],
            "pwsh" | "powershell" => vec!["-NoProfile", "-NonInteractive", "-Command"],
            "cmd" => vec!["/D", "/C"],
            _ => vec!["-c"],
        }
        .into_iter()
        .map(String::from)
        .collect();

        args.push(script.to_string());
        args
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for ShellExecutor {
    async fn execute(&self, step: &Step, ctx: &mut JobContext) -> RunflowResult<StepResult> {
        let Some(StepKind::Command { script }) = step.kind() else {
            return Err(RunflowError::invalid_step(
                &ctx.job_name,
                &step.display_name(),
                "Expected a run step",
            ));
        };

        let shell = step.shell.as_deref().unwrap_or(&ctx.default_shell);
        let working_dir = match step.working_directory {
            Some(ref dir) => ctx.workspace.join(dir),
            None => ctx.workspace.clone(),
        };

        let program = ctx.which(shell).unwrap_or_else(|| shell.into());
        let mut cmd = Command::new(program);
        cmd.args(Self::shell_args(shell, script));
        cmd.current_dir(&working_dir);
        cmd.envs(ctx.command_env(&step.env));

        run_captured(cmd, shell).await
    }

    async fn check_available(&self) -> RunflowResult<bool> {
        Ok(which::which("bash").is_ok() || which::which("sh").is_ok())
    }

    fn validate_step(&self, step: &Step) -> RunflowResult<()> {
        let Some(StepKind::Command { script }) = step.kind() else {
            return Err(RunflowError::invalid_step("", &step.display_name(), "Not a run step"));
        };

        if script.trim().is_empty() {
            return Err(RunflowError::invalid_step(
                "",
                &step.display_name(),
                "Shell command is empty",
            ));
        }

        Ok(())
    }
}
