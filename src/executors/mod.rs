// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Step executors
//!
//! This module provides the executor trait and the built-in
//! implementations: inline shell commands plus the checkout,
//! setup-python and setup-uv actions.

mod checkout;
mod setup_python;
mod setup_uv;
mod shell;

pub use checkout::CheckoutExecutor;
pub use setup_python::SetupPythonExecutor;
pub use setup_uv::SetupUvExecutor;
pub use shell::ShellExecutor;

use async_trait::async_trait;
use command_group::{AsyncCommandGroup, AsyncGroupChild};
use std::collections::HashMap;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::errors::{RunflowError, RunflowResult};
use crate::runner::JobContext;
use crate::workflow::{Step, RUN_EXECUTOR};

/// Result of step execution
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Whether execution succeeded
    pub success: bool,

    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Exit code
    pub exit_code: i32,

    /// Execution duration
    pub duration: Duration,
}

impl StepResult {
    /// Create a successful result
    pub fn success(stdout: String, duration: Duration) -> Self {
        Self {
            success: true,
            stdout,
            stderr: String::new(),
            exit_code: 0,
            duration,
        }
    }

    /// Create a failed result
    pub fn failure(stderr: String, exit_code: i32, duration: Duration) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr,
            exit_code,
            duration,
        }
    }
}

/// Trait for step executors
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a step whose expressions are already resolved
    ///
    /// # Arguments
    /// * `step` - The step configuration
    /// * `ctx` - Job state; setup actions add PATH entries and env here
    async fn execute(&self, step: &Step, ctx: &mut JobContext) -> RunflowResult<StepResult>;

    /// Check if the executor can work on this host
    async fn check_available(&self) -> RunflowResult<bool>;

    /// Validate step configuration
    fn validate_step(&self, step: &Step) -> RunflowResult<()>;
}

/// Executors keyed by action name (`actions/checkout`) or `run`
pub struct ExecutorRegistry {
    executors: HashMap<String, Box<dyn Executor>>,
}

impl ExecutorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Registry with all built-in executors
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(RUN_EXECUTOR, Box::new(ShellExecutor::new()));
        registry.register(CheckoutExecutor::ACTION, Box::new(CheckoutExecutor::new()));
        registry.register(SetupPythonExecutor::ACTION, Box::new(SetupPythonExecutor::new()));
        registry.register(SetupUvExecutor::ACTION, Box::new(SetupUvExecutor::new()));
        registry
    }

    /// Register an executor for an action name
    pub fn register(&mut self, name: &str, executor: Box<dyn Executor>) {
        self.executors.insert(name.to_string(), executor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.executors.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    /// Executor responsible for a step
    pub fn for_step(&self, step: &Step) -> RunflowResult<&dyn Executor> {
        let key = step.executor_key().ok_or_else(|| RunflowError::InvalidWorkflow {
            reason: format!("step '{}' must set exactly one of 'uses' or 'run'", step.display_name()),
            help: None,
        })?;

        self.executors
            .get(key)
            .map(|e| e.as_ref())
            .ok_or_else(|| RunflowError::ExecutorNotFound {
                action: key.to_string(),
            })
    }

    /// Names of executors that report themselves unavailable
    pub async fn unavailable(&self, names: &[&str]) -> Vec<String> {
        let mut missing = Vec::new();
        for name in names {
            match self.executors.get(*name) {
                Some(executor) => {
                    if !matches!(executor.check_available().await, Ok(true)) {
                        missing.push(name.to_string());
                    }
                }
                None => missing.push(name.to_string()),
            }
        }
        missing
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Time a terminated step gets between SIGTERM and SIGKILL
#[cfg_attr(not(unix), allow(dead_code))]
const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Run a prepared command in its own process group, capturing its output.
/// Dropping the returned future terminates the whole group.
pub(crate) async fn run_captured(mut cmd: Command, tool: &str) -> RunflowResult<StepResult> {
    let start = Instant::now();

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::debug!(command = ?cmd.as_std(), "spawning");

    let child = cmd
        .group_spawn()
        .map_err(|e| RunflowError::ToolExecutionFailed {
            tool: tool.to_string(),
            error: e.to_string(),
            help: Some(format!("Check that '{}' is installed and on PATH", tool)),
        })?;
    let mut group = GroupGuard::new(child);

    let stdout = group.child().inner().stdout.take();
    let stderr = group.child().inner().stderr.take();

    let (status, stdout, stderr) =
        tokio::join!(group.child().wait(), read_pipe(stdout), read_pipe(stderr));
    group.disarm();

    let status = status.map_err(|e| RunflowError::ToolExecutionFailed {
        tool: tool.to_string(),
        error: e.to_string(),
        help: None,
    })?;

    Ok(StepResult {
        success: status.success(),
        stdout,
        stderr,
        exit_code: status.code().unwrap_or(-1),
        duration: start.elapsed(),
    })
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            tracing::warn!(error = %e, "error reading child output");
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Owns a spawned process group until its leader has been waited on
struct GroupGuard {
    child: AsyncGroupChild,
    armed: bool,
}

impl GroupGuard {
    fn new(child: AsyncGroupChild) -> Self {
        Self { child, armed: true }
    }

    fn child(&mut self) -> &mut AsyncGroupChild {
        &mut self.child
    }

    /// The leader exited on its own; leave the group alone
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if self.armed {
            terminate_group(&mut self.child);
        }
    }
}

/// SIGTERM the group now, SIGKILL what is left after the grace period
#[cfg(unix)]
fn terminate_group(child: &mut AsyncGroupChild) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.inner().id() else {
        return;
    };
    let pgid = Pid::from_raw(pid as i32);

    match killpg(pgid, Signal::SIGTERM) {
        Ok(()) => {}
        Err(nix::errno::Errno::ESRCH) => return,
        Err(e) => tracing::warn!(pid, error = %e, "SIGTERM to process group failed"),
    }

    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        let _ = killpg(pgid, Signal::SIGKILL);
        return;
    };

    handle.spawn(async move {
        let deadline = tokio::time::Instant::now() + GRACE_PERIOD;
        while tokio::time::Instant::now() < deadline {
            // ESRCH once no member of the group is left
            if killpg(pgid, None).is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        match killpg(pgid, Signal::SIGKILL) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
            Err(e) => tracing::warn!(pid, error = %e, "SIGKILL to process group failed"),
        }
    });
}

#[cfg(not(unix))]
fn terminate_group(child: &mut AsyncGroupChild) {
    if let Err(e) = child.inner().start_kill() {
        tracing::warn!(error = %e, "could not kill step process");
    }
}

/// Run `<binary> --version` and return stdout and stderr joined
pub(crate) async fn probe_version(binary: &std::path::Path) -> RunflowResult<String> {
    let mut cmd = Command::new(binary);
    cmd.arg("--version");
    let result = run_captured(cmd, &binary.display().to_string()).await?;
    Ok(format!("{}{}", result.stdout, result.stderr).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = ExecutorRegistry::with_builtins();
        assert_eq!(
            registry.names(),
            vec!["actions/checkout", "actions/setup-python", "astral-sh/setup-uv", "run"]
        );
    }

    #[test]
    fn test_for_step_resolution() {
        let registry = ExecutorRegistry::with_builtins();

        assert!(registry.for_step(&Step::action("actions/checkout@v4", &[])).is_ok());
        assert!(registry.for_step(&Step::command("x", "true")).is_ok());
        assert!(matches!(
            registry.for_step(&Step::action("actions/cache@v4", &[])),
            Err(RunflowError::ExecutorNotFound { .. })
        ));
        assert!(registry.for_step(&Step::default()).is_err());
    }

    #[tokio::test]
    async fn test_run_captured_reports_exit_code() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err >&2; exit 3");

        let result = run_captured(cmd, "sh").await.unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout.trim(), "out");
        assert_eq!(result.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dropped_run_stops_grandchildren() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(format!("(sleep 1; touch '{}') & wait", marker.display()));

        let raced = tokio::time::timeout(Duration::from_millis(200), run_captured(cmd, "sh")).await;
        assert!(raced.is_err());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let cmd = Command::new("runflow-definitely-missing-binary");
        let err = run_captured(cmd, "missing").await.unwrap_err();
        assert!(matches!(err, RunflowError::ToolExecutionFailed { .. }));
    }
}
