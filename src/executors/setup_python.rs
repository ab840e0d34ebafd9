// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Python setup executor
//!
//! `actions/setup-python` does not download interpreters. It looks for one
//! on the host that satisfies `python-version` and puts it first on PATH
//! for the remaining steps of the job.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::{probe_version, Executor, StepResult};
use crate::errors::{RunflowError, RunflowResult};
use crate::runner::JobContext;
use crate::workflow::Step;

/// File read when the step has no `python-version` input
const VERSION_FILE: &str = ".python-version";

/// Suffix for staged interpreter links
#[cfg(unix)]
static LINK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Python setup executor
pub struct SetupPythonExecutor;

impl SetupPythonExecutor {
    pub const ACTION: &'static str = "actions/setup-python";

    pub fn new() -> Self {
        Self
    }

    /// Binary names to try, most specific first
    pub fn candidates(requested: Option<&str>) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(requested) = requested {
            let parts: Vec<&str> = requested.split('.').collect();
            if parts.len() >= 2 && parts[..2].iter().all(|p| p.parse::<u32>().is_ok()) {
                names.push(format!("python{}.{}", parts[0], parts[1]));
            }
        }
        names.push("python3".to_string());
        names.push("python".to_string());
        names
    }

    /// Extract `3.12.4` from `Python 3.12.4`
    pub fn parse_version(output: &str) -> Option<String> {
        output
            .split_whitespace()
            .skip_while(|word| !word.eq_ignore_ascii_case("python"))
            .nth(1)
            .map(|v| v.trim().to_string())
            .filter(|v| v.chars().next().is_some_and(|c| c.is_ascii_digit()))
    }

    /// Prefix match on dotted components; `x` and `*` match anything
    pub fn version_matches(requested: &str, actual: &str) -> bool {
        let requested: Vec<&str> = requested.trim().split('.').collect();
        let actual: Vec<&str> = actual.trim().split('.').collect();

        requested.len() <= actual.len()
            && requested
                .iter()
                .zip(&actual)
                .all(|(r, a)| matches!(*r, "x" | "X" | "*") || r == a)
    }

    async fn requested_version(step: &Step, ctx: &JobContext) -> Option<String> {
        if let Some(version) = step.with.get("python-version").filter(|v| !v.trim().is_empty()) {
            return Some(version.trim().to_string());
        }

        let file = step
            .with
            .get("python-version-file")
            .map(|f| ctx.workspace.join(f))
            .unwrap_or_else(|| ctx.workspace.join(VERSION_FILE));

        let content = tokio::fs::read_to_string(&file).await.ok()?;
        content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#'))
            .map(String::from)
    }

    async fn find_interpreter(
        requested: Option<&str>,
        ctx: &JobContext,
    ) -> Option<(PathBuf, String)> {
        for name in Self::candidates(requested) {
            let Some(path) = ctx.which(&name) else {
                continue;
            };

            let version = match probe_version(&path).await {
                Ok(output) => Self::parse_version(&output),
                Err(e) => {
                    tracing::debug!(binary = %path.display(), error = %e, "version probe failed");
                    None
                }
            };

            match (version, requested) {
                (Some(version), Some(req)) if Self::version_matches(req, &version) => {
                    return Some((path, version))
                }
                (Some(version), None) => return Some((path, version)),
                (Some(version), Some(_)) => {
                    tracing::debug!(binary = %path.display(), %version, "version does not match");
                }
                (None, _) => {}
            }
        }
        None
    }

    /// Directory placed on PATH that exposes the interpreter as `python` and `python3`
    #[cfg(unix)]
    async fn link_dir(interpreter: &Path, version: &str, ctx: &JobContext) -> RunflowResult<PathBuf> {
        let bin = ctx.tool_cache.join("python").join(version).join("bin");
        tokio::fs::create_dir_all(&bin)
            .await
            .map_err(|e| RunflowError::FileWriteError {
                path: bin.clone(),
                error: e.to_string(),
            })?;

        // Concurrent jobs share this directory; each link is built under a
        // private name and renamed over the old one.
        for name in ["python", "python3"] {
            let link = bin.join(name);
            let staged = bin.join(format!(
                ".{}.{}.{}",
                name,
                std::process::id(),
                LINK_COUNTER.fetch_add(1, Ordering::Relaxed)
            ));
            let write_err = |e: std::io::Error| RunflowError::FileWriteError {
                path: link.clone(),
                error: e.to_string(),
            };

            tokio::fs::symlink(interpreter, &staged).await.map_err(write_err)?;
            if let Err(e) = tokio::fs::rename(&staged, &link).await {
                let _ = tokio::fs::remove_file(&staged).await;
                return Err(write_err(e));
            }
        }
        Ok(bin)
    }

    #[cfg(not(unix))]
    async fn link_dir(interpreter: &Path, _version: &str, _ctx: &JobContext) -> RunflowResult<PathBuf> {
        Ok(interpreter
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default())
    }
}

impl Default for SetupPythonExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for SetupPythonExecutor {
    async fn execute(&self, step: &Step, ctx: &mut JobContext) -> RunflowResult<StepResult> {
        let start = Instant::now();
        let requested = Self::requested_version(step, ctx).await;

        let Some((interpreter, version)) = Self::find_interpreter(requested.as_deref(), ctx).await
        else {
            let tried = Self::candidates(requested.as_deref()).join(", ");
            return Ok(StepResult::failure(
                format!(
                    "No Python interpreter matching '{}' found on PATH (tried {})",
                    requested.as_deref().unwrap_or("any"),
                    tried
                ),
                1,
                start.elapsed(),
            ));
        };

        let bin = Self::link_dir(&interpreter, &version, ctx).await?;
        ctx.add_path(bin.clone());
        if let Some(root) = bin.parent() {
            ctx.env
                .insert("pythonLocation".to_string(), root.display().to_string());
        }

        tracing::info!(job = %ctx.job_name, %version, interpreter = %interpreter.display(), "python ready");

        Ok(StepResult::success(
            format!("Using Python {} at {}", version, interpreter.display()),
            start.elapsed(),
        ))
    }

    async fn check_available(&self) -> RunflowResult<bool> {
        Ok(which::which("python3").is_ok() || which::which("python").is_ok())
    }

    fn validate_step(&self, step: &Step) -> RunflowResult<()> {
        if let Some(version) = step.with.get("python-version") {
            let valid = version.trim().split('.').all(|part| {
                matches!(part, "x" | "X" | "*") || part.parse::<u32>().is_ok()
            });
            // Unresolved expressions are checked after interpolation
            if !valid && !version.contains("${{") {
                return Err(RunflowError::invalid_step(
                    "",
                    &step.display_name(),
                    &format!("Unsupported python-version '{}'", version),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerConfig;
    use crate::runner::JobRun;
    use crate::workflow::{Combination, Event};
    use std::time::Duration;

    fn context(dir: &Path) -> JobContext {
        let config = RunnerConfig {
            tool_cache: Some(PathBuf::from("tools")),
            ..RunnerConfig::default()
        };
        let run = JobRun::new("t", "t", Combination::new(), vec![], Duration::from_secs(60));
        JobContext::for_job(&run, &Event::push("main"), &config, dir).unwrap()
    }

    #[test]
    fn test_version_matches() {
        assert!(SetupPythonExecutor::version_matches("3.12", "3.12.4"));
        assert!(SetupPythonExecutor::version_matches("3.x", "3.9.1"));
        assert!(SetupPythonExecutor::version_matches("3", "3.11.0"));
        assert!(!SetupPythonExecutor::version_matches("3.12", "3.11.9"));
        assert!(!SetupPythonExecutor::version_matches("3.1", "3.12.0"));
        assert!(!SetupPythonExecutor::version_matches("3.12.4.1", "3.12.4"));
    }

    #[test]
    fn test_candidates() {
        assert_eq!(
            SetupPythonExecutor::candidates(Some("3.12")),
            vec!["python3.12", "python3", "python"]
        );
        assert_eq!(SetupPythonExecutor::candidates(Some("3.x")), vec!["python3", "python"]);
        assert_eq!(SetupPythonExecutor::candidates(None), vec!["python3", "python"]);
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(
            SetupPythonExecutor::parse_version("Python 3.12.4"),
            Some("3.12.4".to_string())
        );
        assert_eq!(SetupPythonExecutor::parse_version("command not found"), None);
    }

    #[test]
    fn test_validate_version_input() {
        let executor = SetupPythonExecutor::new();
        let ok = Step::action("actions/setup-python@v5", &[("python-version", "3.12")]);
        let templated = Step::action(
            "actions/setup-python@v5",
            &[("python-version", "${{ matrix.python-version }}")],
        );
        let bad = Step::action("actions/setup-python@v5", &[("python-version", "latest")]);

        assert!(executor.validate_step(&ok).is_ok());
        assert!(executor.validate_step(&templated).is_ok());
        assert!(executor.validate_step(&bad).is_err());
    }

    #[tokio::test]
    async fn test_version_file_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(VERSION_FILE), "# pinned\n3.11\n").unwrap();
        let ctx = context(dir.path());

        let step = Step::action("actions/setup-python@v5", &[]);
        assert_eq!(
            SetupPythonExecutor::requested_version(&step, &ctx).await,
            Some("3.11".to_string())
        );
    }

    #[tokio::test]
    async fn test_unavailable_version_fails_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());

        let step = Step::action("actions/setup-python@v5", &[("python-version", "1.4")]);
        let result = SetupPythonExecutor::new().execute(&step, &mut ctx).await.unwrap();

        assert!(!result.success);
        assert!(result.stderr.contains("1.4"));
        assert!(ctx.path_entries.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_concurrent_links_share_version_dir() {
        let dir = tempfile::tempdir().unwrap();
        let interpreter = dir.path().join("python3.11");
        std::fs::write(&interpreter, "").unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..12 {
            let ctx = context(dir.path());
            let interpreter = interpreter.clone();
            tasks.spawn(async move {
                SetupPythonExecutor::link_dir(&interpreter, "3.11.7", &ctx).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        let bin = dir.path().join("tools/python/3.11.7/bin");
        assert_eq!(std::fs::read_link(bin.join("python")).unwrap(), interpreter);
        assert_eq!(std::fs::read_dir(&bin).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_host_python_put_on_path() {
        if which::which("python3").is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());

        let step = Step::action("actions/setup-python@v5", &[("python-version", "3")]);
        let result = SetupPythonExecutor::new().execute(&step, &mut ctx).await.unwrap();

        assert!(result.success, "{}", result.stderr);
        assert_eq!(ctx.path_entries.len(), 1);
        assert!(ctx.env.contains_key("pythonLocation"));
    }
}
