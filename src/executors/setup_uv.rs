// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! uv setup executor
//!
//! `astral-sh/setup-uv`: uses a uv already on PATH when it satisfies the
//! requested version, otherwise installs one with pip into the tool cache.
//!
//! `latest` is resolved once: the first install lands in `uv/latest` and
//! later runs reuse it until that directory is deleted.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::process::Command;

use super::{probe_version, run_captured, Executor, StepResult};
use crate::errors::{RunflowError, RunflowResult};
use crate::runner::JobContext;
use crate::workflow::Step;

/// uv setup executor
pub struct SetupUvExecutor;

impl SetupUvExecutor {
    pub const ACTION: &'static str = "astral-sh/setup-uv";

    pub fn new() -> Self {
        Self
    }

    /// Extract `0.4.18` from `uv 0.4.18 (7b55e9790 2024-10-01)`
    pub fn parse_version(output: &str) -> Option<String> {
        let mut words = output.split_whitespace();
        match (words.next(), words.next()) {
            (Some("uv"), Some(version)) => Some(version.to_string()),
            _ => None,
        }
    }

    /// `latest` accepts any version; otherwise a dotted prefix match
    pub fn satisfies(requested: &str, actual: &str) -> bool {
        if requested == "latest" {
            return true;
        }
        let requested: Vec<&str> = requested.trim_start_matches('v').split('.').collect();
        let actual: Vec<&str> = actual.split('.').collect();
        requested.len() <= actual.len() && requested.iter().zip(&actual).all(|(r, a)| r == a)
    }

    /// Install target inside the tool cache
    pub fn install_dir(tool_cache: &Path, version: &str) -> PathBuf {
        tool_cache.join("uv").join(version)
    }

    async fn installed_version(binary: &Path) -> Option<String> {
        match probe_version(binary).await {
            Ok(output) => Self::parse_version(&output),
            Err(e) => {
                tracing::debug!(binary = %binary.display(), error = %e, "uv probe failed");
                None
            }
        }
    }

    async fn pip_install(version: &str, target: &Path, ctx: &JobContext) -> RunflowResult<StepResult> {
        let python = ["python3", "python"]
            .iter()
            .find_map(|name| ctx.which(name))
            .ok_or_else(|| RunflowError::tool_not_found("python3"))?;

        let requirement = match version {
            "latest" => "uv".to_string(),
            v => format!("uv=={}", v.trim_start_matches('v')),
        };

        let mut cmd = Command::new(&python);
        cmd.args(["-m", "pip", "install", "--disable-pip-version-check", "--quiet", "--upgrade"])
            .arg("--target")
            .arg(target)
            .arg(&requirement)
            .current_dir(&ctx.workspace)
            .envs(ctx.command_env(&Default::default()));

        tracing::info!(job = %ctx.job_name, %requirement, target = %target.display(), "installing uv");
        run_captured(cmd, "pip").await
    }
}

impl Default for SetupUvExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for SetupUvExecutor {
    async fn execute(&self, step: &Step, ctx: &mut JobContext) -> RunflowResult<StepResult> {
        let start = Instant::now();
        let requested = step
            .with
            .get("version")
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .unwrap_or("latest")
            .to_string();

        // Already on PATH
        if let Some(uv) = ctx.which("uv") {
            if let Some(version) = Self::installed_version(&uv).await {
                if Self::satisfies(&requested, &version) {
                    return Ok(StepResult::success(
                        format!("Using uv {} at {}", version, uv.display()),
                        start.elapsed(),
                    ));
                }
            }
        }

        let target = Self::install_dir(&ctx.tool_cache, &requested);
        let bin = target.join("bin");
        let cached = bin.join("uv");

        // Installed by an earlier run
        if cached.is_file() {
            if let Some(version) = Self::installed_version(&cached).await {
                if Self::satisfies(&requested, &version) {
                    let mut message = format!("Using cached uv {} at {}", version, cached.display());
                    if requested == "latest" {
                        message.push_str(&format!(
                            " (pinned as latest; remove {} to update)",
                            target.display()
                        ));
                    }
                    ctx.add_path(bin);
                    return Ok(StepResult::success(message, start.elapsed()));
                }
            }
        }

        let installed = Self::pip_install(&requested, &target, ctx).await?;
        if !installed.success {
            return Ok(StepResult {
                stderr: format!("Failed to install uv {}:\n{}", requested, installed.stderr),
                duration: start.elapsed(),
                ..installed
            });
        }

        if !cached.is_file() {
            return Ok(StepResult::failure(
                format!("pip finished but {} does not exist", cached.display()),
                1,
                start.elapsed(),
            ));
        }

        ctx.add_path(bin);
        let version = Self::installed_version(&cached)
            .await
            .unwrap_or_else(|| requested.clone());

        Ok(StepResult::success(
            format!("Installed uv {} into {}", version, target.display()),
            start.elapsed(),
        ))
    }

    async fn check_available(&self) -> RunflowResult<bool> {
        Ok(which::which("uv").is_ok()
            || which::which("python3").is_ok()
            || which::which("python").is_ok())
    }

    fn validate_step(&self, step: &Step) -> RunflowResult<()> {
        if let Some(version) = step.with.get("version") {
            let v = version.trim().trim_start_matches('v');
            let valid = v == "latest"
                || v.contains("${{")
                || (!v.is_empty() && v.split('.').all(|p| p.parse::<u32>().is_ok()));
            if !valid {
                return Err(RunflowError::invalid_step(
                    "",
                    &step.display_name(),
                    format!("Unsupported uv version '{}'", version),
                ));
            }
        }
        Ok(())
    }
}
