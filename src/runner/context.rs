// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Per-job execution context
//!
//! State shared by the steps of one job run: the workspace, the
//! environment and PATH entries that setup actions add for later steps.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::{RunnerConfig, WorkspaceMode};
use crate::errors::RunflowResult;
use crate::runner::JobRun;
use crate::workflow::{Event, ExpressionContext};

/// Mutable state of a running job
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Job run name, for messages
    pub job_name: String,
    /// Project directory the run was started from
    pub source_dir: PathBuf,
    /// Directory steps run in
    pub workspace: PathBuf,
    /// How the workspace relates to the source
    pub workspace_mode: WorkspaceMode,
    /// Root of isolated workspaces (never copied by checkout)
    pub work_root: PathBuf,
    /// Where setup actions install tools
    pub tool_cache: PathBuf,
    /// Shell for `run:` steps without an explicit one
    pub default_shell: String,
    /// Triggering event
    pub event: Event,
    /// Matrix values of this run
    pub matrix: HashMap<String, String>,
    /// Environment visible to every step
    pub env: HashMap<String, String>,
    /// Directories prepended to PATH, most recent first
    pub path_entries: Vec<PathBuf>,
}

impl JobContext {
    /// Build the context for one job run
    pub fn for_job(
        run: &JobRun,
        event: &Event,
        config: &RunnerConfig,
        source_dir: &Path,
    ) -> RunflowResult<Self> {
        let workspace_mode = config.workspace;
        let work_root = config.work_root(source_dir);
        let workspace = match workspace_mode {
            WorkspaceMode::InPlace => source_dir.to_path_buf(),
            WorkspaceMode::Isolated => work_root.join(&run.key),
        };

        let mut ctx = Self {
            job_name: run.name.clone(),
            source_dir: source_dir.to_path_buf(),
            workspace,
            workspace_mode,
            work_root,
            tool_cache: config.tool_cache_dir(source_dir),
            default_shell: config.shell.clone(),
            event: event.clone(),
            matrix: run.matrix.clone().into_iter().collect(),
            env: HashMap::new(),
            path_entries: Vec::new(),
        };

        let mut env: HashMap<String, String> = config.env.clone();
        env.insert("CI".into(), "true".into());
        env.insert("RUNFLOW".into(), "true".into());
        env.insert("GITHUB_ACTIONS".into(), "false".into());
        env.insert("GITHUB_WORKSPACE".into(), ctx.workspace.display().to_string());
        env.insert("GITHUB_EVENT_NAME".into(), event.kind.to_string());
        if let Some(ref branch) = event.branch {
            env.insert("GITHUB_REF_NAME".into(), branch.clone());
        }

        // Job env may refer to the matrix and to variables set above
        ctx.env = env;
        let job_env = ctx.expressions(&HashMap::new()).interpolate_map(&run.env)?;
        ctx.env.extend(job_env);

        Ok(ctx)
    }

    /// Expression context for a step with the given step-level env
    pub fn expressions(&self, step_env: &HashMap<String, String>) -> ExpressionContext {
        let mut env = self.env.clone();
        env.extend(step_env.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut github = vec![
            ("event_name".to_string(), self.event.kind.to_string()),
            ("workspace".to_string(), self.workspace.display().to_string()),
        ];
        if let Some(ref branch) = self.event.branch {
            github.push(("ref_name".to_string(), branch.clone()));
            github.push(("ref".to_string(), format!("refs/heads/{}", branch)));
        }

        ExpressionContext::new()
            .with_context("matrix", self.matrix.clone())
            .with_context("env", env)
            .with_context("github", github)
            .with_context("runner", [("os", runner_os()), ("arch", std::env::consts::ARCH)])
    }

    /// Prepend a directory to PATH for all later steps
    pub fn add_path(&mut self, dir: PathBuf) {
        self.path_entries.retain(|p| p != &dir);
        self.path_entries.insert(0, dir);
    }

    /// PATH value seen by steps
    pub fn search_path(&self) -> OsString {
        let inherited = std::env::var_os("PATH").unwrap_or_default();
        let dirs = self
            .path_entries
            .iter()
            .cloned()
            .chain(std::env::split_paths(&inherited));

        std::env::join_paths(dirs).unwrap_or(inherited)
    }

    /// Full environment for a child process
    pub fn command_env(&self, step_env: &HashMap<String, String>) -> HashMap<String, OsString> {
        let mut env: HashMap<String, OsString> = self
            .env
            .iter()
            .chain(step_env.iter())
            .map(|(k, v)| (k.clone(), OsString::from(v)))
            .collect();
        env.insert("PATH".to_string(), self.search_path());
        env
    }

    /// Locate a binary on the job's PATH
    pub fn which(&self, binary: &str) -> Option<PathBuf> {
        which::which_in(binary, Some(self.search_path()), &self.workspace).ok()
    }
}

fn runner_os() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "macOS",
        "windows" => "Windows",
        other => other,
    }
}

/// Directory-safe form of a job run name
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Step;
    use std::time::Duration;

    fn run() -> JobRun {
        let mut run = JobRun::new(
            "test",
            "test (3.12)",
            [("python-version".to_string(), "3.12".to_string())].into(),
            vec![Step::command("noop", "true")],
            Duration::from_secs(60),
        );
        run.env
            .insert("PY".into(), "python${{ matrix.python-version }}".into());
        run
    }

    #[test]
    fn test_job_env_interpolated() {
        let ctx = JobContext::for_job(
            &run(),
            &Event::push("main"),
            &RunnerConfig::default(),
            Path::new("/project"),
        )
        .unwrap();

        assert_eq!(ctx.env["PY"], "python3.12");
        assert_eq!(ctx.env["GITHUB_REF_NAME"], "main");
        assert_eq!(ctx.env["CI"], "true");
        assert_eq!(ctx.workspace, PathBuf::from("/project"));
    }

    #[test]
    fn test_isolated_workspace_path() {
        let config = RunnerConfig {
            workspace: WorkspaceMode::Isolated,
            ..RunnerConfig::default()
        };
        let mut run = run();
        run.key = "3-test".into();
        let ctx = JobContext::for_job(&run, &Event::push("main"), &config, Path::new("/project"))
            .unwrap();
        assert_eq!(ctx.workspace, PathBuf::from("/project/.runflow/work/3-test"));
    }

    #[test]
    fn test_add_path_moves_to_front() {
        let mut ctx = JobContext::for_job(
            &run(),
            &Event::push("main"),
            &RunnerConfig::default(),
            Path::new("/project"),
        )
        .unwrap();

        ctx.add_path(PathBuf::from("/a"));
        ctx.add_path(PathBuf::from("/b"));
        ctx.add_path(PathBuf::from("/a"));
        assert_eq!(ctx.path_entries, vec![PathBuf::from("/a"), PathBuf::from("/b")]);

        let path = ctx.search_path();
        let first = std::env::split_paths(&path).next().unwrap();
        assert_eq!(first, PathBuf::from("/a"));
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("test (3.12, ubuntu)"), "test-3.12-ubuntu");
        assert_eq!(slug("Build/Release"), "build-release");
    }
}
