// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Runner configuration
//!
//! Loaded from `.runflow.toml` in the project, falling back to
//! `config.toml` in the user's config directory, then to defaults.
//!
//! ```toml
//! shell = "bash"
//! default_timeout_minutes = 360
//! workspace = "isolated"
//! work_dir = ".runflow/work"
//! max_parallel = 4
//!
//! [env]
//! PYTHONUNBUFFERED = "1"
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{RunflowError, RunflowResult};
use crate::workflow::minutes;

/// Project-local configuration file name
pub const CONFIG_FILE: &str = ".runflow.toml";

/// Where job runs execute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkspaceMode {
    /// Run steps directly in the project directory
    #[default]
    InPlace,
    /// Copy the project into a fresh directory per job run
    Isolated,
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Shell used for `run:` steps without an explicit `shell`
    pub shell: String,

    /// Timeout for jobs that do not declare `timeout-minutes`
    pub default_timeout_minutes: f64,

    /// Workspace mode
    pub workspace: WorkspaceMode,

    /// Root for isolated workspaces, relative to the project
    pub work_dir: PathBuf,

    /// Upper bound on concurrently running job runs
    pub max_parallel: Option<usize>,

    /// Keep isolated workspaces after the run
    pub keep_workspace: bool,

    /// Directory for tools installed by setup actions
    pub tool_cache: Option<PathBuf>,

    /// Extra environment for every job
    pub env: HashMap<String, String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            shell: "bash".to_string(),
            default_timeout_minutes: 360.0,
            workspace: WorkspaceMode::default(),
            work_dir: PathBuf::from(".runflow/work"),
            max_parallel: None,
            keep_workspace: false,
            tool_cache: None,
            env: HashMap::new(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration for a project directory
    pub fn load(project_dir: &Path) -> RunflowResult<Self> {
        let local = project_dir.join(CONFIG_FILE);
        if local.exists() {
            tracing::debug!(path = %local.display(), "loading project config");
            return Self::from_file(&local);
        }

        if let Some(user) = Self::user_config_path().filter(|p| p.exists()) {
            tracing::debug!(path = %user.display(), "loading user config");
            return Self::from_file(&user);
        }

        Ok(Self::default())
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> RunflowResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RunflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config = Self::from_toml(&content).map_err(|e| RunflowError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        config.check().map_err(|message| RunflowError::Config {
            path: path.to_path_buf(),
            message,
        })?;

        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> RunflowResult<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    fn check(&self) -> Result<(), String> {
        if !(self.default_timeout_minutes.is_finite() && self.default_timeout_minutes > 0.0) {
            return Err("default_timeout_minutes must be positive".to_string());
        }
        if self.max_parallel == Some(0) {
            return Err("max_parallel must be at least 1".to_string());
        }
        if self.shell.trim().is_empty() {
            return Err("shell must not be empty".to_string());
        }
        Ok(())
    }

    /// `config.toml` in the platform config directory
    pub fn user_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Timeout applied to jobs without `timeout-minutes`
    pub fn default_timeout(&self) -> Duration {
        minutes(self.default_timeout_minutes)
    }

    /// Tool cache directory, resolved against the project directory
    pub fn tool_cache_dir(&self, project_dir: &Path) -> PathBuf {
        match self.tool_cache {
            Some(ref dir) => project_dir.join(dir),
            None => project_dirs()
                .map(|dirs| dirs.cache_dir().join("tools"))
                .unwrap_or_else(|| project_dir.join(".runflow/tools")),
        }
    }

    /// Root of isolated workspaces, resolved against the project directory
    pub fn work_root(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.work_dir)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "runflow", "runflow")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.shell, "bash");
        assert_eq!(config.default_timeout(), Duration::from_secs(360 * 60));
        assert_eq!(config.workspace, WorkspaceMode::InPlace);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RunnerConfig::from_toml(
            r#"
workspace = "isolated"
max_parallel = 2

[env]
PYTHONUNBUFFERED = "1"
"#,
        )
        .unwrap();

        assert_eq!(config.workspace, WorkspaceMode::Isolated);
        assert_eq!(config.max_parallel, Some(2));
        assert_eq!(config.env["PYTHONUNBUFFERED"], "1");
        assert_eq!(config.shell, "bash");
    }

    #[test]
    fn test_project_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "shell = \"sh\"\n").unwrap();

        let config = RunnerConfig::load(dir.path()).unwrap();
        assert_eq!(config.shell, "sh");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "default_timeout_minutes = 0\n").unwrap();

        let err = RunnerConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, RunflowError::Config { .. }));
    }

    #[test]
    fn test_paths_resolve_against_project() {
        let config = RunnerConfig {
            tool_cache: Some(PathBuf::from("tools")),
            ..RunnerConfig::default()
        };
        let project = Path::new("/project");
        assert_eq!(config.tool_cache_dir(project), PathBuf::from("/project/tools"));
        assert_eq!(config.work_root(project), PathBuf::from("/project/.runflow/work"));
    }
}
