// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from a failed run.

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest installing a missing tool
    pub fn install_tool(tool: &str) -> Self {
        match tool {
            "uv" => Self {
                action: "Install uv".into(),
                steps: vec![
                    "uv is required by astral-sh/setup-uv steps".into(),
                    "Install it once and runflow will find it on PATH".into(),
                ],
                commands: vec![
                    "# Standalone installer:".into(),
                    "curl -LsSf https://astral.sh/uv/install.sh | sh".into(),
                    "".into(),
                    "# Using pip:".into(),
                    "python3 -m pip install --user uv".into(),
                ],
            },
            t if t.starts_with("python") => Self {
                action: format!("Install {}", t),
                steps: vec![
                    "actions/setup-python looks for pythonX.Y, python3 and python on PATH".into(),
                    "Install the requested version or adjust the matrix".into(),
                ],
                commands: vec![
                    "# Using uv:".into(),
                    "uv python install 3.12".into(),
                    "".into(),
                    "# Using pyenv:".into(),
                    "pyenv install 3.12".into(),
                ],
            },
            _ => Self {
                action: format!("Install {}", tool),
                steps: vec![format!("Install {} and ensure it's in your PATH", tool)],
                commands: vec![],
            },
        }
    }

    /// Suggest creating a workflow file
    pub fn create_workflow() -> Self {
        Self {
            action: "Create a workflow file".into(),
            steps: vec![
                "No workflow found at the given path".into(),
                "Initialize one from a template or point --workflow at an existing file".into(),
            ],
            commands: vec![
                "# Write .github/workflows/ci.yml:".into(),
                "runflow init --template python-uv".into(),
            ],
        }
    }

    /// Suggest fixing a circular `needs` chain
    pub fn fix_circular_dependency(jobs: &[String]) -> Self {
        Self {
            action: "Remove circular dependency".into(),
            steps: vec![
                format!("Detected cycle: {}", jobs.join(" → ")),
                "Review the 'needs' lists of these jobs".into(),
            ],
            commands: vec![
                "# Visualize the job graph:".into(),
                "runflow graph --format mermaid".into(),
            ],
        }
    }

    /// Suggest how to deal with a job that hit its deadline
    pub fn raise_timeout(job: &str, minutes: f64) -> Self {
        Self {
            action: format!("Job '{}' exceeded {} minute(s)", job, minutes),
            steps: vec![
                "Raise 'timeout-minutes' on the job".into(),
                "Or override it for a local run".into(),
            ],
            commands: vec![format!("runflow run --timeout-minutes {}", (minutes * 2.0).ceil())],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}
