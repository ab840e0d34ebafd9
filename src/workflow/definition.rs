// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Workflow definition structures
//!
//! Defines the schema for workflow files (`.github/workflows/*.yml`).

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use super::matrix::{Combination, Matrix};
use super::trigger::Triggers;
use crate::errors::{RunflowError, RunflowResult};

/// Workflow definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Events that start the workflow
    #[serde(rename = "on", default)]
    pub triggers: Triggers,

    /// Global environment variables
    #[serde(
        default,
        deserialize_with = "scalar_map",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub env: HashMap<String, String>,

    /// Jobs keyed by job id
    pub jobs: BTreeMap<String, Job>,
}

impl Workflow {
    /// Load a workflow from a YAML file
    pub fn from_file(path: &Path) -> RunflowResult<Self> {
        if !path.exists() {
            return Err(RunflowError::WorkflowNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| RunflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_yaml(&content)
    }

    /// Parse a workflow from a YAML string
    pub fn from_yaml(yaml: &str) -> RunflowResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Serialize the workflow to YAML
    pub fn to_yaml(&self) -> RunflowResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Get a job by id
    pub fn get_job(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// All job ids, sorted
    pub fn job_ids(&self) -> Vec<&str> {
        self.jobs.keys().map(String::as_str).collect()
    }

    /// Display name of the workflow, falling back to the file stem
    pub fn display_name(&self, path: &Path) -> String {
        self.name.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "workflow".to_string())
        })
    }
}

/// A job: an ordered list of steps run on one runner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Job {
    /// Display name (may contain expressions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Runner labels. Recorded, not enforced: every job runs on the local host.
    #[serde(default, deserialize_with = "one_or_many")]
    pub runs_on: Vec<String>,

    /// Jobs that must succeed before this one starts
    #[serde(default, deserialize_with = "one_or_many")]
    pub needs: Vec<String>,

    /// Wall-clock bound for each job run, in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<f64>,

    /// Matrix and scheduling strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,

    /// Job-level environment variables
    #[serde(
        default,
        deserialize_with = "scalar_map",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub env: HashMap<String, String>,

    /// Steps in execution order
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Job {
    /// Name used for reports, before matrix values are appended
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(id)
    }

    /// Timeout for a run of this job
    pub fn timeout(&self, default: Duration) -> Duration {
        self.timeout_minutes.map(minutes).unwrap_or(default)
    }

    /// Expand the job's matrix. A job without one yields a single empty combination.
    pub fn combinations(&self) -> Vec<Combination> {
        match self.strategy.as_ref().and_then(|s| s.matrix.as_ref()) {
            Some(matrix) => matrix.expand(),
            None => vec![Combination::new()],
        }
    }

    /// Whether a failing matrix entry cancels its siblings
    pub fn fail_fast(&self) -> bool {
        self.strategy.as_ref().map(|s| s.fail_fast).unwrap_or(true)
    }

    /// Maximum number of this job's matrix entries running at once
    pub fn max_parallel(&self) -> Option<usize> {
        self.strategy.as_ref().and_then(|s| s.max_parallel)
    }
}

/// Job strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Strategy {
    /// Matrix of parameter axes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Matrix>,

    /// Cancel remaining matrix entries once one fails
    #[serde(default = "default_true")]
    pub fail_fast: bool,

    /// Limit on concurrently running matrix entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,
}

fn default_true() -> bool {
    true
}

/// A single step within a job
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Step {
    /// Step identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Reusable action reference (`owner/repo@ref`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,

    /// Inline script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,

    /// Action inputs
    #[serde(
        default,
        deserialize_with = "scalar_map",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub with: HashMap<String, String>,

    /// Step-level environment variables
    #[serde(
        default,
        deserialize_with = "scalar_map",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub env: HashMap<String, String>,

    /// Shell for `run` steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    /// Directory for `run` steps, relative to the workspace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    /// Record a failure but keep going
    #[serde(default)]
    pub continue_on_error: bool,

    /// Bound for this step alone, in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<f64>,
}

/// What a step does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind<'a> {
    /// Named reusable action, e.g. `actions/checkout` at `v4`
    Action {
        name: &'a str,
        reference: Option<&'a str>,
    },
    /// Inline shell command
    Command { script: &'a str },
}

impl Step {
    /// Create an inline command step
    pub fn command(name: &str, script: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            run: Some(script.to_string()),
            ..Self::default()
        }
    }

    /// Create an action step
    pub fn action(uses: &str, with: &[(&str, &str)]) -> Self {
        Self {
            uses: Some(uses.to_string()),
            with: with
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    /// Classify the step. `None` when both or neither of `uses`/`run` are set.
    pub fn kind(&self) -> Option<StepKind<'_>> {
        match (&self.uses, &self.run) {
            (Some(uses), None) => {
                let (name, reference) = match uses.split_once('@') {
                    Some((name, reference)) => (name, Some(reference)),
                    None => (uses.as_str(), None),
                };
                Some(StepKind::Action { name, reference })
            }
            (None, Some(script)) => Some(StepKind::Command { script }),
            _ => None,
        }
    }

    /// Registry key of the executor that handles this step
    pub fn executor_key(&self) -> Option<&str> {
        match self.kind()? {
            StepKind::Action { name, .. } => Some(name),
            StepKind::Command { .. } => Some(super::RUN_EXECUTOR),
        }
    }

    /// Name shown in progress output and reports
    pub fn display_name(&self) -> String {
        if let Some(ref name) = self.name {
            return name.clone();
        }
        match (&self.uses, &self.run) {
            (Some(uses), _) => format!("Run {}", uses),
            (None, Some(run)) => format!("Run {}", run.lines().next().unwrap_or("").trim()),
            (None, None) => "(empty step)".to_string(),
        }
    }
}

/// Convert fractional minutes into a duration. Non-positive values give zero.
pub fn minutes(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f64(value * 60.0).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

/// A YAML scalar normalized to its string form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Scalar(pub String);

impl Scalar {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        scalar_to_string(&value)
            .map(Scalar)
            .ok_or_else(|| D::Error::custom("expected a string, number or boolean"))
    }
}

pub(crate) fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, Scalar>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.0))
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
        None => vec![],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::fixtures::PYTHON_CI;
    use crate::workflow::{Event, EventKind};

    #[test]
    fn test_parse_python_workflow() {
        let workflow = Workflow::from_yaml(PYTHON_CI).unwrap();
        assert_eq!(workflow.name.as_deref(), Some("CI"));
        assert_eq!(workflow.job_ids(), vec!["test"]);

        let job = workflow.get_job("test").unwrap();
        assert_eq!(job.runs_on, vec!["ubuntu-latest"]);
        assert_eq!(job.timeout(Duration::from_secs(1)), Duration::from_secs(30 * 60));
        assert_eq!(job.steps.len(), 5);
        assert!(job.fail_fast());
    }

    #[test]
    fn test_step_kinds() {
        let workflow = Workflow::from_yaml(PYTHON_CI).unwrap();
        let steps = &workflow.jobs["test"].steps;

        assert_eq!(
            steps[0].kind(),
            Some(StepKind::Action {
                name: "actions/checkout",
                reference: Some("v4"),
            })
        );
        assert_eq!(steps[3].kind(), Some(StepKind::Command { script: "uv sync" }));
        assert_eq!(steps[2].with.get("version").map(String::as_str), Some("latest"));
        assert_eq!(steps[0].display_name(), "Run actions/checkout@v4");
        assert_eq!(steps[4].executor_key(), Some("run"));
    }

    #[test]
    fn test_step_with_both_uses_and_run_has_no_kind() {
        let step = Step {
            uses: Some("actions/checkout@v4".into()),
            run: Some("echo hi".into()),
            ..Step::default()
        };
        assert_eq!(step.kind(), None);
        assert_eq!(step.executor_key(), None);
    }

    #[test]
    fn test_numeric_scalars_are_strings() {
        let yaml = r#"
on: push
env:
  RETRIES: 3
  VERBOSE: true
jobs:
  build:
    needs: lint
    steps:
      - uses: actions/setup-python@v5
        with:
          python-version: 3.12
  lint:
    steps:
      - run: "true"
"#;
        let workflow = Workflow::from_yaml(yaml).unwrap();
        assert_eq!(workflow.env["RETRIES"], "3");
        assert_eq!(workflow.env["VERBOSE"], "true");
        assert_eq!(workflow.jobs["build"].needs, vec!["lint"]);
        assert_eq!(workflow.jobs["build"].steps[0].with["python-version"], "3.12");
    }

    #[test]
    fn test_round_trip_yaml() {
        let workflow = Workflow::from_yaml(PYTHON_CI).unwrap();
        let yaml = workflow.to_yaml().unwrap();
        let parsed = Workflow::from_yaml(&yaml).unwrap();

        assert_eq!(parsed.jobs.len(), workflow.jobs.len());
        assert!(parsed.triggers.matches(&Event::new(EventKind::Push, Some("develop"))));
        assert_eq!(parsed.jobs["test"].combinations().len(), 1);
    }

    #[test]
    fn test_minutes_conversion() {
        assert_eq!(minutes(30.0), Duration::from_secs(1800));
        assert_eq!(minutes(0.5), Duration::from_secs(30));
        assert_eq!(minutes(-1.0), Duration::ZERO);
        assert_eq!(minutes(f64::NAN), Duration::ZERO);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = Workflow::from_file(Path::new("does/not/exist.yml")).unwrap_err();
        assert!(matches!(err, RunflowError::WorkflowNotFound { .. }));
    }
}
