// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Job runs and their reports

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::{RunflowError, RunflowResult};
use crate::workflow::{Combination, Step};

/// Lifecycle state of a job run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    /// Stopped because a matrix sibling failed
    Cancelled,
    /// Never started because a needed job did not succeed
    Skipped,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Skipped)
                | (Pending, Cancelled)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, TimedOut)
                | (Running, Cancelled)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed-out",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// One job instance produced by matrix expansion
#[derive(Debug, Clone)]
pub struct JobRun {
    /// Id of the job in the workflow
    pub job_id: String,
    /// Display name, including matrix values
    pub name: String,
    /// Matrix combination of this run
    pub matrix: Combination,
    /// Steps in order
    pub steps: Vec<Step>,
    /// Workflow and job env, not yet interpolated
    pub env: HashMap<String, String>,
    /// Jobs that must succeed first
    pub needs: Vec<String>,
    /// Wall-clock bound for the whole run
    pub timeout: Duration,
    /// Cancel matrix siblings when this run fails
    pub fail_fast: bool,
    /// Limit on concurrently running siblings
    pub max_parallel: Option<usize>,
    /// Directory name of the run's isolated workspace, unique within a plan
    pub key: String,
    status: JobStatus,
}

impl JobRun {
    pub fn new(
        job_id: &str,
        name: &str,
        matrix: Combination,
        steps: Vec<Step>,
        timeout: Duration,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            name: name.to_string(),
            matrix,
            steps,
            env: HashMap::new(),
            needs: Vec::new(),
            timeout,
            fail_fast: true,
            max_parallel: None,
            key: run_key(job_id, 0),
            status: JobStatus::Pending,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Move to the next lifecycle state
    pub fn transition(&mut self, next: JobStatus) -> RunflowResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(RunflowError::ExecutionFailed {
                message: format!(
                    "Job run '{}' cannot go from {} to {}",
                    self.name, self.status, next
                ),
                help: None,
            });
        }

        tracing::debug!(job = %self.name, from = %self.status, to = %next, "job status");
        self.status = next;
        Ok(())
    }

    /// Report for a run that never started
    pub fn unstarted_report(&self) -> JobReport {
        JobReport {
            job_id: self.job_id.clone(),
            name: self.name.clone(),
            matrix: self.matrix.clone(),
            status: self.status,
            steps: self
                .steps
                .iter()
                .map(|s| StepReport::not_run(s.display_name()))
                .collect(),
            duration_ms: 0,
            error: None,
        }
    }

    /// Report for a run that failed before its first step
    pub fn setup_failed_report(&mut self, error: &RunflowError) -> JobReport {
        for next in [JobStatus::Running, JobStatus::Failed] {
            if let Err(e) = self.transition(next) {
                tracing::warn!(job = %self.name, error = %e, "could not record job status");
            }
        }
        JobReport {
            error: Some(error.to_string()),
            ..self.unstarted_report()
        }
    }
}

/// Workspace key for the `index`-th run of the plan
pub fn run_key(job_id: &str, index: usize) -> String {
    let slug = crate::runner::slug(job_id);
    if slug.is_empty() {
        format!("{}-job", index)
    } else {
        format!("{}-{}", index, slug)
    }
}

/// Outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
    NotRun,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed-out",
            Self::Cancelled => "cancelled",
            Self::NotRun => "not-run",
        };
        f.write_str(s)
    }
}

/// Step report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    /// Failure recorded but the job continued
    #[serde(default)]
    pub continued: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

impl StepReport {
    pub fn not_run(name: String) -> Self {
        Self {
            name,
            status: StepStatus::NotRun,
            exit_code: None,
            duration_ms: 0,
            continued: false,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn ran(&self) -> bool {
        self.status != StepStatus::NotRun
    }
}

/// Job run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Combination::is_empty")]
    pub matrix: Combination,
    pub status: JobStatus,
    pub steps: Vec<StepReport>,
    pub duration_ms: u64,
    /// Why the run failed before any step started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobReport {
    /// First step that did not succeed, if any
    pub fn failed_step(&self) -> Option<&StepReport> {
        self.steps
            .iter()
            .find(|s| s.ran() && s.status != StepStatus::Succeeded && !s.continued)
    }
}

/// Report for a whole workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub workflow: String,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// False when the event did not match any trigger
    pub triggered: bool,
    pub jobs: Vec<JobReport>,
    pub duration_ms: u64,
    pub success: bool,
}

impl RunReport {
    /// Final status: failed beats timed-out beats everything else
    pub fn status(&self) -> JobStatus {
        let statuses: Vec<JobStatus> = self.jobs.iter().map(|j| j.status).collect();
        if statuses.contains(&JobStatus::Failed) {
            JobStatus::Failed
        } else if statuses.contains(&JobStatus::TimedOut) {
            JobStatus::TimedOut
        } else if statuses.iter().all(JobStatus::is_success) {
            JobStatus::Succeeded
        } else if statuses.contains(&JobStatus::Cancelled) {
            JobStatus::Cancelled
        } else {
            JobStatus::Skipped
        }
    }

    pub fn to_json(&self) -> RunflowResult<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_run() -> JobRun {
        JobRun::new(
            "test",
            "test",
            Combination::new(),
            vec![Step::command("a", "true"), Step::command("b", "true")],
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut run = job_run();
        assert_eq!(run.status(), JobStatus::Pending);
        run.transition(JobStatus::Running).unwrap();
        run.transition(JobStatus::TimedOut).unwrap();
        assert!(run.status().is_terminal());
        assert!(run.transition(JobStatus::Running).is_err());
    }

    #[test]
    fn test_cannot_finish_without_running() {
        let mut run = job_run();
        assert!(run.transition(JobStatus::Succeeded).is_err());
        run.transition(JobStatus::Skipped).unwrap();
        assert_eq!(run.unstarted_report().steps.len(), 2);
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&JobStatus::TimedOut).unwrap(),
            "\"timed-out\""
        );
        assert_eq!(JobStatus::TimedOut.to_string(), "timed-out");
    }

    #[test]
    fn test_run_report_status_precedence() {
        let mut report = RunReport {
            workflow: "ci".into(),
            event: "push".into(),
            branch: None,
            triggered: true,
            jobs: vec![],
            duration_ms: 0,
            success: true,
        };
        assert_eq!(report.status(), JobStatus::Succeeded);

        let mut job = job_run().unstarted_report();
        job.status = JobStatus::TimedOut;
        report.jobs.push(job.clone());
        assert_eq!(report.status(), JobStatus::TimedOut);

        job.status = JobStatus::Failed;
        report.jobs.push(job);
        assert_eq!(report.status(), JobStatus::Failed);
    }

    #[test]
    fn test_setup_failure_keeps_cause() {
        let mut run = job_run();
        let report = run.setup_failed_report(&RunflowError::FileWriteError {
            path: "/nowhere".into(),
            error: "Permission denied".into(),
        });

        assert_eq!(run.status(), JobStatus::Failed);
        assert_eq!(report.status, JobStatus::Failed);
        assert!(report.steps.iter().all(|s| !s.ran()));
        assert!(report.error.as_deref().unwrap().contains("Permission denied"));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"error\""));
    }

    #[test]
    fn test_run_key_is_never_empty() {
        assert_eq!(run_key("test", 2), "2-test");
        assert_eq!(run_key("テスト", 0), "0-job");
    }
}
