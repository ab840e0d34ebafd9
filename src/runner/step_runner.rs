// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Step runner
//!
//! Runs the steps of one job run in order against a deadline. Each step
//! races the job deadline, its own `timeout-minutes` and the cancellation
//! signal; whichever finishes first decides the outcome. Dropping the losing
//! step future kills its child process.

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::errors::RunflowResult;
use crate::executors::{ExecutorRegistry, StepResult};
use crate::runner::job::{JobReport, JobRun, JobStatus, StepReport, StepStatus};
use crate::runner::JobContext;
use crate::workflow::{minutes, Step};

/// Fallback when a deadline would overflow `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// How a single step ended
enum StepOutcome {
    Finished(StepResult),
    Errored(String),
    StepTimedOut(Duration),
    JobTimedOut,
    Cancelled,
}

/// Runs the steps of a job
pub struct StepRunner {
    registry: Arc<ExecutorRegistry>,
    progress: bool,
    verbose: bool,
}

impl StepRunner {
    pub fn new(registry: Arc<ExecutorRegistry>) -> Self {
        Self {
            registry,
            progress: false,
            verbose: false,
        }
    }

    /// Print a line per step as it starts and finishes
    pub fn with_progress(mut self, progress: bool, verbose: bool) -> Self {
        self.progress = progress;
        self.verbose = verbose;
        self
    }

    /// Run all steps of `job`, moving it from pending to a terminal state
    pub async fn run(
        &self,
        job: &mut JobRun,
        ctx: &mut JobContext,
        mut cancel: watch::Receiver<bool>,
    ) -> JobReport {
        let started = Instant::now();
        let deadline = deadline_after(started, job.timeout);

        if let Err(e) = job.transition(JobStatus::Running) {
            tracing::warn!(job = %job.name, error = %e, "job run already started");
        }
        tracing::info!(job = %job.name, steps = job.steps.len(), timeout = ?job.timeout, "job started");

        let mut outcome = JobStatus::Succeeded;
        let mut reports = Vec::with_capacity(job.steps.len());

        for step in &job.steps {
            let name = step_name(step, ctx);

            if outcome == JobStatus::Succeeded {
                if *cancel.borrow() {
                    outcome = JobStatus::Cancelled;
                } else if Instant::now() >= deadline {
                    outcome = JobStatus::TimedOut;
                }
            }
            if outcome != JobStatus::Succeeded {
                reports.push(StepReport::not_run(name));
                continue;
            }

            self.print_start(&job.name, &name);
            let step_started = Instant::now();
            let result = self.run_step(step, ctx, deadline, &mut cancel).await;
            let failure = match result {
                StepOutcome::Finished(ref r) if r.success => None,
                StepOutcome::Cancelled => Some(JobStatus::Cancelled),
                StepOutcome::JobTimedOut => Some(JobStatus::TimedOut),
                _ => Some(JobStatus::Failed),
            };

            let mut report = step_report(name, result, step_started.elapsed());
            match failure {
                Some(JobStatus::Failed) if step.continue_on_error => report.continued = true,
                Some(status) => outcome = status,
                None => {}
            }

            self.print_finish(&job.name, &report);
            reports.push(report);
        }

        if let Err(e) = job.transition(outcome) {
            tracing::warn!(job = %job.name, error = %e, "could not record job status");
        }
        tracing::info!(job = %job.name, status = %outcome, elapsed = ?started.elapsed(), "job finished");

        JobReport {
            job_id: job.job_id.clone(),
            name: job.name.clone(),
            matrix: job.matrix.clone(),
            status: job.status(),
            steps: reports,
            duration_ms: started.elapsed().as_millis() as u64,
            error: None,
        }
    }

    async fn run_step(
        &self,
        step: &Step,
        ctx: &mut JobContext,
        job_deadline: Instant,
        cancel: &mut watch::Receiver<bool>,
    ) -> StepOutcome {
        let resolved = match resolve(step, ctx) {
            Ok(resolved) => resolved,
            Err(e) => return StepOutcome::Errored(e.to_string()),
        };

        let executor = match self.registry.for_step(&resolved) {
            Ok(executor) => executor,
            Err(e) => return StepOutcome::Errored(e.to_string()),
        };
        if let Err(e) = executor.validate_step(&resolved) {
            return StepOutcome::Errored(e.to_string());
        }

        let step_timeout = resolved.timeout_minutes.map(minutes);
        let step_deadline = step_timeout.map(|t| deadline_after(Instant::now(), t));

        tracing::debug!(job = %ctx.job_name, step = %resolved.display_name(), "step started");

        tokio::select! {
            biased;
            _ = wait_cancelled(cancel) => StepOutcome::Cancelled,
            _ = tokio::time::sleep_until(job_deadline) => StepOutcome::JobTimedOut,
            _ = sleep_until_opt(step_deadline) => {
                StepOutcome::StepTimedOut(step_timeout.unwrap_or_default())
            }
            result = executor.execute(&resolved, ctx) => match result {
                Ok(result) => StepOutcome::Finished(result),
                Err(e) => StepOutcome::Errored(e.to_string()),
            },
        }
    }

    fn print_start(&self, job: &str, step: &str) {
        if self.progress {
            println!("  {} {} {} {}", "→".blue(), job.dimmed(), "›".dimmed(), step);
        }
    }

    fn print_finish(&self, job: &str, report: &StepReport) {
        if !self.progress {
            return;
        }

        let elapsed = format!("({:.2}s)", report.duration_ms as f64 / 1000.0);
        let line = format!("{} {} {}", job.dimmed(), "›".dimmed(), report.name.bold());
        match report.status {
            StepStatus::Succeeded => println!("  {} {} {}", "✓".green(), line, elapsed.dimmed()),
            StepStatus::Failed if report.continued => {
                println!("  {} {} failed, continuing", "⚠".yellow(), line)
            }
            StepStatus::Failed => println!("  {} {} failed", "✗".red(), line),
            StepStatus::TimedOut => println!("  {} {} timed out", "✗".red(), line),
            StepStatus::Cancelled => println!("  {} {} cancelled", "✗".yellow(), line),
            StepStatus::NotRun => {}
        }

        if self.verbose && !report.stdout.is_empty() {
            println!("{}", report.stdout.trim_end());
        }
        if report.status != StepStatus::Succeeded && !report.stderr.is_empty() {
            eprintln!("{}", report.stderr.trim_end().dimmed());
        }
    }
}

/// Interpolate the step's expressions against the job context
fn resolve(step: &Step, ctx: &JobContext) -> RunflowResult<Step> {
    let expressions = ctx.expressions(&step.env);

    let mut resolved = step.clone();
    resolved.env = expressions.interpolate_map(&step.env)?;
    resolved.with = expressions.interpolate_map(&step.with)?;
    if let Some(ref run) = step.run {
        resolved.run = Some(expressions.interpolate(run)?);
    }
    if let Some(ref name) = step.name {
        resolved.name = Some(expressions.interpolate(name)?);
    }
    if let Some(ref dir) = step.working_directory {
        resolved.working_directory = Some(expressions.interpolate(dir)?);
    }
    Ok(resolved)
}

/// Display name with expressions resolved where possible
fn step_name(step: &Step, ctx: &JobContext) -> String {
    match step.name {
        Some(ref name) => ctx
            .expressions(&step.env)
            .interpolate(name)
            .unwrap_or_else(|_| name.clone()),
        None => step.display_name(),
    }
}

fn step_report(name: String, outcome: StepOutcome, elapsed: Duration) -> StepReport {
    let mut report = StepReport::not_run(name);
    report.duration_ms = elapsed.as_millis() as u64;

    match outcome {
        StepOutcome::Finished(result) => {
            report.status = if result.success {
                StepStatus::Succeeded
            } else {
                StepStatus::Failed
            };
            report.exit_code = Some(result.exit_code);
            report.stdout = result.stdout;
            report.stderr = result.stderr;
        }
        StepOutcome::Errored(message) => {
            report.status = StepStatus::Failed;
            report.stderr = message;
        }
        StepOutcome::StepTimedOut(limit) => {
            report.status = StepStatus::TimedOut;
            report.stderr = format!("Step exceeded its timeout of {:?}", limit);
        }
        StepOutcome::JobTimedOut => {
            report.status = StepStatus::TimedOut;
            report.stderr = "Job deadline exceeded".to_string();
        }
        StepOutcome::Cancelled => {
            report.status = StepStatus::Cancelled;
            report.stderr = "Cancelled".to_string();
        }
    }
    report
}

fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Resolves once the cancel flag is set; never if the sender goes away
async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerConfig;
    use crate::workflow::{Combination, Event};
    use std::path::Path;

    fn job(steps: Vec<Step>, timeout: Duration) -> JobRun {
        JobRun::new("test", "test", Combination::new(), steps, timeout)
    }

    fn context(run: &JobRun, dir: &Path) -> JobContext {
        JobContext::for_job(run, &Event::push("main"), &RunnerConfig::default(), dir).unwrap()
    }

    async fn run_job(mut job: JobRun) -> (JobRun, JobReport) {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&job, dir.path());
        let (_tx, rx) = watch::channel(false);

        let runner = StepRunner::new(Arc::new(ExecutorRegistry::with_builtins()));
        let report = runner.run(&mut job, &mut ctx, rx).await;
        (job, report)
    }

    fn statuses(report: &JobReport) -> Vec<StepStatus> {
        report.steps.iter().map(|s| s.status).collect()
    }

    #[tokio::test]
    async fn test_all_steps_succeed() {
        let (job, report) = run_job(job(
            vec![Step::command("one", "true"), Step::command("two", "echo ok")],
            Duration::from_secs(30),
        ))
        .await;

        assert_eq!(job.status(), JobStatus::Succeeded);
        assert_eq!(report.status, JobStatus::Succeeded);
        assert_eq!(statuses(&report), vec![StepStatus::Succeeded; 2]);
        assert_eq!(report.steps[1].stdout.trim(), "ok");
    }

    #[tokio::test]
    async fn test_failing_step_halts_sequence() {
        let (job, report) = run_job(job(
            vec![
                Step::command("one", "true"),
                Step::command("two", "exit 4"),
                Step::command("three", "true"),
            ],
            Duration::from_secs(30),
        ))
        .await;

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(
            statuses(&report),
            vec![StepStatus::Succeeded, StepStatus::Failed, StepStatus::NotRun]
        );
        assert_eq!(report.steps[1].exit_code, Some(4));
        assert_eq!(report.failed_step().map(|s| s.name.as_str()), Some("two"));
    }

    #[tokio::test]
    async fn test_deadline_during_step_times_out_job() {
        let started = std::time::Instant::now();
        let (job, report) = run_job(job(
            vec![
                Step::command("one", "true"),
                Step::command("slow", "sleep 5"),
                Step::command("three", "true"),
            ],
            minutes(0.01),
        ))
        .await;

        assert_eq!(job.status(), JobStatus::TimedOut);
        assert_eq!(
            statuses(&report),
            vec![StepStatus::Succeeded, StepStatus::TimedOut, StepStatus::NotRun]
        );
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timed_out_step_leaves_no_processes_behind() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let mut job = job(
            vec![Step::command(
                "background",
                &format!("(sleep 2; touch '{}'); true", marker.display()),
            )],
            minutes(0.005),
        );
        let mut ctx = context(&job, dir.path());
        let (_tx, rx) = watch::channel(false);

        let runner = StepRunner::new(Arc::new(ExecutorRegistry::with_builtins()));
        let report = runner.run(&mut job, &mut ctx, rx).await;
        assert_eq!(report.status, JobStatus::TimedOut);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_step_timeout_fails_job() {
        let mut slow = Step::command("slow", "sleep 5");
        slow.timeout_minutes = Some(0.005);

        let (job, report) = run_job(job(
            vec![slow, Step::command("after", "true")],
            Duration::from_secs(30),
        ))
        .await;

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(statuses(&report), vec![StepStatus::TimedOut, StepStatus::NotRun]);
    }

    #[tokio::test]
    async fn test_continue_on_error() {
        let mut flaky = Step::command("flaky", "exit 1");
        flaky.continue_on_error = true;

        let (job, report) = run_job(job(
            vec![flaky, Step::command("after", "true")],
            Duration::from_secs(30),
        ))
        .await;

        assert_eq!(job.status(), JobStatus::Succeeded);
        assert!(report.steps[0].continued);
        assert_eq!(report.steps[1].status, StepStatus::Succeeded);
        assert!(report.failed_step().is_none());
    }

    #[tokio::test]
    async fn test_matrix_expressions_resolved() {
        let mut matrix_run = JobRun::new(
            "test",
            "test (3.12)",
            [("python-version".to_string(), "3.12".to_string())].into(),
            vec![Step::command(
                "Show ${{ matrix.python-version }}",
                "echo py${{ matrix.python-version }}",
            )],
            Duration::from_secs(30),
        );
        matrix_run.env.insert("MODE".into(), "ci".into());

        let (_, report) = run_job(matrix_run).await;
        assert_eq!(report.steps[0].name, "Show 3.12");
        assert_eq!(report.steps[0].stdout.trim(), "py3.12");
    }

    #[tokio::test]
    async fn test_unknown_context_fails_step() {
        let (job, report) = run_job(job(
            vec![Step::command("bad", "echo ${{ secrets.TOKEN }}")],
            Duration::from_secs(30),
        ))
        .await;

        assert_eq!(job.status(), JobStatus::Failed);
        assert!(report.steps[0].stderr.contains("secrets.TOKEN"));
    }

    #[tokio::test]
    async fn test_cancel_signal_stops_running_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job(
            vec![Step::command("slow", "sleep 5"), Step::command("after", "true")],
            Duration::from_secs(30),
        );
        let mut ctx = context(&job, dir.path());
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            tx.send_replace(true);
        });

        let runner = StepRunner::new(Arc::new(ExecutorRegistry::with_builtins()));
        let report = runner.run(&mut job, &mut ctx, rx).await;

        assert_eq!(job.status(), JobStatus::Cancelled);
        assert_eq!(statuses(&report), vec![StepStatus::Cancelled, StepStatus::NotRun]);
    }
}
