// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Workflow executor
//!
//! Turns a workflow and an event into job runs, then executes them level by
//! level along the `needs` graph. Runs within a level share a task set and
//! are bounded by the runner's and the job's `max-parallel`.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use crate::config::{RunnerConfig, WorkspaceMode};
use crate::errors::{RunflowError, RunflowResult};
use crate::executors::ExecutorRegistry;
use crate::runner::job::{run_key, JobReport, JobRun, JobStatus, RunReport};
use crate::runner::{JobContext, StepRunner};
use crate::utils::print_header;
use crate::workflow::{
    combination_label, Combination, DagBuilder, Event, ExpressionContext, Workflow,
};

/// Options that shape the plan
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Only plan these job ids (all when empty)
    pub jobs: Vec<String>,
    /// Replaces every job's timeout
    pub timeout_override: Option<Duration>,
}

/// Execution options
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Print captured stdout of every step
    pub verbose: bool,
    /// Print a line per step
    pub progress: bool,
}

/// Workflow executor
pub struct WorkflowExecutor {
    registry: Arc<ExecutorRegistry>,
    config: Arc<RunnerConfig>,
    source_dir: PathBuf,
}

impl WorkflowExecutor {
    /// Executor with the built-in step executors
    pub fn new(config: RunnerConfig, source_dir: &Path) -> Self {
        Self {
            registry: Arc::new(ExecutorRegistry::with_builtins()),
            config: Arc::new(config),
            source_dir: source_dir.to_path_buf(),
        }
    }

    /// Replace the executor registry
    pub fn with_registry(mut self, registry: ExecutorRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Job runs triggered by `event`, in dependency order
    ///
    /// Returns no runs when the event does not match the workflow's triggers.
    pub fn plan(
        &self,
        workflow: &Workflow,
        event: &Event,
        options: &PlanOptions,
    ) -> RunflowResult<Vec<JobRun>> {
        for id in &options.jobs {
            if workflow.get_job(id).is_none() {
                return Err(RunflowError::JobNotFound { job: id.clone() });
            }
        }

        if !workflow.triggers.matches(event) {
            tracing::info!(
                event = %event.kind,
                branch = event.branch.as_deref().unwrap_or("-"),
                "event does not match workflow triggers"
            );
            return Ok(Vec::new());
        }

        let selected: BTreeSet<&str> = options.jobs.iter().map(String::as_str).collect();
        let dag = DagBuilder::build(workflow)?;
        let mut runs = Vec::new();

        for job_id in dag.topological_order()? {
            if !selected.is_empty() && !selected.contains(job_id.as_str()) {
                continue;
            }
            let Some(job) = workflow.get_job(&job_id) else {
                continue;
            };

            let timeout = options
                .timeout_override
                .unwrap_or_else(|| job.timeout(self.config.default_timeout()));
            let needs: Vec<String> = job
                .needs
                .iter()
                .filter(|n| selected.is_empty() || selected.contains(n.as_str()))
                .cloned()
                .collect();

            let mut env = workflow.env.clone();
            env.extend(job.env.clone());

            for combination in job.combinations() {
                let name = run_name(job.display_name(&job_id), &combination, &env, event)?;

                let mut run = JobRun::new(&job_id, &name, combination, job.steps.clone(), timeout);
                run.key = run_key(&job_id, runs.len());
                run.env = env.clone();
                run.needs = needs.clone();
                run.fail_fast = job.fail_fast();
                run.max_parallel = job.max_parallel();
                runs.push(run);
            }
        }

        tracing::debug!(runs = runs.len(), "planned job runs");
        Ok(runs)
    }

    /// Fail early when a step names an action nobody implements
    pub fn check_actions(&self, runs: &[JobRun]) -> RunflowResult<()> {
        for run in runs {
            for step in &run.steps {
                self.registry.for_step(step)?;
            }
        }
        Ok(())
    }

    /// Execute planned job runs
    pub async fn execute(
        &self,
        workflow: &Workflow,
        event: &Event,
        runs: Vec<JobRun>,
        options: &ExecutionOptions,
    ) -> RunflowResult<RunReport> {
        let start = Instant::now();
        self.check_actions(&runs)?;

        let levels = DagBuilder::build(workflow)?.levels()?;
        let runner = Arc::new(
            StepRunner::new(Arc::clone(&self.registry)).with_progress(options.progress, options.verbose),
        );
        let global = Arc::new(Semaphore::new(
            self.config.max_parallel.unwrap_or(Semaphore::MAX_PERMITS),
        ));

        let mut reports: Vec<Option<JobReport>> = vec![None; runs.len()];
        let mut slots: Vec<Option<JobRun>> = runs.into_iter().map(Some).collect();
        let mut job_succeeded: HashMap<String, bool> = HashMap::new();

        for level in &levels {
            let mut tasks = JoinSet::new();

            for job_id in level {
                let indices: Vec<usize> = slots
                    .iter()
                    .enumerate()
                    .filter(|(_, run)| run.as_ref().is_some_and(|r| &r.job_id == job_id))
                    .map(|(i, _)| i)
                    .collect();

                let Some(first) = indices.first().and_then(|&i| slots[i].as_ref()) else {
                    continue;
                };

                let blocked: Vec<String> = first
                    .needs
                    .iter()
                    .filter(|n| !job_succeeded.get(n.as_str()).copied().unwrap_or(true))
                    .cloned()
                    .collect();

                if !blocked.is_empty() {
                    tracing::info!(job = %job_id, needs = ?blocked, "skipping job");
                    for &i in &indices {
                        if let Some(mut run) = slots[i].take() {
                            run.transition(JobStatus::Skipped)?;
                            if options.progress {
                                println!(
                                    "  {} {} {}",
                                    "-".dimmed(),
                                    run.name.bold(),
                                    format!("skipped (needs: {})", blocked.join(", ")).dimmed()
                                );
                            }
                            reports[i] = Some(run.unstarted_report());
                        }
                    }
                    continue;
                }

                let (cancel_tx, _) = watch::channel(false);
                let cancel_tx = Arc::new(cancel_tx);
                let per_job = first.max_parallel.map(|n| Arc::new(Semaphore::new(n)));

                for &i in &indices {
                    let Some(run) = slots[i].take() else {
                        continue;
                    };

                    let task = RunTask {
                        run,
                        event: event.clone(),
                        config: Arc::clone(&self.config),
                        source_dir: self.source_dir.clone(),
                        runner: Arc::clone(&runner),
                        cancel_rx: cancel_tx.subscribe(),
                        cancel_tx: Arc::clone(&cancel_tx),
                        global: Arc::clone(&global),
                        per_job: per_job.clone(),
                        progress: options.progress,
                    };
                    tasks.spawn(async move { (i, task.run().await) });
                }
            }

            while let Some(joined) = tasks.join_next().await {
                let (i, report) = joined.map_err(|e| RunflowError::ExecutionFailed {
                    message: format!("job task failed: {}", e),
                    help: None,
                })?;
                reports[i] = Some(report);
            }

            for job_id in level {
                let ok = reports
                    .iter()
                    .flatten()
                    .filter(|r| &r.job_id == job_id)
                    .all(|r| r.status.is_success());
                job_succeeded.insert(job_id.clone(), ok);
            }
        }

        let jobs: Vec<JobReport> = reports.into_iter().flatten().collect();
        let success = jobs.iter().all(|j| j.status.is_success());

        Ok(RunReport {
            workflow: workflow.name.clone().unwrap_or_else(|| "workflow".to_string()),
            event: event.kind.to_string(),
            branch: event.branch.clone(),
            triggered: workflow.triggers.matches(event),
            jobs,
            duration_ms: start.elapsed().as_millis() as u64,
            success,
        })
    }

    /// Print the execution plan
    pub fn print_plan(&self, workflow: &Workflow, runs: &[JobRun]) {
        println!();
        print_header(&format!("Workflow: {}", workflow.name.as_deref().unwrap_or("workflow")));
        println!(
            "Execution plan ({} job run{}):",
            runs.len(),
            if runs.len() == 1 { "" } else { "s" }
        );
        println!();

        for (i, run) in runs.iter().enumerate() {
            print!(
                "  {}. {} ({} step{}, timeout {})",
                i + 1,
                run.name.bold(),
                run.steps.len(),
                if run.steps.len() == 1 { "" } else { "s" },
                format_timeout(run.timeout)
            );
            if !run.needs.is_empty() {
                print!(" {}", format!("[needs: {}]", run.needs.join(", ")).dimmed());
            }
            println!();
        }

        println!();
    }
}

/// Job name for one combination; a templated name replaces the matrix label
fn run_name(
    base: &str,
    combination: &Combination,
    env: &HashMap<String, String>,
    event: &Event,
) -> RunflowResult<String> {
    if base.contains("${{") {
        let github = [
            ("event_name", event.kind.to_string()),
            ("ref_name", event.branch.clone().unwrap_or_default()),
        ];
        return ExpressionContext::new()
            .with_context("matrix", combination.clone())
            .with_context("env", env.clone())
            .with_context("github", github)
            .interpolate(base);
    }

    Ok(match combination_label(combination) {
        Some(label) => format!("{} {}", base, label),
        None => base.to_string(),
    })
}

/// One job run moved into its own task
struct RunTask {
    run: JobRun,
    event: Event,
    config: Arc<RunnerConfig>,
    source_dir: PathBuf,
    runner: Arc<StepRunner>,
    cancel_rx: watch::Receiver<bool>,
    cancel_tx: Arc<watch::Sender<bool>>,
    global: Arc<Semaphore>,
    per_job: Option<Arc<Semaphore>>,
    progress: bool,
}

impl RunTask {
    async fn run(self) -> JobReport {
        let RunTask {
            mut run,
            event,
            config,
            source_dir,
            runner,
            cancel_rx,
            cancel_tx,
            global,
            per_job,
            progress,
        } = self;

        let _job_permit = match per_job {
            Some(semaphore) => semaphore.acquire_owned().await.ok(),
            None => None,
        };
        let _permit = global.acquire_owned().await.ok();

        if *cancel_rx.borrow() {
            if let Err(e) = run.transition(JobStatus::Cancelled) {
                tracing::warn!(job = %run.name, error = %e, "could not cancel job run");
            }
            if progress {
                println!("  {} {} {}", "✗".yellow(), run.name.bold(), "cancelled".dimmed());
            }
            return run.unstarted_report();
        }

        let mut ctx = match prepare_context(&run, &event, &config, &source_dir).await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::error!(job = %run.name, error = %e, "could not prepare job");
                if progress {
                    eprintln!("  {} {} {}", "✗".red(), run.name.bold(), e);
                }
                let report = run.setup_failed_report(&e);
                if run.fail_fast {
                    cancel_tx.send_replace(true);
                }
                return report;
            }
        };

        if progress {
            println!("{} {}", "▶".blue(), run.name.bold());
        }

        let report = runner.run(&mut run, &mut ctx, cancel_rx).await;

        if run.fail_fast && matches!(report.status, JobStatus::Failed | JobStatus::TimedOut) {
            tracing::info!(job = %run.job_id, "fail-fast: cancelling remaining matrix entries");
            cancel_tx.send_replace(true);
        }

        if ctx.workspace_mode == WorkspaceMode::Isolated && !config.keep_workspace {
            if let Err(e) = tokio::fs::remove_dir_all(&ctx.workspace).await {
                tracing::warn!(path = %ctx.workspace.display(), error = %e, "could not remove workspace");
            }
        }

        if progress {
            print_job_summary(&report);
        }
        report
    }
}

/// Build the job context and, in isolated mode, a fresh workspace
async fn prepare_context(
    run: &JobRun,
    event: &Event,
    config: &RunnerConfig,
    source_dir: &Path,
) -> RunflowResult<JobContext> {
    let ctx = JobContext::for_job(run, event, config, source_dir)?;

    if ctx.workspace_mode == WorkspaceMode::Isolated {
        if ctx.workspace.exists() {
            tokio::fs::remove_dir_all(&ctx.workspace)
                .await
                .map_err(|e| RunflowError::FileWriteError {
                    path: ctx.workspace.clone(),
                    error: e.to_string(),
                })?;
        }
        tokio::fs::create_dir_all(&ctx.workspace)
            .await
            .map_err(|e| RunflowError::FileWriteError {
                path: ctx.workspace.clone(),
                error: e.to_string(),
            })?;
    }

    Ok(ctx)
}

fn print_job_summary(report: &JobReport) {
    let secs = report.duration_ms as f64 / 1000.0;
    match report.status {
        JobStatus::Succeeded => println!(
            "{} {} {}",
            "✓".green(),
            report.name.bold(),
            format!("succeeded in {:.2}s", secs).dimmed()
        ),
        status => println!(
            "{} {} {}",
            "✗".red(),
            report.name.bold(),
            format!("{} after {:.2}s", status, secs)
        ),
    }
}

fn format_timeout(timeout: Duration) -> String {
    let secs = timeout.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{:.1}s", timeout.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::fixtures::PYTHON_CI;
    use crate::workflow::EventKind;

    fn executor(dir: &Path) -> WorkflowExecutor {
        WorkflowExecutor::new(RunnerConfig::default(), dir)
    }

    fn names(runs: &[JobRun]) -> Vec<&str> {
        runs.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_undeclared_event_plans_nothing() {
        let workflow = Workflow::from_yaml(PYTHON_CI).unwrap();
        let executor = executor(Path::new("."));

        for kind in ["workflow_dispatch", "schedule", "release"] {
            let event = Event::new(EventKind::from_name(kind), Some("main"));
            let runs = executor.plan(&workflow, &event, &PlanOptions::default()).unwrap();
            assert!(runs.is_empty(), "{} should not trigger", kind);
        }
    }

    #[test]
    fn test_push_branch_filter() {
        let workflow = Workflow::from_yaml(PYTHON_CI).unwrap();
        let executor = executor(Path::new("."));
        let options = PlanOptions::default();

        assert!(executor
            .plan(&workflow, &Event::push("feature/login"), &options)
            .unwrap()
            .is_empty());

        for branch in ["main", "develop"] {
            let runs = executor.plan(&workflow, &Event::push(branch), &options).unwrap();
            assert_eq!(names(&runs), vec!["test (3.12)"]);
            assert_eq!(runs[0].timeout, Duration::from_secs(30 * 60));
            assert_eq!(runs[0].status(), JobStatus::Pending);
        }
    }

    #[test]
    fn test_pull_request_always_plans() {
        let workflow = Workflow::from_yaml(PYTHON_CI).unwrap();
        let executor = executor(Path::new("."));

        for branch in ["main", "feature/x", "release-1.0"] {
            let runs = executor
                .plan(&workflow, &Event::pull_request(branch), &PlanOptions::default())
                .unwrap();
            assert_eq!(runs.len(), 1);
        }
    }

    #[test]
    fn test_plan_selection_and_overrides() {
        let workflow = Workflow::from_yaml(
            r#"
on: push
env:
  LEVEL: workflow
jobs:
  lint:
    runs-on: ubuntu-latest
    steps:
      - run: "true"
  test:
    runs-on: ubuntu-latest
    needs: lint
    env:
      LEVEL: job
    steps:
      - run: "true"
"#,
        )
        .unwrap();
        let executor = executor(Path::new("."));

        let runs = executor
            .plan(
                &workflow,
                &Event::push("main"),
                &PlanOptions {
                    jobs: vec!["test".into()],
                    timeout_override: Some(Duration::from_secs(5)),
                },
            )
            .unwrap();

        assert_eq!(names(&runs), vec!["test"]);
        assert!(runs[0].needs.is_empty());
        assert_eq!(runs[0].timeout, Duration::from_secs(5));
        assert_eq!(runs[0].env["LEVEL"], "job");

        let err = executor
            .plan(
                &workflow,
                &Event::push("main"),
                &PlanOptions {
                    jobs: vec!["deploy".into()],
                    ..PlanOptions::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, RunflowError::JobNotFound { .. }));
    }

    async fn run_workflow(yaml: &str) -> RunReport {
        let dir = tempfile::tempdir().unwrap();
        let workflow = Workflow::from_yaml(yaml).unwrap();
        let executor = executor(dir.path());
        let event = Event::push("main");

        let runs = executor.plan(&workflow, &event, &PlanOptions::default()).unwrap();
        executor
            .execute(&workflow, &event, runs, &ExecutionOptions::default())
            .await
            .unwrap()
    }

    fn status_of(report: &RunReport, name: &str) -> JobStatus {
        report
            .jobs
            .iter()
            .find(|j| j.name == name)
            .map(|j| j.status)
            .unwrap_or_else(|| panic!("no job run named {}", name))
    }

    #[tokio::test]
    async fn test_successful_run() {
        let report = run_workflow(
            r#"
name: ok
on: push
jobs:
  build:
    steps:
      - run: echo building
  test:
    needs: build
    strategy:
      matrix:
        n: [1, 2]
    steps:
      - run: echo "n=${{ matrix.n }}"
"#,
        )
        .await;

        assert!(report.success);
        assert_eq!(report.status(), JobStatus::Succeeded);
        assert_eq!(report.jobs.len(), 3);
        assert_eq!(report.jobs[1].steps[0].stdout.trim(), "n=1");
    }

    #[tokio::test]
    async fn test_fail_fast_cancels_siblings() {
        let report = run_workflow(
            r#"
on: push
jobs:
  test:
    strategy:
      matrix:
        n: [1, 2]
    steps:
      - run: |
          if [ "${{ matrix.n }}" = "1" ]; then exit 1; fi
          sleep 5
"#,
        )
        .await;

        assert!(!report.success);
        assert_eq!(status_of(&report, "test (1)"), JobStatus::Failed);
        assert_eq!(status_of(&report, "test (2)"), JobStatus::Cancelled);
        assert_eq!(report.status(), JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_fail_fast_with_max_parallel_cancels_queued() {
        let report = run_workflow(
            r#"
on: push
jobs:
  test:
    strategy:
      max-parallel: 1
      matrix:
        n: [1, 2]
    steps:
      - run: exit 1
"#,
        )
        .await;

        assert_eq!(status_of(&report, "test (1)"), JobStatus::Failed);
        assert_eq!(status_of(&report, "test (2)"), JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_without_fail_fast_siblings_finish() {
        let report = run_workflow(
            r#"
on: push
jobs:
  test:
    strategy:
      fail-fast: false
      matrix:
        n: [1, 2]
    steps:
      - run: |
          if [ "${{ matrix.n }}" = "1" ]; then exit 1; fi
          sleep 0.2
"#,
        )
        .await;

        assert_eq!(status_of(&report, "test (1)"), JobStatus::Failed);
        assert_eq!(status_of(&report, "test (2)"), JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_failed_needs_skip_dependents() {
        let report = run_workflow(
            r#"
on: push
jobs:
  build:
    steps:
      - run: exit 1
  test:
    needs: build
    steps:
      - run: "true"
  docs:
    steps:
      - run: "true"
"#,
        )
        .await;

        assert_eq!(status_of(&report, "build"), JobStatus::Failed);
        assert_eq!(status_of(&report, "test"), JobStatus::Skipped);
        assert_eq!(status_of(&report, "docs"), JobStatus::Succeeded);
        assert!(!report.success);
    }

    #[tokio::test]
    async fn test_unknown_action_rejected_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let yaml = format!(
            r#"
on: push
jobs:
  test:
    steps:
      - run: touch {}
      - uses: actions/cache@v4
"#,
            marker.display()
        );
        let workflow = Workflow::from_yaml(&yaml).unwrap();
        let executor = executor(dir.path());
        let event = Event::push("main");

        let runs = executor.plan(&workflow, &event, &PlanOptions::default()).unwrap();
        let err = executor
            .execute(&workflow, &event, runs, &ExecutionOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, RunflowError::ExecutorNotFound { .. }));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_isolated_workspace_removed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.txt"), "payload").unwrap();
        let config = RunnerConfig {
            workspace: WorkspaceMode::Isolated,
            ..RunnerConfig::default()
        };
        let workflow = Workflow::from_yaml(
            r#"
on: push
jobs:
  test:
    steps:
      - uses: actions/checkout@v4
      - run: grep -q payload data.txt
"#,
        )
        .unwrap();
        let executor = WorkflowExecutor::new(config, dir.path());
        let event = Event::push("main");

        let runs = executor.plan(&workflow, &event, &PlanOptions::default()).unwrap();
        let report = executor
            .execute(&workflow, &event, runs, &ExecutionOptions::default())
            .await
            .unwrap();

        assert!(report.success, "{:?}", report.jobs[0].failed_step());
        assert!(!dir.path().join(".runflow/work/0-test").exists());
    }

    #[tokio::test]
    async fn test_isolated_workspaces_are_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnerConfig {
            workspace: WorkspaceMode::Isolated,
            ..RunnerConfig::default()
        };
        let workflow = Workflow::from_yaml(
            r#"
on: push
jobs:
  a:
    name: Check
    steps:
      - run: echo a > who; sleep 0.3; grep -qx a who
  b:
    name: Check
    steps:
      - run: echo b > who; sleep 0.3; grep -qx b who
  c:
    name: Tests on ${{ github.ref_name }}
    strategy:
      matrix:
        n: [1, 2]
    steps:
      - run: echo ${{ matrix.n }} > who; sleep 0.3; grep -qx ${{ matrix.n }} who
"#,
        )
        .unwrap();
        let executor = WorkflowExecutor::new(config, dir.path());
        let event = Event::push("main");

        let runs = executor.plan(&workflow, &event, &PlanOptions::default()).unwrap();
        let keys: BTreeSet<&str> = runs.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys.len(), runs.len());

        let report = executor
            .execute(&workflow, &event, runs, &ExecutionOptions::default())
            .await
            .unwrap();

        assert_eq!(report.jobs.len(), 4);
        for job in &report.jobs {
            assert_eq!(job.status, JobStatus::Succeeded, "{}: {:?}", job.name, job.failed_step());
        }
    }

    #[tokio::test]
    async fn test_setup_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the work root should be
        std::fs::write(dir.path().join("blocked"), "").unwrap();
        let config = RunnerConfig {
            workspace: WorkspaceMode::Isolated,
            work_dir: PathBuf::from("blocked"),
            ..RunnerConfig::default()
        };
        let workflow = Workflow::from_yaml(
            r#"
on: push
jobs:
  test:
    steps:
      - run: "true"
"#,
        )
        .unwrap();
        let executor = WorkflowExecutor::new(config, dir.path());
        let event = Event::push("main");

        let runs = executor.plan(&workflow, &event, &PlanOptions::default()).unwrap();
        let report = executor
            .execute(&workflow, &event, runs, &ExecutionOptions::default())
            .await
            .unwrap();

        let job = &report.jobs[0];
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.is_some());
        assert!(!job.steps[0].ran());
    }

    #[test]
    fn test_templated_job_name_replaces_label() {
        let workflow = Workflow::from_yaml(
            r#"
on: push
jobs:
  test:
    name: Python ${{ matrix.python-version }} on ${{ github.ref_name }}
    strategy:
      matrix:
        python-version: ["3.11", "3.12"]
    steps:
      - run: "true"
"#,
        )
        .unwrap();

        let runs = executor(Path::new("."))
            .plan(&workflow, &Event::push("main"), &PlanOptions::default())
            .unwrap();
        assert_eq!(names(&runs), vec!["Python 3.11 on main", "Python 3.12 on main"]);
    }

    #[test]
    fn test_format_timeout() {
        assert_eq!(format_timeout(Duration::from_secs(1800)), "30m");
        assert_eq!(format_timeout(Duration::from_millis(600)), "0.6s");
    }
}
