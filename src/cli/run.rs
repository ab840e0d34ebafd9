// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Run command - execute the workflow for an event

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{load_workflow, OutputFormat};
use crate::config::{RunnerConfig, WorkspaceMode};
use crate::errors::RecoverySuggestion;
use crate::executors::{SetupPythonExecutor, SetupUvExecutor};
use crate::runner::{
    ExecutionOptions, JobRun, JobStatus, PlanOptions, RunReport, StepStatus, WorkflowExecutor,
};
use crate::utils::print_info;
use crate::workflow::{minutes, Event, EventKind, Workflow, WorkflowValidator};

/// Arguments of `runflow run`
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub workflow: PathBuf,
    pub event: String,
    pub branch: Option<String>,
    pub jobs: Vec<String>,
    pub dry_run: bool,
    pub format: OutputFormat,
    pub timeout_minutes: Option<f64>,
    pub isolated: bool,
    pub max_parallel: Option<usize>,
}

/// Run the workflow
pub async fn run(args: RunArgs, verbose: bool) -> Result<()> {
    let workflow = load_workflow(&args.workflow)?;
    let text = args.format == OutputFormat::Text;

    let validation = WorkflowValidator::validate(&workflow)?;
    if !validation.is_valid() {
        eprintln!("{}", "Workflow validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(miette::miette!("Workflow configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Workflow warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    let kind: EventKind = args.event.parse()?;
    let branch = args.branch.clone().or_else(current_branch);
    let event = Event::new(kind, branch.as_deref());

    let working_dir = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;

    let mut config = RunnerConfig::load(&working_dir)?;
    if args.isolated {
        config.workspace = WorkspaceMode::Isolated;
    }
    if let Some(n) = args.max_parallel {
        if n == 0 {
            return Err(miette::miette!("--max-parallel must be at least 1"));
        }
        config.max_parallel = Some(n);
    }

    let timeout_override = match args.timeout_minutes {
        Some(m) if !(m.is_finite() && m > 0.0) => {
            return Err(miette::miette!("--timeout-minutes must be positive"));
        }
        Some(m) => Some(minutes(m)),
        None => None,
    };

    let executor = WorkflowExecutor::new(config, &working_dir);
    let plan_options = PlanOptions {
        jobs: args.jobs.clone(),
        timeout_override,
    };
    let runs = executor.plan(&workflow, &event, &plan_options)?;

    if runs.is_empty() {
        let branch = event.branch.as_deref().unwrap_or("-");
        if text {
            print_info(&format!(
                "Event '{}' (branch '{}') does not match the workflow's triggers; nothing to run.",
                event.kind, branch
            ));
        } else {
            let report = executor
                .execute(&workflow, &event, runs, &ExecutionOptions::default())
                .await?;
            println!("{}", report.to_json()?);
        }
        return Ok(());
    }

    executor.check_actions(&runs)?;

    if args.dry_run {
        if text {
            executor.print_plan(&workflow, &runs);
        } else {
            println!("{}", plan_json(&workflow, &event, &runs)?);
        }
        return Ok(());
    }

    warn_unavailable(&executor, &runs).await;

    if text {
        executor.print_plan(&workflow, &runs);
    }

    let options = ExecutionOptions {
        verbose,
        progress: text,
    };
    let report = executor.execute(&workflow, &event, runs, &options).await?;

    if text {
        print_summary(&report, &workflow);
    } else {
        println!("{}", report.to_json()?);
    }

    if report.success {
        Ok(())
    } else {
        Err(miette::miette!("Workflow run {}", report.status()))
    }
}

/// Current git branch, if the directory is a repository with a checked-out branch
fn current_branch() -> Option<String> {
    let output = std::process::Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .stderr(std::process::Stdio::null())
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    match branch.as_str() {
        "" | "HEAD" => None,
        _ => {
            tracing::debug!(%branch, "detected git branch");
            Some(branch)
        }
    }
}

async fn warn_unavailable(executor: &WorkflowExecutor, runs: &[JobRun]) {
    let mut names: Vec<&str> = runs
        .iter()
        .flat_map(|r| r.steps.iter())
        .filter_map(|s| s.executor_key())
        .collect();
    names.sort();
    names.dedup();

    for name in executor.registry().unavailable(&names).await {
        tracing::warn!(executor = %name, "required tooling not found on this host");
    }
}

fn plan_json(workflow: &Workflow, event: &Event, runs: &[JobRun]) -> miette::Result<String> {
    let jobs: Vec<serde_json::Value> = runs
        .iter()
        .map(|run| {
            serde_json::json!({
                "job_id": run.job_id,
                "name": run.name,
                "matrix": run.matrix,
                "needs": run.needs,
                "timeout_secs": run.timeout.as_secs_f64(),
                "steps": run.steps.iter().map(|s| s.display_name()).collect::<Vec<_>>(),
            })
        })
        .collect();

    let plan = serde_json::json!({
        "workflow": workflow.name,
        "event": event.kind.to_string(),
        "branch": event.branch,
        "jobs": jobs,
    });

    serde_json::to_string_pretty(&plan).map_err(|e| miette::miette!("{}", e))
}

fn print_summary(report: &RunReport, workflow: &Workflow) {
    let secs = report.duration_ms as f64 / 1000.0;
    println!();

    if report.success {
        println!(
            "{}",
            format!("Workflow completed successfully in {:.2}s", secs).green()
        );
        return;
    }

    println!(
        "{}",
        format!("Workflow {} after {:.2}s", report.status(), secs).red()
    );

    for job in &report.jobs {
        match job.status {
            JobStatus::Succeeded => {}
            JobStatus::TimedOut => {
                eprintln!();
                eprintln!("{}", format!("Job '{}' timed out", job.name).red().bold());
                let limit = report_timeout_minutes(job.duration_ms);
                eprintln!("{}", RecoverySuggestion::raise_timeout(&job.name, limit));
            }
            JobStatus::Failed => {
                if let Some(ref error) = job.error {
                    eprintln!();
                    eprintln!("{}", format!("Job '{}' could not start:", job.name).red().bold());
                    eprintln!("{}", error.dimmed());
                    continue;
                }
                let Some((index, step)) = job
                    .steps
                    .iter()
                    .enumerate()
                    .find(|(_, s)| s.ran() && s.status != StepStatus::Succeeded && !s.continued)
                else {
                    continue;
                };
                eprintln!();
                eprintln!(
                    "{}",
                    format!("Job '{}' failed at step '{}':", job.name, step.name)
                        .red()
                        .bold()
                );
                if !step.stderr.is_empty() {
                    eprintln!("{}", step.stderr.trim_end().dimmed());
                }
                let key = workflow
                    .get_job(&job.job_id)
                    .and_then(|j| j.steps.get(index))
                    .and_then(|s| s.executor_key());
                if let Some(tool) = key.and_then(missing_tool) {
                    eprintln!();
                    eprintln!("{}", RecoverySuggestion::install_tool(tool));
                }
            }
            status => println!("  {} {} {}", "-".dimmed(), job.name, status.to_string().dimmed()),
        }
    }
}

/// Elapsed job time rounded up to whole minutes
fn report_timeout_minutes(duration_ms: u64) -> f64 {
    ((duration_ms as f64) / 60_000.0).ceil().max(1.0)
}

/// Tool a failed setup action could not provide
fn missing_tool(executor_key: &str) -> Option<&'static str> {
    match executor_key {
        SetupPythonExecutor::ACTION => Some("python"),
        SetupUvExecutor::ACTION => Some("uv"),
        _ => None,
    }
}
