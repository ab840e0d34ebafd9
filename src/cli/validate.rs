// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Validate command - check a workflow file

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::load_workflow;
use crate::errors::{RecoverySuggestion, RunflowError};
use crate::executors::ExecutorRegistry;
use crate::utils::{print_error, print_success, print_warning};
use crate::workflow::{DagBuilder, Workflow, WorkflowValidator};

/// Run the validate command
pub async fn run(workflow_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating workflow...".bold());
    println!();

    let workflow = match load_workflow(&workflow_path) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("  {} Failed to parse workflow", "✗".red());
            eprintln!();
            return Err(e);
        }
    };

    print_success("Workflow file is valid YAML");

    let mut validation = WorkflowValidator::validate(&workflow)?;

    let registry = ExecutorRegistry::with_builtins();
    for action in WorkflowValidator::validate_actions(&workflow, &registry) {
        validation.add_error(&format!(
            "Unknown action '{}' (available: {})",
            action,
            registry.names().join(", ")
        ));
    }
    for message in step_problems(&workflow, &registry) {
        validation.add_error(&message);
    }

    if !validation.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            print_error(error);
        }

        if let Err(RunflowError::CircularDependency { jobs }) = DagBuilder::build(&workflow) {
            println!();
            println!("{}", RecoverySuggestion::fix_circular_dependency(&jobs));
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            print_warning(warning);
        }
    }

    if verbose {
        print_summary(&workflow, &workflow_path);
    }

    println!();

    if !validation.is_valid() {
        Err(miette::miette!("Workflow validation failed"))
    } else if validation.has_warnings() {
        println!("{}", "Workflow is valid but has warnings.".yellow().bold());
        Ok(())
    } else {
        println!("{}", "Workflow is valid!".green().bold());
        Ok(())
    }
}

/// Per-step checks owned by the executors
fn step_problems(workflow: &Workflow, registry: &ExecutorRegistry) -> Vec<String> {
    let mut problems = Vec::new();
    for (id, job) in &workflow.jobs {
        for step in &job.steps {
            let Ok(executor) = registry.for_step(step) else {
                continue;
            };
            if let Err(e) = executor.validate_step(step) {
                problems.push(format!("Job '{}': {}", id, e));
            }
        }
    }
    problems
}

fn print_summary(workflow: &Workflow, path: &std::path::Path) {
    println!();
    println!("{}:", "Workflow summary".bold());
    println!("  Name: {}", workflow.display_name(path));

    let triggers: Vec<String> = workflow.triggers.kinds().map(|k| k.to_string()).collect();
    println!("  Triggers: {}", if triggers.is_empty() { "-".to_string() } else { triggers.join(", ") });

    println!("  Jobs: {}", workflow.jobs.len());
    for (id, job) in &workflow.jobs {
        let needs = if job.needs.is_empty() {
            String::new()
        } else {
            format!(" [needs: {}]", job.needs.join(", "))
        };
        println!(
            "    - {} ({} step{}, {} run{}){}",
            id,
            job.steps.len(),
            if job.steps.len() == 1 { "" } else { "s" },
            job.combinations().len(),
            if job.combinations().len() == 1 { "" } else { "s" },
            needs.dimmed()
        );
    }
}
