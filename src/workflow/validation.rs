// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Workflow validation
//!
//! Validates a workflow before anything is executed.

use std::collections::BTreeSet;

use crate::errors::RunflowError;
use crate::executors::ExecutorRegistry;
use crate::workflow::{DagBuilder, Job, Step, StepKind, Workflow};

/// Workflow validator
pub struct WorkflowValidator;

impl WorkflowValidator {
    /// Validate workflow structure
    pub fn validate(workflow: &Workflow) -> Result<ValidationResult, RunflowError> {
        let mut result = ValidationResult::new();

        if workflow.jobs.is_empty() {
            result.add_error("Workflow has no jobs defined");
        }

        if workflow.triggers.is_empty() {
            result.add_warning("Workflow declares no triggers ('on:'); no event will start it");
        }

        for kind in workflow.triggers.kinds() {
            if let Some(filter) = workflow.triggers.filter(kind) {
                for pattern in filter.patterns() {
                    if let Err(e) = glob::Pattern::new(pattern) {
                        result.add_error(&format!(
                            "Trigger '{}': invalid branch pattern '{}': {}",
                            kind, pattern, e
                        ));
                    }
                }
            }
        }

        match DagBuilder::build(workflow) {
            Ok(_) => {}
            Err(RunflowError::CircularDependency { jobs }) => {
                result.add_error(&format!("Circular dependency: {}", jobs.join(" → ")));
            }
            Err(RunflowError::UnknownDependency { job, dependency }) => {
                result.add_error(&format!(
                    "Job '{}' needs unknown job '{}'",
                    job, dependency
                ));
            }
            Err(e) => {
                result.add_error(&format!("DAG validation error: {}", e));
            }
        }

        for (id, job) in &workflow.jobs {
            Self::validate_job(id, job, &mut result);
        }

        Ok(result)
    }

    fn validate_job(id: &str, job: &Job, result: &mut ValidationResult) {
        if job.steps.is_empty() {
            result.add_error(&format!("Job '{}': no steps defined", id));
        }

        if let Some(minutes) = job.timeout_minutes {
            if !(minutes.is_finite() && minutes > 0.0) {
                result.add_error(&format!(
                    "Job '{}': timeout-minutes must be positive, got {}",
                    id, minutes
                ));
            }
        }

        if let Some(matrix) = job.strategy.as_ref().and_then(|s| s.matrix.as_ref()) {
            for axis in matrix.empty_axes() {
                result.add_error(&format!("Job '{}': matrix axis '{}' has no values", id, axis));
            }
            if matrix.empty_axes().is_empty() && matrix.expand().is_empty() {
                result.add_warning(&format!(
                    "Job '{}': matrix excludes every combination; the job never runs",
                    id
                ));
            }
        }

        if job.strategy.as_ref().and_then(|s| s.max_parallel) == Some(0) {
            result.add_error(&format!("Job '{}': max-parallel must be at least 1", id));
        }

        let mut seen_ids = BTreeSet::new();
        for (idx, step) in job.steps.iter().enumerate() {
            if let Some(ref step_id) = step.id {
                if !seen_ids.insert(step_id.as_str()) {
                    result.add_error(&format!("Job '{}': duplicate step id '{}'", id, step_id));
                }
            }
            Self::validate_step(id, idx, step, result);
        }
    }

    fn validate_step(job: &str, idx: usize, step: &Step, result: &mut ValidationResult) {
        let label = format!("Job '{}', step {} ({})", job, idx + 1, step.display_name());

        match step.kind() {
            None if step.uses.is_some() => {
                result.add_error(&format!("{}: set either 'uses' or 'run', not both", label));
            }
            None => {
                result.add_error(&format!("{}: must set 'uses' or 'run'", label));
            }
            Some(StepKind::Command { script }) => {
                if script.trim().is_empty() {
                    result.add_error(&format!("{}: 'run' is empty", label));
                }
            }
            Some(StepKind::Action { name, reference }) => {
                if name.starts_with("./") || name.starts_with("docker://") {
                    result.add_error(&format!(
                        "{}: local and docker actions are not supported",
                        label
                    ));
                }
                if reference.is_none() {
                    result.add_warning(&format!("{}: action '{}' has no @ref", label, name));
                }
                if step.shell.is_some() {
                    result.add_warning(&format!("{}: 'shell' is ignored for actions", label));
                }
            }
        }

        if let Some(minutes) = step.timeout_minutes {
            if !(minutes.is_finite() && minutes > 0.0) {
                result.add_error(&format!("{}: timeout-minutes must be positive", label));
            }
        }
    }

    /// Actions referenced by the workflow that no executor handles
    pub fn validate_actions(workflow: &Workflow, registry: &ExecutorRegistry) -> Vec<String> {
        let mut missing = BTreeSet::new();

        for job in workflow.jobs.values() {
            for step in &job.steps {
                if let Some(key) = step.executor_key() {
                    if !registry.contains(key) {
                        missing.insert(key.to_string());
                    }
                }
            }
        }

        missing.into_iter().collect()
    }
}

/// Result of workflow validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::fixtures::PYTHON_CI;

    #[test]
    fn test_python_ci_is_valid() {
        let workflow = Workflow::from_yaml(PYTHON_CI).unwrap();
        let result = WorkflowValidator::validate(&workflow).unwrap();
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(!result.has_warnings(), "{:?}", result.warnings);

        let registry = ExecutorRegistry::with_builtins();
        assert!(WorkflowValidator::validate_actions(&workflow, &registry).is_empty());
    }

    #[test]
    fn test_validate_empty_workflow() {
        let workflow = Workflow::from_yaml("on: push\njobs: {}\n").unwrap();
        let result = WorkflowValidator::validate(&workflow).unwrap();
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("no jobs"));
    }

    #[test]
    fn test_step_shape_errors() {
        let yaml = r#"
on: push
jobs:
  build:
    timeout-minutes: 0
    strategy:
      matrix:
        python: []
    steps:
      - uses: actions/checkout@v4
        run: echo both
      - name: nothing
      - run: "   "
"#;
        let workflow = Workflow::from_yaml(yaml).unwrap();
        let result = WorkflowValidator::validate(&workflow).unwrap();

        let all = result.errors.join("\n");
        assert!(all.contains("not both"));
        assert!(all.contains("must set 'uses' or 'run'"));
        assert!(all.contains("'run' is empty"));
        assert!(all.contains("timeout-minutes must be positive"));
        assert!(all.contains("matrix axis 'python' has no values"));
    }

    #[test]
    fn test_unknown_need_and_missing_trigger() {
        let yaml = r#"
jobs:
  deploy:
    needs: build
    steps:
      - run: echo deploy
"#;
        let workflow = Workflow::from_yaml(yaml).unwrap();
        let result = WorkflowValidator::validate(&workflow).unwrap();
        assert!(result.errors.iter().any(|e| e.contains("unknown job 'build'")));
        assert!(result.warnings.iter().any(|w| w.contains("no triggers")));
    }

    #[test]
    fn test_unknown_actions_reported() {
        let yaml = r#"
on: push
jobs:
  build:
    steps:
      - uses: actions/cache@v4
      - uses: actions/checkout@v4
"#;
        let workflow = Workflow::from_yaml(yaml).unwrap();
        let registry = ExecutorRegistry::with_builtins();
        assert_eq!(
            WorkflowValidator::validate_actions(&workflow, &registry),
            vec!["actions/cache".to_string()]
        );
    }
}
