// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Local workflow runner
//!
//! Plans job runs for an event and executes them: scheduling across jobs
//! in `executor`, steps within a job in `step_runner`.

mod context;
mod executor;
mod job;
mod step_runner;

pub use context::{slug, JobContext};
pub use executor::{ExecutionOptions, PlanOptions, WorkflowExecutor};
pub use job::{JobReport, JobRun, JobStatus, RunReport, StepReport, StepStatus};
pub use step_runner::StepRunner;
