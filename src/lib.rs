// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! # runflow - local CI workflow runner
//!
//! `runflow` reads GitHub-Actions-style workflow files and runs them on the
//! local machine.
//!
//! ## Features
//!
//! - **Triggers** - `push` / `pull_request` with branch filters decide whether an event runs anything
//! - **Matrix** - one job run per combination, with `include` / `exclude`
//! - **Scheduling** - `needs` ordering, parallel matrix entries, `fail-fast`
//! - **Deadlines** - job and step `timeout-minutes` stop runaway steps
//!
//! ## Quick Start
//!
//! ```bash
//! # Write .github/workflows/ci.yml
//! runflow init --template python-uv
//!
//! # Show what a push to main would run
//! runflow run --dry-run -b main
//!
//! # Run it
//! runflow run
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod executors;
pub mod runner;
pub mod utils;
pub mod workflow;

// Re-export commonly used types
pub use config::RunnerConfig;
pub use errors::{RunflowError, RunflowResult};
pub use runner::{JobRun, JobStatus, RunReport, WorkflowExecutor};
pub use workflow::{Event, EventKind, Workflow};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
