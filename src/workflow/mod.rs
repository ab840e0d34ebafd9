// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Workflow definitions and types
//!
//! This module defines the workflow file schema (triggers, jobs, matrix,
//! steps) and the pure logic around it: trigger matching, matrix
//! expansion, expression interpolation, job ordering and validation.

mod dag;
mod definition;
mod expression;
mod matrix;
mod trigger;
mod validation;

pub use dag::DagBuilder;
pub use definition::*;
pub use expression::ExpressionContext;
pub use matrix::{combination_label, Combination, Matrix};
pub use trigger::{branch_matches, Event, EventFilter, EventKind, Triggers};
pub use validation::{ValidationResult, WorkflowValidator};

/// Registry key for inline `run:` steps
pub const RUN_EXECUTOR: &str = "run";

#[cfg(test)]
pub(crate) mod fixtures {
    pub const PYTHON_CI: &str = r#"
name: CI

on:
  push:
    branches: [main, develop]
  pull_request:

jobs:
  test:
    runs-on: ubuntu-latest
    timeout-minutes: 30
    strategy:
      matrix:
        python-version: ["3.12"]
    steps:
      - uses: actions/checkout@v4
      - name: Set up Python ${{ matrix.python-version }}
        uses: actions/setup-python@v5
        with:
          python-version: ${{ matrix.python-version }}
      - name: Install uv
        uses: astral-sh/setup-uv@v3
        with:
          version: "latest"
      - name: Install dependencies
        run: uv sync
      - name: Run tests
        run: uv run pytest
"#;
}
