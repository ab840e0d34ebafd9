// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Init command - write a starter workflow

use colored::Colorize;
use miette::Result;
use std::path::Path;

use super::DEFAULT_WORKFLOW;
use crate::utils::print_success;
use crate::workflow::{Workflow, WorkflowValidator};

/// Run the init command
pub async fn run(template: String, force: bool, verbose: bool) -> Result<()> {
    let project_name = std::env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|s| s.to_string_lossy().to_string()))
        .unwrap_or_else(|| "project".to_string());

    println!("{}", "Initializing runflow workflow...".bold());
    println!();

    let path = Path::new(DEFAULT_WORKFLOW);
    if path.exists() && !force {
        return Err(miette::miette!(
            "{} already exists. Use --force to overwrite it.",
            DEFAULT_WORKFLOW
        ));
    }

    let content = match template.as_str() {
        "python-uv" | "python" => generate_python_uv_template(&project_name),
        "rust-cargo" | "rust" => generate_rust_template(&project_name),
        t => {
            return Err(miette::miette!(
                "Unknown template: '{}'\n\nAvailable templates:\n\
                 • python-uv   - Python matrix with uv and pytest\n\
                 • rust-cargo  - cargo fmt, clippy and test",
                t
            ));
        }
    };

    // Templates must pass our own validator
    let workflow = Workflow::from_yaml(&content)?;
    let validation = WorkflowValidator::validate(&workflow)?;
    if !validation.is_valid() {
        return Err(miette::miette!(
            "Template '{}' is invalid: {}",
            template,
            validation.errors.join("; ")
        ));
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| {
            miette::miette!("Failed to create directory '{}': {}", dir.display(), e)
        })?;
    }
    std::fs::write(path, &content)
        .map_err(|e| miette::miette!("Failed to write {}: {}", DEFAULT_WORKFLOW, e))?;

    print_success(&format!("Created {}", DEFAULT_WORKFLOW));
    println!();
    println!("{}", "Workflow initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to fit your project", DEFAULT_WORKFLOW.cyan());
    println!("  2. Run {} to check it", "runflow validate".cyan());
    println!("  3. Run {} to execute it locally", "runflow run".cyan());
    println!();

    if verbose {
        println!("{}", "Generated workflow:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", content.dimmed());
    }

    Ok(())
}

fn generate_python_uv_template(name: &str) -> String {
    format!(
        r#"# runflow / GitHub Actions workflow
name: {name} CI

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

      - name: Set up Python ${{{{ matrix.python-version }}}}
        uses: actions/setup-python@v5
        with:
          python-version: ${{{{ matrix.python-version }}}}

      - name: Install uv
        uses: astral-sh/setup-uv@v3
        with:
          version: "latest"

      - name: Install dependencies
        run: uv sync

      - name: Run tests
        run: uv run pytest
"#
    )
}

fn generate_rust_template(name: &str) -> String {
    format!(
        r#"# runflow / GitHub Actions workflow
name: {name} CI

on:
  push:
    branches: [main]
  pull_request:

env:
  CARGO_TERM_COLOR: always

jobs:
  lint:
    runs-on: ubuntu-latest
    timeout-minutes: 15
    steps:
      - uses: actions/checkout@v4
      - name: Format
        run: cargo fmt --all -- --check
      - name: Clippy
        run: cargo clippy --all-targets -- -D warnings

  test:
    runs-on: ubuntu-latest
    needs: lint
    timeout-minutes: 30
    steps:
      - uses: actions/checkout@v4
      - name: Test
        run: cargo test --all
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_valid() {
        for content in [generate_python_uv_template("demo"), generate_rust_template("demo")] {
            let workflow = Workflow::from_yaml(&content).unwrap();
            let validation = WorkflowValidator::validate(&workflow).unwrap();
            assert!(validation.is_valid(), "{:?}", validation.errors);
        }
    }

    #[test]
    fn test_python_template_keeps_expressions() {
        let content = generate_python_uv_template("demo");
        assert!(content.contains("${{ matrix.python-version }}"));
        assert!(content.starts_with("# runflow"));
    }
}
