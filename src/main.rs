// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! runflow - local CI workflow runner
//!
//! Run GitHub-Actions-style workflows on this machine.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use runflow::cli::run::RunArgs;
use runflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runflow=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    if !runflow::utils::should_use_colors() {
        colored::control::set_override(false);
    }

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    match cli.command {
        Commands::Init { template, force } => {
            runflow::cli::init::run(template, force, cli.verbose).await
        }
        Commands::Run {
            workflow,
            event,
            branch,
            jobs,
            dry_run,
            format,
            timeout_minutes,
            isolated,
            max_parallel,
        } => {
            let args = RunArgs {
                workflow,
                event,
                branch,
                jobs,
                dry_run,
                format,
                timeout_minutes,
                isolated,
                max_parallel,
            };
            runflow::cli::run::run(args, cli.verbose).await
        }
        Commands::Validate { workflow } => {
            runflow::cli::validate::run(workflow, cli.verbose).await
        }
        Commands::Graph { workflow, format } => {
            runflow::cli::graph::run(workflow, format, cli.verbose).await
        }
    }
}
