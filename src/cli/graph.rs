// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Graph command - show the job dependency graph

use miette::Result;
use std::path::PathBuf;

use super::{load_workflow, GraphFormat};
use crate::workflow::DagBuilder;

/// Run the graph command
pub async fn run(workflow_path: PathBuf, format: GraphFormat, _verbose: bool) -> Result<()> {
    let workflow = load_workflow(&workflow_path)?;
    let dag = DagBuilder::build(&workflow)?;

    let output = match format {
        GraphFormat::Text => dag.to_text(&workflow)?,
        GraphFormat::Dot => dag.to_dot(),
        GraphFormat::Mermaid => dag.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}
