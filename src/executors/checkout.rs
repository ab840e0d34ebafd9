// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Checkout executor
//!
//! `actions/checkout`: makes the project source available in the job
//! workspace. In-place runs already sit in the source tree; isolated
//! runs get a copy.

use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::{Executor, StepResult};
use crate::errors::{RunflowError, RunflowResult};
use crate::runner::JobContext;
use crate::workflow::Step;

/// Checkout executor
pub struct CheckoutExecutor;

impl CheckoutExecutor {
    pub const ACTION: &'static str = "actions/checkout";

    pub fn new() -> Self {
        Self
    }
}

impl Default for CheckoutExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for CheckoutExecutor {
    async fn execute(&self, step: &Step, ctx: &mut JobContext) -> RunflowResult<StepResult> {
        let start = Instant::now();

        if !ctx.source_dir.is_dir() {
            return Ok(StepResult::failure(
                format!("Source directory {} does not exist", ctx.source_dir.display()),
                1,
                start.elapsed(),
            ));
        }

        let target = match step.with.get("path") {
            Some(path) if !path.is_empty() => ctx.workspace.join(path),
            _ => ctx.workspace.clone(),
        };

        if same_dir(&target, &ctx.source_dir) {
            return Ok(StepResult::success(
                format!("Using source tree at {}", ctx.source_dir.display()),
                start.elapsed(),
            ));
        }

        let source = ctx.source_dir.clone();
        let skip = vec![source.join(".git"), ctx.work_root.clone(), target.clone()];
        let dest = target.clone();

        // The blocking copy outlives a dropped step future unless told to stop
        let stop = StopOnDrop::new();
        let flag = stop.flag();
        let copied = tokio::task::spawn_blocking(move || copy_tree(&source, &dest, &skip, &flag))
            .await
            .map_err(|e| RunflowError::ExecutionFailed {
                message: format!("checkout task panicked: {}", e),
                help: None,
            })?;

        match copied {
            Ok(files) => {
                tracing::info!(job = %ctx.job_name, files, target = %target.display(), "checked out");
                Ok(StepResult::success(
                    format!("Copied {} file(s) into {}", files, target.display()),
                    start.elapsed(),
                ))
            }
            Err(e) => Ok(StepResult::failure(
                format!("Checkout into {} failed: {}", target.display(), e),
                1,
                start.elapsed(),
            )),
        }
    }

    async fn check_available(&self) -> RunflowResult<bool> {
        Ok(true)
    }

    fn validate_step(&self, step: &Step) -> RunflowResult<()> {
        if let Some(path) = step.with.get("path") {
            if Path::new(path).is_absolute() || path.split('/').any(|c| c == "..") {
                return Err(RunflowError::invalid_step(
                    "",
                    &step.display_name(),
                    "'path' must stay inside the workspace",
                ));
            }
        }
        Ok(())
    }
}

/// Raises its flag when dropped
struct StopOnDrop(Arc<AtomicBool>);

impl StopOnDrop {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Recursively copy `source` into `dest`, skipping the given paths and any
/// directory that contains one of them. Returns the file count. Stops with
/// `Interrupted` once `stop` is set.
fn copy_tree(source: &Path, dest: &Path, skip: &[PathBuf], stop: &AtomicBool) -> io::Result<usize> {
    let entries: Vec<fs::DirEntry> = fs::read_dir(source)?.collect::<io::Result<_>>()?;
    fs::create_dir_all(dest)?;
    let mut files = 0;

    for entry in entries {
        if stop.load(Ordering::Relaxed) {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "checkout cancelled"));
        }

        let path = entry.path();
        if skip.iter().any(|s| s.starts_with(&path)) {
            continue;
        }

        let target = dest.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            files += copy_tree(&path, &target, skip, stop)?;
        } else if file_type.is_file() {
            fs::copy(&path, &target)?;
            files += 1;
        } else if file_type.is_symlink() {
            // Follow links to files; links to directories could loop.
            if fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false) {
                fs::copy(&path, &target)?;
                files += 1;
            }
        }
    }

    Ok(files)
}
