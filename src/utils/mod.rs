// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Utility modules
//!
//! Common utilities for the runflow CLI.

pub mod colors;

pub use colors::*;
