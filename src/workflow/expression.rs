// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! `${{ context.key }}` interpolation
//!
//! Only property lookups are supported. Operators and function calls are
//! rejected instead of being silently passed through to the shell.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::errors::{RunflowError, RunflowResult};

fn expression_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{\{\s*(.*?)\s*\}\}").expect("valid expression regex"))
}

fn lookup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z0-9_][A-Za-z0-9_.\-]*)$")
            .expect("valid lookup regex")
    })
}

/// Values visible to expressions, grouped by context name
#[derive(Debug, Clone, Default)]
pub struct ExpressionContext {
    contexts: HashMap<String, HashMap<String, String>>,
}

impl ExpressionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a context such as `matrix` or `env`
    pub fn with_context<I, K, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.contexts.insert(
            name.to_string(),
            values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Replace every expression in `input`
    pub fn interpolate(&self, input: &str) -> RunflowResult<String> {
        if !input.contains("${{") {
            return Ok(input.to_string());
        }

        let mut out = String::with_capacity(input.len());
        let mut last = 0;

        for caps in expression_regex().captures_iter(input) {
            let whole = caps.get(0).expect("group 0 always present");
            out.push_str(&input[last..whole.start()]);
            out.push_str(&self.evaluate(&caps[1])?);
            last = whole.end();
        }
        out.push_str(&input[last..]);

        Ok(out)
    }

    /// Interpolate every value of a map
    pub fn interpolate_map(
        &self,
        values: &HashMap<String, String>,
    ) -> RunflowResult<HashMap<String, String>> {
        values
            .iter()
            .map(|(k, v)| Ok((k.clone(), self.interpolate(v)?)))
            .collect()
    }

    fn evaluate(&self, expression: &str) -> RunflowResult<String> {
        let caps = lookup_regex()
            .captures(expression)
            .ok_or_else(|| RunflowError::InvalidExpression {
                expression: expression.to_string(),
                reason: "only `context.key` lookups are supported".to_string(),
            })?;

        let (context, key) = (&caps[1], &caps[2]);
        let values = self
            .contexts
            .get(context)
            .ok_or_else(|| RunflowError::InvalidExpression {
                expression: expression.to_string(),
                reason: format!("unknown context '{}'", context),
            })?;

        match values.get(key) {
            Some(value) => Ok(value.clone()),
            None => {
                tracing::warn!(expression, "expression refers to a missing key, using ''");
                Ok(String::new())
            }
        }
    }
}
