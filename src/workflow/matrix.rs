// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Job matrix expansion
//!
//! A matrix maps axis names to value lists. Expansion takes the cross
//! product of all axes, drops combinations matched by `exclude`, then
//! applies `include` entries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::definition::Scalar;

/// One matrix combination: axis name to value
pub type Combination = BTreeMap<String, String>;

/// Matrix declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    /// Extra combinations, or extra keys for matching combinations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<BTreeMap<String, Scalar>>,

    /// Combinations to drop (partial matches count)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<BTreeMap<String, Scalar>>,

    /// Axes, e.g. `python-version: ["3.11", "3.12"]`
    #[serde(flatten)]
    pub axes: BTreeMap<String, Vec<Scalar>>,
}

impl Matrix {
    /// Build a matrix from axes
    pub fn from_axes<I, K, V>(axes: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: Into<String>,
        V: Into<Scalar>,
    {
        Self {
            axes: axes
                .into_iter()
                .map(|(k, vs)| (k.into(), vs.into_iter().map(Into::into).collect()))
                .collect(),
            ..Self::default()
        }
    }

    /// Expand into concrete combinations
    pub fn expand(&self) -> Vec<Combination> {
        let mut combinations: Vec<Combination> = if self.axes.is_empty() {
            Vec::new()
        } else {
            vec![Combination::new()]
        };

        for (axis, values) in &self.axes {
            let mut next = Vec::with_capacity(combinations.len() * values.len());
            for combination in &combinations {
                for value in values {
                    let mut extended = combination.clone();
                    extended.insert(axis.clone(), value.0.clone());
                    next.push(extended);
                }
            }
            combinations = next;
        }

        combinations.retain(|c| !self.exclude.iter().any(|ex| partially_matches(c, ex)));

        // Includes extend only the original combinations, never ones added by other includes.
        let original = combinations.len();
        for entry in &self.include {
            let mut applied = false;
            for combination in combinations.iter_mut().take(original) {
                let compatible = entry
                    .iter()
                    .filter(|(key, _)| self.axes.contains_key(*key))
                    .all(|(key, value)| combination.get(key) == Some(&value.0));

                if compatible {
                    for (key, value) in entry {
                        combination.insert(key.clone(), value.0.clone());
                    }
                    applied = true;
                }
            }

            if !applied {
                combinations.push(
                    entry
                        .iter()
                        .map(|(k, v)| (k.clone(), v.0.clone()))
                        .collect(),
                );
            }
        }

        combinations
    }

    /// Axes declared with no values
    pub fn empty_axes(&self) -> Vec<&str> {
        self.axes
            .iter()
            .filter(|(_, values)| values.is_empty())
            .map(|(axis, _)| axis.as_str())
            .collect()
    }
}

fn partially_matches(combination: &Combination, pattern: &BTreeMap<String, Scalar>) -> bool {
    pattern
        .iter()
        .all(|(key, value)| combination.get(key) == Some(&value.0))
}

/// Suffix appended to a job name for one combination, e.g. `(3.12, ubuntu)`
pub fn combination_label(combination: &Combination) -> Option<String> {
    if combination.is_empty() {
        return None;
    }
    let values: Vec<&str> = combination.values().map(String::as_str).collect();
    Some(format!("({})", values.join(", ")))
}
