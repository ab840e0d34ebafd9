// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! Workflow triggers
//!
//! Decides whether an incoming event starts a run. The `on:` key accepts
//! a single event name, a list of names, or a map of names to filters.

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::errors::RunflowError;

/// Kind of event that may start a workflow
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Push,
    PullRequest,
    WorkflowDispatch,
    /// Any other event name (`schedule`, `release`, ...)
    Other(String),
}

impl EventKind {
    /// Map an event name to its kind
    pub fn from_name(name: &str) -> Self {
        match name {
            "push" => Self::Push,
            "pull_request" => Self::PullRequest,
            "workflow_dispatch" => Self::WorkflowDispatch,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Push => "push",
            Self::PullRequest => "pull_request",
            Self::WorkflowDispatch => "workflow_dispatch",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = RunflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(RunflowError::InvalidEvent { kind: s.to_string() });
        }
        Ok(Self::from_name(name))
    }
}

/// Incoming event descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// Pushed branch, or the base branch of a pull request
    pub branch: Option<String>,
}

impl Event {
    pub fn new(kind: EventKind, branch: Option<&str>) -> Self {
        Self {
            kind,
            branch: branch.map(str::to_string),
        }
    }

    pub fn push(branch: &str) -> Self {
        Self::new(EventKind::Push, Some(branch))
    }

    pub fn pull_request(base_branch: &str) -> Self {
        Self::new(EventKind::PullRequest, Some(base_branch))
    }
}

/// Branch filter attached to one event kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EventFilter {
    /// Branch patterns that must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<String>>,

    /// Branch patterns that must not match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches_ignore: Option<Vec<String>>,
}

impl EventFilter {
    /// Check a branch against this filter
    pub fn matches_branch(&self, branch: Option<&str>) -> bool {
        if let Some(ref patterns) = self.branches {
            let Some(branch) = branch else {
                return false;
            };
            if !patterns.iter().any(|p| branch_matches(p, branch)) {
                return false;
            }
        }

        if let (Some(ref ignored), Some(branch)) = (&self.branches_ignore, branch) {
            if ignored.iter().any(|p| branch_matches(p, branch)) {
                return false;
            }
        }

        true
    }

    /// All patterns in this filter
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.branches
            .iter()
            .chain(self.branches_ignore.iter())
            .flatten()
            .map(String::as_str)
    }
}

/// Match a branch against a glob. `*` stays within one path segment, `**` crosses them.
pub fn branch_matches(pattern: &str, branch: &str) -> bool {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    match Pattern::new(pattern) {
        Ok(p) => p.matches_with(branch, options),
        Err(_) => pattern == branch,
    }
}

/// Declared triggers of a workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTriggers", into = "RawTriggers")]
pub struct Triggers {
    events: BTreeMap<EventKind, EventFilter>,
}

impl Triggers {
    /// Declare an event kind with a filter
    pub fn with_event(mut self, kind: EventKind, filter: EventFilter) -> Self {
        self.events.insert(kind, filter);
        self
    }

    /// Whether an event starts a run
    pub fn matches(&self, event: &Event) -> bool {
        self.events
            .get(&event.kind)
            .map(|filter| filter.matches_branch(event.branch.as_deref()))
            .unwrap_or(false)
    }

    /// Declared event kinds
    pub fn kinds(&self) -> impl Iterator<Item = &EventKind> {
        self.events.keys()
    }

    /// Filter for one event kind
    pub fn filter(&self, kind: &EventKind) -> Option<&EventFilter> {
        self.events.get(kind)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawTriggers {
    One(String),
    Many(Vec<String>),
    Map(BTreeMap<String, serde_yaml::Value>),
}

impl TryFrom<RawTriggers> for Triggers {
    type Error = String;

    fn try_from(raw: RawTriggers) -> Result<Self, Self::Error> {
        let events = match raw {
            RawTriggers::One(name) => {
                BTreeMap::from([(EventKind::from_name(&name), EventFilter::default())])
            }
            RawTriggers::Many(names) => names
                .iter()
                .map(|n| (EventKind::from_name(n), EventFilter::default()))
                .collect(),
            RawTriggers::Map(map) => {
                let mut events = BTreeMap::new();
                for (name, value) in map {
                    // Only mappings carry branch filters; `schedule` lists and nulls do not.
                    let filter = if value.is_mapping() {
                        serde_yaml::from_value(value)
                            .map_err(|e| format!("invalid filter for '{}': {}", name, e))?
                    } else {
                        EventFilter::default()
                    };
                    events.insert(EventKind::from_name(&name), filter);
                }
                events
            }
        };

        Ok(Self { events })
    }
}

impl From<Triggers> for RawTriggers {
    fn from(triggers: Triggers) -> Self {
        let map = triggers
            .events
            .into_iter()
            .map(|(kind, filter)| {
                let value = if filter == EventFilter::default() {
                    serde_yaml::Value::Null
                } else {
                    serde_yaml::to_value(&filter).unwrap_or(serde_yaml::Value::Null)
                };
                (kind.to_string(), value)
            })
            .collect();
        RawTriggers::Map(map)
    }
}
