// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 runflow contributors

//! DAG (Directed Acyclic Graph) builder for job dependencies
//!
//! Builds the `needs` graph between jobs, detects cycles and unknown
//! jobs, and groups jobs into levels that can run side by side.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::errors::RunflowError;
use crate::workflow::Workflow;

/// Builder for job dependency DAGs
pub struct DagBuilder {
    graph: DiGraph<String, ()>,
    name_to_index: HashMap<String, NodeIndex>,
}

impl DagBuilder {
    /// Create an empty DAG builder
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_to_index: HashMap::new(),
        }
    }

    /// Build a DAG from a workflow
    pub fn build(workflow: &Workflow) -> Result<Self, RunflowError> {
        let mut builder = Self::new();

        for id in workflow.jobs.keys() {
            let node = builder.graph.add_node(id.clone());
            builder.name_to_index.insert(id.clone(), node);
        }

        for (id, job) in &workflow.jobs {
            let job_node = builder.name_to_index[id];

            for dep in &job.needs {
                let dep_node = builder.name_to_index.get(dep).ok_or_else(|| {
                    RunflowError::UnknownDependency {
                        job: id.clone(),
                        dependency: dep.clone(),
                    }
                })?;

                if !builder.graph.contains_edge(*dep_node, job_node) {
                    builder.graph.add_edge(*dep_node, job_node, ());
                }
            }
        }

        builder.validate_acyclic()?;

        Ok(builder)
    }

    fn validate_acyclic(&self) -> Result<(), RunflowError> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(RunflowError::CircularDependency {
                jobs: self.find_cycle_members(cycle.node_id()),
            }),
        }
    }

    /// Walk `needs` edges from `start` until a job repeats
    fn find_cycle_members(&self, start: NodeIndex) -> Vec<String> {
        let mut path = vec![start];
        let mut current = start;

        loop {
            let next = if self.graph.contains_edge(current, start) {
                Some(start)
            } else {
                self.graph
                    .neighbors_directed(current, petgraph::Direction::Outgoing)
                    .find(|n| petgraph::algo::has_path_connecting(&self.graph, *n, start, None))
            };

            let Some(next) = next else { break };
            path.push(next);
            if next == start || path.len() > self.graph.node_count() {
                break;
            }
            current = next;
        }

        path.into_iter().map(|n| self.graph[n].clone()).collect()
    }

    /// Job ids in dependency order, ties broken by id
    pub fn topological_order(&self) -> Result<Vec<String>, RunflowError> {
        Ok(self.levels()?.into_iter().flatten().collect())
    }

    /// Jobs grouped so that every job comes after all of its `needs`
    pub fn levels(&self) -> Result<Vec<Vec<String>>, RunflowError> {
        let order = toposort(&self.graph, None).map_err(|cycle| {
            RunflowError::CircularDependency {
                jobs: self.find_cycle_members(cycle.node_id()),
            }
        })?;

        let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
        for node in &order {
            let level = self
                .graph
                .neighbors_directed(*node, petgraph::Direction::Incoming)
                .map(|dep| depth[&dep] + 1)
                .max()
                .unwrap_or(0);
            depth.insert(*node, level);
        }

        let count = depth.values().max().map(|d| d + 1).unwrap_or(0);
        let mut levels = vec![Vec::new(); count];
        for (node, level) in depth {
            levels[level].push(self.graph[node].clone());
        }
        for level in &mut levels {
            level.sort();
        }

        Ok(levels)
    }

    /// Jobs that must run before `job`
    pub fn dependencies(&self, job: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(job)?;
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(*node, petgraph::Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect();
        deps.sort();
        Some(deps)
    }

    /// Check if job A depends (directly or transitively) on job B
    pub fn depends_on(&self, job_a: &str, job_b: &str) -> bool {
        let (Some(a), Some(b)) = (self.name_to_index.get(job_a), self.name_to_index.get(job_b))
        else {
            return false;
        };

        a != b && petgraph::algo::has_path_connecting(&self.graph, *b, *a, None)
    }

    fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<(&str, &str)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(from, to)| (self.graph[from].as_str(), self.graph[to].as_str()))
            .collect();
        edges.sort();
        edges
    }

    fn sorted_nodes(&self) -> Vec<(&str, NodeIndex)> {
        let mut nodes: Vec<(&str, NodeIndex)> = self
            .name_to_index
            .iter()
            .map(|(name, idx)| (name.as_str(), *idx))
            .collect();
        nodes.sort();
        nodes
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for (name, _) in self.sorted_nodes() {
            out.push_str(&format!("    {}[{}]\n", name, name));
        }

        for (from, to) in self.edges() {
            out.push_str(&format!("    {} --> {}\n", from, to));
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph workflow {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for (from, to) in self.edges() {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
        }

        for (name, node) in self.sorted_nodes() {
            if self.graph.neighbors_undirected(node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", name));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Text listing of jobs in execution order with their matrix sizes
    pub fn to_text(&self, workflow: &Workflow) -> Result<String, RunflowError> {
        let mut out = String::new();

        for (i, level) in self.levels()?.iter().enumerate() {
            out.push_str(&format!("Level {}:\n", i + 1));
            for id in level {
                let runs = workflow
                    .get_job(id)
                    .map(|j| j.combinations().len())
                    .unwrap_or(0);
                out.push_str(&format!(
                    "  - {} ({} run{})",
                    id,
                    runs,
                    if runs == 1 { "" } else { "s" }
                ));

                let deps = self.dependencies(id).unwrap_or_default();
                if !deps.is_empty() {
                    out.push_str(&format!(" [needs: {}]", deps.join(", ")));
                }
                out.push('\n');
            }
        }

        Ok(out)
    }
}

impl Default for DagBuilder {
    fn default() -> Self {
        Self::new()
    }
}
