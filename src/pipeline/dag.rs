// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Job dependency graph
//!
//! Jobs depend on each other through `passed` constraints on their get
//! steps. The graph checks those constraints and renders the pipeline for
//! humans.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::errors::{PipesmithError, PipesmithResult};
use crate::pipeline::{Action, Job, Pipeline, PlanStep};

/// Dependency graph over a pipeline's jobs
pub struct JobGraph {
    graph: DiGraph<usize, ()>,
    name_to_index: HashMap<String, NodeIndex>,
    index_to_name: HashMap<NodeIndex, String>,
}

impl JobGraph {
    fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_to_index: HashMap::new(),
            index_to_name: HashMap::new(),
        }
    }

    /// Build the graph from a pipeline
    pub fn build(pipeline: &Pipeline) -> PipesmithResult<Self> {
        let mut builder = Self::new();

        for (idx, job) in pipeline.jobs.iter().enumerate() {
            let node = builder.graph.add_node(idx);
            builder.name_to_index.insert(job.name.clone(), node);
            builder.index_to_name.insert(node, job.name.clone());
        }

        for job in &pipeline.jobs {
            let job_node = builder.name_to_index[&job.name];

            for dep_name in passed_constraints(job) {
                let dep_node = builder.name_to_index.get(dep_name).ok_or_else(|| {
                    PipesmithError::UnknownDependency {
                        job: job.name.clone(),
                        dependency: dep_name.to_string(),
                    }
                })?;

                if !builder.graph.contains_edge(*dep_node, job_node) {
                    builder.graph.add_edge(*dep_node, job_node, ());
                }
            }
        }

        builder.topological_order()?;
        Ok(builder)
    }

    /// Find all jobs involved in a cycle
    fn find_cycle_members(&self, start: NodeIndex) -> Vec<String> {
        use petgraph::visit::{depth_first_search, Control, DfsEvent};

        let mut in_cycle = vec![self.index_to_name[&start].clone()];
        depth_first_search(&self.graph, Some(start), |event| match event {
            DfsEvent::BackEdge(_, to) if to == start => Control::Break(()),
            DfsEvent::Discover(node, _) if node != start => {
                in_cycle.push(self.index_to_name[&node].clone());
                Control::Continue
            }
            _ => Control::Continue,
        });

        in_cycle
    }

    fn cycle_error(&self, node: NodeIndex) -> PipesmithError {
        PipesmithError::CircularDependency {
            job: self.index_to_name[&node].clone(),
            jobs: self.find_cycle_members(node),
        }
    }

    /// Get topologically sorted job indices
    pub fn topological_order(&self) -> PipesmithResult<Vec<usize>> {
        toposort(&self.graph, None)
            .map(|nodes| nodes.into_iter().map(|n| self.graph[n]).collect())
            .map_err(|cycle| self.cycle_error(cycle.node_id()))
    }

    /// Jobs that must pass before `job_name`
    pub fn dependencies(&self, job_name: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(job_name)?;
        let deps: Vec<String> = self
            .graph
            .neighbors_directed(*node, petgraph::Direction::Incoming)
            .map(|n| self.index_to_name[&n].clone())
            .collect();
        Some(deps)
    }

    fn edges(&self) -> Vec<(&str, &str)> {
        self.graph
            .edge_indices()
            .filter_map(|edge| self.graph.edge_endpoints(edge))
            .map(|(from, to)| {
                (
                    self.index_to_name[&from].as_str(),
                    self.index_to_name[&to].as_str(),
                )
            })
            .collect()
    }

    fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.name_to_index.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Generate Mermaid diagram of the job graph
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for name in self.sorted_names() {
            out.push_str(&format!("    {}[\"{}\"]\n", mermaid_id(name), name));
        }

        for (from, to) in self.edges() {
            out.push_str(&format!("    {} --> {}\n", mermaid_id(from), mermaid_id(to)));
        }

        out
    }

    /// Generate DOT diagram of the job graph
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for (from, to) in self.edges() {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
        }

        for name in self.sorted_names() {
            let node = self.name_to_index[name];
            if self.graph.neighbors_undirected(node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", name));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Execution order followed by each job's plan tree
    pub fn to_text(&self, pipeline: &Pipeline) -> PipesmithResult<String> {
        let order = self.topological_order()?;
        let mut out = String::new();

        for (i, idx) in order.iter().enumerate() {
            let job = &pipeline.jobs[*idx];
            let deps = self.dependencies(&job.name).unwrap_or_default();

            out.push_str(&format!("{}. {} ({} steps)", i + 1, job.name, job.plan.len()));
            if !deps.is_empty() {
                out.push_str(&format!(" [passed: {}]", deps.join(", ")));
            }
            out.push('\n');

            for step in &job.plan {
                write_step(&mut out, step, 1, "");
            }
        }

        Ok(out)
    }
}

/// Every `passed` entry of a job's get steps, nested ones included
fn passed_constraints(job: &Job) -> Vec<&str> {
    let mut passed = Vec::new();
    for step in &job.plan {
        step.walk(&mut |s| {
            if let Action::Get(get) = &s.action {
                passed.extend(get.passed.iter().map(String::as_str));
            }
        });
    }
    passed
}

fn write_step(out: &mut String, step: &PlanStep, depth: usize, label: &str) {
    let indent = "  ".repeat(depth);
    let description = match &step.action {
        Action::Task(task) => format!("task {}", task.name),
        Action::Get(get) => format!("get {}", get.resource),
        Action::Put(put) => format!("put {}", put.resource),
        Action::Aggregate(steps) => format!("aggregate ({})", steps.len()),
    };
    out.push_str(&format!("{}- {}{}\n", indent, label, description));

    if let Action::Aggregate(steps) = &step.action {
        for child in steps {
            write_step(out, child, depth + 1, "");
        }
    }

    let hooks = [
        ("ensure: ", step.hooks.get_ensure()),
        ("on_success: ", step.hooks.on_success()),
        ("on_failure: ", step.hooks.on_failure()),
    ];
    for (label, hook) in hooks {
        if let Some(hook) = hook {
            write_step(out, hook, depth + 1, label);
        }
    }
}

fn mermaid_id(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
