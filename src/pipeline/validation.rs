// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Pipeline validation
//!
//! Static checks over a synthesized pipeline before it is handed to the
//! execution engine.

use std::collections::HashSet;

use crate::errors::PipesmithError;
use crate::pipeline::{Action, Job, JobGraph, Pipeline};

/// Resource types the execution engine provides out of the box
const BUILTIN_RESOURCE_TYPES: &[&str] = &[
    "git",
    "docker-image",
    "registry-image",
    "time",
    "s3",
    "semver",
];

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline document
    pub fn validate(pipeline: &Pipeline) -> ValidationResult {
        let mut result = ValidationResult::new();

        if pipeline.jobs.is_empty() {
            result.add_error("Pipeline has no jobs defined");
        }

        Self::check_unique("job", pipeline.jobs.iter().map(|j| j.name.as_str()), &mut result);
        Self::check_unique(
            "resource",
            pipeline.resources.iter().map(|r| r.name.as_str()),
            &mut result,
        );
        Self::check_unique(
            "resource type",
            pipeline.resource_types.iter().map(|t| t.name.as_str()),
            &mut result,
        );

        let declared_types: HashSet<&str> = pipeline
            .resource_types
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        for resource in &pipeline.resources {
            if !declared_types.contains(resource.kind.as_str())
                && !BUILTIN_RESOURCE_TYPES.contains(&resource.kind.as_str())
            {
                result.add_warning(&format!(
                    "Resource '{}': type '{}' is neither declared nor built in",
                    resource.name, resource.kind
                ));
            }
        }

        match JobGraph::build(pipeline) {
            Ok(_) => {}
            Err(PipesmithError::CircularDependency { jobs, .. }) => {
                result.add_error(&format!("Circular dependency: {}", jobs.join(" → ")));
            }
            Err(PipesmithError::UnknownDependency { job, dependency }) => {
                result.add_error(&format!(
                    "Job '{}' requires unknown job '{}' to have passed",
                    job, dependency
                ));
            }
            Err(e) => {
                result.add_error(&format!("Job graph error: {}", e));
            }
        }

        let resources: HashSet<&str> = pipeline.resources.iter().map(|r| r.name.as_str()).collect();
        for job in &pipeline.jobs {
            Self::validate_job(job, &resources, &mut result);
        }

        result
    }

    fn check_unique<'a>(
        what: &str,
        names: impl Iterator<Item = &'a str>,
        result: &mut ValidationResult,
    ) {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name) {
                result.add_error(&format!("Duplicate {} name: '{}'", what, name));
            }
        }
    }

    /// Validate a single job, hooks and aggregates included
    fn validate_job(job: &Job, resources: &HashSet<&str>, result: &mut ValidationResult) {
        if job.plan.is_empty() {
            result.add_error(&format!("Job '{}': plan is empty", job.name));
        }

        for step in &job.plan {
            step.walk(&mut |s| match &s.action {
                Action::Get(get) if !resources.contains(get.resource.as_str()) => {
                    result.add_error(&format!(
                        "Job '{}': get references undeclared resource '{}'",
                        job.name, get.resource
                    ));
                }
                Action::Put(put) if !resources.contains(put.resource.as_str()) => {
                    result.add_error(&format!(
                        "Job '{}': put references undeclared resource '{}'",
                        job.name, put.resource
                    ));
                }
                Action::Task(task) if task.config.run.path.is_empty() => {
                    result.add_error(&format!(
                        "Job '{}': task '{}' has an empty run path",
                        job.name, task.name
                    ));
                }
                Action::Aggregate(steps) if steps.is_empty() => {
                    result.add_warning(&format!("Job '{}': empty aggregate", job.name));
                }
                _ => {}
            });
        }
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures;
    use crate::images::ImageTable;
    use crate::pipeline::builder::{new_get_resource, new_job, new_pipeline, new_put_resource, new_resource};
    use crate::pipeline::{synthesize, Params};

    #[test]
    fn test_validate_empty_pipeline() {
        let result = PipelineValidator::validate(&new_pipeline());
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("no jobs"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let mut pipeline = new_pipeline();
        for _ in 0..2 {
            pipeline.resources.push(new_resource("source", "git", Params::new()));
            let mut job = new_job("build", true, true);
            job.plan.push(new_get_resource("source", vec![], None));
            pipeline.jobs.push(job);
        }

        let result = PipelineValidator::validate(&pipeline);
        assert!(result.errors.iter().any(|e| e.contains("Duplicate job")));
        assert!(result.errors.iter().any(|e| e.contains("Duplicate resource")));
    }

    #[test]
    fn test_undeclared_resource_in_hook() {
        let mut pipeline = new_pipeline();
        pipeline.resources.push(new_resource("source", "git", Params::new()));
        let mut get = new_get_resource("source", vec![], None);
        get.hooks = crate::pipeline::Hooks::ensure(new_put_resource("notify-x", Params::new()));
        let mut job = new_job("build", true, true);
        job.plan.push(get);
        pipeline.jobs.push(job);

        let result = PipelineValidator::validate(&pipeline);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("undeclared resource 'notify-x'")));
    }

    #[test]
    fn test_unknown_resource_type_warns() {
        let mut pipeline = new_pipeline();
        pipeline.resources.push(new_resource("chat", "irc", Params::new()));
        let mut job = new_job("build", true, true);
        job.plan.push(new_put_resource("chat", Params::new()));
        pipeline.jobs.push(job);

        let result = PipelineValidator::validate(&pipeline);
        assert!(result.is_valid());
        assert!(result.has_warnings());
    }

    #[test]
    fn test_synthesized_pipelines_are_valid() {
        let images = ImageTable::with_defaults();
        for trigger in ["push", "pull_request", "close_pull_request"] {
            let mut ctx = fixtures::context(trigger, &["latest", "edge"]);
            ctx.notification_targets.push(crate::context::NotificationTarget {
                id: "hook".into(),
                kind: "webhook".into(),
                location: "https://hooks.example/ci".into(),
                token: None,
            });
            let pipeline = synthesize(&ctx, &images, "https://ci.example/b/7").unwrap();
            let result = PipelineValidator::validate(&pipeline);
            assert!(result.is_valid(), "{}: {:?}", trigger, result.errors);
            assert!(!result.has_warnings(), "{}: {:?}", trigger, result.warnings);
        }
    }
}
