// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Pipeline constructors
//!
//! Plain functions returning owned values. Nothing is shared between calls,
//! so two pipelines built from the same inputs never alias.

use crate::images::ImageRef;
use crate::pipeline::{
    Action, Get, Hooks, ImageResource, Job, Params, Pipeline, PlanStep, Put, Resource,
    ResourceType, RunConfig, Task, TaskConfig, TaskIo, TaskOrigin,
};

/// Resource type used for task images and custom resource types
pub const DOCKER_IMAGE: &str = "docker-image";

/// Resource type of source repositories
pub const GIT: &str = "git";

pub fn new_pipeline() -> Pipeline {
    Pipeline::default()
}

pub fn new_job(name: impl Into<String>, public: bool, serial: bool) -> Job {
    Job {
        name: name.into(),
        public,
        serial,
        max_in_flight: None,
        plan: new_plan(),
    }
}

pub fn new_plan() -> Vec<PlanStep> {
    Vec::new()
}

/// Run `steps` in parallel
pub fn new_aggregate(steps: Vec<PlanStep>) -> PlanStep {
    PlanStep::new(Action::Aggregate(steps))
}

pub fn new_task(name: impl Into<String>, config: TaskConfig) -> PlanStep {
    PlanStep::new(Action::Task(Task {
        name: name.into(),
        config,
        privileged: false,
        origin: TaskOrigin::Declared,
    }))
}

/// A task added by instrumentation rather than by the build
pub fn new_event_task(name: impl Into<String>, config: TaskConfig) -> PlanStep {
    PlanStep::new(Action::Task(Task {
        name: name.into(),
        config,
        privileged: false,
        origin: TaskOrigin::Event,
    }))
}

pub fn new_resource(name: impl Into<String>, kind: impl Into<String>, source: Params) -> Resource {
    Resource {
        name: name.into(),
        kind: kind.into(),
        source,
    }
}

pub fn new_resource_type(
    name: impl Into<String>,
    kind: impl Into<String>,
    source: Params,
) -> ResourceType {
    ResourceType {
        name: name.into(),
        kind: kind.into(),
        source,
    }
}

pub fn new_get_resource(
    name: impl Into<String>,
    passed: Vec<String>,
    version: Option<Params>,
) -> PlanStep {
    PlanStep::new(Action::Get(Get {
        resource: name.into(),
        passed,
        version,
    }))
}

pub fn new_put_resource(name: impl Into<String>, params: Params) -> PlanStep {
    PlanStep::new(Action::Put(Put {
        resource: name.into(),
        params,
    }))
}

/// Linux task config running `path args...` inside `image`
pub fn new_task_config(image: &ImageRef, path: impl Into<String>, args: Vec<String>) -> TaskConfig {
    TaskConfig {
        platform: "linux".into(),
        image_resource: ImageResource {
            kind: DOCKER_IMAGE.into(),
            source: image.to_source(),
        },
        inputs: vec![],
        outputs: vec![],
        params: Params::new(),
        run: RunConfig {
            path: path.into(),
            args,
            dir: None,
        },
    }
}

/// Task config running a POSIX shell script
pub fn new_script_config(image: &ImageRef, script: impl Into<String>) -> TaskConfig {
    new_task_config(image, "sh", vec!["-c".into(), script.into()])
}

/// Declare `names` as task inputs
pub fn inputs(names: &[&str]) -> Vec<TaskIo> {
    names.iter().map(|n| TaskIo::new(*n)).collect()
}

/// Run `then` after `step` succeeds
pub fn chain(mut step: PlanStep, then: Option<PlanStep>) -> PlanStep {
    if then.is_some() {
        step.hooks = Hooks::outcome(then, None);
    }
    step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_do_not_alias() {
        let image = ImageRef::new("busybox", None);
        let mut first = new_job("build", true, true);
        first.plan.push(new_task("Build", new_script_config(&image, "true")));
        let second = first.clone();

        if let Action::Task(task) = &mut first.plan[0].action {
            task.config.params.insert("X".into(), "1".into());
        }

        assert_ne!(first, second);
        assert!(second.plan[0].as_task().unwrap().config.params.is_empty());
    }

    #[test]
    fn test_chain_without_follow_up_leaves_hooks_empty() {
        let step = chain(new_get_resource("source", vec![], None), None);
        assert!(step.hooks.is_empty());

        let step = chain(
            new_get_resource("source", vec![], None),
            Some(new_put_resource("notify", Params::new())),
        );
        assert_eq!(step.hooks.on_success().unwrap().name(), "notify");
        assert!(step.hooks.on_failure().is_none());
    }

    #[test]
    fn test_task_config_defaults() {
        let config = new_script_config(&ImageRef::new("alpine", Some("3")), "echo hi");
        assert_eq!(config.platform, "linux");
        assert_eq!(config.image_resource.kind, DOCKER_IMAGE);
        assert_eq!(config.image_resource.source["tag"], "3");
        assert_eq!(config.run.args, vec!["-c", "echo hi"]);
        assert!(config.output_dir().is_none());
    }
}
