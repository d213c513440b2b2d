// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Pipeline definition structures
//!
//! The document submitted to the execution engine: resource types,
//! resources and jobs, each job holding an ordered plan of steps.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::errors::PipesmithResult;

/// Free-form key/value block (`source`, `params`, `version`)
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Parameter on a put step marking a docker build-and-push
pub const DOCKER_BUILD_PARAM: &str = "build";

/// A complete pipeline document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pipeline {
    pub resource_types: Vec<ResourceType>,
    pub resources: Vec<Resource>,
    pub jobs: Vec<Job>,
}

impl Pipeline {
    /// Serialize pipeline to YAML
    pub fn to_yaml(&self) -> PipesmithResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Serialize pipeline to pretty-printed JSON
    pub fn to_json(&self) -> PipesmithResult<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    /// Get a resource by name
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// A custom resource type (`type: docker-image` pointing at an image)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceType {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub source: Params,
}

/// A versioned external dependency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub source: Params,
}

/// A named unit of work with an ordered plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub name: String,

    pub public: bool,

    pub serial: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_in_flight: Option<u32>,

    pub plan: Vec<PlanStep>,
}

/// One step of a plan together with the hooks it owns
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    pub action: Action,
    pub hooks: Hooks,
}

/// What a plan step does
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Task(Task),
    Get(Get),
    Put(Put),
    /// Sub-steps run in parallel
    Aggregate(Vec<PlanStep>),
}

/// Steps run after the owning step finishes
///
/// A step either has an `ensure` hook or outcome hooks, never both.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Hooks {
    #[default]
    None,
    /// Runs whatever the outcome
    Ensure(Box<PlanStep>),
    Outcome {
        on_success: Option<Box<PlanStep>>,
        on_failure: Option<Box<PlanStep>>,
    },
}

impl Hooks {
    pub fn ensure(step: PlanStep) -> Self {
        Self::Ensure(Box::new(step))
    }

    pub fn outcome(on_success: Option<PlanStep>, on_failure: Option<PlanStep>) -> Self {
        if on_success.is_none() && on_failure.is_none() {
            return Self::None;
        }
        Self::Outcome {
            on_success: on_success.map(Box::new),
            on_failure: on_failure.map(Box::new),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn has_ensure(&self) -> bool {
        matches!(self, Self::Ensure(_))
    }

    pub fn on_success(&self) -> Option<&PlanStep> {
        match self {
            Self::Outcome { on_success, .. } => on_success.as_deref(),
            _ => None,
        }
    }

    pub fn on_failure(&self) -> Option<&PlanStep> {
        match self {
            Self::Outcome { on_failure, .. } => on_failure.as_deref(),
            _ => None,
        }
    }

    pub fn get_ensure(&self) -> Option<&PlanStep> {
        match self {
            Self::Ensure(step) => Some(&**step),
            _ => None,
        }
    }

    /// Hook steps in serialization order
    pub fn steps(&self) -> Vec<&PlanStep> {
        match self {
            Self::None => vec![],
            Self::Ensure(step) => vec![&**step],
            Self::Outcome {
                on_success,
                on_failure,
            } => on_success
                .iter()
                .chain(on_failure.iter())
                .map(|s| &**s)
                .collect(),
        }
    }
}

impl PlanStep {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            hooks: Hooks::None,
        }
    }

    /// Human label: task name, resource name, or `aggregate`
    pub fn name(&self) -> &str {
        match &self.action {
            Action::Task(task) => &task.name,
            Action::Get(get) => &get.resource,
            Action::Put(put) => &put.resource,
            Action::Aggregate(_) => "aggregate",
        }
    }

    pub fn as_task(&self) -> Option<&Task> {
        match &self.action {
            Action::Task(task) => Some(task),
            _ => None,
        }
    }

    /// A put that builds and pushes a docker image
    pub fn is_docker_build(&self) -> bool {
        matches!(&self.action, Action::Put(put) if put.params.contains_key(DOCKER_BUILD_PARAM))
    }

    /// Direct sub-steps: aggregate members followed by hook steps
    pub fn children(&self) -> Vec<&PlanStep> {
        let mut children: Vec<&PlanStep> = match &self.action {
            Action::Aggregate(steps) => steps.iter().collect(),
            _ => vec![],
        };
        children.extend(self.hooks.steps());
        children
    }

    /// Visit this step and every step nested below it, depth first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a PlanStep)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

/// Where a task came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskOrigin {
    /// Part of the build itself
    #[default]
    Declared,
    /// Status reporting added during instrumentation
    Event,
}

/// A containerized command
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub name: String,
    pub config: TaskConfig,
    pub privileged: bool,
    pub origin: TaskOrigin,
}

/// Fetch a resource version into the build
#[derive(Debug, Clone, PartialEq)]
pub struct Get {
    pub resource: String,
    /// Jobs the version must have passed through
    pub passed: Vec<String>,
    pub version: Option<Params>,
}

/// Push to a resource
#[derive(Debug, Clone, PartialEq)]
pub struct Put {
    pub resource: String,
    pub params: Params,
}

/// Task configuration in the engine's schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskConfig {
    pub platform: String,

    pub image_resource: ImageResource,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<TaskIo>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<TaskIo>,

    #[serde(skip_serializing_if = "Params::is_empty")]
    pub params: Params,

    pub run: RunConfig,
}

impl TaskConfig {
    /// Directory of the first declared output
    pub fn output_dir(&self) -> Option<&str> {
        self.outputs.first().map(|o| o.name.as_str())
    }
}

/// Image a task runs in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageResource {
    #[serde(rename = "type")]
    pub kind: String,

    pub source: Params,
}

/// Named task input or output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskIo {
    pub name: String,
}

impl TaskIo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Command a task executes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    pub path: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Serialize for PlanStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        match &self.action {
            Action::Task(task) => {
                map.serialize_entry("task", &task.name)?;
                if task.privileged {
                    map.serialize_entry("privileged", &true)?;
                }
                map.serialize_entry("config", &task.config)?;
            }
            Action::Get(get) => {
                map.serialize_entry("get", &get.resource)?;
                if !get.passed.is_empty() {
                    map.serialize_entry("passed", &get.passed)?;
                }
                if let Some(version) = &get.version {
                    map.serialize_entry("version", version)?;
                }
            }
            Action::Put(put) => {
                map.serialize_entry("put", &put.resource)?;
                if !put.params.is_empty() {
                    map.serialize_entry("params", &put.params)?;
                }
            }
            Action::Aggregate(steps) => {
                map.serialize_entry("aggregate", steps)?;
            }
        }

        match &self.hooks {
            Hooks::None => {}
            Hooks::Ensure(step) => map.serialize_entry("ensure", step)?,
            Hooks::Outcome {
                on_success,
                on_failure,
            } => {
                if let Some(step) = on_success {
                    map.serialize_entry("on_success", step)?;
                }
                if let Some(step) = on_failure {
                    map.serialize_entry("on_failure", step)?;
                }
            }
        }

        map.end()
    }
}
