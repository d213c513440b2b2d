// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Build context
//!
//! Everything the synthesis engine needs to know about one build request.
//! These records are owned by the surrounding service (projects, targets,
//! images and notification settings live in its database); pipesmith only
//! reads them, either handed over in-process or loaded from a YAML/JSON
//! document.

use serde::{Deserialize, Serialize};

use crate::errors::PipesmithResult;
use crate::pipeline::Params;
use crate::vcs::Commit;

/// Input to a single pipeline synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildContext {
    pub project: Project,

    pub build: Build,

    /// Canonical commit produced by the webhook layer
    pub commit: Commit,

    pub deployment_target: DeploymentTarget,

    /// Image to build and push; no image resources are produced without it
    #[serde(default)]
    pub application_image: Option<ApplicationImage>,

    pub build_container: BuildContainer,

    #[serde(default)]
    pub notification_targets: Vec<NotificationTarget>,

    #[serde(default)]
    pub post_deploy_actions: Vec<PostDeployAction>,
}

impl BuildContext {
    /// Parse a build context from YAML; JSON documents are valid YAML too
    pub fn from_yaml(yaml: &str) -> PipesmithResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }
}

/// Project being built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,

    /// Branch the project builds and deploys from
    pub branch: String,
}

/// The build record this pipeline belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub id: String,

    #[serde(default)]
    pub number: u64,

    /// What started the build (push, pull_request, close_pull_request, ...)
    pub trigger: String,
}

/// Where the application is deployed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    pub id: String,

    /// Target platform; also the system image name of its deploy tool
    pub kind: String,

    pub name: String,

    /// Extra parameters handed to the deploy tool
    #[serde(default)]
    pub params: Params,
}

/// Container image produced by the build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationImage {
    pub repository: String,

    /// One docker-image resource is registered per tag
    pub tags: Vec<String>,

    /// Dockerfile path relative to the repository root
    #[serde(default)]
    pub dockerfile: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

/// Image and commands used to build and test the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildContainer {
    pub repository: String,

    #[serde(default)]
    pub tag: Option<String>,

    #[serde(default)]
    pub build: Vec<String>,

    #[serde(default)]
    pub test: Vec<String>,

    /// Run build and test tasks privileged (e.g. docker-in-docker)
    #[serde(default)]
    pub privileged: bool,
}

/// An endpoint informed of build status transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTarget {
    pub id: String,

    /// Notifier kind (slack, github, webhook)
    #[serde(rename = "type")]
    pub kind: String,

    /// Kind-specific address: webhook URL, repository slug, ...
    pub location: String,

    #[serde(default)]
    pub token: Option<String>,
}

/// Work scheduled after a successful deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PostDeployAction {
    /// Drive traffic at the deployed application
    LoadTest {
        url: String,

        #[serde(default = "default_duration")]
        duration_seconds: u64,

        #[serde(default = "default_users")]
        virtual_users: u32,
    },
}

fn default_duration() -> u64 {
    60
}

fn default_users() -> u32 {
    10
}
