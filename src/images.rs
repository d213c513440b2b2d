// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! System image lookup
//!
//! Pipelines reference helper images (event reporter, git, deploy tools,
//! notification resource types) by a short system name. The lookup table is
//! read-only and handed to the builder and rewriter explicitly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::pipeline::Params;

/// Well-known system image names
pub mod names {
    /// Reports task events to the control plane
    pub const EVENT_REPORTER: &str = "event-reporter";
    /// Merges pull requests onto their base branch
    pub const GIT: &str = "git";
    /// Runs post-deploy load tests
    pub const LOAD_TEST: &str = "load-test";
    pub const SLACK_NOTIFICATION: &str = "slack-notification";
    pub const GITHUB_STATUS: &str = "github-status";
    pub const WEBHOOK_NOTIFICATION: &str = "webhook-notification";
}

/// Docker repository and optional tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub repository: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: Option<&str>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.map(String::from),
        }
    }

    /// Parse `repository[:tag]`; a colon inside a registry host:port is kept
    pub fn parse(reference: &str) -> Self {
        match reference.rsplit_once(':') {
            Some((repository, tag)) if !tag.contains('/') => Self::new(repository, Some(tag)),
            _ => Self::new(reference, None),
        }
    }

    /// `source` block for a docker-image resource or task image
    pub fn to_source(&self) -> Params {
        let mut source = Params::new();
        source.insert("repository".into(), self.repository.clone().into());
        if let Some(tag) = &self.tag {
            source.insert("tag".into(), tag.clone().into());
        }
        source
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}:{}", self.repository, tag),
            None => write!(f, "{}", self.repository),
        }
    }
}

/// Read-only lookup from system image name to image reference
pub trait ImageResolver {
    fn resolve(&self, name: &str) -> ImageRef;
}

/// Table-backed resolver
///
/// Names missing from the table resolve to a repository of the same name.
#[derive(Debug, Clone, Default)]
pub struct ImageTable {
    images: HashMap<String, ImageRef>,
}

impl ImageTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in system images
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        for (name, reference) in [
            (names::EVENT_REPORTER, "pipesmith/event-reporter:latest"),
            (names::GIT, "alpine/git:latest"),
            (names::LOAD_TEST, "grafana/k6:latest"),
            (names::SLACK_NOTIFICATION, "cfcommunity/slack-notification-resource:latest"),
            (names::GITHUB_STATUS, "dpb587/github-status-resource:master"),
            (names::WEBHOOK_NOTIFICATION, "jgriff/http-resource:latest"),
            ("kubernetes", "bitnami/kubectl:latest"),
            ("helm", "alpine/helm:latest"),
        ] {
            table.insert(name, ImageRef::parse(reference));
        }
        table
    }

    pub fn insert(&mut self, name: impl Into<String>, image: ImageRef) {
        self.images.insert(name.into(), image);
    }

    /// Overlay entries from another table
    pub fn extend(&mut self, other: impl IntoIterator<Item = (String, ImageRef)>) {
        self.images.extend(other);
    }
}

impl ImageResolver for ImageTable {
    fn resolve(&self, name: &str) -> ImageRef {
        match self.images.get(name) {
            Some(image) => image.clone(),
            None => {
                tracing::debug!(name, "no system image registered, using name as repository");
                ImageRef::new(name, None)
            }
        }
    }
}
