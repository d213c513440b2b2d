// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Notifiers
//!
//! Each notification target is reached through a pipeline resource. A
//! notifier knows how to configure that resource (`source_properties`) and
//! what to `put` to it for a status transition (`status_params`).

mod github;
mod slack;
mod webhook;

pub use github::GitHubStatusNotifier;
pub use slack::SlackNotifier;
pub use webhook::WebhookNotifier;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::context::{BuildContext, NotificationTarget};
use crate::errors::{PipesmithError, PipesmithResult};
use crate::pipeline::Params;

/// Notifier implementations known to pipesmith
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifierKind {
    Slack,
    GitHub,
    Webhook,
}

impl fmt::Display for NotifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slack => write!(f, "slack"),
            Self::GitHub => write!(f, "github"),
            Self::Webhook => write!(f, "webhook"),
        }
    }
}

impl FromStr for NotifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "slack" => Ok(Self::Slack),
            "github" => Ok(Self::GitHub),
            "webhook" => Ok(Self::Webhook),
            _ => Err(format!("Unknown notifier: {}", s)),
        }
    }
}

/// Status transitions reported to notification targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Started,
    Succeeded,
    Failed,
    Completed,
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// What happened, to which step, in which build
#[derive(Debug, Clone, Copy)]
pub struct StatusEvent<'a> {
    /// Step the status refers to (`Pipeline` for the terminal event)
    pub step: &'a str,
    pub status: BuildStatus,
    pub context: &'a BuildContext,
    /// Public page describing the build
    pub status_url: &'a str,
}

impl StatusEvent<'_> {
    /// One-line human readable summary
    pub fn summary(&self) -> String {
        format!(
            "{} #{} {} {} ({} @ {})",
            self.context.project.name,
            self.context.build.number,
            self.step,
            self.status,
            self.context.commit.repo_branch,
            self.context.commit.short_sha()
        )
    }
}

/// A notification provider
pub trait Notifier: Send + Sync {
    fn kind(&self) -> NotifierKind;

    /// System image name of the resource type that talks to the provider
    fn resource_image(&self) -> &'static str;

    /// `source` of the resource addressing `target`
    fn source_properties(&self, target: &NotificationTarget) -> Params;

    /// `params` of the put announcing `event`
    fn status_params(&self, event: &StatusEvent<'_>) -> Params;
}

/// A notification target paired with its notifier
#[derive(Clone, Copy)]
pub struct ResolvedTarget<'a> {
    pub target: &'a NotificationTarget,
    pub notifier: &'a dyn Notifier,
}

impl ResolvedTarget<'_> {
    /// Name of the resource the pipeline puts notifications to
    pub fn resource_name(&self) -> String {
        format!("notify-{}", self.target.id)
    }

    /// Name of the resource type backing [`Self::resource_name`]
    pub fn resource_type_name(&self) -> String {
        format!("{}-notification-{}", self.notifier.kind(), self.target.id)
    }
}

impl fmt::Debug for ResolvedTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedTarget")
            .field("target", &self.target.id)
            .field("kind", &self.notifier.kind())
            .finish()
    }
}

/// Maps notifier kinds to implementations
pub struct NotifierRegistry {
    notifiers: HashMap<NotifierKind, Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            notifiers: HashMap::new(),
        }
    }

    /// Registry with every built-in notifier
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SlackNotifier));
        registry.register(Box::new(GitHubStatusNotifier));
        registry.register(Box::new(WebhookNotifier));
        registry
    }

    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.insert(notifier.kind(), notifier);
    }

    pub fn get(&self, kind: NotifierKind) -> Option<&dyn Notifier> {
        self.notifiers.get(&kind).map(|n| n.as_ref())
    }

    /// Pair every target with its notifier
    ///
    /// Fails on the first target whose type is unknown or unregistered, so a
    /// pipeline is never built with a notifier silently missing.
    pub fn resolve<'a>(
        &'a self,
        targets: &'a [NotificationTarget],
    ) -> PipesmithResult<Vec<ResolvedTarget<'a>>> {
        targets
            .iter()
            .map(|target| {
                let notifier = target
                    .kind
                    .parse::<NotifierKind>()
                    .ok()
                    .and_then(|kind| self.get(kind))
                    .ok_or_else(|| PipesmithError::UnknownNotifierType {
                        kind: target.kind.clone(),
                        target: target.id.clone(),
                    })?;
                Ok(ResolvedTarget { target, notifier })
            })
            .collect()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Insert `key: value` when the value is present
pub(crate) fn insert_some(params: &mut Params, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        params.insert(key.to_string(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures;

    fn target(id: &str, kind: &str) -> NotificationTarget {
        NotificationTarget {
            id: id.into(),
            kind: kind.into(),
            location: "https://hooks.example/x".into(),
            token: None,
        }
    }

    #[test]
    fn test_resolve_known_targets() {
        let registry = NotifierRegistry::with_defaults();
        let targets = vec![target("a", "slack"), target("b", "GitHub"), target("c", "webhook")];
        let resolved = registry.resolve(&targets).unwrap();

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[1].notifier.kind(), NotifierKind::GitHub);
        assert_eq!(resolved[0].resource_name(), "notify-a");
        assert_eq!(resolved[0].resource_type_name(), "slack-notification-a");
    }

    #[test]
    fn test_unknown_type_fails_fast() {
        let registry = NotifierRegistry::with_defaults();
        let targets = vec![target("a", "slack"), target("b", "pager")];
        let err = registry.resolve(&targets).unwrap_err();
        assert!(matches!(
            err,
            PipesmithError::UnknownNotifierType { ref kind, ref target } if kind == "pager" && target == "b"
        ));
    }

    #[test]
    fn test_unregistered_kind_fails() {
        let registry = NotifierRegistry::new();
        let targets = vec![target("a", "slack")];
        assert!(matches!(
            registry.resolve(&targets),
            Err(PipesmithError::UnknownNotifierType { .. })
        ));
    }

    #[test]
    fn test_summary_mentions_step_and_status() {
        let ctx = fixtures::context("push", &["latest"]);
        let event = StatusEvent {
            step: "Build",
            status: BuildStatus::Failed,
            context: &ctx,
            status_url: "https://ci.example/b/7",
        };
        assert_eq!(event.summary(), "acme-app #7 Build failed (main @ 0123456)");
    }
}
