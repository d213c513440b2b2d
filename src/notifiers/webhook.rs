// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Generic HTTP webhook notifier

use super::{Notifier, NotifierKind, StatusEvent};
use crate::context::NotificationTarget;
use crate::images::names;
use crate::pipeline::Params;

/// POSTs a JSON status document to an arbitrary endpoint
pub struct WebhookNotifier;

impl Notifier for WebhookNotifier {
    fn kind(&self) -> NotifierKind {
        NotifierKind::Webhook
    }

    fn resource_image(&self) -> &'static str {
        names::WEBHOOK_NOTIFICATION
    }

    fn source_properties(&self, target: &NotificationTarget) -> Params {
        let mut source = Params::new();
        source.insert("url".into(), target.location.clone().into());
        source.insert("method".into(), "POST".into());
        if let Some(token) = target.token.as_deref().filter(|t| !t.is_empty()) {
            source.insert(
                "headers".into(),
                serde_json::json!({ "Authorization": format!("Bearer {}", token) }),
            );
        }
        source
    }

    fn status_params(&self, event: &StatusEvent<'_>) -> Params {
        let ctx = event.context;
        let body = serde_json::json!({
            "status": event.status.to_string(),
            "step": event.step,
            "project": ctx.project.id,
            "build": ctx.build.id,
            "commit": ctx.commit.commit_sha,
            "branch": ctx.commit.repo_branch,
            "url": event.status_url,
        });

        let mut params = Params::new();
        params.insert("body".into(), body);
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures;
    use crate::notifiers::BuildStatus;

    #[test]
    fn test_bearer_header_only_with_token() {
        let mut target = NotificationTarget {
            id: "w".into(),
            kind: "webhook".into(),
            location: "https://hooks.example/ci".into(),
            token: None,
        };
        assert!(!WebhookNotifier.source_properties(&target).contains_key("headers"));

        target.token = Some("s3cret".into());
        let source = WebhookNotifier.source_properties(&target);
        assert_eq!(source["headers"]["Authorization"], "Bearer s3cret");
    }

    #[test]
    fn test_body_describes_build() {
        let ctx = fixtures::context("push", &[]);
        let params = WebhookNotifier.status_params(&StatusEvent {
            step: "Pipeline",
            status: BuildStatus::Completed,
            context: &ctx,
            status_url: "https://ci.example/b/7",
        });
        assert_eq!(params["body"]["status"], "completed");
        assert_eq!(params["body"]["build"], "build-7");
    }
}
