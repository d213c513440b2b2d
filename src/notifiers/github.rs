// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! GitHub commit status notifier

use super::{insert_some, BuildStatus, Notifier, NotifierKind, StatusEvent};
use crate::context::NotificationTarget;
use crate::images::names;
use crate::pipeline::Params;

/// Sets commit statuses on a GitHub repository
///
/// The target's `location` is the `owner/repo` slug and its `token` an
/// access token allowed to write statuses.
pub struct GitHubStatusNotifier;

impl GitHubStatusNotifier {
    fn state(status: BuildStatus) -> &'static str {
        match status {
            BuildStatus::Started => "pending",
            BuildStatus::Succeeded | BuildStatus::Completed => "success",
            BuildStatus::Failed => "failure",
        }
    }
}

impl Notifier for GitHubStatusNotifier {
    fn kind(&self) -> NotifierKind {
        NotifierKind::GitHub
    }

    fn resource_image(&self) -> &'static str {
        names::GITHUB_STATUS
    }

    fn source_properties(&self, target: &NotificationTarget) -> Params {
        let mut source = Params::new();
        source.insert("repository".into(), target.location.clone().into());
        insert_some(&mut source, "access_token", target.token.as_deref());
        source
    }

    fn status_params(&self, event: &StatusEvent<'_>) -> Params {
        let mut params = Params::new();
        params.insert("state".into(), Self::state(event.status).into());
        params.insert(
            "commit".into(),
            event.context.commit.commit_sha.clone().into(),
        );
        params.insert(
            "context".into(),
            format!("pipesmith/{}", event.step.to_lowercase()).into(),
        );
        params.insert("description".into(), event.summary().into());
        params.insert("target_url".into(), event.status_url.into());
        params
    }
}
