// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Slack incoming-webhook notifier

use super::{insert_some, BuildStatus, Notifier, NotifierKind, StatusEvent};
use crate::context::NotificationTarget;
use crate::images::names;
use crate::pipeline::Params;

/// Posts build status messages to a Slack incoming webhook
pub struct SlackNotifier;

impl SlackNotifier {
    fn emoji(status: BuildStatus) -> &'static str {
        match status {
            BuildStatus::Started => ":hourglass_flowing_sand:",
            BuildStatus::Succeeded | BuildStatus::Completed => ":white_check_mark:",
            BuildStatus::Failed => ":x:",
        }
    }
}

impl Notifier for SlackNotifier {
    fn kind(&self) -> NotifierKind {
        NotifierKind::Slack
    }

    fn resource_image(&self) -> &'static str {
        names::SLACK_NOTIFICATION
    }

    fn source_properties(&self, target: &NotificationTarget) -> Params {
        let mut source = Params::new();
        source.insert("url".into(), target.location.clone().into());
        source
    }

    fn status_params(&self, event: &StatusEvent<'_>) -> Params {
        let mut params = Params::new();
        params.insert(
            "text".into(),
            format!(
                "{} {} <{}|details>",
                Self::emoji(event.status),
                event.summary(),
                event.status_url
            )
            .into(),
        );
        params.insert("username".into(), "pipesmith".into());
        insert_some(
            &mut params,
            "icon_url",
            Some(event.context.commit.avatar_url.as_str()),
        );
        params
    }
}
