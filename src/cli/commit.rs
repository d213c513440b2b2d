// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Commit command - normalize a webhook payload

use miette::{IntoDiagnostic, Result};

use super::WebhookArgs;
use crate::vcs;

/// Run the commit command
pub async fn run(webhook: WebhookArgs, token: Option<String>, verbose: bool) -> Result<()> {
    let event = webhook.event_type()?;
    let body = webhook.read_payload().await?;
    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(crate::errors::PipesmithError::from)?;

    if verbose {
        eprintln!("Extracting {} commit from {}", event, webhook.payload.display());
    }

    let commit = vcs::extract(event, &payload, token.as_deref())?;
    let json = serde_json::to_string_pretty(&commit).into_diagnostic()?;
    println!("{}", json);

    Ok(())
}
