// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Verify command - check a webhook before trusting it

use colored::Colorize;
use miette::Result;
use std::path::Path;

use super::WebhookArgs;
use crate::context::Project;
use crate::utils::{print_error, print_success, print_warning};
use crate::vcs;

/// Run the verify command
pub async fn run(
    webhook: WebhookArgs,
    signature: Option<String>,
    secret: Option<String>,
    branch: Option<String>,
    config: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let config = super::load_config(config)?;
    let event = webhook.event_type()?;
    let body = webhook.read_payload().await?;

    println!("{}", format!("Verifying {} webhook...", event).bold());
    println!();

    let mut rejected = false;

    let payload: Option<serde_json::Value> = match serde_json::from_slice(&body) {
        Ok(payload) => {
            print_success("Payload is valid JSON");
            Some(payload)
        }
        Err(e) => {
            print_error(&format!("Payload is not valid JSON: {}", e));
            rejected = true;
            None
        }
    };

    if let Some(payload) = &payload {
        if vcs::is_valid_payload(event, payload) {
            print_success("Payload carries every field the extractor needs");
        } else {
            print_error("Payload is missing required fields");
            rejected = true;
        }
    }

    match (signature, secret.or_else(|| config.webhook_secret())) {
        (Some(header), Some(secret)) => {
            if vcs::is_valid_hmac(webhook.provider, secret.as_bytes(), &body, &header) {
                print_success("Signature matches");
            } else {
                print_error("Signature does not match");
                rejected = true;
            }
        }
        (Some(_), None) => {
            print_error(&format!(
                "No secret to check the signature with (set {} or pass --secret)",
                config.webhook.secret_env
            ));
            rejected = true;
        }
        (None, _) => print_warning("No signature given, skipped"),
    }

    if let (Some(branch), Some(payload)) = (branch, &payload) {
        let project = Project {
            id: String::new(),
            name: String::new(),
            branch: branch.clone(),
        };
        if vcs::is_valid_branch(event, payload, &project) {
            print_success(&format!("Targets branch '{}'", branch));
        } else {
            print_error(&format!("Does not target branch '{}'", branch));
            rejected = true;
        }
    }

    if verbose {
        println!();
        println!("  Provider: {}", webhook.provider);
        println!("  Event: {}", event.tag());
        println!("  Payload: {} bytes", body.len());
    }

    println!();

    if rejected {
        Err(miette::miette!("Webhook rejected"))
    } else {
        println!("{}", "Webhook accepted.".green().bold());
        Ok(())
    }
}
