// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! pipesmith - CI/CD pipeline synthesizer
//!
//! Turn VCS webhook events into instrumented, declarative build pipelines.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pipesmith::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipesmith=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let config = cli.config.as_deref();

    // Dispatch to command handlers
    match cli.command {
        Commands::Commit { webhook, token } => {
            pipesmith::cli::commit::run(webhook, token, cli.verbose).await
        }
        Commands::Verify {
            webhook,
            signature,
            secret,
            branch,
        } => {
            pipesmith::cli::verify::run(webhook, signature, secret, branch, config, cli.verbose)
                .await
        }
        Commands::Synth {
            context,
            format,
            output,
            status_url,
        } => {
            pipesmith::cli::synth::run(context, format, output, status_url, config, cli.verbose)
                .await
        }
        Commands::Graph { context, format } => {
            pipesmith::cli::graph::run(context, format, config, cli.verbose).await
        }
    }
}
