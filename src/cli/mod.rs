// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for pipesmith.

pub mod commit;
pub mod graph;
pub mod synth;
pub mod verify;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::context::BuildContext;
use crate::pipeline::RenderFormat;
use crate::vcs::{EventType, Provider};

/// CI/CD pipeline synthesizer
///
/// Turn VCS webhook events into instrumented, declarative build pipelines.
#[derive(Parser, Debug)]
#[clap(
    name = "pipesmith",
    version,
    about = "Synthesize instrumented CI/CD pipelines from VCS events",
    long_about = None,
    after_help = "Examples:\n\
        pipesmith commit -p github -e push push.json      Normalize a webhook payload\n\
        pipesmith verify -p github -e push push.json \\\n\
            --signature sha256=...                        Check a webhook before trusting it\n\
        pipesmith synth build.yaml                        Print the pipeline for a build\n\
        pipesmith graph build.yaml                        Show the pipeline's jobs and steps\n\n\
        See 'pipesmith <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Configuration file (default: .pipesmith.yaml)
    #[clap(long, global = true, env = "PIPESMITH_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Normalize a webhook payload into a canonical commit
    Commit {
        #[clap(flatten)]
        webhook: WebhookArgs,

        /// Access token embedded in clone URLs
        #[clap(long, env = "PIPESMITH_VCS_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Check a webhook payload's completeness, signature and branch
    Verify {
        #[clap(flatten)]
        webhook: WebhookArgs,

        /// Signature header sent with the payload (e.g. sha256=...)
        #[clap(short, long)]
        signature: Option<String>,

        /// Shared secret (default: the variable named by webhook.secret_env)
        #[clap(long, hide_env_values = true)]
        secret: Option<String>,

        /// Branch the project builds from
        #[clap(short, long)]
        branch: Option<String>,
    },

    /// Synthesize the pipeline for a build context
    Synth {
        /// Build context file (YAML or JSON)
        context: PathBuf,

        /// Output format
        #[clap(short, long, default_value = "yaml")]
        format: RenderFormat,

        /// Write to a file instead of stdout
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// Status URL override (default: derived from status.base_url)
        #[clap(long)]
        status_url: Option<String>,
    },

    /// Show a synthesized pipeline as a graph
    Graph {
        /// Build context file (YAML or JSON)
        context: PathBuf,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,
    },
}

/// Identifies a webhook payload
#[derive(clap::Args, Debug, Clone)]
pub struct WebhookArgs {
    /// VCS provider (github, bitbucket)
    #[clap(short, long)]
    pub provider: Provider,

    /// Event type (push, pull_request, repo:push, pullrequest:created, ...)
    #[clap(short, long)]
    pub event: String,

    /// Payload file (JSON)
    pub payload: PathBuf,
}

impl WebhookArgs {
    pub fn event_type(&self) -> miette::Result<EventType> {
        Ok(EventType::parse(self.provider, &self.event)?)
    }

    /// Raw payload bytes
    pub async fn read_payload(&self) -> miette::Result<Vec<u8>> {
        read_bytes(&self.payload).await
    }
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}

pub(crate) async fn read_bytes(path: &Path) -> miette::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| crate::errors::PipesmithError::file_read(path, e).into())
}

pub(crate) async fn load_context(path: &Path) -> miette::Result<BuildContext> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| crate::errors::PipesmithError::file_read(path, e))?;
    Ok(BuildContext::from_yaml(&content)?)
}

pub(crate) fn load_config(path: Option<&Path>) -> miette::Result<Config> {
    Ok(Config::load(path)?)
}
