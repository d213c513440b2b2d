// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! # pipesmith - CI/CD pipeline synthesizer
//!
//! `pipesmith` turns VCS webhook events into declarative pipelines for a
//! Concourse-style execution engine, instrumented so every step reports its
//! status to the configured notification targets.
//!
//! ## Features
//!
//! - **Canonical commits** - GitHub and Bitbucket payloads normalized into one shape
//! - **Webhook checks** - payload completeness, HMAC signatures, target branch
//! - **Pipeline strategies** - branch builds, pull request previews, preview teardown
//! - **Instrumentation** - start markers, success/failure/ensure hooks, notifier fan-out
//!
//! ## Quick Start
//!
//! ```bash
//! # Normalize a webhook payload
//! pipesmith commit --provider github --event push push.json
//!
//! # Synthesize the pipeline for a build
//! pipesmith synth build.yaml > pipeline.yaml
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod images;
pub mod notifiers;
pub mod pipeline;
pub mod utils;
pub mod vcs;

// Re-export commonly used types
pub use config::Config;
pub use context::BuildContext;
pub use errors::{PipesmithError, PipesmithResult};
pub use images::{ImageResolver, ImageTable};
pub use pipeline::{synthesize, Pipeline, PipelineKind};
pub use vcs::{Commit, EventType, Provider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
