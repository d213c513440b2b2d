// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Pipeline synthesis
//!
//! Builds the pipeline for a build context, instruments it with status
//! reporting, and renders it for the execution engine.

pub mod builder;
mod dag;
mod definition;
mod render;
mod rewriter;
pub mod strategy;
mod validation;

pub use dag::JobGraph;
pub use definition::*;
pub use render::{render, RenderFormat};
pub use rewriter::{RewriteSummary, Rewriter};
pub use strategy::PipelineKind;
pub use validation::{PipelineValidator, ValidationResult};

use crate::context::BuildContext;
use crate::errors::PipesmithResult;
use crate::images::ImageResolver;
use crate::notifiers::NotifierRegistry;

/// Build and instrument the pipeline for `ctx` with the built-in notifiers
pub fn synthesize(
    ctx: &BuildContext,
    images: &dyn ImageResolver,
    status_url: &str,
) -> PipesmithResult<Pipeline> {
    synthesize_with(&NotifierRegistry::with_defaults(), ctx, images, status_url)
}

/// Build and instrument the pipeline for `ctx`
///
/// Notification targets are resolved before anything is built, so an
/// unknown target type fails the whole synthesis.
pub fn synthesize_with(
    registry: &NotifierRegistry,
    ctx: &BuildContext,
    images: &dyn ImageResolver,
    status_url: &str,
) -> PipesmithResult<Pipeline> {
    let kind = PipelineKind::select(&ctx.build.trigger)?;
    let targets = registry.resolve(&ctx.notification_targets)?;

    let mut pipeline = kind.build(ctx, images)?;
    Rewriter::new(ctx, &targets, status_url, images).rewrite(&mut pipeline);
    Ok(pipeline)
}
