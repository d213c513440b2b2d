// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Graph command - visualize a synthesized pipeline

use miette::Result;
use std::path::{Path, PathBuf};

use super::GraphFormat;
use crate::pipeline::{synthesize, JobGraph};

/// Run the graph command
pub async fn run(
    context_path: PathBuf,
    format: GraphFormat,
    config: Option<&Path>,
    _verbose: bool,
) -> Result<()> {
    let config = super::load_config(config)?;
    let ctx = super::load_context(&context_path).await?;
    let status_url = config.status_url(&ctx.project.id, &ctx.build.id);
    let pipeline = synthesize(&ctx, &config.image_table(), &status_url)?;

    let graph = JobGraph::build(&pipeline)?;

    let output = match format {
        GraphFormat::Text => graph.to_text(&pipeline)?,
        GraphFormat::Dot => graph.to_dot(),
        GraphFormat::Mermaid => graph.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}
