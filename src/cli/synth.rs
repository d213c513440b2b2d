// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Synth command - build and render a pipeline

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};

use crate::errors::PipesmithError;
use crate::pipeline::{render, synthesize, PipelineValidator, RenderFormat};
use crate::utils::{eprint_error, eprint_warning};

/// Run the synth command
pub async fn run(
    context_path: PathBuf,
    format: RenderFormat,
    output: Option<PathBuf>,
    status_url: Option<String>,
    config: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let config = super::load_config(config)?;
    let ctx = super::load_context(&context_path).await?;
    let images = config.image_table();
    let status_url =
        status_url.unwrap_or_else(|| config.status_url(&ctx.project.id, &ctx.build.id));

    let pipeline = synthesize(&ctx, &images, &status_url)?;

    let validation = PipelineValidator::validate(&pipeline);
    for warning in &validation.warnings {
        eprint_warning(warning);
    }
    if !validation.is_valid() {
        for error in &validation.errors {
            eprint_error(error);
        }
        return Err(PipesmithError::InvalidPipeline {
            reason: format!("{} validation error(s)", validation.errors.len()),
            help: None,
        }
        .into());
    }

    let document = render(&pipeline, format)?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, document)
                .await
                .map_err(|e| PipesmithError::FileWriteError {
                    path: path.clone(),
                    error: e.to_string(),
                })?;
            println!(
                "{} Wrote {} pipeline to {}",
                "✓".green(),
                format,
                path.display()
            );
        }
        None => print!("{}", document),
    }

    if verbose {
        eprintln!();
        eprintln!("{}:", "Pipeline summary".bold());
        eprintln!("  Trigger: {}", ctx.build.trigger);
        eprintln!("  Resources: {}", pipeline.resources.len());
        if validation.has_warnings() {
            eprintln!("  Warnings: {}", validation.warnings.len());
        }
        for job in &pipeline.jobs {
            eprintln!("  Job {}: {} steps", job.name, job.plan.len());
        }
    }

    Ok(())
}
