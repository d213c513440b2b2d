// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Pipeline serialization

use std::fmt;
use std::str::FromStr;

use crate::errors::PipesmithResult;
use crate::pipeline::Pipeline;

/// Output document format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderFormat {
    #[default]
    Yaml,
    Json,
}

impl FromStr for RenderFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Render `pipeline` as a document the execution engine accepts
pub fn render(pipeline: &Pipeline, format: RenderFormat) -> PipesmithResult<String> {
    match format {
        RenderFormat::Yaml => pipeline.to_yaml(),
        RenderFormat::Json => pipeline.to_json(),
    }
}
