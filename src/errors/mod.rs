// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Error types
//!
//! Every failure the synthesis engine can report, rendered as `miette`
//! diagnostics so the CLI can print codes and hints.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipesmith operations
pub type PipesmithResult<T> = Result<T, PipesmithError>;

/// Main error type for pipesmith
#[derive(Error, Debug, Diagnostic)]
pub enum PipesmithError {
    // ─────────────────────────────────────────────────────────────────────────
    // Webhook Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Unsupported {provider} event type '{event}'")]
    #[diagnostic(
        code(pipesmith::unsupported_event_type),
        help("GitHub: commit, push, pull_request. Bitbucket: commit, repo:push, pullrequest:created, pullrequest:updated, pullrequest:rejected")
    )]
    UnsupportedEventType { provider: String, event: String },

    #[error("Invalid '{event}' payload: {reason}")]
    #[diagnostic(
        code(pipesmith::invalid_payload),
        help("The payload is missing a field the commit extractor depends on")
    )]
    InvalidPayload { event: String, reason: String },

    #[error("Webhook signature check failed for {provider}")]
    #[diagnostic(
        code(pipesmith::invalid_signature),
        help("Check that the shared secret matches the one configured on the provider")
    )]
    InvalidSignature { provider: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Synthesis Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Unsupported pipeline type '{kind}'")]
    #[diagnostic(
        code(pipesmith::unsupported_pipeline_type),
        help("Known triggers: push, manual, build_repo_head, pull_request, pr_opened, pr_synchronize, close_pull_request")
    )]
    UnsupportedPipelineType { kind: String },

    #[error("Unknown notifier type '{kind}' for notification target '{target}'")]
    #[diagnostic(
        code(pipesmith::unknown_notifier_type),
        help("Available notifiers: slack, github, webhook")
    )]
    UnknownNotifierType { kind: String, target: String },

    #[error("Invalid pipeline: {reason}")]
    #[diagnostic(code(pipesmith::invalid_pipeline))]
    InvalidPipeline {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Job '{job}' has a circular 'passed' dependency")]
    #[diagnostic(
        code(pipesmith::circular_dependency),
        help("Review the 'passed' constraints on your get steps to remove the cycle")
    )]
    CircularDependency { job: String, jobs: Vec<String> },

    #[error("Job '{job}' requires unknown job '{dependency}' to have passed")]
    #[diagnostic(
        code(pipesmith::unknown_dependency),
        help("Check that '{dependency}' is defined in the pipeline")
    )]
    UnknownDependency { job: String, dependency: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(pipesmith::invalid_config))]
    InvalidConfig {
        message: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("File not found: {path}")]
    #[diagnostic(code(pipesmith::file_not_found))]
    FileNotFound {
        path: PathBuf,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(pipesmith::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(pipesmith::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(pipesmith::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(pipesmith::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(pipesmith::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(pipesmith::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for PipesmithError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for PipesmithError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for PipesmithError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for PipesmithError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl PipesmithError {
    /// Create an invalid payload error for an event
    pub fn invalid_payload(event: impl ToString, reason: impl ToString) -> Self {
        Self::InvalidPayload {
            event: event.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a file read error, mapping a missing file to `FileNotFound`
    pub fn file_read(path: &std::path::Path, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
                help: None,
            }
        } else {
            Self::FileReadError {
                path: path.to_path_buf(),
                error: error.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let err = PipesmithError::file_read(
            std::path::Path::new("nope.yaml"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, PipesmithError::FileNotFound { .. }));
    }
}
