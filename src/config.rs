// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipesmith contributors

//! Service configuration
//!
//! Loaded from `.pipesmith.yaml` (or `.pipesmith.toml`) in the working
//! directory, falling back to the user's config directory. Every section is
//! optional.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{PipesmithError, PipesmithResult};
use crate::images::{ImageRef, ImageTable};

/// Configuration file names looked up in the working directory
pub const CONFIG_FILES: &[&str] = &[".pipesmith.yaml", ".pipesmith.toml"];

/// Configuration from .pipesmith.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Config version
    #[serde(default = "default_version")]
    pub version: String,

    /// Public build status pages
    #[serde(default)]
    pub status: StatusConfig,

    /// System image overrides, keyed by system image name
    #[serde(default)]
    pub images: HashMap<String, ImageRef>,

    /// Webhook verification settings
    #[serde(default)]
    pub webhook: WebhookConfig,
}

fn default_version() -> String {
    "1".to_string()
}

/// Public status page settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Prefix of every build status URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Webhook verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Environment variable holding the shared webhook secret
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

fn default_secret_env() -> String {
    "PIPESMITH_WEBHOOK_SECRET".to_string()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret_env: default_secret_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            status: StatusConfig::default(),
            images: HashMap::new(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Otherwise the working directory and then
    /// the platform config directory are searched, and defaults are used
    /// when nothing is found.
    pub fn load(explicit: Option<&Path>) -> PipesmithResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::discover() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    fn discover() -> Option<PathBuf> {
        let local = CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file());
        if local.is_some() {
            return local;
        }

        let dirs = directories::ProjectDirs::from("dev", "pipesmith", "pipesmith")?;
        let global = dirs.config_dir().join("config.yaml");
        global.is_file().then_some(global)
    }

    /// Load from file; the extension picks TOML or YAML
    pub fn from_file(path: &Path) -> PipesmithResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PipesmithError::file_read(path, e))?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> PipesmithResult<()> {
        let base = &self.status.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(PipesmithError::InvalidConfig {
                message: format!("status.base_url '{}' is not an http(s) URL", base),
                help: Some("Use the public address of the CI dashboard, e.g. https://ci.example.com".into()),
            });
        }
        if self.webhook.secret_env.is_empty() {
            return Err(PipesmithError::InvalidConfig {
                message: "webhook.secret_env is empty".into(),
                help: None,
            });
        }
        Ok(())
    }

    /// Built-in system images overlaid with configured ones
    pub fn image_table(&self) -> ImageTable {
        let mut table = ImageTable::with_defaults();
        table.extend(self.images.clone());
        table
    }

    /// Public status URL of a build
    pub fn status_url(&self, project_id: &str, build_id: &str) -> String {
        format!(
            "{}/projects/{}/builds/{}",
            self.status.base_url.trim_end_matches('/'),
            project_id,
            build_id
        )
    }

    /// Shared webhook secret from the configured environment variable
    pub fn webhook_secret(&self) -> Option<String> {
        std::env::var(&self.webhook.secret_env)
            .ok()
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::{names, ImageResolver};
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.status_url("p", "b"), "http://localhost:8080/projects/p/builds/b");
        assert_eq!(config.webhook.secret_env, "PIPESMITH_WEBHOOK_SECRET");
    }

    #[test]
    fn test_load_yaml_with_image_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pipesmith.yaml");
        std::fs::write(
            &path,
            r#"
status:
  base_url: https://ci.example.com/
images:
  git:
    repository: mirror.local/git
    tag: "2.45"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(
            config.status_url("acme", "42"),
            "https://ci.example.com/projects/acme/builds/42"
        );

        let table = config.image_table();
        assert_eq!(table.resolve(names::GIT), ImageRef::new("mirror.local/git", Some("2.45")));
        assert_eq!(
            table.resolve(names::EVENT_REPORTER).repository,
            "pipesmith/event-reporter"
        );
    }

    #[test]
    fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pipesmith.toml");
        std::fs::write(
            &path,
            "[webhook]\nsecret_env = \"HOOK_SECRET\"\n\n[images.kubernetes]\nrepository = \"kubectl\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.webhook.secret_env, "HOOK_SECRET");
        assert_eq!(config.images["kubernetes"].repository, "kubectl");
        assert_eq!(config.status.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "status:\n  base_url: ftp://ci\n").unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(PipesmithError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = Config::load(Some(Path::new("/nonexistent/pipesmith.yaml")));
        assert!(matches!(result, Err(PipesmithError::FileNotFound { .. })));
    }
}
