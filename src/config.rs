// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `PROCBOARD__SECTION__KEY` environment variables. Secrets are only ever
//! read from the environment.

use crate::error::DashboardError;
use crate::types::RepoCoordinate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable holding the hosted-file API token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment variable holding the KPI suggestion API key
pub const SUGGEST_KEY_ENV: &str = "OPENAI_API_KEY";

/// Upper bound for the auto-refresh interval, in seconds
pub const MAX_AUTO_REFRESH_SECS: u64 = 600;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Repository that hosts the diagram and KPI files
    pub repo: RepoConfig,
    /// Default source selection and refresh behaviour
    pub dashboard: DashboardConfig,
    /// KPI suggestion endpoint
    pub suggest: SuggestConfig,
}

/// Repository and hosted-file API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Repository owner (user or organisation)
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Branch to read from
    pub branch: String,
    /// Base URL of the contents API
    pub api_base: String,
    /// Base URL for raw file downloads
    pub raw_base: String,
    /// Send the bearer token from `GITHUB_TOKEN` (private repositories)
    pub use_token: bool,
    /// Folders offered when the root listing fails
    pub default_folders: Vec<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Bearer token, from the environment only
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            owner: "udexvinda".to_string(),
            name: "process-flow-dashboard".to_string(),
            branch: "main".to_string(),
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            use_token: false,
            default_folders: vec!["hr".into(), "finance".into(), "claims".into()],
            timeout_secs: 20,
            token: None,
        }
    }
}

impl RepoConfig {
    /// Repository coordinate for the fetcher
    #[must_use]
    pub fn coordinate(&self) -> RepoCoordinate {
        RepoCoordinate::new(&self.owner, &self.name, &self.branch)
    }

    /// The token to send, if token use is enabled and one is present
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        if self.use_token {
            self.token.as_deref().filter(|t| !t.is_empty())
        } else {
            None
        }
    }
}

/// Source selection and refresh defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Folder holding the diagram
    pub folder: String,
    /// Diagram file name; first `.bpmn` in the folder when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram: Option<String>,
    /// KPI file name; `<diagram>_kpis.csv` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpi_file: Option<String>,
    /// Auto-refresh interval in seconds (0 = off)
    pub auto_refresh_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            folder: "hr".to_string(),
            diagram: None,
            kpi_file: None,
            auto_refresh_secs: 0,
        }
    }
}

/// OpenAI-compatible endpoint used by `suggest`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestConfig {
    /// Base URL, up to and including the version segment
    pub api_base: String,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// API key, from the environment only
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            api_key: None,
        }
    }
}

/// Default config file location (`<config dir>/procboard/config.toml`)
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "hyperpolymath", "procboard")
        .map(|d| d.config_dir().join("config.toml"))
}

/// Load configuration from disk and environment, falling back to defaults.
///
/// An explicit path must exist; the default path is optional.
pub fn load(explicit: Option<&Path>) -> Result<Config, DashboardError> {
    load_with(explicit, environment())
}

/// `PROCBOARD__SECTION__KEY` overrides; list settings are comma-separated
fn environment() -> config::Environment {
    config::Environment::with_prefix("PROCBOARD")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("repo.default_folders")
}

fn load_with(explicit: Option<&Path>, env: config::Environment) -> Result<Config, DashboardError> {
    let mut builder = config::Config::builder();

    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(DashboardError::Config(format!(
                    "missing configuration file: {}",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "Loading configuration from explicit path");
            builder = builder.add_source(config::File::from(path).required(true));
        }
        None => {
            if let Some(path) = default_path() {
                debug!(path = %path.display(), "Checking default configuration path");
                builder = builder.add_source(config::File::from(path).required(false));
            }
        }
    }

    builder = builder.add_source(env);

    let mut cfg: Config = builder
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| DashboardError::Config(e.to_string()))?;

    cfg.repo.token = std::env::var(TOKEN_ENV).ok();
    cfg.suggest.api_key = std::env::var(SUGGEST_KEY_ENV).ok();
    cfg.dashboard.auto_refresh_secs = cfg.dashboard.auto_refresh_secs.min(MAX_AUTO_REFRESH_SECS);

    Ok(cfg)
}

impl Config {
    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, DashboardError> {
        toml::to_string_pretty(self).map_err(|e| DashboardError::Config(e.to_string()))
    }

    /// Look up a single dotted key such as `repo.branch`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let value = serde_json::to_value(self).ok()?;
        let found = key
            .split('.')
            .try_fold(&value, |v, part| v.get(part))?;
        Some(match found {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        })
    }
}
