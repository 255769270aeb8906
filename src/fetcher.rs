// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Hosted-file API client
//!
//! Reads raw files from a repository branch and lists directories through
//! the contents API. One request per call, no retries and no caching.

use crate::config::RepoConfig;
use crate::error::DashboardError;
use crate::types::RepoCoordinate;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("procboard/", env!("CARGO_PKG_VERSION"));
const ACCEPT_JSON: &str = "application/vnd.github+json";

/// Kind of entry in a directory listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Regular file
    File,
    /// Directory
    Dir,
    /// Symbolic link
    Symlink,
    /// Git submodule
    Submodule,
    /// Anything the API adds later
    #[serde(other)]
    Other,
}

/// One entry of a contents API directory listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEntry {
    /// File or directory name
    pub name: String,
    /// Path from the repository root
    pub path: String,
    /// Entry kind
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Direct download URL (files only)
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Client for one repository on the hosted-file API
#[derive(Debug, Clone)]
pub struct HostedFileClient {
    http: Client,
    repo: RepoCoordinate,
    api_base: String,
    raw_base: String,
    token: Option<String>,
}

impl HostedFileClient {
    /// Create a client with explicit endpoints
    pub fn new(
        repo: RepoCoordinate,
        api_base: &str,
        raw_base: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DashboardError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT_JSON));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DashboardError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            repo,
            api_base: api_base.trim_end_matches('/').to_string(),
            raw_base: raw_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Create a client from the `[repo]` settings
    pub fn from_config(cfg: &RepoConfig) -> Result<Self, DashboardError> {
        Self::new(
            cfg.coordinate(),
            &cfg.api_base,
            &cfg.raw_base,
            cfg.bearer().map(str::to_string),
            Duration::from_secs(cfg.timeout_secs.max(1)),
        )
    }

    /// The repository this client reads
    #[must_use]
    pub fn repo(&self) -> &RepoCoordinate {
        &self.repo
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetch the raw bytes of the file at `path` on the configured branch
    pub async fn fetch(&self, path: &str) -> Result<Vec<u8>, DashboardError> {
        let url = self.repo.raw_url(&self.raw_base, path);
        debug!(path = path, url = %url, "Fetching file");

        let response = self.authorize(self.http.get(&url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(path = path, status = %status, "File fetch failed");
            return Err(DashboardError::from_status(status, path));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DashboardError::Network(format!("Body read failed for {path}: {e}")))?;

        debug!(path = path, bytes = body.len(), "Fetched file");
        Ok(body.to_vec())
    }

    /// Check whether `path` exists without downloading it
    pub async fn exists(&self, path: &str) -> Result<bool, DashboardError> {
        let url = self.repo.raw_url(&self.raw_base, path);
        let response = self.authorize(self.http.head(&url)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(DashboardError::from_status(status, path)),
        }
    }

    /// List the entries of a directory (`""` for the repository root)
    pub async fn list(&self, path: &str) -> Result<Vec<ContentEntry>, DashboardError> {
        let url = self.repo.contents_url(&self.api_base, path);
        debug!(path = path, url = %url, "Listing directory");

        let response = self
            .authorize(self.http.get(&url))
            .query(&[("ref", self.repo.branch.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let target = if path.is_empty() { "/" } else { path };
            return Err(DashboardError::from_status(status, target));
        }

        response
            .json::<Vec<ContentEntry>>()
            .await
            .map_err(|e| DashboardError::Parse(format!("directory listing for '{path}': {e}")))
    }

    /// Directory names at the repository root, or `defaults` if listing fails
    pub async fn list_folders(&self, defaults: &[String]) -> Vec<String> {
        match self.list("").await {
            Ok(entries) => entries
                .into_iter()
                .filter(|e| e.entry_type == EntryType::Dir)
                .map(|e| e.name)
                .collect(),
            Err(e) => {
                warn!(error = %e, "Root listing failed, using default folders");
                defaults.to_vec()
            }
        }
    }

    /// Names of the `.bpmn` files in `folder`
    pub async fn list_diagrams(&self, folder: &str) -> Result<Vec<String>, DashboardError> {
        let entries = self.list(folder).await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.entry_type == EntryType::File && is_diagram_name(&e.name))
            .map(|e| e.name)
            .collect())
    }
}

/// Whether a file name looks like a BPMN diagram
#[must_use]
pub fn is_diagram_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".bpmn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagram_names() {
        assert!(is_diagram_name("hr_recruitment.bpmn"));
        assert!(is_diagram_name("Claims.BPMN"));
        assert!(!is_diagram_name("hr_recruitment_kpis.csv"));
        assert!(!is_diagram_name("bpmn"));
    }

    #[test]
    fn test_content_entry_deserialize() {
        let json = r#"[
            {"name": "hr", "path": "hr", "type": "dir", "download_url": null},
            {"name": "README.md", "path": "README.md", "type": "file",
             "download_url": "https://raw.example/README.md", "sha": "abc"},
            {"name": "weird", "path": "weird", "type": "portal"}
        ]"#;
        let entries: Vec<ContentEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0].entry_type, EntryType::Dir);
        assert_eq!(entries[1].entry_type, EntryType::File);
        assert_eq!(entries[2].entry_type, EntryType::Other);
        assert!(entries[2].download_url.is_none());
    }

    #[test]
    fn test_client_from_default_config() {
        let client = HostedFileClient::from_config(&RepoConfig::default()).unwrap();
        assert_eq!(client.repo().branch, "main");
    }
}
