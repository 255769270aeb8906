// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error classification shared by the fetcher, parsers and panels

use thiserror::Error;

/// Errors surfaced to the user by the dashboard.
///
/// Panels keep the last error they saw next to their data, so the type is
/// `Clone` and carries rendered messages rather than source errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    /// Connection failure, timeout, unexpected status or unreadable body
    #[error("Network error: {0}")]
    Network(String),

    /// The hosted-file API rejected the credential (401/403)
    #[error("Unauthorized: {0}")]
    Auth(String),

    /// The requested file or folder does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed tabular or XML content
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DashboardError {
    /// Short label used in panel titles and status lines
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Auth(_) => "auth",
            Self::NotFound(_) => "not found",
            Self::Parse(_) => "parse",
            Self::Config(_) => "config",
        }
    }

    /// Classify an HTTP status returned for `target`.
    ///
    /// Only called for non-success statuses.
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode, target: &str) -> Self {
        match status.as_u16() {
            404 => Self::NotFound(target.to_string()),
            401 | 403 => Self::Auth(format!("HTTP {status} for {target}")),
            _ => Self::Network(format!("HTTP {status} for {target}")),
        }
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            let target = err.url().map(|u| u.path().to_string()).unwrap_or_default();
            return Self::from_status(status, &target);
        }
        Self::Network(err.to_string())
    }
}

impl From<csv::Error> for DashboardError {
    fn from(err: csv::Error) -> Self {
        Self::Parse(format!("KPI table: {err}"))
    }
}

impl From<roxmltree::Error> for DashboardError {
    fn from(err: roxmltree::Error) -> Self {
        Self::Parse(format!("diagram XML: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            DashboardError::from_status(StatusCode::NOT_FOUND, "hr/a.bpmn"),
            DashboardError::NotFound("hr/a.bpmn".into())
        );
        assert!(matches!(
            DashboardError::from_status(StatusCode::UNAUTHORIZED, "x"),
            DashboardError::Auth(_)
        ));
        assert!(matches!(
            DashboardError::from_status(StatusCode::FORBIDDEN, "x"),
            DashboardError::Auth(_)
        ));
        assert!(matches!(
            DashboardError::from_status(StatusCode::BAD_GATEWAY, "x"),
            DashboardError::Network(_)
        ));
    }

    #[test]
    fn test_labels() {
        assert_eq!(DashboardError::Parse("x".into()).label(), "parse");
        assert_eq!(DashboardError::NotFound("x".into()).to_string(), "Not found: x");
    }
}
