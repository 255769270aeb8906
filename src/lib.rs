// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Procboard library - process diagrams and KPI tables from your repository
//!
//! This crate fetches a BPMN diagram and a KPI spreadsheet from a hosted
//! repository, parses the KPI rows, scans the diagram for embedded KPI tags
//! and presents both side by side, refreshing on demand or on a timer.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod config;
pub mod diagram;
pub mod error;
pub mod fetcher;
pub mod flow;
pub mod kpi;
pub mod refresh;
pub mod render;
pub mod store;
pub mod suggest;
pub mod tui;

/// Core data types shared across the fetcher, store and presenters
pub mod types {
    use serde::{Deserialize, Serialize};

    // =========================================================================
    // Repository Coordinate
    // =========================================================================

    /// A repository on the hosted-file API, pinned to one branch
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RepoCoordinate {
        /// Repository owner/namespace
        pub owner: String,
        /// Repository name
        pub name: String,
        /// Branch the files are read from
        pub branch: String,
    }

    impl RepoCoordinate {
        /// Create a coordinate
        #[must_use]
        pub fn new(owner: &str, name: &str, branch: &str) -> Self {
            Self {
                owner: owner.to_string(),
                name: name.to_string(),
                branch: branch.to_string(),
            }
        }

        /// Download URL for a file under `raw_base`
        #[must_use]
        pub fn raw_url(&self, raw_base: &str, path: &str) -> String {
            format!(
                "{}/{}/{}/{}/{}",
                raw_base.trim_end_matches('/'),
                self.owner,
                self.name,
                self.branch,
                path.trim_start_matches('/')
            )
        }

        /// Contents API URL for a path under `api_base` (without the `ref` query)
        #[must_use]
        pub fn contents_url(&self, api_base: &str, path: &str) -> String {
            format!(
                "{}/repos/{}/{}/contents/{}",
                api_base.trim_end_matches('/'),
                self.owner,
                self.name,
                path.trim_matches('/')
            )
        }

        /// Display form `owner/name@branch`
        #[must_use]
        pub fn slug(&self) -> String {
            format!("{}/{}@{}", self.owner, self.name, self.branch)
        }
    }

    // =========================================================================
    // Source Selection
    // =========================================================================

    /// Suffix appended to the diagram's base name to find its KPI file
    pub const KPI_FILE_SUFFIX: &str = "_kpis.csv";

    /// The pair of files a dashboard refresh reads
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SourceSelection {
        /// Folder holding both files
        pub folder: String,
        /// Diagram file name, e.g. `hr_recruitment.bpmn`
        pub diagram: String,
        /// KPI file name, e.g. `hr_recruitment_kpis.csv`
        pub kpi_file: String,
    }

    impl SourceSelection {
        /// Build a selection; the KPI file defaults to `<diagram base>_kpis.csv`
        #[must_use]
        pub fn new(folder: &str, diagram: &str, kpi_file: Option<&str>) -> Self {
            let kpi_file = kpi_file
                .map(str::to_string)
                .unwrap_or_else(|| Self::conventional_kpi_file(diagram));
            Self {
                folder: folder.trim_matches('/').to_string(),
                diagram: diagram.to_string(),
                kpi_file,
            }
        }

        /// KPI file name paired with a diagram by convention
        #[must_use]
        pub fn conventional_kpi_file(diagram: &str) -> String {
            let base = diagram.rsplit_once('.').map_or(diagram, |(base, _)| base);
            format!("{base}{KPI_FILE_SUFFIX}")
        }

        /// Repository path of the diagram
        #[must_use]
        pub fn diagram_path(&self) -> String {
            join_path(&self.folder, &self.diagram)
        }

        /// Repository path of the KPI file
        #[must_use]
        pub fn kpi_path(&self) -> String {
            join_path(&self.folder, &self.kpi_file)
        }
    }

    fn join_path(folder: &str, name: &str) -> String {
        if folder.is_empty() {
            name.to_string()
        } else {
            format!("{folder}/{name}")
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_urls() {
            let repo = RepoCoordinate::new("acme", "flows", "main");
            assert_eq!(
                repo.raw_url("https://raw.example/", "hr/a.bpmn"),
                "https://raw.example/acme/flows/main/hr/a.bpmn"
            );
            assert_eq!(
                repo.contents_url("https://api.example", ""),
                "https://api.example/repos/acme/flows/contents/"
            );
            assert_eq!(repo.slug(), "acme/flows@main");
        }

        #[test]
        fn test_conventional_kpi_file() {
            let sel = SourceSelection::new("hr", "hr_recruitment.bpmn", None);
            assert_eq!(sel.diagram_path(), "hr/hr_recruitment.bpmn");
            assert_eq!(sel.kpi_path(), "hr/hr_recruitment_kpis.csv");

            let sel = SourceSelection::new("hr/", "flow.v2.bpmn", Some("hr_kpis.csv"));
            assert_eq!(sel.kpi_path(), "hr/hr_kpis.csv");
            assert_eq!(SourceSelection::conventional_kpi_file("flow.v2.bpmn"), "flow.v2_kpis.csv");
            assert_eq!(SourceSelection::conventional_kpi_file("noext"), "noext_kpis.csv");
        }

        #[test]
        fn test_root_folder() {
            let sel = SourceSelection::new("", "a.bpmn", None);
            assert_eq!(sel.diagram_path(), "a.bpmn");
        }
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::DashboardError;
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}
