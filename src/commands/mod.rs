// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod completions;
pub mod config;
pub mod files;
pub mod flow;
pub mod folders;
pub mod render;
pub mod show;
pub mod suggest;
pub mod tasks;
pub mod view;

use crate::config::Config;
use crate::fetcher::HostedFileClient;
use crate::refresh::resolve_diagram;
use crate::store::{DiagramSnapshot, PanelState};
use crate::types::SourceSelection;
use anyhow::{Context, Result};
use owo_colors::Style;
use std::path::PathBuf;

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Effective configuration
    pub config: Config,
    /// Print JSON instead of text
    pub json: bool,
    /// Colorize text output
    pub color: bool,
}

impl GlobalOptions {
    /// `style` when colors are enabled, plain otherwise
    #[must_use]
    pub fn paint(&self, style: Style) -> Style {
        if self.color {
            style
        } else {
            Style::new()
        }
    }

    /// Client for the configured repository
    pub fn client(&self) -> Result<HostedFileClient> {
        HostedFileClient::from_config(&self.config.repo).context("Failed to create HTTP client")
    }
}

/// Which diagram/KPI pair a command works on
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SourceArgs {
    /// Folder holding the diagram (default: `dashboard.folder`)
    #[arg(short, long)]
    pub folder: Option<String>,

    /// Diagram file name (default: first `.bpmn` in the folder)
    #[arg(short, long)]
    pub diagram: Option<String>,

    /// KPI file name (default: `<diagram>_kpis.csv`)
    #[arg(short, long)]
    pub kpi_file: Option<String>,
}

impl SourceArgs {
    /// Resolve against the configuration, listing the folder if no diagram is named
    pub async fn resolve(&self, opts: &GlobalOptions, client: &HostedFileClient) -> Result<SourceSelection> {
        let dashboard = &opts.config.dashboard;
        let folder = self.folder.as_deref().unwrap_or(&dashboard.folder);
        let preferred = self.diagram.as_deref().or(dashboard.diagram.as_deref());
        let kpi_file = self.kpi_file.as_deref().or(dashboard.kpi_file.as_deref());

        let diagram = resolve_diagram(client, folder, preferred)
            .await
            .with_context(|| format!("Failed to pick a diagram in '{folder}'"))?;

        Ok(SourceSelection::new(folder, &diagram, kpi_file))
    }
}

/// Fetch and scan the selected diagram, failing on any error
pub async fn load_diagram(client: &HostedFileClient, selection: &SourceSelection) -> Result<DiagramSnapshot> {
    let path = selection.diagram_path();
    let bytes = client
        .fetch(&path)
        .await
        .with_context(|| format!("Failed to fetch {path}"))?;
    let snapshot = DiagramSnapshot::from_bytes(&path, bytes)?;
    if let Some(err) = &snapshot.scan_error {
        anyhow::bail!("Failed to scan {path}: {err}");
    }
    Ok(snapshot)
}

/// Default output file for a selection: `<diagram base>.<ext>` in the working directory
#[must_use]
pub fn default_output(selection: &SourceSelection, ext: &str) -> PathBuf {
    let base = selection
        .diagram
        .rsplit_once('.')
        .map_or(selection.diagram.as_str(), |(base, _)| base);
    PathBuf::from(format!("{base}.{ext}"))
}

/// Short lowercase name of a panel state
#[must_use]
pub fn state_label(state: PanelState) -> &'static str {
    match state {
        PanelState::Empty => "empty",
        PanelState::Ready => "ready",
        PanelState::Stale => "stale",
        PanelState::Failed => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output() {
        let sel = SourceSelection::new("hr", "hr_recruitment.bpmn", None);
        assert_eq!(default_output(&sel, "html"), PathBuf::from("hr_recruitment.html"));
        assert_eq!(default_output(&sel, "csv"), PathBuf::from("hr_recruitment.csv"));
    }

    #[test]
    fn test_state_label() {
        assert_eq!(state_label(PanelState::Stale), "stale");
        assert_eq!(state_label(PanelState::Failed), "failed");
    }

    #[tokio::test]
    async fn test_named_diagram_skips_listing() {
        let opts = GlobalOptions { config: Config::default(), json: false, color: true };
        let client = opts.client().unwrap();
        let args = SourceArgs {
            folder: Some("finance".into()),
            diagram: Some("invoice.bpmn".into()),
            kpi_file: None,
        };

        let sel = args.resolve(&opts, &client).await.unwrap();
        assert_eq!(sel.diagram_path(), "finance/invoice.bpmn");
        assert_eq!(sel.kpi_path(), "finance/invoice_kpis.csv");
    }
}
