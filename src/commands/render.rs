// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Render command - writes the standalone HTML viewer for a diagram

use super::{default_output, GlobalOptions, SourceArgs};
use crate::refresh::fetch_outcome;
use crate::render::viewer_html;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Run the render command
pub async fn run(opts: &GlobalOptions, source: &SourceArgs, output: Option<PathBuf>) -> Result<()> {
    let client = opts.client()?;
    let selection = source.resolve(opts, &client).await?;
    let outcome = fetch_outcome(&client, &selection).await;

    let diagram = outcome
        .diagram
        .with_context(|| format!("Failed to load {}", selection.diagram_path()))?;
    if let Some(err) = &diagram.scan_error {
        // The viewer still gets the document and reports import errors itself
        warn!(path = %diagram.path, error = %err, "Rendering without KPI links");
    }
    let kpis = match outcome.kpis {
        Ok(k) => Some(k),
        Err(e) => {
            warn!(path = %selection.kpi_path(), error = %e, "KPI table unavailable");
            None
        }
    };

    let title = format!("{} ({})", diagram.path, client.repo().slug());
    let html = viewer_html(&title, &diagram.document, &diagram.elements, kpis.as_ref().map(|k| &k.table))?;

    let path = output.unwrap_or_else(|| default_output(&selection, "html"));
    fs::write(&path, html).with_context(|| format!("Failed to write to {}", path.display()))?;
    info!(path = %path.display(), bytes = diagram.document.xml().len(), "Viewer written");

    println!("Viewer written to {}", path.display());
    Ok(())
}
