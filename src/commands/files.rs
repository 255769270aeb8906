// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Files command - lists the diagrams in a folder and whether their KPI file exists

use super::GlobalOptions;
use crate::types::SourceSelection;
use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Style};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct DiagramEntry {
    diagram: String,
    kpi_file: String,
    kpi_file_exists: Option<bool>,
}

/// Run the files command
pub async fn run(opts: &GlobalOptions, folder: &str) -> Result<()> {
    let client = opts.client()?;
    let diagrams = client
        .list_diagrams(folder)
        .await
        .with_context(|| format!("Failed to list '{folder}'"))?;

    let mut entries = Vec::with_capacity(diagrams.len());
    for diagram in diagrams {
        let selection = SourceSelection::new(folder, &diagram, None);
        // A failed existence check is reported as unknown rather than aborting the listing
        let exists = match client.exists(&selection.kpi_path()).await {
            Ok(found) => Some(found),
            Err(e) => {
                tracing::warn!(path = %selection.kpi_path(), error = %e, "KPI file check failed");
                None
            }
        };
        entries.push(DiagramEntry { diagram, kpi_file: selection.kpi_file, kpi_file_exists: exists });
    }

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No .bpmn files in '{folder}'");
        return Ok(());
    }

    for entry in &entries {
        let (mark, style) = match entry.kpi_file_exists {
            Some(true) => ("kpis", Style::new().green()),
            Some(false) => ("no kpis", Style::new().yellow()),
            None => ("kpis ?", Style::new().dimmed()),
        };
        println!(
            "{}  [{}: {}]",
            entry.diagram,
            mark.style(opts.paint(style)),
            entry.kpi_file
        );
    }

    Ok(())
}
