// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Suggest command - drafts a KPI table for a diagram's tasks

use super::{load_diagram, GlobalOptions, SourceArgs};
use crate::diagram::named_tasks;
use crate::suggest::KpiSuggester;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Model replies take longer than file fetches
const SUGGEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Run the suggest command
pub async fn run(opts: &GlobalOptions, source: &SourceArgs, output: Option<PathBuf>) -> Result<()> {
    let client = opts.client()?;
    let selection = source.resolve(opts, &client).await?;
    let snapshot = load_diagram(&client, &selection).await?;

    let tasks = named_tasks(&snapshot.elements);
    info!(path = %snapshot.path, tasks = tasks.len(), "Collected named tasks");

    let suggester = KpiSuggester::from_config(&opts.config.suggest, SUGGEST_TIMEOUT)?;
    let table = suggester
        .suggest(&tasks)
        .await
        .context("KPI suggestion failed")?;
    let csv = table.to_csv()?;

    match output {
        Some(path) => {
            fs::write(&path, &csv).with_context(|| format!("Failed to write to {}", path.display()))?;
            println!("Suggested {} KPIs written to {}", table.len(), path.display());
            println!("Commit it as {} to link it to the diagram", selection.kpi_path());
        }
        None => print!("{csv}"),
    }

    Ok(())
}
