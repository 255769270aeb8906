// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! View command - launches the interactive dashboard

use super::{default_output, GlobalOptions, SourceArgs};
use crate::refresh::RefreshController;
use crate::tui::{self, App};
use anyhow::Result;
use std::path::PathBuf;

/// Interval used when auto-refresh is switched on from the dashboard
const DEFAULT_INTERVAL_SECS: u64 = 30;

/// Run the view command
pub async fn run(
    opts: &GlobalOptions,
    source: &SourceArgs,
    auto_refresh: Option<u64>,
    viewer: Option<PathBuf>,
) -> Result<()> {
    tracing::info!("Launching TUI...");

    let client = opts.client()?;
    let selection = source.resolve(opts, &client).await?;

    let secs = auto_refresh.unwrap_or(opts.config.dashboard.auto_refresh_secs);
    let default_interval = if secs > 0 { secs } else { DEFAULT_INTERVAL_SECS };
    let viewer_path = viewer.unwrap_or_else(|| default_output(&selection, "html"));

    let controller = RefreshController::new(client, selection, secs);
    tui::run(App::new(controller, viewer_path, default_interval)).await
}
