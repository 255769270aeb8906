// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Folders command - lists the process folders at the repository root

use super::GlobalOptions;
use anyhow::Result;
use tracing::info;

/// Run the folders command
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let client = opts.client()?;
    info!("Listing folders in {}", client.repo().slug());

    let folders = client.list_folders(&opts.config.repo.default_folders).await;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&folders)?);
        return Ok(());
    }

    if folders.is_empty() {
        println!("No folders found in {}", client.repo().slug());
        return Ok(());
    }

    for folder in &folders {
        println!("{folder}");
    }

    Ok(())
}
