// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Tasks command - prints the named tasks of a diagram

use super::{load_diagram, GlobalOptions, SourceArgs};
use crate::diagram::named_tasks;
use anyhow::Result;

/// Run the tasks command
pub async fn run(opts: &GlobalOptions, source: &SourceArgs) -> Result<()> {
    let client = opts.client()?;
    let selection = source.resolve(opts, &client).await?;
    let snapshot = load_diagram(&client, &selection).await?;

    let tasks = named_tasks(&snapshot.elements);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
    } else if tasks.is_empty() {
        println!("No named tasks in {}", snapshot.path);
    } else {
        for task in &tasks {
            println!("{task}");
        }
    }

    Ok(())
}
