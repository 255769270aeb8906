// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - prints the effective configuration

use super::GlobalOptions;
use anyhow::Result;

/// Print the whole configuration, or one dotted key such as `repo.branch`
pub fn run(opts: &GlobalOptions, key: Option<&str>) -> Result<()> {
    let config = &opts.config;

    match key {
        Some(key) => {
            let value = config
                .get(key)
                .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {key}"))?;
            println!("{value}");
        }
        None if opts.json => println!("{}", serde_json::to_string_pretty(config)?),
        None => print!("{}", config.to_toml()?),
    }

    Ok(())
}
