// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Flow command - prints the sequence-flow order of a diagram, or DOT

use super::{GlobalOptions, SourceArgs};
use crate::flow::ProcessFlow;
use crate::refresh::fetch_outcome;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

/// Output formats for the flow command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FlowFormat {
    /// One node per line with its successors
    #[default]
    Text,
    /// Graphviz DOT
    Dot,
}

#[derive(Debug, Serialize)]
struct FlowNode<'a> {
    id: &'a str,
    kind: &'a str,
    name: Option<&'a str>,
    kpi_key: Option<&'a str>,
    next: Vec<&'a str>,
}

/// Run the flow command
pub async fn run(opts: &GlobalOptions, source: &SourceArgs, format: FlowFormat) -> Result<()> {
    let client = opts.client()?;
    let selection = source.resolve(opts, &client).await?;
    let outcome = fetch_outcome(&client, &selection).await;

    let diagram = outcome
        .diagram
        .with_context(|| format!("Failed to load {}", selection.diagram_path()))?;
    if let Some(err) = &diagram.scan_error {
        anyhow::bail!("Failed to scan {}: {err}", diagram.path);
    }
    // The KPI table only decorates the DOT output
    let kpis = match outcome.kpis {
        Ok(k) => Some(k),
        Err(e) => {
            warn!(path = %selection.kpi_path(), error = %e, "KPI table unavailable");
            None
        }
    };

    let flow = ProcessFlow::build(&diagram.elements);

    match format {
        FlowFormat::Dot => println!("{}", flow.to_dot(kpis.as_ref().map(|k| &k.table))),
        FlowFormat::Text if opts.json => {
            let nodes: Vec<FlowNode<'_>> = flow
                .ordered()
                .into_iter()
                .map(|e| FlowNode {
                    id: &e.id,
                    kind: &e.kind,
                    name: e.name.as_deref(),
                    kpi_key: e.kpi_key(),
                    next: flow.successors(&e.id),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&nodes)?);
        }
        FlowFormat::Text => {
            println!(
                "{}: {} nodes, {} flows",
                diagram.path,
                flow.node_count(),
                flow.edge_count()
            );
            for element in flow.ordered() {
                let next = flow.successors(&element.id);
                let tag = element.kpi_key().map(|k| format!(" [{k}]")).unwrap_or_default();
                if next.is_empty() {
                    println!("  {} ({}){tag}", element.label(), element.kind);
                } else {
                    println!("  {} ({}){tag} -> {}", element.label(), element.kind, next.join(", "));
                }
            }
        }
    }

    Ok(())
}
