// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Show command - one refresh, printed as text or a JSON snapshot

use super::{state_label, GlobalOptions, SourceArgs};
use crate::diagram::{tag_rows, KpiLink};
use crate::error::DashboardError;
use crate::refresh::fetch_outcome;
use crate::store::{DashboardStore, Panel, RefreshOutcome};
use anyhow::Result;
use owo_colors::{OwoColorize, Style};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Run the show command.
///
/// Fails only when neither file could be loaded.
pub async fn run(opts: &GlobalOptions, source: &SourceArgs) -> Result<()> {
    let client = opts.client()?;
    let selection = source.resolve(opts, &client).await?;

    let outcome = fetch_outcome(&client, &selection).await;
    let failure = outcome.is_total_failure().then(|| total_failure(&outcome));

    let mut store = DashboardStore::new();
    store.apply(outcome);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&snapshot(&store))?);
    } else {
        print_text(opts, &store);
    }

    match failure {
        Some(message) => anyhow::bail!(message),
        None => Ok(()),
    }
}

fn total_failure(outcome: &RefreshOutcome) -> String {
    let describe = |err: Option<&DashboardError>| err.map(ToString::to_string).unwrap_or_default();
    format!(
        "Nothing to show: diagram: {}; kpis: {}",
        describe(outcome.diagram.as_ref().err()),
        describe(outcome.kpis.as_ref().err())
    )
}

fn print_text(opts: &GlobalOptions, store: &DashboardStore) {
    let bold = opts.paint(Style::new().bold());
    let green = opts.paint(Style::new().green());
    let yellow = opts.paint(Style::new().yellow());
    let red = opts.paint(Style::new().red());

    let diagram = store.diagram();
    let kpis = store.kpis();

    // Panel headers
    let diagram_path = store.selection().map(|s| s.diagram_path()).unwrap_or_default();
    let kpi_path = store.selection().map(|s| s.kpi_path()).unwrap_or_default();
    println!("{}  [{}]", diagram_path.style(bold), panel_status(diagram));
    if let Some(d) = diagram.data() {
        let flows = d.elements.iter().filter(|e| e.is_flow()).count();
        println!(
            "  digest {}  {} elements, {} flows",
            d.document.short_digest(),
            d.elements.len() - flows,
            flows
        );
        if let Some(err) = &d.scan_error {
            println!("  {}", format!("scan failed: {err}").style(red));
        }
    }
    if let Some(err) = diagram.error() {
        println!("  {}", err.style(red));
    }

    println!("{}  [{}]", kpi_path.style(bold), panel_status(kpis));
    if let Some(err) = kpis.error() {
        println!("  {}", err.style(red));
    }
    println!();

    // Element links
    let links = store.links();
    if !links.is_empty() {
        println!("{}", "KPI links".style(bold));
        for link in &links {
            let element = link.element;
            match &link.link {
                KpiLink::Matched(record) => {
                    let target = record.target().map(|t| format!("  target {t}")).unwrap_or_default();
                    let owner = record.owner().map(|o| format!("  owner {o}")).unwrap_or_default();
                    println!(
                        "  {} {} -> {}{target}{owner}",
                        "✓".style(green),
                        element.label(),
                        record.key
                    );
                }
                KpiLink::Unmatched(key) => {
                    println!("  {} {} -> {key} (no KPI row)", "?".style(yellow), element.label());
                }
                KpiLink::Untagged => {}
            }
        }
        println!();
    }

    // KPI table, or the diagram's own tags when there is none
    if let Some(table) = store.kpi_table() {
        println!("{}", "KPIs".style(bold));
        println!("  {}", table.columns().join(" | "));
        for record in table.records() {
            println!("  {}", table.row(record).join(" | "));
        }
    } else if let Some(d) = diagram.data() {
        let tags = tag_rows(&d.elements);
        if tags.is_empty() {
            println!("No KPI table and no KPI tags in the diagram");
        } else {
            println!("{}", "KPI tags (no KPI table)".style(bold));
            for tag in &tags {
                println!("  {}", tag.cells().join(" | "));
            }
        }
    }
}

fn panel_status<T>(panel: &Panel<T>) -> String {
    let state = state_label(panel.state());
    match panel.updated_at() {
        Some(at) => format!("{state}, updated {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => state.to_string(),
    }
}

fn panel_json<T>(panel: &Panel<T>, path: Option<String>) -> Value {
    json!({
        "path": path,
        "state": state_label(panel.state()),
        "error": panel.error().map(ToString::to_string),
        "error_kind": panel.error().map(|e| e.label()),
        "updated_at": panel.updated_at(),
    })
}

/// Machine-readable view of the store after a refresh
fn snapshot(store: &DashboardStore) -> Value {
    let selection = store.selection();
    let mut diagram = panel_json(store.diagram(), selection.map(|s| s.diagram_path()));
    let mut kpis = panel_json(store.kpis(), selection.map(|s| s.kpi_path()));

    if let Some(d) = store.diagram().data() {
        diagram["digest"] = json!(d.document.digest());
        diagram["elements"] = json!(d.elements);
        diagram["scan_error"] = json!(d.scan_error.as_ref().map(ToString::to_string));
        diagram["kpi_tags"] = json!(tag_rows(&d.elements));
    }
    if let Some(table) = store.kpi_table() {
        let rows: Vec<BTreeMap<&str, String>> = table
            .records()
            .map(|r| table.columns().iter().map(String::as_str).zip(table.row(r)).collect())
            .collect();
        kpis["key_column"] = json!(table.key_column());
        kpis["columns"] = json!(table.columns());
        kpis["rows"] = json!(rows);
    }

    let links: Vec<Value> = store
        .links()
        .iter()
        .map(|l| {
            let (status, key) = match &l.link {
                KpiLink::Matched(r) => ("matched", Some(r.key.as_str())),
                KpiLink::Unmatched(k) => ("unmatched", Some(*k)),
                KpiLink::Untagged => ("untagged", None),
            };
            json!({
                "element_id": l.element.id,
                "element_name": l.element.name,
                "kpi_key": key,
                "status": status,
                "record": l.link.record().map(|r| &r.fields),
            })
        })
        .collect();

    json!({
        "selection": selection,
        "refreshed_at": store.last_refresh(),
        "diagram": diagram,
        "kpis": kpis,
        "links": links,
    })
}
