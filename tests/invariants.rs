// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Invariant tests for KPI parsing and diagram linking
//!
//! These tests verify:
//! 1. One record per unique key, the last row winning
//! 2. Untagged diagrams produce no links
//! 3. Linking never fails on keys the table lacks

use procboard::diagram::{named_tasks, resolve_links, scan_elements, tag_rows, KpiLink};
use procboard::flow::ProcessFlow;
use procboard::kpi::KpiTable;
use proptest::prelude::*;
use std::collections::BTreeMap;

// =============================================================================
// Test Helpers
// =============================================================================

fn diagram(tasks: &[(&str, &str, Option<&str>)]) -> String {
    let mut body = String::new();
    for (id, name, key) in tasks {
        body.push_str(&format!("    <bpmn:task id=\"{id}\" name=\"{name}\">\n"));
        if let Some(key) = key {
            body.push_str(&format!(
                "      <bpmn:extensionElements><camunda:properties>\
                 <camunda:property name=\"kpi_key\" value=\"{key}\"/>\
                 </camunda:properties></bpmn:extensionElements>\n"
            ));
        }
        body.push_str("    </bpmn:task>\n");
    }
    format!(
        r#"<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
                  xmlns:camunda="http://camunda.org/schema/1.0/bpmn" id="D">
  <bpmn:process id="P">
{body}  </bpmn:process>
</bpmn:definitions>"#
    )
}

// =============================================================================
// KPI table
// =============================================================================

proptest! {
    #[test]
    fn prop_one_record_per_key_last_wins(
        rows in prop::collection::vec(("[a-z]{1,3}", "[a-z0-9]{0,4}"), 0..30)
    ) {
        let mut csv = String::from("kpi_key,target\n");
        let mut expected = BTreeMap::new();
        for (key, target) in &rows {
            csv.push_str(&format!("{key},{target}\n"));
            expected.insert(key.clone(), target.clone());
        }

        let table = KpiTable::parse(csv.as_bytes()).unwrap();

        prop_assert_eq!(table.len(), expected.len());
        for (key, target) in &expected {
            let record = table.get(key).unwrap();
            prop_assert_eq!(record.target().unwrap_or_default(), target.as_str());
        }
    }

    #[test]
    fn prop_header_without_key_column_is_rejected(
        columns in prop::collection::vec("[a-j]{1,6}", 1..5)
    ) {
        let csv = format!("{}\n", columns.join(","));
        prop_assert!(KpiTable::parse(csv.as_bytes()).is_err());
    }
}

#[test]
fn test_csv_round_trip_keeps_rows() {
    let input = "kpi_key,target,owner\nb,2,Ops\na,1,\"Finance, AP\"\n";
    let table = KpiTable::parse(input.as_bytes()).unwrap();
    let again = KpiTable::parse(table.to_csv().unwrap().as_bytes()).unwrap();

    assert_eq!(again.columns(), table.columns());
    assert_eq!(again.get("a").unwrap().owner(), Some("Finance, AP"));
    assert_eq!(again.len(), 2);
}

// =============================================================================
// Linking
// =============================================================================

#[test]
fn test_untagged_diagram_has_no_links() {
    let xml = diagram(&[("A", "Approve", None), ("B", "Book", None)]);
    let elements = scan_elements(&xml).unwrap();
    let table = KpiTable::parse(b"kpi_key\nanything\n").unwrap();

    assert!(resolve_links(&elements, Some(&table)).is_empty());
    assert!(tag_rows(&elements).is_empty());
    assert_eq!(named_tasks(&elements), vec!["Approve", "Book"]);
}

#[test]
fn test_tagged_task_joins_row() {
    let xml = diagram(&[("Screen", "Screen candidates", Some("time_to_screen"))]);
    let elements = scan_elements(&xml).unwrap();
    let table = KpiTable::parse(b"kpi_key,target,owner\ntime_to_screen,48h,HR Recruiting\n").unwrap();

    let links = resolve_links(&elements, Some(&table));
    assert_eq!(links.len(), 1);
    let record = links[0].link.record().unwrap();
    assert_eq!(record.target(), Some("48h"));
    assert_eq!(record.owner(), Some("HR Recruiting"));
}

#[test]
fn test_unknown_key_is_unmatched() {
    let xml = diagram(&[("X", "Unknown", Some("nonexistent_key"))]);
    let elements = scan_elements(&xml).unwrap();
    let table = KpiTable::parse(b"kpi_key\nother\n").unwrap();

    let links = resolve_links(&elements, Some(&table));
    assert_eq!(links[0].link, KpiLink::Unmatched("nonexistent_key"));
    assert_eq!(resolve_links(&elements, None)[0].link, KpiLink::Unmatched("nonexistent_key"));
}

proptest! {
    #[test]
    fn prop_every_tagged_task_gets_one_link(
        keys in prop::collection::vec(prop::option::of("[a-z]{1,4}"), 0..12),
        known in prop::collection::vec("[a-z]{1,4}", 0..6)
    ) {
        let ids: Vec<String> = (0..keys.len()).map(|i| format!("T{i}")).collect();
        let tasks: Vec<(&str, &str, Option<&str>)> = ids
            .iter()
            .zip(&keys)
            .map(|(id, key)| (id.as_str(), id.as_str(), key.as_deref()))
            .collect();
        let xml = diagram(&tasks);
        let elements = scan_elements(&xml).unwrap();

        let mut csv = String::from("kpi_key\n");
        for key in &known {
            csv.push_str(key);
            csv.push('\n');
        }
        let table = KpiTable::parse(csv.as_bytes()).unwrap();

        let links = resolve_links(&elements, Some(&table));
        prop_assert_eq!(links.len(), keys.iter().flatten().count());
        for link in &links {
            let key = link.element.kpi_key().unwrap();
            match link.link {
                KpiLink::Matched(record) => prop_assert_eq!(record.key.as_str(), key),
                KpiLink::Unmatched(k) => {
                    prop_assert_eq!(k, key);
                    prop_assert!(!known.iter().any(|n| n == key));
                }
                KpiLink::Untagged => prop_assert!(false, "untagged element in links"),
            }
        }

        // Every node appears once in flow order
        prop_assert_eq!(ProcessFlow::build(&elements).ordered().len(), keys.len());
    }
}
