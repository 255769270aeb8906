// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! KPI table parsing
//!
//! A KPI file is comma-delimited text with a header row. One column holds the
//! row key (`kpi_key` or `key`); every other column becomes a named field.

use crate::error::DashboardError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Header names accepted as the key column, in priority order
pub const KEY_COLUMNS: &[&str] = &["kpi_key", "key"];

/// Header names read by [`KpiRecord::target`]
pub const TARGET_COLUMNS: &[&str] = &["target", "kpi_target", "target_value"];

/// Header name read by [`KpiRecord::owner`]
pub const OWNER_COLUMN: &str = "owner";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One KPI row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiRecord {
    /// Unique row key
    pub key: String,
    /// Remaining columns by header name
    pub fields: BTreeMap<String, String>,
}

impl KpiRecord {
    /// Value of a named column
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Target value (free-form, e.g. `48h`)
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        TARGET_COLUMNS.iter().find_map(|c| self.field(c))
    }

    /// Owning team or person
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.field(OWNER_COLUMN)
    }
}

/// Parsed KPI file: rows keyed by the key column, last row wins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiTable {
    columns: Vec<String>,
    key_column: String,
    records: BTreeMap<String, KpiRecord>,
}

impl KpiTable {
    /// Parse KPI file bytes.
    ///
    /// Fails with [`DashboardError::Parse`] when no header matches
    /// [`KEY_COLUMNS`] or the text is not valid CSV.
    pub fn parse(bytes: &[u8]) -> Result<Self, DashboardError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let key_index = find_key_column(&columns).ok_or_else(|| {
            DashboardError::Parse(format!(
                "KPI table has no key column (expected one of: {}; found: {})",
                KEY_COLUMNS.join(", "),
                if columns.is_empty() { "<none>".to_string() } else { columns.join(", ") }
            ))
        })?;

        let mut records = BTreeMap::new();
        let mut rows = 0usize;
        for row in reader.records() {
            let row = row?;
            rows += 1;

            let key = row.get(key_index).unwrap_or_default();
            if key.is_empty() {
                debug!(line = row.position().map(csv::Position::line), "Skipping KPI row without key");
                continue;
            }

            let fields = columns
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != key_index)
                .filter_map(|(i, name)| row.get(i).map(|v| (name.clone(), v.to_string())))
                .collect();

            records.insert(key.to_string(), KpiRecord { key: key.to_string(), fields });
        }

        debug!(rows = rows, unique = records.len(), "Parsed KPI table");

        Ok(Self {
            key_column: columns[key_index].clone(),
            columns,
            records,
        })
    }

    /// Look up a record by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&KpiRecord> {
        self.records.get(key)
    }

    /// All records, ordered by key
    pub fn records(&self) -> impl Iterator<Item = &KpiRecord> {
        self.records.values()
    }

    /// Header row in file order, key column included
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Name of the key column as written in the file
    #[must_use]
    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    /// Number of unique keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cell values of a record in header order
    #[must_use]
    pub fn row(&self, record: &KpiRecord) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| {
                if *c == self.key_column {
                    record.key.clone()
                } else {
                    record.field(c).unwrap_or_default().to_string()
                }
            })
            .collect()
    }

    /// Serialize back to CSV, header first, rows ordered by key
    pub fn to_csv(&self) -> Result<String, DashboardError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for record in self.records() {
            writer.write_record(self.row(record))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| DashboardError::Parse(format!("KPI table: {e}")))?;
        String::from_utf8(bytes).map_err(|e| DashboardError::Parse(format!("KPI table: {e}")))
    }
}

fn find_key_column(columns: &[String]) -> Option<usize> {
    KEY_COLUMNS.iter().find_map(|wanted| {
        columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(wanted))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HR_KPIS: &str = "kpi_key,target,owner\n\
        time_to_screen,48h,HR Recruiting\n\
        offer_acceptance,85%,HR Ops\n";

    #[test]
    fn test_parse_basic() {
        let table = KpiTable::parse(HR_KPIS.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.key_column(), "kpi_key");
        let rec = table.get("time_to_screen").unwrap();
        assert_eq!(rec.target(), Some("48h"));
        assert_eq!(rec.owner(), Some("HR Recruiting"));
        assert!(!rec.fields.contains_key("kpi_key"));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let csv = "key,target,owner\na,1h,X\nb,2h,Y\na,3h,Z\n";
        let table = KpiTable::parse(csv.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a").unwrap().target(), Some("3h"));
        assert_eq!(table.get("a").unwrap().owner(), Some("Z"));
    }

    #[test]
    fn test_missing_key_column() {
        let err = KpiTable::parse(b"name,target\nx,1\n").unwrap_err();
        assert!(matches!(err, DashboardError::Parse(_)));
        assert!(err.to_string().contains("no key column"));
    }

    #[test]
    fn test_empty_input_is_parse_error() {
        assert!(matches!(KpiTable::parse(b""), Err(DashboardError::Parse(_))));
    }

    #[test]
    fn test_header_only() {
        let table = KpiTable::parse(b"kpi_key,target\n").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_bom_whitespace_and_case() {
        let csv = "\u{feff} KPI_Key , target_value ,owner\n  cycle_time , 5d , Claims \n";
        let table = KpiTable::parse(csv.as_bytes()).unwrap();

        let rec = table.get("cycle_time").unwrap();
        assert_eq!(rec.target(), Some("5d"));
        assert_eq!(rec.owner(), Some("Claims"));
        assert_eq!(table.key_column(), "KPI_Key");
    }

    #[test]
    fn test_ragged_and_blank_key_rows() {
        let csv = "kpi_key,target,owner\nshort,1d\n,2d,Nobody\n";
        let table = KpiTable::parse(csv.as_bytes()).unwrap();

        assert_eq!(table.len(), 1);
        let rec = table.get("short").unwrap();
        assert_eq!(rec.target(), Some("1d"));
        assert_eq!(rec.owner(), None);
    }

    #[test]
    fn test_extra_columns_are_kept() {
        let csv = "kpi_key,current_value,target_value,last_updated\nscreen,52h,48h,2025-01-31\n";
        let table = KpiTable::parse(csv.as_bytes()).unwrap();

        let rec = table.get("screen").unwrap();
        assert_eq!(rec.field("current_value"), Some("52h"));
        assert_eq!(rec.target(), Some("48h"));
        assert_eq!(table.row(rec), vec!["screen", "52h", "48h", "2025-01-31"]);
    }

    #[test]
    fn test_to_csv() {
        let table = KpiTable::parse(HR_KPIS.as_bytes()).unwrap();
        let out = table.to_csv().unwrap();

        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("kpi_key,target,owner"));
        assert_eq!(lines.next(), Some("offer_acceptance,85%,HR Ops"));
        assert_eq!(lines.next(), Some("time_to_screen,48h,HR Recruiting"));
    }
}
