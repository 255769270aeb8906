// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! In-memory dashboard state
//!
//! The store is owned by one refresh controller. Each refresh outcome is
//! applied in one step, so two refreshes never interleave: whichever
//! outcome is applied last defines what the panels show.

use crate::diagram::{resolve_links, DiagramDocument, DiagramElement, ElementLink};
use crate::error::DashboardError;
use crate::kpi::KpiTable;
use crate::types::SourceSelection;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// What a panel can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    /// Never loaded
    Empty,
    /// Showing data from the latest refresh
    Ready,
    /// Showing older data; the latest refresh failed
    Stale,
    /// Latest refresh failed and there is nothing to show
    Failed,
}

/// Last good data of one panel, plus the last error
#[derive(Debug, Clone)]
pub struct Panel<T> {
    data: Option<T>,
    error: Option<DashboardError>,
    updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Self { data: None, error: None, updated_at: None }
    }
}

impl<T> Panel<T> {
    /// Apply one fetch result: success replaces, failure keeps old data
    pub fn apply(&mut self, result: Result<T, DashboardError>, at: DateTime<Utc>) {
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
                self.updated_at = Some(at);
            }
            Err(err) => self.error = Some(err),
        }
    }

    /// Data to display, possibly stale
    #[must_use]
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Error from the latest refresh
    #[must_use]
    pub fn error(&self) -> Option<&DashboardError> {
        self.error.as_ref()
    }

    /// When the data was last replaced
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Current display state
    #[must_use]
    pub fn state(&self) -> PanelState {
        match (&self.data, &self.error) {
            (None, None) => PanelState::Empty,
            (Some(_), None) => PanelState::Ready,
            (Some(_), Some(_)) => PanelState::Stale,
            (None, Some(_)) => PanelState::Failed,
        }
    }
}

/// Diagram panel contents
#[derive(Debug, Clone)]
pub struct DiagramSnapshot {
    /// Repository path the diagram came from
    pub path: String,
    /// The XML as fetched
    pub document: DiagramDocument,
    /// Scanned elements (empty when the scan failed)
    pub elements: Vec<DiagramElement>,
    /// Scan failure; the document can still be rendered
    pub scan_error: Option<DashboardError>,
}

impl DiagramSnapshot {
    /// Wrap fetched bytes and scan them
    pub fn from_bytes(path: &str, bytes: Vec<u8>) -> Result<Self, DashboardError> {
        let document = DiagramDocument::from_bytes(bytes)?;
        let (elements, scan_error) = match document.scan() {
            Ok(elements) => (elements, None),
            Err(err) => {
                warn!(path = path, error = %err, "Diagram scan failed");
                (Vec::new(), Some(err))
            }
        };
        Ok(Self { path: path.to_string(), document, elements, scan_error })
    }
}

/// KPI panel contents
#[derive(Debug, Clone)]
pub struct KpiSnapshot {
    /// Repository path the table came from
    pub path: String,
    /// Parsed table
    pub table: KpiTable,
}

impl KpiSnapshot {
    /// Parse fetched bytes
    pub fn from_bytes(path: &str, bytes: &[u8]) -> Result<Self, DashboardError> {
        Ok(Self { path: path.to_string(), table: KpiTable::parse(bytes)? })
    }
}

/// Results of one refresh of both files
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// Which files were fetched
    pub selection: SourceSelection,
    /// Diagram half
    pub diagram: Result<DiagramSnapshot, DashboardError>,
    /// KPI half
    pub kpis: Result<KpiSnapshot, DashboardError>,
    /// When the fetches completed
    pub completed_at: DateTime<Utc>,
}

impl RefreshOutcome {
    /// Whether both halves failed
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.diagram.is_err() && self.kpis.is_err()
    }
}

/// The two panels and the selection they belong to
#[derive(Debug, Clone, Default)]
pub struct DashboardStore {
    selection: Option<SourceSelection>,
    diagram: Panel<DiagramSnapshot>,
    kpis: Panel<KpiSnapshot>,
    refreshes: u64,
    last_refresh: Option<DateTime<Utc>>,
    diagram_changed: bool,
}

impl DashboardStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply both halves of a refresh.
    ///
    /// An outcome for a different selection first clears both panels.
    pub fn apply(&mut self, outcome: RefreshOutcome) {
        if self.selection.as_ref() != Some(&outcome.selection) {
            debug!(diagram = %outcome.selection.diagram_path(), "Selection changed, clearing panels");
            self.diagram = Panel::default();
            self.kpis = Panel::default();
            self.selection = Some(outcome.selection);
        }

        let previous_digest = self.diagram.data().map(|d| d.document.digest().to_string());

        self.diagram.apply(outcome.diagram, outcome.completed_at);
        self.kpis.apply(outcome.kpis, outcome.completed_at);

        let current_digest = self.diagram.data().map(|d| d.document.digest());
        self.diagram_changed = previous_digest.as_deref() != current_digest;

        self.refreshes += 1;
        self.last_refresh = Some(outcome.completed_at);

        info!(
            refresh = self.refreshes,
            diagram = ?self.diagram.state(),
            kpis = ?self.kpis.state(),
            changed = self.diagram_changed,
            "Applied refresh"
        );
    }

    /// Drop everything, as on restart
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Selection the panels belong to
    #[must_use]
    pub fn selection(&self) -> Option<&SourceSelection> {
        self.selection.as_ref()
    }

    /// Diagram panel
    #[must_use]
    pub fn diagram(&self) -> &Panel<DiagramSnapshot> {
        &self.diagram
    }

    /// KPI panel
    #[must_use]
    pub fn kpis(&self) -> &Panel<KpiSnapshot> {
        &self.kpis
    }

    /// KPI table, if one has ever loaded for this selection
    #[must_use]
    pub fn kpi_table(&self) -> Option<&KpiTable> {
        self.kpis.data().map(|k| &k.table)
    }

    /// Number of refreshes applied
    #[must_use]
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    /// When the last refresh completed
    #[must_use]
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    /// Whether the last refresh changed the diagram content
    #[must_use]
    pub fn diagram_changed(&self) -> bool {
        self.diagram_changed
    }

    /// Tagged diagram elements joined to the KPI table
    #[must_use]
    pub fn links(&self) -> Vec<ElementLink<'_>> {
        match self.diagram.data() {
            Some(d) => resolve_links(&d.elements, self.kpi_table()),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::tests::HR_DIAGRAM;
    use crate::diagram::KpiLink;

    fn selection() -> SourceSelection {
        SourceSelection::new("hr", "hr_recruitment.bpmn", None)
    }

    fn diagram(xml: &str) -> Result<DiagramSnapshot, DashboardError> {
        DiagramSnapshot::from_bytes("hr/hr_recruitment.bpmn", xml.as_bytes().to_vec())
    }

    fn kpis(csv: &str) -> Result<KpiSnapshot, DashboardError> {
        KpiSnapshot::from_bytes("hr/hr_recruitment_kpis.csv", csv.as_bytes())
    }

    fn outcome(
        sel: SourceSelection,
        d: Result<DiagramSnapshot, DashboardError>,
        k: Result<KpiSnapshot, DashboardError>,
    ) -> RefreshOutcome {
        RefreshOutcome { selection: sel, diagram: d, kpis: k, completed_at: Utc::now() }
    }

    #[test]
    fn test_panel_states() {
        let mut panel: Panel<u32> = Panel::default();
        assert_eq!(panel.state(), PanelState::Empty);

        panel.apply(Err(DashboardError::NotFound("x".into())), Utc::now());
        assert_eq!(panel.state(), PanelState::Failed);

        panel.apply(Ok(1), Utc::now());
        assert_eq!(panel.state(), PanelState::Ready);
        assert!(panel.updated_at().is_some());

        panel.apply(Err(DashboardError::Network("down".into())), Utc::now());
        assert_eq!(panel.state(), PanelState::Stale);
        assert_eq!(panel.data(), Some(&1));
    }

    #[test]
    fn test_failed_half_keeps_prior_data() {
        let mut store = DashboardStore::new();
        store.apply(outcome(selection(), diagram(HR_DIAGRAM), kpis("kpi_key,target\ntime_to_screen,48h\n")));

        store.apply(outcome(
            selection(),
            Err(DashboardError::NotFound("hr/hr_recruitment.bpmn".into())),
            kpis("kpi_key,target\ntime_to_screen,24h\n"),
        ));

        assert_eq!(store.diagram().state(), PanelState::Stale);
        assert!(matches!(store.diagram().error(), Some(DashboardError::NotFound(_))));
        assert_eq!(store.diagram().data().unwrap().elements.len(), 7);

        assert_eq!(store.kpis().state(), PanelState::Ready);
        assert_eq!(store.kpi_table().unwrap().get("time_to_screen").unwrap().target(), Some("24h"));
        assert_eq!(store.refreshes(), 2);
    }

    #[test]
    fn test_last_applied_outcome_wins() {
        let mut store = DashboardStore::new();
        let first = outcome(selection(), diagram(HR_DIAGRAM), kpis("kpi_key,target\na,1\n"));
        let second = outcome(selection(), diagram(HR_DIAGRAM), kpis("kpi_key,target\nb,2\n"));

        store.apply(second);
        store.apply(first);

        let table = store.kpi_table().unwrap();
        assert!(table.get("a").is_some());
        assert!(table.get("b").is_none());
    }

    #[test]
    fn test_selection_change_clears_stale_data() {
        let mut store = DashboardStore::new();
        store.apply(outcome(selection(), diagram(HR_DIAGRAM), kpis("kpi_key\na\n")));

        let other = SourceSelection::new("finance", "invoice.bpmn", None);
        store.apply(outcome(
            other.clone(),
            Err(DashboardError::NotFound("finance/invoice.bpmn".into())),
            Err(DashboardError::NotFound("finance/invoice_kpis.csv".into())),
        ));

        assert_eq!(store.selection(), Some(&other));
        assert_eq!(store.diagram().state(), PanelState::Failed);
        assert_eq!(store.kpis().state(), PanelState::Failed);
    }

    #[test]
    fn test_total_failure_needs_both_halves() {
        let missing = || DashboardError::NotFound("hr".into());
        assert!(outcome(selection(), Err(missing()), Err(missing())).is_total_failure());
        assert!(!outcome(selection(), diagram(HR_DIAGRAM), Err(missing())).is_total_failure());
        assert!(!outcome(selection(), Err(missing()), kpis("kpi_key\na\n")).is_total_failure());
    }

    #[test]
    fn test_malformed_diagram_still_held() {
        let snap = diagram("<definitions><broken").unwrap();
        assert!(snap.elements.is_empty());
        assert!(matches!(snap.scan_error, Some(DashboardError::Parse(_))));
        assert_eq!(snap.document.xml(), "<definitions><broken");
    }

    #[test]
    fn test_links_and_change_detection() {
        let mut store = DashboardStore::new();
        store.apply(outcome(selection(), diagram(HR_DIAGRAM), kpis("kpi_key,target,owner\ntime_to_screen,48h,HR Recruiting\n")));
        assert!(store.diagram_changed());

        let links = store.links();
        assert_eq!(links.len(), 2);
        assert!(matches!(links[0].link, KpiLink::Matched(_)));
        assert_eq!(links[1].link, KpiLink::Unmatched("offer_speed"));

        store.apply(outcome(selection(), diagram(HR_DIAGRAM), kpis("kpi_key\nx\n")));
        assert!(!store.diagram_changed());

        store.clear();
        assert_eq!(store.refreshes(), 0);
        assert!(store.links().is_empty());
    }
}
