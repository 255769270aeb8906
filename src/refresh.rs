// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Refresh controller
//!
//! Re-fetches both files on request or on a timer and hands the outcome to
//! the store. Spawned refreshes report back through a channel and are
//! applied in completion order.

use crate::config::MAX_AUTO_REFRESH_SECS;
use crate::error::DashboardError;
use crate::fetcher::HostedFileClient;
use crate::store::{DashboardStore, DiagramSnapshot, KpiSnapshot, RefreshOutcome};
use crate::types::SourceSelection;
use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Step used by [`RefreshController::adjust_interval`]
pub const INTERVAL_STEP_SECS: u64 = 5;

/// Fetch both files of a selection and parse them.
///
/// The two requests run concurrently; each half fails independently.
pub async fn fetch_outcome(client: &HostedFileClient, selection: &SourceSelection) -> RefreshOutcome {
    let diagram_path = selection.diagram_path();
    let kpi_path = selection.kpi_path();

    let (diagram, kpis) = tokio::join!(client.fetch(&diagram_path), client.fetch(&kpi_path));

    RefreshOutcome {
        selection: selection.clone(),
        diagram: diagram.and_then(|bytes| DiagramSnapshot::from_bytes(&diagram_path, bytes)),
        kpis: kpis.and_then(|bytes| KpiSnapshot::from_bytes(&kpi_path, &bytes)),
        completed_at: Utc::now(),
    }
}

/// Resolve the diagram to show in `folder`: `preferred`, or the first listed
pub async fn resolve_diagram(
    client: &HostedFileClient,
    folder: &str,
    preferred: Option<&str>,
) -> Result<String, DashboardError> {
    if let Some(name) = preferred {
        return Ok(name.to_string());
    }
    client
        .list_diagrams(folder)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| DashboardError::NotFound(format!("no .bpmn files in '{folder}'")))
}

/// Owns the store and drives refreshes into it
pub struct RefreshController {
    client: HostedFileClient,
    selection: SourceSelection,
    store: DashboardStore,
    auto_refresh: Option<Duration>,
    last_started: Option<Instant>,
    in_flight: usize,
    tx: mpsc::UnboundedSender<RefreshOutcome>,
    rx: mpsc::UnboundedReceiver<RefreshOutcome>,
}

impl RefreshController {
    /// Create a controller; `auto_refresh_secs` of 0 disables the timer
    #[must_use]
    pub fn new(client: HostedFileClient, selection: SourceSelection, auto_refresh_secs: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            selection,
            store: DashboardStore::new(),
            auto_refresh: interval(auto_refresh_secs),
            last_started: None,
            in_flight: 0,
            tx,
            rx,
        }
    }

    /// Current dashboard state
    #[must_use]
    pub fn store(&self) -> &DashboardStore {
        &self.store
    }

    /// Files the next refresh will read
    #[must_use]
    pub fn selection(&self) -> &SourceSelection {
        &self.selection
    }

    /// The client used for fetching
    #[must_use]
    pub fn client(&self) -> &HostedFileClient {
        &self.client
    }

    /// Point later refreshes at other files
    pub fn select(&mut self, selection: SourceSelection) {
        self.selection = selection;
    }

    /// Fetch both files now and apply the outcome
    pub async fn refresh_now(&mut self) -> &DashboardStore {
        self.last_started = Some(Instant::now());
        info!(diagram = %self.selection.diagram_path(), kpis = %self.selection.kpi_path(), "Refreshing");
        let outcome = fetch_outcome(&self.client, &self.selection).await;
        self.store.apply(outcome);
        &self.store
    }

    /// Start a refresh in the background; see [`Self::drain`]
    pub fn spawn_refresh(&mut self) {
        self.last_started = Some(Instant::now());
        self.in_flight += 1;
        debug!(in_flight = self.in_flight, "Spawning refresh");

        let client = self.client.clone();
        let selection = self.selection.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = fetch_outcome(&client, &selection).await;
            // Receiver gone means the controller was dropped
            let _ = tx.send(outcome);
        });
    }

    /// Apply every outcome delivered so far, in completion order.
    ///
    /// Returns how many were applied; outcomes for a previous selection are
    /// discarded.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.rx.try_recv() {
            if self.accept(outcome) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for every spawned refresh to complete and apply them
    pub async fn wait_pending(&mut self) -> usize {
        let mut applied = 0;
        while self.in_flight > 0 {
            let Some(outcome) = self.rx.recv().await else {
                break;
            };
            if self.accept(outcome) {
                applied += 1;
            }
        }
        applied
    }

    fn accept(&mut self, outcome: RefreshOutcome) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if outcome.selection != self.selection {
            debug!(
                diagram = %outcome.selection.diagram_path(),
                "Discarding refresh for a previous selection"
            );
            return false;
        }
        self.store.apply(outcome);
        true
    }

    #[cfg(test)]
    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<RefreshOutcome> {
        self.tx.clone()
    }

    /// Number of spawned refreshes not yet applied
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Auto-refresh interval, if enabled
    #[must_use]
    pub fn auto_refresh(&self) -> Option<Duration> {
        self.auto_refresh
    }

    /// Set the auto-refresh interval in seconds (0 = off, clamped to 600)
    pub fn set_auto_refresh(&mut self, secs: u64) {
        self.auto_refresh = interval(secs);
        info!(secs = self.auto_refresh.map_or(0, |d| d.as_secs()), "Auto-refresh interval set");
    }

    /// Turn auto-refresh on (at `default_secs`) or off
    pub fn toggle_auto_refresh(&mut self, default_secs: u64) {
        if self.auto_refresh.is_some() {
            self.set_auto_refresh(0);
        } else {
            self.set_auto_refresh(default_secs.max(INTERVAL_STEP_SECS));
        }
    }

    /// Lengthen or shorten the interval by one step; shortening past the
    /// step turns auto-refresh off
    pub fn adjust_interval(&mut self, longer: bool) {
        let current = self.auto_refresh.map_or(0, |d| d.as_secs());
        let next = if longer {
            current + INTERVAL_STEP_SECS
        } else {
            current.saturating_sub(INTERVAL_STEP_SECS)
        };
        self.set_auto_refresh(next);
    }

    /// Whether the auto-refresh interval has elapsed since the last start
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        match (self.auto_refresh, self.last_started) {
            (Some(every), Some(last)) => now.saturating_duration_since(last) >= every,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

fn interval(secs: u64) -> Option<Duration> {
    match secs.min(MAX_AUTO_REFRESH_SECS) {
        0 => None,
        s => Some(Duration::from_secs(s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepoConfig;

    fn controller(secs: u64) -> RefreshController {
        let client = HostedFileClient::from_config(&RepoConfig::default()).unwrap();
        RefreshController::new(client, SourceSelection::new("hr", "a.bpmn", None), secs)
    }

    #[test]
    fn test_interval_clamp() {
        assert_eq!(interval(0), None);
        assert_eq!(interval(30), Some(Duration::from_secs(30)));
        assert_eq!(interval(10_000), Some(Duration::from_secs(MAX_AUTO_REFRESH_SECS)));
    }

    #[test]
    fn test_auto_refresh_controls() {
        let mut ctl = controller(0);
        assert!(!ctl.is_due(Instant::now()));

        ctl.toggle_auto_refresh(30);
        assert_eq!(ctl.auto_refresh(), Some(Duration::from_secs(30)));
        assert!(ctl.is_due(Instant::now()));

        ctl.adjust_interval(true);
        assert_eq!(ctl.auto_refresh(), Some(Duration::from_secs(35)));

        ctl.set_auto_refresh(5);
        ctl.adjust_interval(false);
        assert_eq!(ctl.auto_refresh(), None);

        ctl.toggle_auto_refresh(0);
        assert_eq!(ctl.auto_refresh(), Some(Duration::from_secs(INTERVAL_STEP_SECS)));
        ctl.toggle_auto_refresh(30);
        assert_eq!(ctl.auto_refresh(), None);
    }

    #[test]
    fn test_is_due_after_interval() {
        let mut ctl = controller(10);
        let start = Instant::now();
        ctl.last_started = Some(start);

        assert!(!ctl.is_due(start + Duration::from_secs(9)));
        assert!(ctl.is_due(start + Duration::from_secs(10)));
    }

    #[test]
    fn test_outcome_for_previous_selection_is_discarded() {
        let mut ctl = controller(0);
        let old = ctl.selection().clone();
        ctl.in_flight = 2;
        let outcome = |selection: SourceSelection| RefreshOutcome {
            selection,
            diagram: Err(DashboardError::NotFound("x".into())),
            kpis: Err(DashboardError::NotFound("y".into())),
            completed_at: Utc::now(),
        };

        ctl.select(SourceSelection::new("finance", "invoice.bpmn", None));
        ctl.tx.send(outcome(old)).unwrap();
        ctl.tx.send(outcome(ctl.selection().clone())).unwrap();

        assert_eq!(ctl.drain(), 1);
        assert_eq!(ctl.in_flight(), 0);
        assert_eq!(ctl.store().selection(), Some(ctl.selection()));
        assert_eq!(ctl.store().refreshes(), 1);
    }

    #[test]
    fn test_select() {
        let mut ctl = controller(0);
        ctl.select(SourceSelection::new("finance", "invoice.bpmn", Some("finance_kpis.csv")));
        assert_eq!(ctl.selection().kpi_path(), "finance/finance_kpis.csv");
        assert_eq!(ctl.drain(), 0);
        assert_eq!(ctl.in_flight(), 0);
    }
}
