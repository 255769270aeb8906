// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Terminal user interface
//!
//! Two panels side by side: the diagram's flow nodes with their KPI links,
//! and the KPI table (or the diagram's own KPI tags when no table loads).
//! `r` refreshes, `a` toggles auto-refresh, `o` writes the HTML viewer.

use crate::diagram::{tag_rows, KpiLink, TagRow};
use crate::flow::ProcessFlow;
use crate::refresh::RefreshController;
use crate::render::viewer_html;
use crate::store::{DashboardStore, Panel, PanelState};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};
use ratatui::{Frame, Terminal};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(200);

/// Which panel the arrow keys scroll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Diagram panel
    Diagram,
    /// KPI panel
    Kpis,
}

/// Dashboard state owned by the event loop
pub struct App {
    controller: RefreshController,
    focus: Focus,
    diagram_row: usize,
    kpi_row: usize,
    status: Option<String>,
    viewer_path: PathBuf,
    default_interval: u64,
    should_quit: bool,
}

impl App {
    /// Create the app; `default_interval` is used when auto-refresh is toggled on
    #[must_use]
    pub fn new(controller: RefreshController, viewer_path: PathBuf, default_interval: u64) -> Self {
        Self {
            controller,
            focus: Focus::Diagram,
            diagram_row: 0,
            kpi_row: 0,
            status: None,
            viewer_path,
            default_interval,
            should_quit: false,
        }
    }

    /// The refresh controller
    #[must_use]
    pub fn controller(&self) -> &RefreshController {
        &self.controller
    }

    /// Handle one key press
    pub fn on_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => {
                self.controller.spawn_refresh();
                self.status = Some("Refreshing...".to_string());
            }
            KeyCode::Char('a') => self.controller.toggle_auto_refresh(self.default_interval),
            KeyCode::Char('+') => self.controller.adjust_interval(true),
            KeyCode::Char('-') => self.controller.adjust_interval(false),
            KeyCode::Char('o') => self.write_viewer(),
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Diagram => Focus::Kpis,
                    Focus::Kpis => Focus::Diagram,
                };
            }
            KeyCode::Down => {
                let last = self.row_count(self.focus).saturating_sub(1);
                let row = self.focused_row();
                *row = (*row + 1).min(last);
            }
            KeyCode::Up => {
                let row = self.focused_row();
                *row = row.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn focused_row(&mut self) -> &mut usize {
        match self.focus {
            Focus::Diagram => &mut self.diagram_row,
            Focus::Kpis => &mut self.kpi_row,
        }
    }

    fn row_count(&self, focus: Focus) -> usize {
        let store = self.controller.store();
        match focus {
            Focus::Diagram => diagram_rows(store).len(),
            Focus::Kpis => kpi_view(store).rows.len(),
        }
    }

    /// Apply finished refreshes and start one if the timer is due
    pub fn tick(&mut self, now: Instant) {
        if self.controller.drain() > 0 {
            self.status = None;
            // A refresh can shrink either panel
            self.diagram_row = self.diagram_row.min(self.row_count(Focus::Diagram).saturating_sub(1));
            self.kpi_row = self.kpi_row.min(self.row_count(Focus::Kpis).saturating_sub(1));
        }
        if self.controller.in_flight() == 0 && self.controller.is_due(now) {
            self.controller.spawn_refresh();
        }
    }

    fn write_viewer(&mut self) {
        let store = self.controller.store();
        let Some(diagram) = store.diagram().data() else {
            self.status = Some("No diagram loaded yet".to_string());
            return;
        };

        let title = diagram.path.clone();
        let result = viewer_html(&title, &diagram.document, &diagram.elements, store.kpi_table())
            .map_err(anyhow::Error::from)
            .and_then(|html| std::fs::write(&self.viewer_path, html).map_err(anyhow::Error::from));

        self.status = Some(match result {
            Ok(()) => format!("Viewer written to {}", self.viewer_path.display()),
            Err(e) => format!("Could not write viewer: {e}"),
        });
    }
}

/// Run the dashboard until the user quits
pub async fn run(mut app: App) -> Result<()> {
    app.controller.spawn_refresh();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));

    let result = event_loop(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    while !app.should_quit {
        app.tick(Instant::now());
        terminal.draw(|f| draw(f, app))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key.code);
                }
            }
        }
        // Let spawned refreshes make progress on this worker too
        tokio::task::yield_now().await;
    }
    Ok(())
}

// =============================================================================
// Drawing
// =============================================================================

/// Draw the whole dashboard
pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // header
            Constraint::Min(6),    // panels
            Constraint::Length(1), // status
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);

    draw_header(f, app, chunks[0]);
    draw_diagram(f, app, panels[0]);
    draw_kpis(f, app, panels[1]);
    draw_status(f, app, chunks[2]);
    draw_footer(f, chunks[3]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let ctl = &app.controller;
    let store = ctl.store();
    let sel = ctl.selection();

    let auto = match ctl.auto_refresh() {
        Some(d) => Span::styled(format!("auto {}s", d.as_secs()), Style::default().fg(Color::Green)),
        None => Span::styled("auto off", Style::default().fg(Color::DarkGray)),
    };
    let last = store
        .last_refresh()
        .map_or_else(|| "never".to_string(), |t| t.format("%H:%M:%S").to_string());
    let busy = if ctl.in_flight() > 0 { "  ⟳ fetching" } else { "" };

    let lines = vec![
        Line::from(vec![
            Span::styled(ctl.client().repo().slug(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("  {}  +  {}", sel.diagram_path(), sel.kpi_path())),
        ]),
        Line::from(vec![
            Span::raw(format!("refreshes: {}  last: {last}  ", store.refreshes())),
            auto,
            Span::styled(busy, Style::default().fg(Color::Yellow)),
        ]),
    ];

    let header = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Process Diagram + KPI Monitor "),
    );
    f.render_widget(header, area);
}

fn draw_diagram(f: &mut Frame, app: &App, area: Rect) {
    let store = app.controller.store();
    let rows: Vec<Row> = diagram_rows(store)
        .into_iter()
        .map(|r| {
            let color = match r.link {
                LinkMark::Matched => Color::Green,
                LinkMark::Unmatched => Color::Yellow,
                LinkMark::None => Color::White,
            };
            Row::new(vec![r.kind, r.label, r.kpi]).style(Style::default().fg(color))
        })
        .collect();

    let title = panel_title("Diagram", store.diagram(), |d| {
        let changed = if store.diagram_changed() { " changed" } else { "" };
        format!("{} #{}{changed}", d.path, d.document.short_digest())
    });

    let table = Table::new(
        rows,
        [Constraint::Length(14), Constraint::Min(16), Constraint::Min(12)],
    )
    .header(header_row(&["Kind", "Element", "KPI"]))
    .block(panel_block(title, app.focus == Focus::Diagram))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default().with_selected(Some(app.diagram_row));
    f.render_stateful_widget(table, area, &mut state);
}

fn draw_kpis(f: &mut Frame, app: &App, area: Rect) {
    let store = app.controller.store();
    let view = kpi_view(store);

    let widths: Vec<Constraint> = view.headers.iter().map(|_| Constraint::Min(8)).collect();
    let headers: Vec<&str> = view.headers.iter().map(String::as_str).collect();
    let rows: Vec<Row> = view.rows.into_iter().map(Row::new).collect();

    let title = panel_title("KPIs", store.kpis(), |k| format!("{} ({} rows)", k.path, k.table.len()));
    let title = match view.source {
        KpiSource::Table => title,
        KpiSource::DiagramTags => format!("{title} · showing diagram tags"),
        KpiSource::Nothing => title,
    };

    let table = Table::new(rows, widths)
        .header(header_row(&headers))
        .block(panel_block(title, app.focus == Focus::Kpis))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default().with_selected(Some(app.kpi_row));
    f.render_stateful_widget(table, area, &mut state);
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let store = app.controller.store();
    let mut spans = Vec::new();

    if let Some(msg) = &app.status {
        spans.push(Span::styled(format!(" {msg} "), Style::default().fg(Color::Cyan)));
    }
    for (name, err) in [("diagram", store.diagram().error()), ("kpis", store.kpis().error())] {
        if let Some(err) = err {
            spans.push(Span::styled(format!(" {name}: {err} "), Style::default().fg(Color::Red)));
        }
    }
    if let Some(err) = store.diagram().data().and_then(|d| d.scan_error.as_ref()) {
        spans.push(Span::styled(format!(" scan: {err} "), Style::default().fg(Color::Red)));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_footer(f: &mut Frame, area: Rect) {
    let key = |k: &'static str| {
        Span::styled(k, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    };
    let footer = Paragraph::new(Line::from(vec![
        key(" r"),
        Span::raw(" refresh  "),
        key("a"),
        Span::raw(" auto  "),
        key("+/-"),
        Span::raw(" interval  "),
        key("Tab"),
        Span::raw(" focus  "),
        key("o"),
        Span::raw(" HTML viewer  "),
        key("q"),
        Span::raw(" quit"),
    ]))
    .style(Style::default().fg(Color::DarkGray));

    f.render_widget(footer, area);
}

fn header_row(cells: &[&str]) -> Row<'static> {
    Row::new(cells.iter().map(|c| c.to_string()).collect::<Vec<_>>())
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .bottom_margin(1)
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(format!(" {title} "))
}

/// Panel title with its state appended
fn panel_title<T>(name: &str, panel: &Panel<T>, describe: impl Fn(&T) -> String) -> String {
    let base = match panel.data() {
        Some(data) => format!("{name} · {}", describe(data)),
        None => name.to_string(),
    };
    match (panel.state(), panel.error()) {
        (PanelState::Empty, _) => format!("{base} · loading"),
        (PanelState::Stale, Some(e)) => format!("{base} · stale ({})", e.label()),
        (PanelState::Failed, Some(e)) => format!("{base} · error ({})", e.label()),
        _ => base,
    }
}

// =============================================================================
// View models
// =============================================================================

/// KPI link marker of a diagram row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMark {
    /// Linked to a KPI row
    Matched,
    /// Tagged, but the key is not in the table
    Unmatched,
    /// Not tagged
    None,
}

/// One row of the diagram panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramRow {
    /// Element kind
    pub kind: String,
    /// Element name or id
    pub label: String,
    /// KPI cell text
    pub kpi: String,
    /// Link marker
    pub link: LinkMark,
}

/// Flow nodes in flow order with their KPI link text
#[must_use]
pub fn diagram_rows(store: &DashboardStore) -> Vec<DiagramRow> {
    let Some(diagram) = store.diagram().data() else {
        return Vec::new();
    };
    let table = store.kpi_table();

    ProcessFlow::build(&diagram.elements)
        .ordered()
        .into_iter()
        .map(|element| {
            let (kpi, link) = match KpiLink::resolve(element, table) {
                KpiLink::Matched(record) => {
                    let mut text = format!("✓ {}", record.key);
                    if let Some(target) = record.target() {
                        text.push_str(&format!(" → {target}"));
                    }
                    if let Some(owner) = record.owner() {
                        text.push_str(&format!(" ({owner})"));
                    }
                    (text, LinkMark::Matched)
                }
                KpiLink::Unmatched(key) => (format!("? {key}"), LinkMark::Unmatched),
                KpiLink::Untagged => (String::new(), LinkMark::None),
            };
            DiagramRow {
                kind: element.kind.clone(),
                label: element.label().to_string(),
                kpi,
                link,
            }
        })
        .collect()
}

/// Where the KPI panel's rows come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiSource {
    /// The KPI file
    Table,
    /// The diagram's embedded tags (no KPI file available)
    DiagramTags,
    /// Nothing to show
    Nothing,
}

/// Contents of the KPI panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KpiView {
    /// Column headers
    pub headers: Vec<String>,
    /// Cell rows
    pub rows: Vec<Vec<String>>,
    /// Row source
    pub source: KpiSource,
}

/// KPI table rows, or the diagram's tag mapping when no table is loaded
#[must_use]
pub fn kpi_view(store: &DashboardStore) -> KpiView {
    if let Some(table) = store.kpi_table() {
        return KpiView {
            headers: table.columns().to_vec(),
            rows: table.records().map(|r| table.row(r)).collect(),
            source: KpiSource::Table,
        };
    }

    let tags = store
        .diagram()
        .data()
        .map(|d| tag_rows(&d.elements))
        .unwrap_or_default();
    if tags.is_empty() {
        return KpiView { headers: vec!["kpi_key".to_string()], rows: Vec::new(), source: KpiSource::Nothing };
    }

    KpiView {
        headers: TagRow::HEADERS.iter().map(|h| (*h).to_string()).collect(),
        rows: tags
            .iter()
            .map(|t| t.cells().iter().map(|c| (*c).to_string()).collect())
            .collect(),
        source: KpiSource::DiagramTags,
    }
}
