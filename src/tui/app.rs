//! TUI Application - Main entry point and run loop

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::events::{handle_key_event, poll_event, Action};
use super::state::{AppEvent, AppState, RefreshTickets, ReportTarget};
use super::theme::{icons, FloodTheme};
use super::widgets::{format_duration, markdown_lines, truncate};
use crate::backend::Backend;
use crate::export::download_geojson;
use crate::refresh::RefreshPlan;
use crate::report::{render_result, ReportSource, PREVIEW_LINES};
use crate::runner::{Notice, RunRequest};
use crate::stream::{pump, SimulationSource};
use crate::view::ViewId;

/// TUI Application
pub struct TuiApp {
    state: AppState,
    theme: FloodTheme,
    backend: Backend,
    tx: mpsc::UnboundedSender<AppEvent>,
    rx: mpsc::UnboundedReceiver<AppEvent>,
    /// Cancels the reader task of the current run
    run_cancel: Option<CancellationToken>,
}

impl TuiApp {
    pub fn new(backend: Backend) -> anyhow::Result<Self> {
        let coordinator = backend.coordinator()?;
        let state = AppState::new(
            backend.config.initial_view,
            backend.config.intensity,
            coordinator,
        );
        let (tx, rx) = mpsc::unbounded_channel();

        Ok(Self {
            state,
            theme: FloodTheme::new(),
            backend,
            tx,
            rx,
            run_cancel: None,
        })
    }

    /// Run the TUI application
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut terminal = self.setup_terminal()?;

        // Initial content
        let ticket = self.state.preview.begin();
        self.spawn_report_load(ReportTarget::Preview, ticket);
        if self.state.navigator.is_active(ViewId::Report) {
            let ticket = self.state.report.begin();
            self.spawn_report_load(ReportTarget::Panel, ticket);
        }

        let result = self.main_loop(&mut terminal).await;

        if let Some(cancel) = self.run_cancel.take() {
            cancel.cancel();
        }
        self.restore_terminal(&mut terminal)?;

        result
    }

    fn setup_terminal(&self) -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(terminal)
    }

    fn restore_terminal(
        &self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    async fn main_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        let tick_rate = Duration::from_millis(33);

        loop {
            self.state.tick();

            // Background results first so a frame never shows stale state
            while let Ok(event) = self.rx.try_recv() {
                self.apply(event);
            }

            terminal.draw(|frame| self.render(frame))?;

            if let Some(key) = poll_event(tick_rate)? {
                let action = handle_key_event(key, &mut self.state);
                self.perform(action);
            }

            if self.state.should_quit {
                break;
            }

            // Let spawned tasks make progress on a busy runtime
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::Run(message) => {
                if let Some((plan, tickets)) = self.state.apply_run_message(message) {
                    self.spawn_refresh(plan, tickets);
                }
                if !self.state.runs.is_running() {
                    self.run_cancel = None;
                }
            }
            AppEvent::ReportLoaded {
                target,
                ticket,
                result,
            } => self.state.apply_report(target, ticket, result),
            AppEvent::Refreshed { outcome, tickets } => self.state.apply_refresh(outcome, tickets),
            AppEvent::Exported(result) => self.state.apply_export(result),
        }
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::Quit => self.state.should_quit = true,
            Action::LoadReport(ticket) => self.spawn_report_load(ReportTarget::Panel, ticket),
            Action::StartRun(request) => self.spawn_run(request),
            Action::CancelRun(run_id) => {
                if let Some(cancel) = self.run_cancel.take() {
                    cancel.cancel();
                }
                tracing::debug!(run_id, "Reader released");
            }
            Action::Export => self.spawn_export(),
            Action::None => {}
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Background tasks
    // ─────────────────────────────────────────────────────────────────────

    fn spawn_run(&mut self, request: RunRequest) {
        let cancel = CancellationToken::new();
        self.run_cancel = Some(cancel.clone());
        self.state.run_started = Some(Instant::now());
        self.state.elapsed = Duration::ZERO;

        let source: Arc<dyn SimulationSource> = self.backend.simulation.clone();
        let idle = self.backend.config.stream_idle_timeout();
        let app_tx = self.tx.clone();

        tokio::spawn(async move {
            let (run_tx, mut run_rx) = mpsc::unbounded_channel();
            let forward = async {
                while let Some(message) = run_rx.recv().await {
                    if app_tx.send(AppEvent::Run(message)).is_err() {
                        break;
                    }
                }
            };
            tokio::join!(pump(&*source, request, idle, cancel, run_tx), forward);
        });
    }

    fn spawn_report_load(&self, target: ReportTarget, ticket: u64) {
        let loader = self.backend.report.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = loader.load().await;
            let _ = tx.send(AppEvent::ReportLoaded {
                target,
                ticket,
                result,
            });
        });
    }

    fn spawn_refresh(&self, plan: RefreshPlan, tickets: RefreshTickets) {
        let loader = self.backend.report.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = plan.execute(&*loader).await;
            let _ = tx.send(AppEvent::Refreshed { outcome, tickets });
        });
    }

    fn spawn_export(&mut self) {
        let url = match self.backend.geojson_url() {
            Ok(url) => url,
            Err(e) => {
                self.state.apply_export(Err(e.to_string()));
                return;
            }
        };
        self.state.status_line = Some("Exporting GeoJSON...".to_string());
        let client = self.backend.client.clone();
        let dest = self.backend.config.geojson_file.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = download_geojson(&client, &url, &dest)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(AppEvent::Exported(result));
        });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(8),    // Active view
                Constraint::Length(1), // Notice
                Constraint::Length(1), // Footer
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0]);
        match self.state.navigator.active() {
            ViewId::Simulation => self.render_simulation(frame, chunks[1]),
            ViewId::Report => self.render_report(frame, chunks[1]),
            ViewId::FloodMap => self.render_map(frame, chunks[1], "flood"),
            ViewId::RouteMap => self.render_map(frame, chunks[1], "route"),
        }
        self.render_notice(frame, chunks[2]);
        self.render_footer(frame, chunks[3]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(format!("{} FLOODBOARD", icons::DROP), self.theme.header()),
            Span::raw("  │ "),
        ];
        for (i, view) in ViewId::ALL.iter().enumerate() {
            let style = if self.state.navigator.is_active(*view) {
                self.theme.highlight()
            } else {
                self.theme.dimmed()
            };
            spans.push(Span::styled(format!(" {}:{} ", i + 1, view.title()), style));
        }
        let run_state = self.state.runs.state();
        spans.push(Span::raw(" │  "));
        spans.push(Span::styled(run_state.to_string(), self.theme.run_state(run_state)));
        spans.push(Span::raw("  │  "));
        spans.push(Span::styled(
            format!("⏱ {}", format_duration(self.state.elapsed.as_secs())),
            self.theme.text(),
        ));

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(" DRAINAGE CONTROL ");
        frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
    }

    fn render_simulation(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(6), Constraint::Min(4)])
            .split(columns[1]);

        self.render_run_log(frame, columns[0]);
        self.render_controls(frame, right[0]);
        self.render_preview(frame, right[1]);
    }

    fn render_run_log(&self, frame: &mut Frame, area: Rect) {
        let visible = area.height.saturating_sub(2) as usize;
        let width = area.width.saturating_sub(6) as usize;
        let log = self.state.runs.log();
        let end = log.len().saturating_sub(self.state.log_scroll);
        let start = end.saturating_sub(visible);

        let lines: Vec<Line> = log[start..end]
            .iter()
            .map(|event| {
                Line::from(vec![
                    Span::styled(format!(" {} ", icons::LOG), self.theme.accent()),
                    Span::styled(truncate(&event.message, width), self.theme.text()),
                ])
            })
            .collect();

        let title = if self.state.log_scroll > 0 {
            format!(" RUN LOG (↑{}) ", self.state.log_scroll)
        } else {
            " RUN LOG ".to_string()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(title);
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_controls(&self, frame: &mut Frame, area: Rect) {
        let runs = &self.state.runs;
        let progress = if runs.is_running() {
            let spin = icons::SPINNER[(self.state.ticks / 3) as usize % icons::SPINNER.len()];
            Span::styled(format!("{spin} running"), self.theme.highlight())
        } else {
            Span::styled("ready", self.theme.dimmed())
        };
        let start_style = if runs.can_start() {
            self.theme.accent()
        } else {
            self.theme.dimmed()
        };

        let lines = vec![
            Line::from(vec![
                Span::raw("  Intensity: "),
                Span::styled(self.state.intensity.to_string(), self.theme.accent()),
                Span::styled("  [-/+]", self.theme.dimmed()),
            ]),
            Line::from(vec![Span::raw("  Status:    "), progress]),
            Line::from(vec![
                Span::raw("  Lines:     "),
                Span::styled(runs.log().len().to_string(), self.theme.text()),
            ]),
            Line::from(vec![Span::raw("  "), Span::styled("[s] start run", start_style)]),
        ];
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(" CONTROLS ");
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_preview(&self, frame: &mut Frame, area: Rect) {
        let pane = &self.state.preview;
        let lines: Vec<Line> = match (&pane.result, pane.loading) {
            (_, true) => vec![Line::from(Span::styled("  Loading...", self.theme.dimmed()))],
            (Some(Ok(doc)), false) => doc
                .preview(PREVIEW_LINES)
                .into_iter()
                .flat_map(|l| markdown_lines(l, &self.theme))
                .collect(),
            (Some(result @ Err(_)), false) => vec![Line::from(Span::styled(
                render_result(result),
                self.theme.error(),
            ))],
            (None, false) => Vec::new(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(format!(" {} REPORT PREVIEW ", icons::REPORT));
        frame.render_widget(
            Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: false }),
            area,
        );
    }

    fn render_report(&self, frame: &mut Frame, area: Rect) {
        let pane = &self.state.report;
        let lines: Vec<Line> = match (&pane.result, pane.loading) {
            (_, true) => vec![Line::from(Span::styled("Loading report...", self.theme.dimmed()))],
            (Some(Ok(doc)), false) => markdown_lines(&doc.content, &self.theme),
            (Some(result @ Err(_)), false) => vec![Line::from(Span::styled(
                render_result(result),
                self.theme.error(),
            ))],
            (None, false) => vec![Line::from(Span::styled(
                "Press r to load the report",
                self.theme.dimmed(),
            ))],
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(format!(" {} DESIGN REPORT ", icons::REPORT));
        frame.render_widget(
            Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: false }),
            area,
        );
    }

    fn render_map(&self, frame: &mut Frame, area: Rect, name: &str) {
        let lines = match self.state.coordinator.map(name) {
            Some(map) => vec![
                Line::from(""),
                Line::from(vec![
                    Span::raw("  Address:  "),
                    Span::styled(map.url.as_str(), self.theme.highlight()),
                ]),
                Line::from(vec![
                    Span::raw("  Reloads:  "),
                    Span::styled(map.reloads.to_string(), self.theme.text()),
                ]),
                Line::from(""),
                Line::from(Span::styled(
                    "  Open the address in a browser to view the interactive map.",
                    self.theme.dimmed(),
                )),
            ],
            None => vec![Line::from(Span::styled(
                format!("  No '{name}' map configured"),
                self.theme.warning(),
            ))],
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(format!(" {} {} MAP ", icons::MAP, name.to_uppercase()));
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_notice(&self, frame: &mut Frame, area: Rect) {
        let line = match (self.state.runs.notice(), &self.state.status_line) {
            (Some(Notice::Error(msg)), _) => {
                Line::from(Span::styled(format!(" ✗ {msg}"), self.theme.error()))
            }
            (Some(Notice::Success(msg)), _) => {
                Line::from(Span::styled(format!(" ✓ {msg}"), self.theme.success()))
            }
            (None, Some(status)) => {
                Line::from(Span::styled(format!(" {status}"), self.theme.text()))
            }
            (None, None) => Line::from(""),
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let keys = [
            ("[q]", "uit  "),
            ("[1-4]", " view  "),
            ("[s]", "tart  "),
            ("[x]", " cancel  "),
            ("[r]", "eload report  "),
            ("[g]", "eojson  "),
            ("[↑↓]", " scroll  "),
        ];
        let spans: Vec<Span> = keys
            .iter()
            .flat_map(|(k, label)| {
                [
                    Span::styled(*k, self.theme.accent()),
                    Span::styled(*label, self.theme.dimmed()),
                ]
            })
            .collect();
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
