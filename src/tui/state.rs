//! AppState - Domain Layer
//!
//! Owns the navigator, the run controller and the refresh coordinator, and
//! applies [`AppEvent`]s coming back from background tasks. Rendering reads
//! from here; nothing in this module touches the terminal or the network.

use std::time::{Duration, Instant};

use crate::error::LoadError;
use crate::refresh::{RefreshCoordinator, RefreshOutcome, RefreshPlan};
use crate::report::ReportDocument;
use crate::runner::{RunController, RunMessage, RunOutcome};
use crate::view::{ViewId, ViewNavigator};

pub const MIN_INTENSITY: u32 = 1;
pub const MAX_INTENSITY: u32 = 1000;
pub const INTENSITY_STEP: u32 = 10;

/// Messages delivered to the app loop by background tasks
#[derive(Debug)]
pub enum AppEvent {
    Run(RunMessage),
    ReportLoaded {
        target: ReportTarget,
        ticket: u64,
        result: Result<ReportDocument, LoadError>,
    },
    Refreshed {
        outcome: RefreshOutcome,
        tickets: RefreshTickets,
    },
    Exported(Result<u64, String>),
}

/// Which rendering of the report a load feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTarget {
    Panel,
    Preview,
}

/// Content of a report rendering.
///
/// Every load takes a ticket from [`ReportPane::begin`]; a result whose ticket
/// is older than the one on display is dropped, so a slow pre-run load cannot
/// overwrite the report fetched after the run.
#[derive(Debug, Default)]
pub struct ReportPane {
    pub loading: bool,
    pub result: Option<Result<ReportDocument, LoadError>>,
    issued: u64,
    shown: u64,
}

impl ReportPane {
    pub fn begin(&mut self) -> u64 {
        self.loading = true;
        self.issued += 1;
        self.issued
    }

    /// Apply the result of load `ticket`. Returns false when it was stale.
    pub fn set(&mut self, ticket: u64, result: Result<ReportDocument, LoadError>) -> bool {
        if ticket < self.shown {
            tracing::debug!(ticket, shown = self.shown, "Dropping stale report load");
            return false;
        }
        self.shown = ticket;
        if ticket >= self.issued {
            self.loading = false;
        }
        self.result = Some(result);
        true
    }
}

/// Pane tickets taken by a post-run refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTickets {
    pub report: Option<u64>,
    pub preview: u64,
}

pub struct AppState {
    pub navigator: ViewNavigator,
    pub runs: RunController,
    pub coordinator: RefreshCoordinator,
    pub intensity: u32,

    pub report: ReportPane,
    pub preview: ReportPane,

    /// One-line message for actions outside a run (export)
    pub status_line: Option<String>,

    pub run_started: Option<Instant>,
    pub elapsed: Duration,
    pub ticks: u64,

    /// Lines scrolled up from the bottom of the run log
    pub log_scroll: usize,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(initial_view: ViewId, intensity: u32, coordinator: RefreshCoordinator) -> Self {
        Self {
            navigator: ViewNavigator::new(initial_view),
            runs: RunController::new(),
            coordinator,
            intensity,
            report: ReportPane::default(),
            preview: ReportPane::default(),
            status_line: None,
            run_started: None,
            elapsed: Duration::ZERO,
            ticks: 0,
            log_scroll: 0,
            should_quit: false,
        }
    }

    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        if let (Some(start), true) = (self.run_started, self.runs.is_running()) {
            self.elapsed = start.elapsed();
        }
    }

    pub fn adjust_intensity(&mut self, up: bool) {
        self.intensity = if up {
            self.intensity.saturating_add(INTENSITY_STEP)
        } else {
            self.intensity.saturating_sub(INTENSITY_STEP)
        }
        .clamp(MIN_INTENSITY, MAX_INTENSITY);
    }

    pub fn scroll_log(&mut self, up: bool) {
        let max = self.runs.log().len().saturating_sub(1);
        self.log_scroll = if up {
            (self.log_scroll + 1).min(max)
        } else {
            self.log_scroll.saturating_sub(1)
        };
    }

    /// Feed a transport message to the run controller.
    ///
    /// Returns the refresh to execute when the run just succeeded.
    pub fn apply_run_message(
        &mut self,
        message: RunMessage,
    ) -> Option<(RefreshPlan, RefreshTickets)> {
        let outcome = self.runs.dispatch(message)?;
        if let Some(start) = self.run_started {
            self.elapsed = start.elapsed();
        }
        match outcome {
            RunOutcome::Succeeded { run_id } => {
                let report_active = self.navigator.is_active(ViewId::Report);
                let plan = self.coordinator.on_run_complete(run_id, report_active)?;
                let tickets = RefreshTickets {
                    report: plan.reload_report.then(|| self.report.begin()),
                    preview: self.preview.begin(),
                };
                Some((plan, tickets))
            }
            RunOutcome::Failed { .. } => None,
        }
    }

    pub fn apply_report(
        &mut self,
        target: ReportTarget,
        ticket: u64,
        result: Result<ReportDocument, LoadError>,
    ) {
        match target {
            ReportTarget::Panel => self.report.set(ticket, result),
            ReportTarget::Preview => self.preview.set(ticket, result),
        };
    }

    pub fn apply_refresh(&mut self, outcome: RefreshOutcome, tickets: RefreshTickets) {
        if let (Some(report), Some(ticket)) = (outcome.report, tickets.report) {
            self.report.set(ticket, report);
        }
        self.preview.set(tickets.preview, outcome.preview);
    }

    pub fn apply_export(&mut self, result: Result<u64, String>) {
        self.status_line = Some(match result {
            Ok(bytes) => format!("GeoJSON exported ({bytes} bytes)"),
            Err(e) => format!("Export failed: {e}"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_bust::CacheBuster;
    use crate::config::BoardConfig;
    use crate::refresh::MapDocument;
    use std::sync::Arc;

    fn state(initial: ViewId) -> AppState {
        let maps = MapDocument::from_config(&BoardConfig::default()).unwrap();
        let coordinator = RefreshCoordinator::new(maps, Arc::new(CacheBuster::new()));
        AppState::new(initial, 100, coordinator)
    }

    #[test]
    fn test_success_plans_refresh_with_report_when_active() {
        let mut state = state(ViewId::Report);
        let req = state.runs.start(100).unwrap();
        let (plan, tickets) = state
            .apply_run_message(RunMessage::chunk(req.run_id, "data: SIMULATION_COMPLETE\n\n"))
            .unwrap();
        assert!(plan.reload_report);
        assert!(tickets.report.is_some());
        assert!(state.report.loading);
        assert!(state.preview.loading);
    }

    #[test]
    fn test_success_skips_report_when_hidden() {
        let mut state = state(ViewId::Simulation);
        let req = state.runs.start(100).unwrap();
        let (plan, tickets) = state
            .apply_run_message(RunMessage::chunk(req.run_id, "data: SIMULATION_COMPLETE\n\n"))
            .unwrap();
        assert!(!plan.reload_report);
        assert_eq!(tickets.report, None);
        assert!(!state.report.loading);
        assert_eq!(state.coordinator.last_refreshed(), Some(req.run_id));
    }

    #[test]
    fn test_failure_plans_nothing() {
        let mut state = state(ViewId::Simulation);
        let req = state.runs.start(100).unwrap();
        assert!(state.apply_run_message(RunMessage::end(req.run_id)).is_none());
        assert!(state.coordinator.maps().iter().all(|m| m.reloads == 0));
    }

    #[test]
    fn test_intensity_clamped() {
        let mut state = state(ViewId::Simulation);
        state.intensity = 5;
        state.adjust_intensity(false);
        assert_eq!(state.intensity, MIN_INTENSITY);
        state.intensity = 995;
        state.adjust_intensity(true);
        assert_eq!(state.intensity, MAX_INTENSITY);
    }

    #[test]
    fn test_refresh_outcome_applied() {
        let mut state = state(ViewId::Simulation);
        let preview = state.preview.begin();
        state.apply_refresh(
            RefreshOutcome {
                run_id: 1,
                report: None,
                preview: Ok(ReportDocument::new("# Report")),
            },
            RefreshTickets {
                report: None,
                preview,
            },
        );
        assert!(!state.preview.loading);
        assert!(state.report.result.is_none());
        assert!(matches!(state.preview.result, Some(Ok(_))));
    }

    #[test]
    fn test_late_pre_run_load_does_not_overwrite_refresh() {
        let mut state = state(ViewId::Report);
        let early = state.report.begin();

        let req = state.runs.start(100).unwrap();
        let (_, tickets) = state
            .apply_run_message(RunMessage::chunk(req.run_id, "data: SIMULATION_COMPLETE\n\n"))
            .unwrap();
        state.apply_refresh(
            RefreshOutcome {
                run_id: req.run_id,
                report: Some(Ok(ReportDocument::new("# After run"))),
                preview: Ok(ReportDocument::new("# After run")),
            },
            tickets,
        );
        state.apply_report(ReportTarget::Panel, early, Ok(ReportDocument::new("# Before run")));

        let shown = state.report.result.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(shown.content, "# After run");
        assert!(!state.report.loading);
    }

    #[test]
    fn test_older_result_keeps_loading_until_latest() {
        let mut pane = ReportPane::default();
        let first = pane.begin();
        let second = pane.begin();

        assert!(pane.set(first, Ok(ReportDocument::new("old"))));
        assert!(pane.loading);
        assert!(pane.set(second, Ok(ReportDocument::new("new"))));
        assert!(!pane.loading);
        assert!(!pane.set(first, Ok(ReportDocument::new("old"))));
    }
}
