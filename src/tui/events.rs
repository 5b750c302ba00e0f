//! Event Handling - Keyboard input processing
//!
//! Keys mutate [`AppState`] directly; anything that needs IO is returned as
//! an [`Action`] for the app loop to perform.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;

use super::state::AppState;
use crate::runner::{RunId, RunRequest};
use crate::view::{Activation, ViewId};

/// Side effects requested by user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    /// Load the report panel under the given pane ticket
    LoadReport(u64),
    StartRun(RunRequest),
    CancelRun(RunId),
    Export,
    None,
}

pub fn handle_key_event(key: KeyEvent, state: &mut AppState) -> Action {
    match (key.modifiers, key.code) {
        (KeyModifiers::NONE, KeyCode::Char('q')) => return Action::Quit,
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => return Action::Quit,

        (KeyModifiers::NONE, KeyCode::Tab) => {
            let next = state.navigator.active().next();
            return activate(state, next);
        }
        (KeyModifiers::SHIFT, KeyCode::BackTab) => {
            let prev = state.navigator.active().prev();
            return activate(state, prev);
        }
        _ => {}
    }

    match key.code {
        KeyCode::Char(c @ '1'..='4') => {
            let index = c as usize - '1' as usize;
            activate(state, ViewId::ALL[index])
        }
        KeyCode::Char('s') => match state.runs.start(state.intensity) {
            Ok(request) => {
                state.log_scroll = 0;
                state.status_line = None;
                Action::StartRun(request)
            }
            // Start is disabled while running
            Err(_) => Action::None,
        },
        KeyCode::Char('x') => match state.runs.cancel() {
            Some(run_id) => Action::CancelRun(run_id),
            None => Action::None,
        },
        KeyCode::Char('+') | KeyCode::Char('=') if state.runs.can_start() => {
            state.adjust_intensity(true);
            Action::None
        }
        KeyCode::Char('-') if state.runs.can_start() => {
            state.adjust_intensity(false);
            Action::None
        }
        KeyCode::Char('r') if !state.report.loading => Action::LoadReport(state.report.begin()),
        KeyCode::Char('g') => Action::Export,
        KeyCode::Up | KeyCode::Char('k') => {
            state.scroll_log(true);
            Action::None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.scroll_log(false);
            Action::None
        }
        KeyCode::Esc => {
            state.runs.dismiss_notice();
            state.status_line = None;
            Action::None
        }
        _ => Action::None,
    }
}

fn activate(state: &mut AppState, view: ViewId) -> Action {
    match state.navigator.activate(view) {
        Activation::LoadReport => Action::LoadReport(state.report.begin()),
        Activation::Switched | Activation::Unchanged => Action::None,
    }
}

/// Poll for keyboard events with timeout
pub fn poll_event(timeout: Duration) -> std::io::Result<Option<KeyEvent>> {
    if event::poll(timeout)? {
        if let Event::Key(key) = event::read()? {
            return Ok(Some(key));
        }
    }
    Ok(None)
}
