//! Run Controller - lifecycle of one simulation run
//!
//! A pure state machine. Transport events arrive as [`RunMessage`]s tagged
//! with the run they belong to; the controller feeds chunks through its
//! [`FrameReassembler`], appends log lines and reports a [`RunOutcome`] when
//! the run reaches a terminal state. It performs no IO.
//!
//! ```text
//!            start                 sentinel
//!   Idle ───────────► Running ───────────────► Succeeded
//!    ▲                │  │  ▲                        │
//!    │      cancel    │  │  │ log line               │
//!    └────────────────┘  │  └─────                   │
//!                        │ transport / decode /      │
//!                        │ early end                 │
//!                        ▼                           │
//!                      Failed ◄── start allowed ─────┘
//! ```

use bytes::Bytes;

use crate::error::{BoardError, StreamError};
use crate::frame::{FrameReassembler, StreamEvent, MAX_FRAME_BYTES};

pub type RunId = u64;

/// Parameters of one run, fixed for its duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRequest {
    pub run_id: RunId,
    pub intensity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Running => write!(f, "RUNNING"),
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Transport event for a given run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMessage {
    pub run_id: RunId,
    pub input: RunInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunInput {
    Chunk(Bytes),
    StreamEnd,
    Failed(StreamError),
}

impl RunMessage {
    pub fn chunk(run_id: RunId, bytes: impl Into<Bytes>) -> Self {
        Self {
            run_id,
            input: RunInput::Chunk(bytes.into()),
        }
    }

    pub fn end(run_id: RunId) -> Self {
        Self {
            run_id,
            input: RunInput::StreamEnd,
        }
    }

    pub fn failed(run_id: RunId, error: StreamError) -> Self {
        Self {
            run_id,
            input: RunInput::Failed(error),
        }
    }
}

/// One line of the run log. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub run_id: RunId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Terminal transition reported to the caller exactly once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded { run_id: RunId },
    Failed { run_id: RunId, error: StreamError },
}

impl RunOutcome {
    pub fn run_id(&self) -> RunId {
        match self {
            Self::Succeeded { run_id } | Self::Failed { run_id, .. } => *run_id,
        }
    }
}

#[derive(Debug)]
struct ActiveRun {
    request: RunRequest,
    reassembler: FrameReassembler,
}

/// Owns run state, the pending buffer and the log view
#[derive(Debug)]
pub struct RunController {
    state: RunState,
    next_run_id: RunId,
    active: Option<ActiveRun>,
    last_request: Option<RunRequest>,
    log: Vec<LogEvent>,
    notice: Option<Notice>,
}

impl Default for RunController {
    fn default() -> Self {
        Self::new()
    }
}

impl RunController {
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
            next_run_id: 1,
            active: None,
            last_request: None,
            log: Vec::new(),
            notice: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Whether the start action is enabled
    pub fn can_start(&self) -> bool {
        self.state != RunState::Running
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn current_run(&self) -> Option<RunRequest> {
        self.active.as_ref().map(|a| a.request)
    }

    pub fn last_request(&self) -> Option<RunRequest> {
        self.last_request
    }

    pub fn log(&self) -> &[LogEvent] {
        &self.log
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Begin a run. Rejected while another run is in progress.
    pub fn start(&mut self, intensity: u32) -> Result<RunRequest, BoardError> {
        if self.is_running() {
            tracing::debug!("Start rejected: run already in progress");
            return Err(BoardError::RunActive);
        }

        let request = RunRequest {
            run_id: self.next_run_id,
            intensity,
        };
        self.next_run_id += 1;

        self.log.clear();
        self.notice = None;
        self.active = Some(ActiveRun {
            request,
            reassembler: FrameReassembler::new(),
        });
        self.last_request = Some(request);
        self.state = RunState::Running;

        tracing::info!(run_id = request.run_id, intensity, "Simulation run started");
        Ok(request)
    }

    /// Abort the running run and return to Idle. Later input for it is ignored.
    pub fn cancel(&mut self) -> Option<RunId> {
        if !self.is_running() {
            return None;
        }
        let run = self.active.take()?;
        self.state = RunState::Idle;
        self.notice = Some(Notice::Error("Simulation cancelled".to_string()));
        tracing::info!(run_id = run.request.run_id, "Simulation run cancelled");
        Some(run.request.run_id)
    }

    /// Transition function for transport events
    pub fn dispatch(&mut self, message: RunMessage) -> Option<RunOutcome> {
        let Some(run) = self.active.as_mut() else {
            tracing::trace!(run_id = message.run_id, "Ignoring input: no active run");
            return None;
        };
        if run.request.run_id != message.run_id {
            tracing::trace!(run_id = message.run_id, "Ignoring input for stale run");
            return None;
        }

        match message.input {
            RunInput::Chunk(bytes) => {
                let frames = run.reassembler.push(&bytes);
                for frame in frames {
                    match frame.classify() {
                        Ok(Some(StreamEvent::Log(message))) => self.append(message),
                        Ok(Some(StreamEvent::Complete)) => return Some(self.succeed()),
                        Ok(None) => tracing::trace!("Dropping malformed frame"),
                        Err(e) => return Some(self.fail(e)),
                    }
                }
                let overflowing = self
                    .active
                    .as_ref()
                    .is_some_and(|run| run.reassembler.is_overflowing());
                if overflowing {
                    return Some(self.fail(StreamError::Decode(format!(
                        "frame exceeds {MAX_FRAME_BYTES} bytes"
                    ))));
                }
                None
            }
            RunInput::StreamEnd => {
                let tail = self
                    .active
                    .take()
                    .and_then(|run| run.reassembler.finish());
                match tail.map(|f| f.classify()) {
                    Some(Ok(Some(StreamEvent::Complete))) => Some(self.succeed()),
                    Some(Ok(Some(StreamEvent::Log(message)))) => {
                        self.append(message);
                        Some(self.fail(StreamError::Incomplete))
                    }
                    Some(Err(e)) => Some(self.fail(e)),
                    Some(Ok(None)) | None => Some(self.fail(StreamError::Incomplete)),
                }
            }
            RunInput::Failed(error) => Some(self.fail(error)),
        }
    }

    fn append(&mut self, message: String) {
        let run_id = self.last_request.map_or(0, |r| r.run_id);
        tracing::debug!(run_id, %message, "Run log");
        self.log.push(LogEvent { run_id, message });
    }

    fn succeed(&mut self) -> RunOutcome {
        let run_id = self.finish_run();
        self.state = RunState::Succeeded;
        self.notice = Some(Notice::Success("Simulation completed".to_string()));
        tracing::info!(run_id, lines = self.log.len(), "Simulation run succeeded");
        RunOutcome::Succeeded { run_id }
    }

    fn fail(&mut self, error: StreamError) -> RunOutcome {
        let run_id = self.finish_run();
        self.state = RunState::Failed;
        self.notice = Some(Notice::Error(format!("Simulation failed: {error}")));
        tracing::warn!(run_id, error = %error, "Simulation run failed");
        RunOutcome::Failed { run_id, error }
    }

    fn finish_run(&mut self) -> RunId {
        self.active = None;
        self.last_request.map_or(0, |r| r.run_id)
    }
}
