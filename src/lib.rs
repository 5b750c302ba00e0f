//! Floodboard - client for the drainage flood simulation server
//!
//! Switches between dashboard panels, loads the design report, and drives a
//! simulation run while streaming its log, then refreshes the dependent maps
//! and report once the run completes.

pub mod backend;
pub mod cache_bust;
pub mod config;
pub mod error;
pub mod export;
pub mod frame;
pub mod refresh;
pub mod report;
pub mod runner;
pub mod stream;
pub mod tui;
pub mod view;

pub use backend::Backend;
pub use config::BoardConfig;
pub use error::{BoardError, FixSuggestion, LoadError, StreamError};
pub use frame::{Frame, FrameReassembler, StreamEvent};
pub use refresh::{MapDocument, RefreshCoordinator, RefreshOutcome, RefreshPlan};
pub use report::{ReportDocument, ReportLoader, ReportSource};
pub use runner::{LogEvent, RunController, RunMessage, RunOutcome, RunRequest, RunState};
pub use stream::{HttpSimulationSource, SimulationSource};
pub use view::{Activation, ViewId, ViewNavigator};
