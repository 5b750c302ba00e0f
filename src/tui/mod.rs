//! TUI Module - Drainage Control Dashboard
//!
//! Architecture:
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  UI LAYER (app.rs render + widgets.rs)              │
//! │  Pure rendering. No business logic. Reads AppState.                 │
//! └─────────────────────────────────────────────────────────────────────┘
//!                               ▲
//!                               │ AppState
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      DOMAIN LAYER (state.rs)                        │
//! │  ViewNavigator + RunController + RefreshCoordinator.                │
//! └─────────────────────────────────────────────────────────────────────┘
//!                               ▲
//!                               │ AppEvent channel
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    CONNECTOR LAYER (spawned tasks)                  │
//! │  Stream reader, report loads, refresh, GeoJSON export.              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

mod app;
mod events;
mod state;
mod theme;
mod widgets;

pub use app::TuiApp;
pub use events::Action;
pub use state::{AppEvent, AppState, RefreshTickets, ReportTarget};
pub use theme::FloodTheme;

use crate::backend::Backend;

/// Run the dashboard
pub async fn run(backend: Backend) -> anyhow::Result<()> {
    let app = TuiApp::new(backend)?;
    app.run().await
}
