//! Floodwater Theme - Visual Design System
//!
//! Deep water blues with a sandbag amber accent.

use ratatui::style::{Color, Modifier, Style};

use crate::runner::RunState;

/// Floodwater color palette
pub struct FloodTheme {
    // Primary palette
    pub deep_water: Color,
    pub surface_blue: Color,
    pub sandbag_amber: Color,
    pub foam_white: Color,

    // Status colors
    pub success_green: Color,
    pub warning_orange: Color,
    pub error_red: Color,
}

impl Default for FloodTheme {
    fn default() -> Self {
        Self {
            deep_water: Color::Rgb(16, 60, 110),     // #103C6E
            surface_blue: Color::Rgb(64, 164, 223),  // #40A4DF
            sandbag_amber: Color::Rgb(222, 170, 80), // #DEAA50
            foam_white: Color::Rgb(230, 237, 243),   // #E6EDF3

            success_green: Color::Rgb(63, 185, 80),   // #3FB950
            warning_orange: Color::Rgb(210, 153, 34), // #D29922
            error_red: Color::Rgb(248, 81, 73),       // #F85149
        }
    }
}

impl FloodTheme {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Styles
    // ─────────────────────────────────────────────────────────────────────

    pub fn text(&self) -> Style {
        Style::default().fg(self.foam_white)
    }

    pub fn dimmed(&self) -> Style {
        Style::default().fg(Color::Rgb(128, 128, 128))
    }

    pub fn header(&self) -> Style {
        Style::default()
            .fg(self.surface_blue)
            .add_modifier(Modifier::BOLD)
    }

    pub fn accent(&self) -> Style {
        Style::default().fg(self.sandbag_amber)
    }

    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.surface_blue)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success(&self) -> Style {
        Style::default().fg(self.success_green)
    }

    pub fn warning(&self) -> Style {
        Style::default().fg(self.warning_orange)
    }

    pub fn error(&self) -> Style {
        Style::default()
            .fg(self.error_red)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.deep_water)
    }

    /// Markdown heading, deeper levels fade out
    pub fn heading(&self, level: usize) -> Style {
        match level {
            1 => self.header().add_modifier(Modifier::UNDERLINED),
            2 => self.header(),
            _ => self.accent().add_modifier(Modifier::BOLD),
        }
    }

    pub fn run_state(&self, state: RunState) -> Style {
        match state {
            RunState::Idle => self.dimmed(),
            RunState::Running => self.highlight(),
            RunState::Succeeded => self.success(),
            RunState::Failed => self.error(),
        }
    }
}

/// UI Icons used throughout the TUI
pub mod icons {
    pub const DROP: &str = "💧";
    pub const MAP: &str = "▣";
    pub const REPORT: &str = "◆";
    pub const LOG: &str = "›";

    /// Braille spinner frames for the progress indicator
    pub const SPINNER: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];
}
