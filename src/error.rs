//! Error types with fix suggestions

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Crate-level errors surfaced by the CLI and dashboard shell.
#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Config error: {reason}")]
    Config { reason: String },

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unknown view '{id}'")]
    UnknownView { id: String },

    #[error("A simulation run is already in progress")]
    RunActive,

    #[error("Report unavailable: {0}")]
    Load(#[from] LoadError),

    #[error("Simulation failed: {0}")]
    Stream(#[from] StreamError),

    #[error("Export failed: {reason}")]
    Export { reason: String },

    #[error("Dashboard error: {reason}")]
    Dashboard { reason: String },
}

/// Document Loader failures. Rendered inline by the caller, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server answered {status}")]
    Status { status: u16 },

    #[error("could not decode report: {0}")]
    Decode(String),
}

/// Reasons a run ends in the Failed state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("server answered {status}")]
    Status { status: u16 },

    #[error("frame is not valid UTF-8: {0}")]
    Decode(String),

    #[error("no data received for {secs}s")]
    IdleTimeout { secs: u64 },

    #[error("stream ended before completion")]
    Incomplete,
}

impl FixSuggestion for BoardError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            BoardError::Config { .. } => Some("Check floodboard.yaml field names and types"),
            BoardError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            BoardError::Io(_) => Some("Check file path and permissions"),
            BoardError::InvalidUrl { .. } => {
                Some("Use an absolute URL such as http://localhost:5000")
            }
            BoardError::Http(_) => Some("Is the simulation server running? Try --server"),
            BoardError::UnknownView { .. } => {
                Some("Valid views: simulation, report, flood-map, route-map")
            }
            BoardError::RunActive => Some("Wait for the current run to finish or cancel it"),
            BoardError::Load(_) => Some("Run a simulation first, then reload the report"),
            BoardError::Stream(StreamError::Incomplete) => {
                Some("A pipeline step failed on the server; check the run log above")
            }
            BoardError::Stream(StreamError::IdleTimeout { .. }) => {
                Some("Raise stream_idle_timeout_secs in floodboard.yaml")
            }
            BoardError::Stream(_) => Some("Check the server logs and retry the run"),
            BoardError::Export { .. } => Some("Run a simulation to generate the network first"),
            BoardError::Dashboard { .. } => {
                Some("Run the dashboard in an interactive terminal, or use `floodboard simulate`")
            }
        }
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LoadError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            LoadError::Status {
                status: status.as_u16(),
            }
        } else {
            LoadError::Transport(err.to_string())
        }
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => StreamError::Status {
                status: status.as_u16(),
            },
            None => StreamError::Transport(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_variant_has_suggestion() {
        let errors = vec![
            BoardError::Config {
                reason: "x".into(),
            },
            BoardError::UnknownView { id: "map".into() },
            BoardError::RunActive,
            BoardError::Load(LoadError::Status { status: 500 }),
            BoardError::Stream(StreamError::Incomplete),
            BoardError::Stream(StreamError::IdleTimeout { secs: 5 }),
            BoardError::Export {
                reason: "missing".into(),
            },
            BoardError::Dashboard {
                reason: "not a tty".into(),
            },
        ];
        for err in errors {
            assert!(err.fix_suggestion().is_some(), "{err} has no suggestion");
        }
    }

    #[test]
    fn test_dashboard_failure_not_reported_as_file_error() {
        let err = BoardError::Dashboard {
            reason: "Device not configured".into(),
        };
        assert_eq!(err.to_string(), "Dashboard error: Device not configured");
        let fix = err.fix_suggestion().unwrap();
        assert!(fix.contains("interactive terminal"));
        assert!(!fix.contains("file path"));
    }

    #[test]
    fn test_stream_error_display() {
        assert_eq!(
            StreamError::Incomplete.to_string(),
            "stream ended before completion"
        );
        assert_eq!(
            StreamError::IdleTimeout { secs: 30 }.to_string(),
            "no data received for 30s"
        );
    }
}
