//! Floodboard configuration
//!
//! Read from an optional `floodboard.yaml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. CLI flags (`--server`)
//! 2. Environment variables (`FLOODBOARD_SERVER`)
//! 3. Config file
//! 4. Defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BoardError, Result};
use crate::view::ViewId;

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "floodboard.yaml";

pub const SERVER_ENV: &str = "FLOODBOARD_SERVER";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// Base address of the simulation server
    pub server: String,

    /// Panel shown at startup
    pub initial_view: ViewId,

    /// Storm intensity sent with each run
    pub intensity: u32,

    /// Longest silence tolerated between two stream chunks
    pub stream_idle_timeout_secs: u64,

    /// Timeout for report and export requests
    pub request_timeout_secs: u64,

    /// Map documents reloaded after each run
    pub maps: Vec<MapEntry>,

    /// Default destination for `export`
    pub geojson_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapEntry {
    pub name: String,
    pub path: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            server: "http://localhost:5000".to_string(),
            initial_view: ViewId::Simulation,
            intensity: 100,
            stream_idle_timeout_secs: 300,
            request_timeout_secs: 30,
            maps: vec![
                MapEntry {
                    name: "flood".to_string(),
                    path: "/maps/flood".to_string(),
                },
                MapEntry {
                    name: "route".to_string(),
                    path: "/maps/route".to_string(),
                },
            ],
            geojson_file: PathBuf::from("proposed_drainage_network.geojson"),
        }
    }
}

impl BoardConfig {
    /// Load from `path`, or from `floodboard.yaml` when present, else defaults.
    ///
    /// An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|e| BoardError::Config {
            reason: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let config = Self::from_yaml(&content)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Environment variables take precedence over file values
    pub fn with_env(mut self) -> Self {
        if let Ok(server) = std::env::var(SERVER_ENV) {
            if !server.is_empty() {
                self.server = server;
            }
        }
        self
    }

    pub fn with_server(mut self, server: Option<String>) -> Self {
        if let Some(server) = server {
            self.server = server;
        }
        self
    }

    fn validate(&self) -> Result<()> {
        self.server_url()?;
        if self.stream_idle_timeout_secs == 0 {
            return Err(BoardError::Config {
                reason: "stream_idle_timeout_secs must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn server_url(&self) -> Result<Url> {
        Url::parse(&self.server).map_err(|e| BoardError::InvalidUrl {
            url: self.server.clone(),
            reason: e.to_string(),
        })
    }

    /// Resolve a server-relative path
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.server_url()?
            .join(path)
            .map_err(|e| BoardError::InvalidUrl {
                url: format!("{}{}", self.server, path),
                reason: e.to_string(),
            })
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BoardConfig::default();
        assert_eq!(config.intensity, 100);
        assert_eq!(config.initial_view, ViewId::Simulation);
        assert_eq!(config.maps.len(), 2);
        assert_eq!(
            config.endpoint("/maps/flood").unwrap().as_str(),
            "http://localhost:5000/maps/flood"
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = BoardConfig::from_yaml(
            "server: http://sim.local:8080\ninitial_view: report\nintensity: 250\n",
        )
        .unwrap();
        assert_eq!(config.server, "http://sim.local:8080");
        assert_eq!(config.initial_view, ViewId::Report);
        assert_eq!(config.intensity, 250);
        assert_eq!(config.stream_idle_timeout_secs, 300);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = BoardConfig::from_yaml("sever: http://x\n").unwrap_err();
        assert!(matches!(err, BoardError::YamlParse(_)));
    }

    #[test]
    fn test_bad_server_rejected() {
        let err = BoardConfig::from_yaml("server: not a url\n").unwrap_err();
        assert!(matches!(err, BoardError::InvalidUrl { .. }));
    }

    #[test]
    fn test_zero_idle_timeout_rejected() {
        let err = BoardConfig::from_yaml("stream_idle_timeout_secs: 0\n").unwrap_err();
        assert!(matches!(err, BoardError::Config { .. }));
    }

    #[test]
    fn test_cli_server_wins() {
        let config = BoardConfig::default().with_server(Some("http://10.0.0.2:5000".into()));
        assert_eq!(config.server, "http://10.0.0.2:5000");
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(BoardConfig::from_yaml("  \n").unwrap(), BoardConfig::default());
    }
}
