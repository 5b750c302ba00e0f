//! Refresh Coordinator - post-run reload of dependent views
//!
//! Runs once per successful run. Its three effects are independent:
//! map addresses are re-stamped, the report panel is reloaded when visible,
//! and the report preview is always reloaded. A failing effect is logged and
//! reported, never escalated into a run failure.

use std::sync::Arc;

use url::Url;

use crate::cache_bust::CacheBuster;
use crate::config::BoardConfig;
use crate::error::{LoadError, Result};
use crate::report::{ReportDocument, ReportSource};
use crate::runner::RunId;

/// An embedded map document and its current (cache-busted) address
#[derive(Debug, Clone, PartialEq)]
pub struct MapDocument {
    pub name: String,
    pub url: Url,
    /// Number of forced reloads so far
    pub reloads: u32,
}

impl MapDocument {
    pub fn new(name: impl Into<String>, url: Url) -> Self {
        Self {
            name: name.into(),
            url,
            reloads: 0,
        }
    }

    pub fn from_config(config: &BoardConfig) -> Result<Vec<Self>> {
        config
            .maps
            .iter()
            .map(|entry| Ok(Self::new(&entry.name, config.endpoint(&entry.path)?)))
            .collect()
    }
}

/// Async half of a refresh, produced by [`RefreshCoordinator::on_run_complete`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPlan {
    pub run_id: RunId,
    pub reload_report: bool,
}

/// Result of the async effects
#[derive(Debug)]
pub struct RefreshOutcome {
    pub run_id: RunId,
    /// `None` when the report panel was not visible
    pub report: Option<std::result::Result<ReportDocument, LoadError>>,
    pub preview: std::result::Result<ReportDocument, LoadError>,
}

impl RefreshPlan {
    pub async fn execute(self, loader: &dyn ReportSource) -> RefreshOutcome {
        let report = if self.reload_report {
            let result = loader.load().await;
            if let Err(e) = &result {
                tracing::warn!(run_id = self.run_id, error = %e, "Report refresh failed");
            }
            Some(result)
        } else {
            None
        };

        let preview = loader.load().await;
        if let Err(e) = &preview {
            tracing::warn!(run_id = self.run_id, error = %e, "Preview refresh failed");
        }

        RefreshOutcome {
            run_id: self.run_id,
            report,
            preview,
        }
    }
}

/// Owns the map documents and remembers which run was last refreshed
#[derive(Debug)]
pub struct RefreshCoordinator {
    maps: Vec<MapDocument>,
    buster: Arc<CacheBuster>,
    last_refreshed: Option<RunId>,
}

impl RefreshCoordinator {
    pub fn new(maps: Vec<MapDocument>, buster: Arc<CacheBuster>) -> Self {
        Self {
            maps,
            buster,
            last_refreshed: None,
        }
    }

    pub fn maps(&self) -> &[MapDocument] {
        &self.maps
    }

    pub fn map(&self, name: &str) -> Option<&MapDocument> {
        self.maps.iter().find(|m| m.name == name)
    }

    pub fn last_refreshed(&self) -> Option<RunId> {
        self.last_refreshed
    }

    /// Re-stamp every map address
    pub fn bust_maps(&mut self) {
        for map in &mut self.maps {
            map.url = self.buster.bust(&map.url);
            map.reloads += 1;
            tracing::debug!(map = %map.name, url = %map.url, "Map reloaded");
        }
    }

    /// Apply the synchronous effects for a completed run.
    ///
    /// Returns `None` if this run was already refreshed.
    pub fn on_run_complete(&mut self, run_id: RunId, report_active: bool) -> Option<RefreshPlan> {
        if self.last_refreshed == Some(run_id) {
            tracing::debug!(run_id, "Refresh already done for run");
            return None;
        }
        self.last_refreshed = Some(run_id);

        self.bust_maps();
        tracing::info!(run_id, maps = self.maps.len(), report_active, "Refreshing views");

        Some(RefreshPlan {
            run_id,
            reload_report: report_active,
        })
    }
}
