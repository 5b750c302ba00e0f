//! View Navigator - which single panel is visible

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BoardError;

/// Dashboard panels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewId {
    Simulation,
    Report,
    FloodMap,
    RouteMap,
}

impl ViewId {
    pub const ALL: [ViewId; 4] = [
        ViewId::Simulation,
        ViewId::Report,
        ViewId::FloodMap,
        ViewId::RouteMap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulation => "simulation",
            Self::Report => "report",
            Self::FloodMap => "flood-map",
            Self::RouteMap => "route-map",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Simulation => "SIMULATION",
            Self::Report => "REPORT",
            Self::FloodMap => "FLOOD MAP",
            Self::RouteMap => "ROUTE MAP",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|v| v == self).unwrap_or(0)
    }

    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewId {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simulation" => Ok(Self::Simulation),
            "report" | "report-view" => Ok(Self::Report),
            "flood-map" => Ok(Self::FloodMap),
            "route-map" => Ok(Self::RouteMap),
            other => Err(BoardError::UnknownView {
                id: other.to_string(),
            }),
        }
    }
}

/// What the caller has to do after an activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Already active, nothing changed
    Unchanged,
    /// Switched panels
    Switched,
    /// Switched to the report panel; the report must be (re)fetched
    LoadReport,
}

/// Holds exactly one active view at all times
#[derive(Debug, Clone)]
pub struct ViewNavigator {
    active: ViewId,
}

impl ViewNavigator {
    pub fn new(initial: ViewId) -> Self {
        Self { active: initial }
    }

    pub fn active(&self) -> ViewId {
        self.active
    }

    pub fn is_active(&self, view: ViewId) -> bool {
        self.active == view
    }

    pub fn activate(&mut self, view: ViewId) -> Activation {
        if self.active == view {
            return Activation::Unchanged;
        }
        tracing::debug!(from = %self.active, to = %view, "Switching view");
        self.active = view;
        if view == ViewId::Report {
            Activation::LoadReport
        } else {
            Activation::Switched
        }
    }

    /// Activate by string id. Unknown ids leave the active view untouched.
    pub fn activate_id(&mut self, id: &str) -> Result<Activation, BoardError> {
        let view = id.parse::<ViewId>()?;
        Ok(self.activate(view))
    }
}

impl Default for ViewNavigator {
    fn default() -> Self {
        Self::new(ViewId::Simulation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_activation_requests_load_once() {
        let mut nav = ViewNavigator::default();
        assert_eq!(nav.activate(ViewId::Report), Activation::LoadReport);
        assert_eq!(nav.activate(ViewId::Report), Activation::Unchanged);
        assert!(nav.is_active(ViewId::Report));
    }

    #[test]
    fn test_switch_between_maps() {
        let mut nav = ViewNavigator::new(ViewId::FloodMap);
        assert_eq!(nav.activate(ViewId::RouteMap), Activation::Switched);
        assert_eq!(nav.active(), ViewId::RouteMap);
    }

    #[test]
    fn test_unknown_id_keeps_active_view() {
        let mut nav = ViewNavigator::new(ViewId::Report);
        let err = nav.activate_id("satellite").unwrap_err();
        assert!(matches!(err, BoardError::UnknownView { .. }));
        assert_eq!(nav.active(), ViewId::Report);
    }

    #[test]
    fn test_activate_by_id() {
        let mut nav = ViewNavigator::default();
        assert_eq!(nav.activate_id("report-view").unwrap(), Activation::LoadReport);
        assert_eq!(nav.activate_id("flood-map").unwrap(), Activation::Switched);
    }

    #[test]
    fn test_cycle_wraps() {
        assert_eq!(ViewId::RouteMap.next(), ViewId::Simulation);
        assert_eq!(ViewId::Simulation.prev(), ViewId::RouteMap);
        for view in ViewId::ALL {
            assert_eq!(view.next().prev(), view);
            assert_eq!(view.as_str().parse::<ViewId>().unwrap(), view);
        }
    }
}
