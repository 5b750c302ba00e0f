//! Wiring of HTTP clients and endpoints from a [`BoardConfig`]

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::cache_bust::CacheBuster;
use crate::config::BoardConfig;
use crate::error::Result;
use crate::export::GEOJSON_PATH;
use crate::refresh::{MapDocument, RefreshCoordinator};
use crate::report::{ReportLoader, REPORT_PATH};
use crate::stream::{HttpSimulationSource, SIMULATE_PATH};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Backend {
    pub config: BoardConfig,
    /// Bounded client for short requests (report, export)
    pub client: reqwest::Client,
    pub buster: Arc<CacheBuster>,
    pub report: Arc<ReportLoader>,
    pub simulation: Arc<HttpSimulationSource>,
}

impl Backend {
    pub fn new(config: BoardConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.request_timeout())
            .build()?;
        // No total timeout: a run lasts as long as the server computes
        let stream_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        let buster = Arc::new(CacheBuster::new());
        let report = Arc::new(ReportLoader::new(
            client.clone(),
            config.endpoint(REPORT_PATH)?,
            buster.clone(),
        ));
        let simulation = Arc::new(HttpSimulationSource::new(
            stream_client,
            config.endpoint(SIMULATE_PATH)?,
        ));

        Ok(Self {
            config,
            client,
            buster,
            report,
            simulation,
        })
    }

    pub fn coordinator(&self) -> Result<RefreshCoordinator> {
        let maps = MapDocument::from_config(&self.config)?;
        Ok(RefreshCoordinator::new(maps, self.buster.clone()))
    }

    pub fn geojson_url(&self) -> Result<Url> {
        self.config.endpoint(GEOJSON_PATH)
    }
}
