//! Document Loader - fetches the latest design report
//!
//! Every call carries a fresh cache-busting stamp: the same endpoint serves
//! new content after each completed run.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::cache_bust::CacheBuster;
use crate::error::LoadError;

pub const REPORT_PATH: &str = "/api/report";

/// Lines of the report shown in the simulation panel preview
pub const PREVIEW_LINES: usize = 12;

/// Most recently fetched report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    /// Markdown text
    pub content: String,
    pub fetched_at: SystemTime,
}

impl ReportDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            fetched_at: SystemTime::now(),
        }
    }

    /// Leading non-empty lines used for the summary rendering
    pub fn preview(&self, max_lines: usize) -> Vec<&str> {
        self.content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .take(max_lines)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ReportBody {
    content: String,
}

/// Anything able to produce the current report
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn load(&self) -> Result<ReportDocument, LoadError>;
}

/// HTTP loader for `GET /api/report`
#[derive(Clone)]
pub struct ReportLoader {
    client: reqwest::Client,
    endpoint: Url,
    buster: Arc<CacheBuster>,
}

impl ReportLoader {
    pub fn new(client: reqwest::Client, endpoint: Url, buster: Arc<CacheBuster>) -> Self {
        Self {
            client,
            endpoint,
            buster,
        }
    }

    /// Address the next `load` will request
    pub fn next_url(&self) -> Url {
        self.buster.bust(&self.endpoint)
    }
}

#[async_trait]
impl ReportSource for ReportLoader {
    async fn load(&self) -> Result<ReportDocument, LoadError> {
        let url = self.next_url();
        tracing::debug!(url = %url, "Fetching report");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "Report request rejected");
            return Err(LoadError::Status {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let body: ReportBody =
            serde_json::from_str(&text).map_err(|e| LoadError::Decode(e.to_string()))?;

        tracing::info!(bytes = body.content.len(), "Report loaded");
        Ok(ReportDocument::new(body.content))
    }
}

/// What a panel shows for a load attempt
pub fn render_result(result: &Result<ReportDocument, LoadError>) -> String {
    match result {
        Ok(doc) => doc.content.clone(),
        Err(e) => format!("Error loading report: {e}"),
    }
}
