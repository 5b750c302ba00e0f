//! GeoJSON export of the proposed drainage network

use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{BoardError, Result};

pub const GEOJSON_PATH: &str = "/api/geojson";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Download the network and write it to `dest`. Returns the byte count.
pub async fn download_geojson(
    client: &reqwest::Client,
    endpoint: &Url,
    dest: &Path,
) -> Result<u64> {
    tracing::debug!(url = %endpoint, dest = %dest.display(), "Downloading GeoJSON");
    let response = client.get(endpoint.clone()).send().await?;
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let reason = serde_json::from_slice::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| format!("server answered {status}"));
        return Err(BoardError::Export { reason });
    }

    // The payload must at least be JSON before it replaces a previous export
    serde_json::from_slice::<serde_json::Value>(&body).map_err(|e| BoardError::Export {
        reason: format!("response is not GeoJSON: {e}"),
    })?;

    tokio::fs::write(dest, &body).await?;
    tracing::info!(bytes = body.len(), dest = %dest.display(), "GeoJSON exported");
    Ok(body.len() as u64)
}
