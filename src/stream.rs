//! Simulation stream transport
//!
//! Opens `GET /api/simulate?intensity=N` and forwards the response body as
//! [`RunMessage`]s. The reader suspends at each chunk, bounds every read by an
//! idle timeout and stops as soon as its cancellation token fires, dropping
//! the response.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::StreamError;
use crate::runner::{LogEvent, RunController, RunMessage, RunOutcome, RunRequest};

pub const SIMULATE_PATH: &str = "/api/simulate";

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// Producer of the byte stream for a run
#[async_trait]
pub trait SimulationSource: Send + Sync {
    async fn open(&self, request: &RunRequest) -> Result<ChunkStream, StreamError>;
}

/// HTTP source backed by reqwest
#[derive(Clone)]
pub struct HttpSimulationSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpSimulationSource {
    pub fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn request_url(&self, request: &RunRequest) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("intensity", &request.intensity.to_string());
        url
    }
}

#[async_trait]
impl SimulationSource for HttpSimulationSource {
    async fn open(&self, request: &RunRequest) -> Result<ChunkStream, StreamError> {
        let url = self.request_url(request);
        tracing::debug!(run_id = request.run_id, url = %url, "Opening simulation stream");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Status {
                status: status.as_u16(),
            });
        }

        Ok(Box::pin(response.bytes_stream().map_err(StreamError::from)))
    }
}

/// Read one run's stream into `tx` until it ends, fails or is cancelled.
///
/// Exactly one terminal message (`StreamEnd` or `Failed`) is sent unless the
/// run is cancelled or the receiver goes away.
pub async fn pump(
    source: &dyn SimulationSource,
    request: RunRequest,
    idle_timeout: Duration,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<RunMessage>,
) {
    let run_id = request.run_id;

    // Waiting for the response headers counts as a read
    let opened = tokio::select! {
        _ = cancel.cancelled() => return,
        opened = tokio::time::timeout(idle_timeout, source.open(&request)) => opened,
    };
    let stream = match opened {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            let _ = tx.send(RunMessage::failed(run_id, e));
            return;
        }
        Err(_elapsed) => {
            tracing::warn!(run_id, "Simulation server sent no response headers");
            let _ = tx.send(RunMessage::failed(
                run_id,
                StreamError::IdleTimeout {
                    secs: idle_timeout.as_secs(),
                },
            ));
            return;
        }
    };

    let stream = stream.timeout(idle_timeout);
    tokio::pin!(stream);

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(run_id, "Stream reader cancelled");
                return;
            }
            next = stream.next() => next,
        };

        let message = match next {
            Some(Ok(Ok(chunk))) => RunMessage::chunk(run_id, chunk),
            Some(Ok(Err(e))) => RunMessage::failed(run_id, e),
            Some(Err(_elapsed)) => RunMessage::failed(
                run_id,
                StreamError::IdleTimeout {
                    secs: idle_timeout.as_secs(),
                },
            ),
            None => RunMessage::end(run_id),
        };
        let terminal = !matches!(message.input, crate::runner::RunInput::Chunk(_));
        if tx.send(message).is_err() || terminal {
            return;
        }
    }
}

/// Drive a started run to its outcome, calling `on_log` for each new line.
pub async fn drive_run<F>(
    controller: &mut RunController,
    source: &dyn SimulationSource,
    request: RunRequest,
    idle_timeout: Duration,
    mut on_log: F,
) -> RunOutcome
where
    F: FnMut(&LogEvent),
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let reader = pump(source, request, idle_timeout, CancellationToken::new(), tx);
    tokio::pin!(reader);
    let mut reader_done = false;

    loop {
        let message = tokio::select! {
            _ = &mut reader, if !reader_done => {
                reader_done = true;
                continue;
            }
            message = rx.recv() => message,
        };

        let Some(message) = message else {
            // Reader finished without a terminal message
            return controller
                .dispatch(RunMessage::failed(request.run_id, StreamError::Incomplete))
                .unwrap_or(RunOutcome::Failed {
                    run_id: request.run_id,
                    error: StreamError::Incomplete,
                });
        };

        let seen = controller.log().len();
        let outcome = controller.dispatch(message);
        for event in &controller.log()[seen..] {
            on_log(event);
        }
        if let Some(outcome) = outcome {
            return outcome;
        }
    }
}
