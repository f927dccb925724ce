//! OpenAI-compatible streaming completion client

use crate::config::ApiConfig;
use crate::openai::protocol::{ChatCompletionBody, LineBuffer, SseFrame, parse_sse_line};
use async_trait::async_trait;
use chatcast_application::{
    CompletionError, CompletionRequest, CompletionStreamHandle, StreamingCompletionClient,
};
use chatcast_domain::StreamEvent;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Capacity of the per-request event channel. A full channel applies
/// backpressure to the SSE reader instead of dropping increments.
const STREAM_CHANNEL_CAPACITY: usize = 32;

/// [`StreamingCompletionClient`] adapter for an OpenAI-compatible
/// `/chat/completions` endpoint.
///
/// Does not buffer the full response: a background task forwards each SSE
/// chunk's text fragment as a [`StreamEvent::Delta`] the moment it decodes.
pub struct OpenAiCompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompletionClient {
    pub fn new(config: &ApiConfig) -> Result<Self, CompletionError> {
        // No overall request timeout: a streaming response stays open for
        // the duration of the generation.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| CompletionError::Other(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl StreamingCompletionClient for OpenAiCompletionClient {
    async fn stream_chat(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionStreamHandle, CompletionError> {
        let body = ChatCompletionBody::from(&request);
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = body.model.as_str(), url = url.as_str(), "Opening completion stream");

        let mut http_request = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let detail = failure_detail(response.text().await);
            return Err(CompletionError::RequestFailed(format!(
                "HTTP {status}: {detail}"
            )));
        }

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(forward_sse(response, tx));
        Ok(CompletionStreamHandle::new(rx))
    }
}

fn map_transport_error(error: reqwest::Error) -> CompletionError {
    if error.is_timeout() {
        CompletionError::Timeout
    } else {
        CompletionError::RequestFailed(error.to_string())
    }
}

/// Detail string for a non-2xx response; a failed body read is reported
/// rather than collapsed to an empty string.
fn failure_detail<E: std::fmt::Display>(body: Result<String, E>) -> String {
    match body {
        Ok(text) => text,
        Err(e) => format!("(failed to read error body: {e})"),
    }
}

/// Read the SSE body to exhaustion, forwarding events until a terminal one.
///
/// Stops early if the receiver is dropped — the consumer walked away and
/// nothing downstream will read further events.
async fn forward_sse(response: reqwest::Response, tx: mpsc::Sender<StreamEvent>) {
    let mut bytes = response.bytes_stream();
    let mut lines = LineBuffer::new();
    let mut finished = false;

    while let Some(read) = bytes.next().await {
        let chunk = match read {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                return;
            }
        };
        for line in lines.push(&chunk) {
            match parse_sse_line(&line) {
                Ok(Some(SseFrame::Done)) => {
                    let _ = tx.send(StreamEvent::Completed).await;
                    return;
                }
                Ok(Some(SseFrame::Chunk(chunk))) => {
                    if let Some(delta) = chunk.delta_content()
                        && !delta.is_empty()
                    {
                        if tx.send(StreamEvent::Delta(delta.to_string())).await.is_err() {
                            return;
                        }
                    }
                    if chunk.is_finished() {
                        finished = true;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Undecodable SSE payload: {e}");
                    let _ = tx
                        .send(StreamEvent::Error(format!("invalid SSE payload: {e}")))
                        .await;
                    return;
                }
            }
        }
    }

    // Some endpoints close the connection after the final finish_reason
    // chunk without sending [DONE]
    if finished {
        let _ = tx.send(StreamEvent::Completed).await;
    } else {
        let _ = tx
            .send(StreamEvent::Error(
                "response body ended without completion".to_string(),
            ))
            .await;
    }
}
