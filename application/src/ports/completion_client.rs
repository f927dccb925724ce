//! Streaming completion client port
//!
//! Defines the interface for issuing streaming chat completion requests to a
//! remote model backend.

use async_trait::async_trait;
use chatcast_domain::{Conversation, Role, StreamEvent};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur when establishing a completion stream
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// One role/content pair in the wire-format turn history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionMessage {
    pub role: Role,
    pub content: String,
}

/// A streaming chat completion request
///
/// Carries the full ordered turn history plus the sampling parameters fixed
/// in the conversation's config. `stream` is always set by
/// [`CompletionRequest::from_conversation`] — incremental delivery is the
/// entire reason this port exists.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<CompletionMessage>,
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub n: u32,
    pub stop: Vec<String>,
    pub max_tokens: u32,
    pub stream: bool,
}

impl CompletionRequest {
    /// Project a conversation's turn history and config to the wire format.
    pub fn from_conversation(conversation: &Conversation) -> Self {
        let config = conversation.config();
        Self {
            model: config.model.name().to_string(),
            messages: conversation
                .turns()
                .iter()
                .map(|turn| CompletionMessage {
                    role: turn.role(),
                    content: turn.content().to_string(),
                })
                .collect(),
            temperature: config.temperature,
            top_p: config.top_p,
            presence_penalty: config.presence_penalty,
            frequency_penalty: config.frequency_penalty,
            n: config.n,
            stop: config.stop.clone(),
            max_tokens: config.max_tokens,
            stream: true,
        }
    }
}

/// Handle for receiving events from an in-flight completion stream.
///
/// Wraps an `mpsc::Receiver<StreamEvent>`: forward-only, non-restartable,
/// terminated by [`StreamEvent::Completed`] or [`StreamEvent::Error`].
pub struct CompletionStreamHandle {
    receiver: mpsc::Receiver<StreamEvent>,
}

impl CompletionStreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Receive the next event, or `None` if the producer went away without
    /// sending a terminal event.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }
}

/// Client for streaming chat completions
///
/// The client does not buffer the full response; it forwards increments as
/// the backend produces them. Implementations live in the infrastructure
/// layer.
#[async_trait]
pub trait StreamingCompletionClient: Send + Sync {
    /// Issue a streaming completion request and return a handle for the
    /// incremental response.
    async fn stream_chat(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionStreamHandle, CompletionError>;
}
