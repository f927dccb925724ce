//! Streaming events for completion responses.
//!
//! [`StreamEvent`] represents one item in a streaming completion response:
//! a text increment, the explicit end-of-stream marker, or a failure. The
//! sequence is forward-only and self-terminating — after a terminal event
//! no further events are emitted.

/// An event in a streaming completion response.
///
/// Used to bridge infrastructure-level streaming (e.g. SSE chunks from an
/// OpenAI-compatible endpoint) to the orchestrator, which accumulates deltas
/// into the cumulative reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A newly generated text fragment for the primary candidate.
    Delta(String),
    /// The explicit end-of-stream marker.
    Completed,
    /// A transport or protocol failure that aborted the stream.
    Error(String),
}

impl StreamEvent {
    /// Returns the text fragment if this is a Delta event.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if this event terminates the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed | StreamEvent::Error(_))
    }
}
