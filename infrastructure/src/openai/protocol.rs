//! Wire protocol for OpenAI-compatible streaming chat completions.
//!
//! The endpoint answers a `stream: true` request with server-sent events:
//! one `data: {json}` line per chunk, terminated by a literal `data: [DONE]`.
//! Chunks arrive on a byte stream that does not respect line boundaries, so
//! [`LineBuffer`] reassembles complete lines across network reads and
//! [`parse_sse_line`] classifies each one.

use chatcast_application::CompletionRequest;
use serde::{Deserialize, Serialize};

/// Request body for `POST /chat/completions`.
#[derive(Debug, Serialize)]
pub struct ChatCompletionBody {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub n: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    pub max_tokens: u32,
    pub stream: bool,
}

/// One role/content pair in the request body.
#[derive(Debug, Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

impl From<&CompletionRequest> for ChatCompletionBody {
    fn from(request: &CompletionRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|message| WireMessage {
                    role: message.role.as_str(),
                    content: message.content.clone(),
                })
                .collect(),
            temperature: request.temperature,
            top_p: request.top_p,
            presence_penalty: request.presence_penalty,
            frequency_penalty: request.frequency_penalty,
            n: request.n,
            stop: request.stop.clone(),
            max_tokens: request.max_tokens,
            stream: request.stream,
        }
    }
}

/// One decoded streaming chunk.
#[derive(Debug, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

impl StreamChunk {
    /// Text fragment of the primary candidate (choice index 0), if any.
    pub fn delta_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }

    /// True once the primary candidate reports a finish reason.
    pub fn is_finished(&self) -> bool {
        self.choices
            .first()
            .is_some_and(|choice| choice.finish_reason.is_some())
    }
}

#[derive(Debug, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}

/// A classified SSE line.
#[derive(Debug)]
pub enum SseFrame {
    /// A decoded data chunk.
    Chunk(StreamChunk),
    /// The `data: [DONE]` terminator.
    Done,
}

/// Classify one complete SSE line.
///
/// Returns `None` for empty lines, comments, and non-`data:` fields. A
/// `data:` payload that fails to decode is an error the caller surfaces —
/// silently skipping it could drop increments.
pub fn parse_sse_line(line: &str) -> Result<Option<SseFrame>, serde_json::Error> {
    let Some(data) = line.strip_prefix("data:").map(str::trim_start) else {
        return Ok(None);
    };
    if data == "[DONE]" {
        return Ok(Some(SseFrame::Done));
    }
    serde_json::from_str(data).map(|chunk| Some(SseFrame::Chunk(chunk)))
}

/// Reassembles complete lines from network reads that split anywhere.
///
/// Buffers raw bytes and decodes only complete lines: a read boundary can
/// fall inside a multi-byte UTF-8 character, and decoding the fragments
/// separately would mangle it into replacement characters.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read; returns the complete lines it finished.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=newline).collect();
            while matches!(line.last(), Some(b'\n' | b'\r')) {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }
}
