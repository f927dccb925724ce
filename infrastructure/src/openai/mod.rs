//! OpenAI-compatible streaming completion adapter.
//!
//! - [`client::OpenAiCompletionClient`] — implements the
//!   [`StreamingCompletionClient`](chatcast_application::StreamingCompletionClient)
//!   port over an OpenAI-compatible `/chat/completions` endpoint
//! - [`protocol`] — wire DTOs and SSE frame parsing

pub mod client;
pub mod protocol;

pub use client::OpenAiCompletionClient;
