//! Application layer for chatcast
//!
//! This crate contains the completion orchestration use case and the port
//! definitions its collaborators implement. It depends only on the domain
//! layer.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::completion_client::{
    CompletionError, CompletionMessage, CompletionRequest, CompletionStreamHandle,
    StreamingCompletionClient,
};
pub use use_cases::complete_chat::{
    CompleteChatError, CompleteChatInput, CompleteChatUseCase, CompletionConfigInput,
    CompletionOutput,
};
