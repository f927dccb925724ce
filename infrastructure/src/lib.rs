//! Infrastructure layer for chatcast
//!
//! This crate contains adapters that implement the ports defined in the
//! domain and application layers, plus configuration file loading.

pub mod config;
pub mod openai;
pub mod store;

// Re-export commonly used types
pub use config::{ApiConfig, CompletionDefaults, ConfigLoader, FileConfig};
pub use openai::OpenAiCompletionClient;
pub use store::InMemoryConversationStore;
