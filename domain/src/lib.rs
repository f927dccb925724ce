//! Domain layer for chatcast
//!
//! This crate contains the conversation aggregate, its value objects, and the
//! repository contract. It has no dependencies on infrastructure or
//! application concerns.
//!
//! # Core Concepts
//!
//! ## Conversation
//!
//! A [`Conversation`] is the unit of persistence: an ordered, append-only
//! history of [`Turn`]s plus a sampling configuration fixed at creation time.
//! Every conversation is seeded with a system turn, and the running token sum
//! of its turns never exceeds the model profile's ceiling.
//!
//! ## Streaming
//!
//! [`StreamEvent`] is the vocabulary produced by a streaming completion
//! backend: text increments, an explicit end-of-stream marker, or a failure.

pub mod conversation;
pub mod core;

// Re-export commonly used types
pub use conversation::{
    config::ConversationConfig,
    entities::Conversation,
    model_profile::ModelProfile,
    repository::{ConversationStore, StoreError},
    stream::StreamEvent,
    value_objects::{Role, Turn},
};
pub use crate::core::error::DomainError;
