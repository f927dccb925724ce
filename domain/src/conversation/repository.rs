//! Conversation repository trait

use crate::conversation::entities::Conversation;
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a [`ConversationStore`]
///
/// `NotFound` is a distinct variant rather than a message to match on: the
/// orchestrator treats it as "create a new conversation", while every other
/// variant is fatal to the call.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Conversation already exists: {0}")]
    AlreadyExists(String),

    #[error("Stale version for conversation {id}: tried {attempted}, stored {stored}")]
    VersionConflict {
        id: String,
        attempted: u64,
        stored: u64,
    },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Repository trait for conversation persistence
///
/// The store is the sole authority on durability; callers never cache
/// conversations across calls. Implementations live in the infrastructure
/// layer.
///
/// Concurrent saves to the same id are serialized with an optimistic version
/// check: `save` compares the conversation's version against the stored one
/// and rejects a stale write with [`StoreError::VersionConflict`].
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist a new conversation. Fails if the id is already taken.
    async fn create(&self, conversation: &Conversation) -> Result<(), StoreError>;

    /// Fetch a conversation by id.
    async fn find_by_id(&self, id: &str) -> Result<Conversation, StoreError>;

    /// Overwrite the persisted state of an existing conversation.
    ///
    /// Returns the new stored version on success.
    async fn save(&self, conversation: &Conversation) -> Result<u64, StoreError>;
}
