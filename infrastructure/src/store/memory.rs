//! In-memory conversation store

use async_trait::async_trait;
use chatcast_domain::{Conversation, ConversationStore, StoreError};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory [`ConversationStore`] backed by a `HashMap`.
///
/// Serializes concurrent updates to the same conversation id with an
/// optimistic version check: a `save` whose base version no longer matches
/// the stored one is rejected with [`StoreError::VersionConflict`] instead of
/// silently overwriting the other writer's turn history.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored conversations.
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create(&self, conversation: &Conversation) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        if conversations.contains_key(conversation.id()) {
            return Err(StoreError::AlreadyExists(conversation.id().to_string()));
        }
        let mut stored = conversation.clone();
        stored.set_version(0);
        debug!(conversation_id = conversation.id(), "Created conversation");
        conversations.insert(stored.id().to_string(), stored);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Conversation, StoreError> {
        self.conversations
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn save(&self, conversation: &Conversation) -> Result<u64, StoreError> {
        let mut conversations = self.conversations.write().await;
        let stored_version = match conversations.get(conversation.id()) {
            Some(stored) => stored.version(),
            None => return Err(StoreError::NotFound(conversation.id().to_string())),
        };
        if conversation.version() != stored_version {
            return Err(StoreError::VersionConflict {
                id: conversation.id().to_string(),
                attempted: conversation.version(),
                stored: stored_version,
            });
        }
        let mut updated = conversation.clone();
        updated.set_version(stored_version + 1);
        let version = updated.version();
        debug!(
            conversation_id = conversation.id(),
            version, "Saved conversation"
        );
        conversations.insert(updated.id().to_string(), updated);
        Ok(version)
    }
}
