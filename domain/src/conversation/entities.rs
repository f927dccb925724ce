//! Conversation aggregate root

use crate::conversation::config::ConversationConfig;
use crate::conversation::value_objects::Turn;
use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted conversation with an LLM (Aggregate Root)
///
/// Invariants:
/// - seeded with a system turn at creation, so `turns` is never empty
/// - the running sum of turn token counts never exceeds the model profile's
///   ceiling; an append that would violate this fails and leaves the history
///   unchanged
/// - the turn history is append-only — never reordered, never deleted
///
/// `version` is the persisted revision counter. It is maintained by the
/// [`ConversationStore`](crate::ConversationStore), which rejects a save whose
/// base version is stale, so concurrent updates to the same id cannot
/// silently overwrite each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    id: String,
    owner_id: String,
    config: ConversationConfig,
    turns: Vec<Turn>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a conversation seeded with a system turn.
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        config: ConversationConfig,
        initial_system_message: impl Into<String>,
    ) -> Result<Self, DomainError> {
        config.validate()?;
        let system_turn = Turn::system(initial_system_message, &config.model);
        let now = Utc::now();
        let mut conversation = Self {
            id: id.into(),
            owner_id: owner_id.into(),
            config,
            turns: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        conversation.add_turn(system_turn)?;
        Ok(conversation)
    }

    /// Append a turn, enforcing the token ceiling.
    ///
    /// Fails without mutating the history if the turn's token count, combined
    /// with the existing turns, would exceed the model profile's ceiling.
    pub fn add_turn(&mut self, turn: Turn) -> Result<(), DomainError> {
        let limit = self.config.model.max_tokens();
        let used = self.tokens_used();
        let available = limit.saturating_sub(used);
        if turn.token_count() > available {
            return Err(DomainError::TokenBudgetExceeded {
                needed: turn.token_count(),
                available,
                limit,
            });
        }
        self.turns.push(turn);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn tokens_used(&self) -> u32 {
        self.turns.iter().map(Turn::token_count).sum()
    }

    pub fn remaining_tokens(&self) -> u32 {
        self.config.model.max_tokens().saturating_sub(self.tokens_used())
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Set the persisted revision. Called by the store, not by domain logic.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
