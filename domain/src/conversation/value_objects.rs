//! Turn value objects

use crate::conversation::model_profile::ModelProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a turn in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire-format identifier for this role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One exchange participant's contribution to a conversation (Value Object)
///
/// Immutable. `token_count` is derived from `content` against the owning
/// conversation's [`ModelProfile`] at construction time — it is never copied
/// from elsewhere, so content and accounting cannot drift apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
    token_count: u32,
    created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>, model: &ModelProfile) -> Self {
        let content = content.into();
        let token_count = model.estimate_tokens(&content);
        Self {
            role,
            content,
            token_count,
            created_at: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>, model: &ModelProfile) -> Self {
        Self::new(Role::System, content, model)
    }

    pub fn user(content: impl Into<String>, model: &ModelProfile) -> Self {
        Self::new(Role::User, content, model)
    }

    pub fn assistant(content: impl Into<String>, model: &ModelProfile) -> Self {
        Self::new(Role::Assistant, content, model)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn token_count(&self) -> u32 {
        self.token_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
