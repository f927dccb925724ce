//! Conversation configuration value object

use crate::conversation::model_profile::ModelProfile;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Sampling and decoding parameters for a conversation (Value Object)
///
/// Fixed at conversation creation time; there is no mid-conversation model
/// or parameter switching. `max_tokens` caps the completion length of one
/// response, while `model.max_tokens()` caps the whole turn history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationConfig {
    pub model: ModelProfile,
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub n: u32,
    pub stop: Vec<String>,
    pub max_tokens: u32,
}

impl ConversationConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.n == 0 {
            return Err(DomainError::InvalidConfig(
                "n must be at least 1".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(DomainError::InvalidConfig(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
