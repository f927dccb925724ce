//! Model profile value object

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Description of the remote model a conversation targets (Value Object)
///
/// `max_tokens` is the hard ceiling on the combined token count of all turns
/// sent to the model, in the same unit as [`ModelProfile::estimate_tokens`].
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    name: String,
    max_tokens: u32,
}

impl ModelProfile {
    pub fn new(name: impl Into<String>, max_tokens: u32) -> Result<Self, DomainError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DomainError::InvalidModelProfile(
                "model name is empty".to_string(),
            ));
        }
        if max_tokens == 0 {
            return Err(DomainError::InvalidModelProfile(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(Self { name, max_tokens })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Estimate the token count of `content` under this model's accounting.
    ///
    /// Deterministic byte-length heuristic (~4 bytes per token, rounded up).
    /// The unit only has to be consistent within one conversation; the
    /// profile's ceiling is expressed in the same unit.
    pub fn estimate_tokens(&self, content: &str) -> u32 {
        (content.len() as u32).div_ceil(4)
    }
}

impl std::fmt::Display for ModelProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
