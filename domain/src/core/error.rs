//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid model profile: {0}")]
    InvalidModelProfile(String),

    #[error("Invalid conversation config: {0}")]
    InvalidConfig(String),

    #[error(
        "Token budget exceeded: turn needs {needed} tokens, {available} of {limit} available"
    )]
    TokenBudgetExceeded {
        needed: u32,
        available: u32,
        limit: u32,
    },
}

impl DomainError {
    /// Check if this error represents a token budget violation
    pub fn is_budget_exceeded(&self) -> bool {
        matches!(self, DomainError::TokenBudgetExceeded { .. })
    }
}
