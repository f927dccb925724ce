//! Conversation domain.
//!
//! - [`entities::Conversation`] — the persisted aggregate root
//! - [`value_objects::Turn`] — one role-attributed message in a conversation
//! - [`model_profile::ModelProfile`] — target model and its token ceiling
//! - [`config::ConversationConfig`] — sampling parameters, fixed at creation
//! - [`repository::ConversationStore`] — trait for conversation persistence
//! - [`stream::StreamEvent`] — increments emitted by a streaming backend

pub mod config;
pub mod entities;
pub mod model_profile;
pub mod repository;
pub mod stream;
pub mod value_objects;
