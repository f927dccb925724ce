//! Use cases

pub mod complete_chat;
