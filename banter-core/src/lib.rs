//! Core types and utilities for banter
//!
//! This crate provides the configuration, error and conversation types
//! shared by the other banter components.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;

pub use error::{Error, Result};
pub use session::{Conversation, ConversationTurn};
