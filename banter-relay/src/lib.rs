//! Upstream relay for banter
//!
//! This crate opens streaming completions against the upstream API and
//! re-frames each incremental text fragment as an event for the server to
//! forward.

pub mod base;
pub mod client;

pub use base::{RelayError, RelayEvent, RelayEventStream, RelayResult};
pub use client::CompletionClient;
