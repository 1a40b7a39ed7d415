//! Shared types for the upstream relay

use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Error type for relay operations
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API error: {0}")]
    ApiError(String),
}

pub type RelayResult<T> = Result<T, RelayError>;

/// Events produced while re-streaming an upstream completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// An incremental text fragment from the upstream delta
    Delta(String),
    /// End of stream: sentinel seen or upstream closed
    Done,
}

pub type RelayEventStream = Pin<Box<dyn Stream<Item = RelayResult<RelayEvent>> + Send>>;
