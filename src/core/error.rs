//! Error types for relay operations.

use thiserror::Error;

/// Errors produced by relay components.
///
/// Client failures (`QueueSend`, `QueueReceive`, `StoreWrite`) never cross a task
/// boundary: the task that observes one logs it and moves on.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The queue service rejected or failed a send.
    #[error("queue send failed: {0}")]
    QueueSend(String),
    /// The queue service failed a receive.
    #[error("queue receive failed: {0}")]
    QueueReceive(String),
    /// The store failed an upsert.
    #[error("store write failed: {0}")]
    StoreWrite(String),
    /// The hand-off was closed while a message was waiting for the slot.
    #[error("hand-off closed")]
    HandOffClosed,
    /// Configuration could not be parsed or failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Backend-specific failure while opening a client.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
