//! Capability contracts for the queue and the store.
//!
//! Tasks only ever see these traits, so tests can substitute in-memory fakes
//! without touching task logic. Each call is a single self-contained round trip;
//! implementations hold no multi-call transaction state and must be safe to share
//! across tasks behind an `Arc`.

use async_trait::async_trait;

use super::{Ack, Message, RelayError};

/// Send/receive access to a remote message queue.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Submit one message with the given body.
    async fn send(&self, body: &str) -> Result<Ack, RelayError>;

    /// Request at most one message.
    ///
    /// Returns `Ok(None)` when nothing is currently deliverable. The message is not
    /// removed from the queue; it may be delivered again later.
    async fn receive(&self) -> Result<Option<Message>, RelayError>;

    /// Identifier of the target queue, used in log lines.
    fn endpoint(&self) -> &str;
}

/// Keyed upsert access to a durable store.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Upsert `body` under `id`. Writing the same id twice overwrites.
    async fn save(&self, id: &str, body: &str) -> Result<(), RelayError>;
}
