//! Message and acknowledgement types exchanged with the queue.

use serde::{Deserialize, Serialize};

/// Upper bound on messages requested from the queue by a single receive call.
///
/// The consumer forwards one message at a time through the hand-off, so asking the
/// queue for more would only leave extra deliveries invisible until they time out.
pub const MAX_MESSAGES_PER_RECEIVE: usize = 1;

/// A message delivered by the queue.
///
/// Identity is `id`, assigned by the queue on send. `body` is opaque and is never
/// parsed or validated by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Queue-assigned identifier.
    pub id: String,
    /// Opaque payload.
    pub body: String,
}

impl Message {
    /// Create a message from an id and body.
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
        }
    }
}

/// Acknowledgement returned by a successful send. Callers do not inspect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Identifier the queue assigned to the sent message.
    pub message_id: String,
}
