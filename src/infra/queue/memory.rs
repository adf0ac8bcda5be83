//! In-memory queue with visibility-timeout redelivery.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{Ack, Message, QueueClient, RelayError, MAX_MESSAGES_PER_RECEIVE};
use crate::util::clock::now_ms;

/// Default maximum number of messages a local queue holds.
pub const DEFAULT_MAX_DEPTH: usize = 100_000;

/// Default time a message stays in a local queue after it was sent.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(300);

/// Delivery and capacity settings for the local queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueLimits {
    /// How long a received message stays hidden before it is delivered again.
    pub visibility_timeout: Duration,
    /// Sends fail once this many messages are held.
    pub max_depth: usize,
    /// Messages older than this are discarded, delivered or not.
    pub retention: Duration,
}

impl QueueLimits {
    /// Default depth and retention with the given visibility timeout.
    #[must_use]
    pub const fn with_visibility(visibility_timeout: Duration) -> Self {
        Self {
            visibility_timeout,
            max_depth: DEFAULT_MAX_DEPTH,
            retention: DEFAULT_RETENTION,
        }
    }
}

/// A queued message with its send time and the time it may be delivered again.
#[derive(Debug, Clone)]
pub(crate) struct QueuedMessage {
    pub(crate) message: Message,
    pub(crate) sent_at_ms: u128,
    visible_at_ms: u128,
}

/// Queue state shared by the in-memory and file-backed queues.
///
/// Receiving hides a message for the visibility timeout instead of removing it,
/// so a message is delivered again once the timeout lapses. Only retention
/// removes messages.
#[derive(Debug)]
pub(crate) struct VisibilityQueue {
    limits: QueueLimits,
    /// Deliverable now, oldest first.
    ready: VecDeque<QueuedMessage>,
    /// Hidden, ordered by the time they become visible again.
    in_flight: VecDeque<QueuedMessage>,
    /// No message can expire before this instant.
    next_expiry_ms: u128,
}

impl VisibilityQueue {
    pub(crate) const fn new(limits: QueueLimits) -> Self {
        Self {
            limits,
            ready: VecDeque::new(),
            in_flight: VecDeque::new(),
            next_expiry_ms: 0,
        }
    }

    /// Enqueue a freshly sent message.
    ///
    /// Fails when the queue is at its depth limit even after dropping expired
    /// messages.
    pub(crate) fn push(&mut self, message: Message, now_ms: u128) -> Result<(), String> {
        if self.len() >= self.limits.max_depth {
            self.expire(now_ms);
            if self.len() >= self.limits.max_depth {
                return Err(format!("queue is full ({} messages)", self.limits.max_depth));
            }
        }
        self.restore(message, now_ms);
        Ok(())
    }

    /// Enqueue a message with its original send time, bypassing the depth limit.
    pub(crate) fn restore(&mut self, message: Message, sent_at_ms: u128) {
        self.ready.push_back(QueuedMessage {
            message,
            sent_at_ms,
            visible_at_ms: sent_at_ms,
        });
    }

    /// Drop the most recently pushed message if it has `id` and was never delivered.
    pub(crate) fn withdraw_newest(&mut self, id: &str) {
        if self.ready.back().is_some_and(|queued| queued.message.id == id) {
            self.ready.pop_back();
        }
    }

    /// Deliver up to `max` visible messages, oldest first, hiding each one.
    pub(crate) fn receive_up_to(&mut self, max: usize, now_ms: u128) -> Vec<Message> {
        while self
            .in_flight
            .front()
            .is_some_and(|queued| queued.visible_at_ms <= now_ms)
        {
            if let Some(queued) = self.in_flight.pop_front() {
                self.ready.push_back(queued);
            }
        }

        let hidden_until = now_ms + self.limits.visibility_timeout.as_millis();
        let mut delivered = Vec::with_capacity(max.min(self.ready.len()));
        while delivered.len() < max {
            let Some(mut queued) = self.ready.pop_front() else {
                break;
            };
            if self.is_expired(&queued, now_ms) {
                continue;
            }
            queued.visible_at_ms = hidden_until;
            delivered.push(queued.message.clone());
            self.in_flight.push_back(queued);
        }
        delivered
    }

    /// Drop every expired message. Returns how many were dropped.
    pub(crate) fn expire(&mut self, now_ms: u128) -> usize {
        if now_ms < self.next_expiry_ms {
            return 0;
        }
        let before = self.len();
        let retention_ms = self.limits.retention.as_millis();
        self.ready
            .retain(|queued| now_ms.saturating_sub(queued.sent_at_ms) < retention_ms);
        self.in_flight
            .retain(|queued| now_ms.saturating_sub(queued.sent_at_ms) < retention_ms);
        self.next_expiry_ms = self
            .messages()
            .map(|queued| queued.sent_at_ms + retention_ms)
            .min()
            .unwrap_or(now_ms);
        before - self.len()
    }

    /// Every held message, deliverable ones first.
    pub(crate) fn messages(&self) -> impl Iterator<Item = &QueuedMessage> {
        self.ready.iter().chain(self.in_flight.iter())
    }

    pub(crate) fn len(&self) -> usize {
        self.ready.len() + self.in_flight.len()
    }

    fn is_expired(&self, queued: &QueuedMessage, now_ms: u128) -> bool {
        now_ms.saturating_sub(queued.sent_at_ms) >= self.limits.retention.as_millis()
    }
}

/// In-process queue for development and testing.
///
/// Mirrors the delivery semantics of a managed queue: message ids are assigned on
/// send, and received messages stay queued and reappear after the visibility
/// timeout. Depth and retention limits keep an unthrottled producer from growing
/// it without bound.
pub struct InMemoryQueue {
    endpoint: String,
    state: Mutex<VisibilityQueue>,
}

impl InMemoryQueue {
    /// Create an empty queue identified by `endpoint` with default depth and
    /// retention limits.
    pub fn new(endpoint: impl Into<String>, visibility_timeout: Duration) -> Self {
        Self::with_limits(endpoint, QueueLimits::with_visibility(visibility_timeout))
    }

    /// Create an empty queue with explicit limits.
    pub fn with_limits(endpoint: impl Into<String>, limits: QueueLimits) -> Self {
        Self {
            endpoint: endpoint.into(),
            state: Mutex::new(VisibilityQueue::new(limits)),
        }
    }

    /// Enqueue a message with a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::QueueSend`] if the queue is full.
    pub fn inject(&self, message: Message) -> Result<(), RelayError> {
        self.state
            .lock()
            .push(message, now_ms())
            .map_err(RelayError::QueueSend)
    }

    /// Number of messages held, visible or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    /// Whether the queue holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl QueueClient for InMemoryQueue {
    async fn send(&self, body: &str) -> Result<Ack, RelayError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.inject(Message::new(id.clone(), body))?;
        Ok(Ack { message_id: id })
    }

    async fn receive(&self) -> Result<Option<Message>, RelayError> {
        let mut delivered = self
            .state
            .lock()
            .receive_up_to(MAX_MESSAGES_PER_RECEIVE, now_ms());
        Ok(delivered.pop())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_depth: usize, retention_ms: u64) -> QueueLimits {
        QueueLimits {
            visibility_timeout: Duration::from_secs(30),
            max_depth,
            retention: Duration::from_millis(retention_ms),
        }
    }

    #[tokio::test]
    async fn test_send_then_receive() {
        let q = InMemoryQueue::new("memory://test", Duration::from_secs(30));
        let ack = q.send("Hello").await.unwrap();

        let message = q.receive().await.unwrap().unwrap();
        assert_eq!(message.id, ack.message_id);
        assert_eq!(message.body, "Hello");
    }

    #[tokio::test]
    async fn test_empty_queue() {
        let q = InMemoryQueue::new("memory://test", Duration::from_secs(30));
        assert!(q.receive().await.unwrap().is_none());
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn test_received_message_is_hidden_not_removed() {
        let q = InMemoryQueue::new("memory://test", Duration::from_secs(30));
        q.inject(Message::new("123", "Hello")).unwrap();

        assert!(q.receive().await.unwrap().is_some());
        assert!(q.receive().await.unwrap().is_none());
        assert_eq!(q.len(), 1);
    }

    #[tokio::test]
    async fn test_redelivery_after_visibility_timeout() {
        let q = InMemoryQueue::new("memory://test", Duration::ZERO);
        q.inject(Message::new("123", "Hello")).unwrap();

        let first = q.receive().await.unwrap().unwrap();
        let second = q.receive().await.unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_send_fails_at_max_depth() {
        let q = InMemoryQueue::with_limits("memory://test", limits(2, 60_000));
        q.send("one").await.unwrap();
        q.send("two").await.unwrap();

        let result = q.send("three").await;
        assert!(matches!(result, Err(RelayError::QueueSend(_))));
        assert_eq!(q.len(), 2);

        // Delivered messages still count against the depth
        assert!(q.receive().await.unwrap().is_some());
        assert!(q.send("four").await.is_err());
    }

    #[test]
    fn test_receive_respects_max() {
        let mut state = VisibilityQueue::new(QueueLimits::with_visibility(Duration::from_secs(30)));
        for i in 0..3 {
            state.push(Message::new(i.to_string(), "body"), 1_000).unwrap();
        }

        let delivered = state.receive_up_to(1, 1_000);
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].id, "0");

        // FIFO among visible messages
        let delivered = state.receive_up_to(5, 1_000);
        assert_eq!(delivered.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), ["1", "2"]);
    }

    #[test]
    fn test_expired_messages_are_not_delivered() {
        let mut state = VisibilityQueue::new(limits(10, 1_000));
        state.push(Message::new("old", "body"), 0).unwrap();
        state.push(Message::new("new", "body"), 900).unwrap();

        let delivered = state.receive_up_to(1, 1_500);
        assert_eq!(delivered[0].id, "new");
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_full_queue_makes_room_by_expiring() {
        let mut state = VisibilityQueue::new(limits(2, 1_000));
        state.push(Message::new("a", "body"), 0).unwrap();
        state.push(Message::new("b", "body"), 500).unwrap();
        assert!(state.push(Message::new("c", "body"), 800).is_err());

        // "a" has expired by now, "b" has not
        state.push(Message::new("c", "body"), 1_200).unwrap();
        let ids: Vec<&str> = state.messages().map(|q| q.message.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);
    }

    #[test]
    fn test_redelivered_message_expires_from_in_flight() {
        let mut state = VisibilityQueue::new(limits(10, 1_000));
        state.push(Message::new("a", "body"), 0).unwrap();
        assert_eq!(state.receive_up_to(1, 0).len(), 1);

        assert_eq!(state.expire(2_000), 1);
        assert_eq!(state.len(), 0);
    }
}
