//! Producer, consumer and persister loops.
//!
//! Each task exposes a single-iteration `step` and an unbounded `run` loop. Every
//! client failure is logged and swallowed; nothing is retried and no failure ends
//! a loop. Loops yield to the scheduler between iterations but never sleep.

use std::sync::Arc;

use super::{HandOff, Message, QueueClient, RelayError, RelayStats, ShutdownSignal, StoreClient};

/// Default payload sent by the producer.
pub const DEFAULT_PAYLOAD: &str = "Hello, World!";

/// Result of one producer iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The queue accepted the message.
    Sent,
    /// The send failed and was logged.
    Failed,
}

/// Result of one consumer iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// A message was received and claimed by the persister.
    HandedOff,
    /// The queue had nothing deliverable.
    Empty,
    /// The receive failed and was logged.
    Failed,
    /// A message was received but the hand-off closed before it was claimed; the
    /// message is dropped.
    Closed,
}

/// Result of one persister iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The message was written to the store.
    Saved,
    /// The write failed; the message is dropped.
    Failed,
    /// The hand-off is closed and empty.
    Closed,
}

/// Unthrottled load generator sending a fixed payload.
pub struct Producer {
    queue: Arc<dyn QueueClient>,
    payload: String,
    stats: Arc<RelayStats>,
}

impl Producer {
    /// Create a producer sending `payload` to `queue`.
    pub fn new(queue: Arc<dyn QueueClient>, payload: impl Into<String>, stats: Arc<RelayStats>) -> Self {
        Self {
            queue,
            payload: payload.into(),
            stats,
        }
    }

    /// Send the payload once.
    pub async fn step(&self) -> SendOutcome {
        match self.queue.send(&self.payload).await {
            Ok(ack) => {
                self.stats.record_sent();
                tracing::info!(message_id = %ack.message_id, "sent message to queue");
                SendOutcome::Sent
            }
            Err(e) => {
                self.stats.record_send_failure();
                tracing::error!(error = %e, queue = %self.queue.endpoint(), "unable to send message to queue");
                SendOutcome::Failed
            }
        }
    }

    /// Send until shutdown is triggered.
    pub async fn run(self, shutdown: ShutdownSignal) {
        tracing::info!(queue = %self.queue.endpoint(), "producer started");
        while !shutdown.is_triggered() {
            self.step().await;
            tokio::task::yield_now().await;
        }
        tracing::info!("producer stopped");
    }
}

/// Polls the queue one message at a time and forwards deliveries to the hand-off.
pub struct Consumer {
    queue: Arc<dyn QueueClient>,
    handoff: Arc<HandOff<Message>>,
    stats: Arc<RelayStats>,
}

impl Consumer {
    /// Create a consumer reading from `queue` into `handoff`.
    pub fn new(queue: Arc<dyn QueueClient>, handoff: Arc<HandOff<Message>>, stats: Arc<RelayStats>) -> Self {
        Self {
            queue,
            handoff,
            stats,
        }
    }

    /// Receive once and, if a message arrived, wait for the persister to claim it.
    pub async fn step(&self) -> ConsumeOutcome {
        self.forward(self.queue.receive().await).await
    }

    async fn forward(&self, received: Result<Option<Message>, RelayError>) -> ConsumeOutcome {
        let message = match received {
            Ok(Some(message)) => message,
            Ok(None) => {
                self.stats.record_empty_receive();
                tracing::info!("zero messages received");
                return ConsumeOutcome::Empty;
            }
            Err(e) => {
                self.stats.record_receive_failure();
                tracing::error!(error = %e, queue = %self.queue.endpoint(), "unable to read message from queue");
                return ConsumeOutcome::Failed;
            }
        };

        self.stats.record_received();
        tracing::info!(message_id = %message.id, "got message from queue");

        let message_id = message.id.clone();
        match self.handoff.put(message).await {
            Ok(()) => {
                self.stats.record_handed_off();
                tracing::debug!(%message_id, "message handed off");
                ConsumeOutcome::HandedOff
            }
            Err(e) => {
                tracing::warn!(%message_id, error = %e, "dropping received message");
                ConsumeOutcome::Closed
            }
        }
    }

    /// Consume until shutdown is triggered or the hand-off closes.
    ///
    /// A receive still in flight when shutdown triggers is abandoned; whatever it
    /// would have delivered stays in the queue and becomes visible again later.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::info!(queue = %self.queue.endpoint(), "consumer started");
        loop {
            let received = tokio::select! {
                biased;
                () = shutdown.triggered() => break,
                received = self.queue.receive() => received,
            };
            if self.forward(received).await == ConsumeOutcome::Closed {
                break;
            }
            tokio::task::yield_now().await;
        }
        tracing::info!("consumer stopped");
    }
}

/// Takes messages off the hand-off and upserts them into the store.
pub struct Persister {
    store: Arc<dyn StoreClient>,
    handoff: Arc<HandOff<Message>>,
    stats: Arc<RelayStats>,
}

impl Persister {
    /// Create a persister writing messages from `handoff` into `store`.
    pub fn new(store: Arc<dyn StoreClient>, handoff: Arc<HandOff<Message>>, stats: Arc<RelayStats>) -> Self {
        Self {
            store,
            handoff,
            stats,
        }
    }

    /// Take one message and save it.
    pub async fn step(&self) -> PersistOutcome {
        let Some(message) = self.handoff.take().await else {
            return PersistOutcome::Closed;
        };

        match self.store.save(&message.id, &message.body).await {
            Ok(()) => {
                self.stats.record_saved();
                tracing::info!(message_id = %message.id, "message saved to store");
                PersistOutcome::Saved
            }
            Err(e) => {
                self.stats.record_save_failure();
                tracing::error!(message_id = %message.id, error = %e, "unable to save message to store");
                PersistOutcome::Failed
            }
        }
    }

    /// Persist until the hand-off is closed and drained.
    ///
    /// A message claimed off the hand-off before it closed is still written before
    /// the loop exits.
    pub async fn run(self) {
        tracing::info!("persister started");
        while self.step().await != PersistOutcome::Closed {
            tokio::task::yield_now().await;
        }
        tracing::info!("persister stopped");
    }
}
