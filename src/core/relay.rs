//! Wiring of the producer, consumer and persister around a single hand-off.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::Instrument;

use super::tasks::DEFAULT_PAYLOAD;
use super::{
    Consumer, HandOff, Message, Persister, Producer, QueueClient, RelayStats, Shutdown,
    ShutdownReason, StatsSnapshot, StoreClient,
};
use crate::util::telemetry::LogContext;

/// Runtime settings for a relay.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Payload sent by the producer on every iteration.
    pub payload: String,
    /// How long shutdown waits for each task's in-flight call before aborting it.
    pub shutdown_timeout: Duration,
    /// Logging context handed to every task.
    pub log: LogContext,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            payload: DEFAULT_PAYLOAD.to_string(),
            shutdown_timeout: Duration::from_secs(10),
            log: LogContext::default(),
        }
    }
}

/// A relay that has not been started yet.
pub struct Relay {
    queue: Arc<dyn QueueClient>,
    store: Arc<dyn StoreClient>,
    settings: RelaySettings,
}

impl Relay {
    /// Create a relay over the given clients.
    pub fn new(queue: Arc<dyn QueueClient>, store: Arc<dyn StoreClient>, settings: RelaySettings) -> Self {
        Self {
            queue,
            store,
            settings,
        }
    }

    /// Spawn the three tasks on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn start(self) -> RelayHandle {
        let stats = Arc::new(RelayStats::new());
        let handoff = Arc::new(HandOff::<Message>::new());
        let shutdown = Shutdown::new();
        let log = &self.settings.log;

        let producer = Producer::new(Arc::clone(&self.queue), self.settings.payload, Arc::clone(&stats));
        let consumer = Consumer::new(Arc::clone(&self.queue), Arc::clone(&handoff), Arc::clone(&stats));
        let persister = Persister::new(self.store, Arc::clone(&handoff), Arc::clone(&stats));

        let tasks = vec![
            (
                "producer",
                tokio::spawn(producer.run(shutdown.signal()).instrument(log.task_span("producer"))),
            ),
            (
                "consumer",
                tokio::spawn(consumer.run(shutdown.signal()).instrument(log.task_span("consumer"))),
            ),
            (
                "persister",
                tokio::spawn(persister.run().instrument(log.task_span("persister"))),
            ),
        ];

        tracing::info!(app = %log.app(), queue = %self.queue.endpoint(), "relay started");

        RelayHandle {
            shutdown,
            handoff,
            stats,
            tasks,
            shutdown_timeout: self.settings.shutdown_timeout,
        }
    }
}

/// Handle to a running relay.
pub struct RelayHandle {
    shutdown: Shutdown,
    handoff: Arc<HandOff<Message>>,
    stats: Arc<RelayStats>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    shutdown_timeout: Duration,
}

impl RelayHandle {
    /// Current outcome counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether every task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|(_, task)| task.is_finished())
    }

    /// Stop the relay and return the final counters.
    ///
    /// No new iterations start once shutdown is triggered. The hand-off is closed
    /// so blocked puts and takes are released; each task then gets up to the
    /// configured timeout to finish its in-flight call before it is aborted.
    pub async fn shutdown(self, reason: ShutdownReason) -> StatsSnapshot {
        self.shutdown.trigger(reason);
        self.handoff.close();

        for (name, mut task) in self.tasks {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => tracing::debug!(task = name, "task finished"),
                Ok(Err(e)) => tracing::error!(task = name, error = %e, "task panicked"),
                Err(_) => {
                    tracing::warn!(task = name, timeout = ?self.shutdown_timeout, "task did not stop in time, aborting");
                    task.abort();
                }
            }
        }

        let stats = self.stats.snapshot();
        tracing::info!(
            sent = stats.sent,
            send_failures = stats.send_failures,
            received = stats.received,
            empty_receives = stats.empty_receives,
            receive_failures = stats.receive_failures,
            saved = stats.saved,
            save_failures = stats.save_failures,
            "relay stopped"
        );
        stats
    }
}
