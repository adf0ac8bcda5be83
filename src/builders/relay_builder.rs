//! Builders to construct clients and the relay from configuration.

use std::sync::Arc;

use crate::config::{QueueBackendConfig, QueueConfig, RelayConfig, StoreBackendConfig, StoreConfig};
use crate::core::{QueueClient, Relay, RelayError, RelaySettings, StoreClient};
use crate::infra::{
    CassandraStore, FileQueue, FileStore, InMemoryQueue, InMemoryStore, SqliteStore, SqsQueue,
};
use crate::util::telemetry::LogContext;

/// Stream name of the file queue inside its directory.
const FILE_QUEUE_STREAM: &str = "queue";

/// Build the queue client selected by `cfg`.
///
/// # Errors
///
/// Returns [`RelayError::Config`] for invalid settings and
/// [`RelayError::Backend`] if the backend cannot be opened.
pub async fn build_queue(cfg: &QueueConfig) -> Result<Arc<dyn QueueClient>, RelayError> {
    cfg.validate().map_err(RelayError::Config)?;
    let queue: Arc<dyn QueueClient> = match cfg.backend {
        QueueBackendConfig::InMemory => Arc::new(InMemoryQueue::with_limits(cfg.url.clone(), cfg.limits())),
        QueueBackendConfig::File => Arc::new(FileQueue::open(cfg.file_path(), FILE_QUEUE_STREAM, cfg.limits())?),
        QueueBackendConfig::Sqs => Arc::new(
            SqsQueue::connect(
                cfg.url.clone(),
                cfg.region.as_deref(),
                cfg.endpoint_url.as_deref(),
                cfg.visibility_timeout(),
            )
            .await,
        ),
    };
    tracing::info!(backend = ?cfg.backend, endpoint = %queue.endpoint(), "queue client ready");
    Ok(queue)
}

/// Build the store client selected by `cfg`. The session is created once here
/// and shared by every caller.
///
/// # Errors
///
/// Returns [`RelayError::Config`] for invalid settings and
/// [`RelayError::Backend`] if the backend cannot be opened.
pub async fn build_store(cfg: &StoreConfig) -> Result<Arc<dyn StoreClient>, RelayError> {
    cfg.validate().map_err(RelayError::Config)?;
    let store: Arc<dyn StoreClient> = match cfg.backend {
        StoreBackendConfig::InMemory => Arc::new(InMemoryStore::new()),
        StoreBackendConfig::File => Arc::new(FileStore::open(
            &cfg.contact_point,
            &cfg.keyspace,
            cfg.consistency,
        )?),
        StoreBackendConfig::Sqlite => Arc::new(
            SqliteStore::connect(&cfg.contact_point, &cfg.keyspace, cfg.consistency).await?,
        ),
        StoreBackendConfig::Cassandra => Arc::new(
            CassandraStore::connect(&cfg.contact_point, &cfg.keyspace, cfg.consistency).await?,
        ),
    };
    tracing::info!(backend = ?cfg.backend, keyspace = %cfg.keyspace, "store client ready");
    Ok(store)
}

/// Build an unstarted relay from configuration.
///
/// # Errors
///
/// Propagates configuration and backend errors from the client builders.
pub async fn build_relay(cfg: &RelayConfig, log: LogContext) -> Result<Relay, RelayError> {
    cfg.validate().map_err(RelayError::Config)?;
    let queue = build_queue(&cfg.queue).await?;
    let store = build_store(&cfg.store).await?;
    let settings = RelaySettings {
        payload: cfg.payload.clone(),
        shutdown_timeout: cfg.shutdown_timeout(),
        log,
    };
    Ok(Relay::new(queue, store, settings))
}
