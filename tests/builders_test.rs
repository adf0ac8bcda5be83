//! Tests for building clients and relays from configuration

use message_relay::builders::{build_queue, build_relay, build_store};
use message_relay::config::{
    Consistency, QueueBackendConfig, QueueConfig, RelayConfig, StoreBackendConfig, StoreConfig,
};
use message_relay::core::{QueueClient, RelayError, ShutdownReason, StoreClient};
use message_relay::util::telemetry::LogContext;

fn queue_config(backend: QueueBackendConfig, url: &str) -> QueueConfig {
    QueueConfig {
        backend,
        url: url.into(),
        ..QueueConfig::default()
    }
}

fn store_config(backend: StoreBackendConfig, contact_point: &str) -> StoreConfig {
    StoreConfig {
        backend,
        contact_point: contact_point.into(),
        keyspace: "relay".into(),
        consistency: Consistency::One,
    }
}

#[tokio::test]
async fn test_build_in_memory_queue() {
    let queue = build_queue(&queue_config(QueueBackendConfig::InMemory, "memory://q"))
        .await
        .unwrap();
    assert_eq!(queue.endpoint(), "memory://q");

    let ack = queue.send("Hello").await.unwrap();
    let message = queue.receive().await.unwrap().unwrap();
    assert_eq!(message.id, ack.message_id);
}

#[tokio::test]
async fn test_build_file_queue_strips_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("file://{}", dir.path().display());

    let queue = build_queue(&queue_config(QueueBackendConfig::File, &url)).await.unwrap();
    queue.send("Hello").await.unwrap();

    assert!(dir.path().join("queue.jsonl").exists());
}

#[tokio::test]
async fn test_build_queue_rejects_invalid_config() {
    let result = build_queue(&queue_config(QueueBackendConfig::InMemory, "")).await;
    assert!(matches!(result, Err(RelayError::Config(_))));

    let result = build_queue(&queue_config(QueueBackendConfig::Sqs, "TomsTestQueue")).await;
    assert!(matches!(result, Err(RelayError::Config(_))));
}

#[tokio::test]
async fn test_build_queue_applies_max_depth() {
    let cfg = QueueConfig {
        max_depth: 1,
        ..queue_config(QueueBackendConfig::InMemory, "memory://q")
    };
    let queue = build_queue(&cfg).await.unwrap();

    queue.send("first").await.unwrap();
    assert!(matches!(queue.send("second").await, Err(RelayError::QueueSend(_))));
}

#[tokio::test]
async fn test_build_sqs_queue_without_contacting_aws() {
    let url = "https://sqs.eu-west-1.amazonaws.com/000000000000/relay";
    let cfg = QueueConfig {
        region: Some("eu-west-1".into()),
        ..queue_config(QueueBackendConfig::Sqs, url)
    };

    let queue = build_queue(&cfg).await.unwrap();
    assert_eq!(queue.endpoint(), url);
}

#[tokio::test]
async fn test_build_cassandra_store_requires_contact_point() {
    let result = build_store(&store_config(StoreBackendConfig::Cassandra, "")).await;
    assert!(matches!(result, Err(RelayError::Config(_))));
}

#[tokio::test]
async fn test_build_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = build_store(&store_config(StoreBackendConfig::File, &dir.path().display().to_string()))
        .await
        .unwrap();

    store.save("123", "Hello").await.unwrap();
    assert!(dir.path().join("relay").join("messages.jsonl").exists());
}

#[tokio::test]
async fn test_build_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = build_store(&store_config(StoreBackendConfig::Sqlite, &dir.path().display().to_string()))
        .await
        .unwrap();

    store.save("123", "Hello").await.unwrap();
    assert!(dir.path().join("relay.db").exists());
}

#[tokio::test]
async fn test_build_store_rejects_missing_contact_point() {
    let result = build_store(&store_config(StoreBackendConfig::Sqlite, "")).await;
    assert!(matches!(result, Err(RelayError::Config(_))));
}

#[tokio::test]
async fn test_build_relay_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = RelayConfig {
        queue: queue_config(QueueBackendConfig::InMemory, "memory://relay"),
        store: store_config(StoreBackendConfig::File, &dir.path().display().to_string()),
        payload: "ping".into(),
        shutdown_timeout_secs: 5,
        worker_threads: Some(1),
    };

    let handle = build_relay(&cfg, LogContext::new("builder-test"))
        .await
        .unwrap()
        .start();

    for _ in 0..100 {
        if handle.stats().saved > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let stats = handle.shutdown(ShutdownReason::Programmatic("test".into())).await;
    assert!(stats.saved > 0);

    let log = std::fs::read_to_string(dir.path().join("relay").join("messages.jsonl")).unwrap();
    assert!(log.lines().count() as u64 >= stats.saved);
    assert!(log.contains("\"body\":\"ping\""));
}
