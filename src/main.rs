//! `message-relay` binary: runs the producer, consumer and persister until SIGINT
//! or SIGTERM.

use anyhow::Context;

use message_relay::builders::build_relay;
use message_relay::config::RelayConfig;
use message_relay::core::{wait_for_termination, AppResult};
use message_relay::runtime::build_runtime;
use message_relay::util::telemetry::{init_tracing, LogContext, LogLevel};

fn main() -> AppResult<()> {
    let _ = dotenvy::dotenv();

    let level = LogLevel::from_env();
    init_tracing(level);

    let config = RelayConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("loading relay configuration")?;
    tracing::info!(%level, queue = %config.queue.url, store = ?config.store.backend, "configuration loaded");

    let runtime = build_runtime(config.worker_threads()).context("building tokio runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: RelayConfig) -> AppResult<()> {
    let relay = build_relay(&config, LogContext::default())
        .await
        .context("building relay")?;
    let handle = relay.start();

    let reason = wait_for_termination().await;
    let stats = handle.shutdown(reason).await;

    tracing::info!(stats = %serde_json::to_string(&stats)?, "final relay stats");
    Ok(())
}
