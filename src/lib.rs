//! # Message Relay
//!
//! A three-stage relay that produces test messages into a remote queue, polls the
//! queue for inbound messages, and persists consumed messages into a durable store.
//!
//! ## Stages
//!
//! - **Producer**: sends a fixed payload to the queue in an unthrottled loop
//!   (a load generator, not a rate-limited publisher).
//! - **Consumer**: receives at most one message per call and forwards it through a
//!   single-slot hand-off.
//! - **Persister**: takes one message at a time off the hand-off and upserts it into
//!   the store, keyed by the queue-assigned message id.
//!
//! Every client failure is logged and swallowed: nothing is retried, nothing crosses
//! a task boundary, and no task stops because of a failure. The only exit is an
//! external shutdown, which closes the hand-off so blocked tasks are released.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use message_relay::core::{Relay, RelaySettings, ShutdownReason};
//! use message_relay::infra::{InMemoryQueue, InMemoryStore};
//!
//! let queue = Arc::new(InMemoryQueue::new("memory://relay", Duration::from_secs(30)));
//! let store = Arc::new(InMemoryStore::new());
//!
//! let handle = Relay::new(queue, store, RelaySettings::default()).start();
//! // ... later
//! let stats = handle.shutdown(ShutdownReason::Programmatic("done".into())).await;
//! println!("saved {} messages", stats.saved);
//! ```
//!
//! Backends are selected from configuration by [`builders::build_relay`]; see
//! [`config::RelayConfig`] for the recognised settings.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core relay abstractions: messages, client contracts, hand-off, tasks and wiring.
pub mod core;
/// Configuration models for the queue, store and relay process.
pub mod config;
/// Builders to construct clients and the relay from configuration.
pub mod builders;
/// Infrastructure adapters for queue and store backends.
pub mod infra;
/// Tokio runtime construction.
pub mod runtime;
/// Shared utilities.
pub mod util;
