//! Core relay abstractions: messages, client contracts, hand-off, tasks and wiring.

pub mod client;
pub mod error;
pub mod handoff;
pub mod message;
pub mod relay;
pub mod shutdown;
pub mod stats;
pub mod tasks;

pub use client::{QueueClient, StoreClient};
pub use error::{AppResult, RelayError};
pub use handoff::HandOff;
pub use message::{Ack, Message, MAX_MESSAGES_PER_RECEIVE};
pub use relay::{Relay, RelayHandle, RelaySettings};
pub use shutdown::{wait_for_termination, Shutdown, ShutdownReason, ShutdownSignal};
pub use stats::{RelayStats, StatsSnapshot};
pub use tasks::{
    ConsumeOutcome, Consumer, PersistOutcome, Persister, Producer, SendOutcome, DEFAULT_PAYLOAD,
};
