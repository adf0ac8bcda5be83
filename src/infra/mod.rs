//! Infrastructure adapters for queue and store backends.

pub mod queue;
pub mod store;
pub use queue::{FileQueue, InMemoryQueue, QueueLimits, SqsQueue};
pub use store::{CassandraStore, FileStore, InMemoryStore, SqliteStore};
