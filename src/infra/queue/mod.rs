//! Queue backends.

pub mod file;
pub mod memory;
pub mod sqs;

pub use file::FileQueue;
pub use memory::{InMemoryQueue, QueueLimits, DEFAULT_MAX_DEPTH, DEFAULT_RETENTION};
pub use sqs::SqsQueue;
