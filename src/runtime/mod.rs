//! Tokio runtime construction.

use tokio::runtime::{Builder, Runtime};

/// Create a multi-threaded runtime with the given number of worker threads.
///
/// # Errors
///
/// Returns the I/O error from the runtime builder.
pub fn build_runtime(worker_threads: usize) -> Result<Runtime, std::io::Error> {
    Builder::new_multi_thread()
        .worker_threads(worker_threads.max(1))
        .thread_name("relay-worker")
        .enable_all()
        .build()
}
