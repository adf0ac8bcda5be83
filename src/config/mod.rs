//! Configuration models for the queue, store and relay process.

pub mod relay;

pub use relay::{
    Consistency, QueueBackendConfig, QueueConfig, RelayConfig, StoreBackendConfig, StoreConfig,
    CONFIG_PATH_ENV,
};
