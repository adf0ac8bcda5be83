//! Builders to construct clients and the relay from configuration.

pub mod relay_builder;

pub use relay_builder::{build_queue, build_relay, build_store};
