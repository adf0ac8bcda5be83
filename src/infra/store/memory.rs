//! In-memory store backend.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{RelayError, StoreClient};

/// Simple in-memory keyed store for development/testing.
#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Body stored under `id`, if any.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<String> {
        self.rows.lock().get(id).cloned()
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StoreClient for InMemoryStore {
    async fn save(&self, id: &str, body: &str) -> Result<(), RelayError> {
        self.rows.lock().insert(id.to_string(), body.to_string());
        Ok(())
    }
}
