//! File-backed store using an append-only JSON-lines log.

use std::collections::HashMap;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::Consistency;
use crate::core::{RelayError, StoreClient};

/// One upsert as written to disk.
#[derive(Debug, Serialize, Deserialize)]
struct Row {
    id: String,
    body: String,
}

/// Durable keyed store appending every write to
/// `<contact_point>/<keyspace>/messages.jsonl`.
///
/// On reopen the log is replayed and the last write for each id wins. With
/// [`Consistency::Quorum`] or [`Consistency::All`] every write is synced to disk
/// before `save` returns. Writes run on the blocking thread pool.
pub struct FileStore {
    file_path: PathBuf,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    file: File,
    consistency: Consistency,
    rows: HashMap<String, String>,
}

impl FileStore {
    /// Open (or create) the store for `keyspace` under `contact_point`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Backend`] if the directory or file cannot be opened or
    /// an existing log cannot be replayed.
    pub fn open(
        contact_point: impl AsRef<Path>,
        keyspace: &str,
        consistency: Consistency,
    ) -> Result<Self, RelayError> {
        let dir = contact_point.as_ref().join(keyspace);
        create_dir_all(&dir).map_err(|e| RelayError::Backend(e.to_string()))?;
        let file_path = dir.join("messages.jsonl");

        let rows = load_from_disk(&file_path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .map_err(|e| RelayError::Backend(e.to_string()))?;
        tracing::debug!(path = %file_path.display(), rows = rows.len(), "opened file store");

        Ok(Self {
            file_path,
            inner: Arc::new(Mutex::new(Inner {
                file,
                consistency,
                rows,
            })),
        })
    }

    /// Path of the underlying log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Body stored under `id`, if any.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<String> {
        self.inner.lock().rows.get(id).cloned()
    }

    /// Number of distinct ids stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().rows.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

}

impl Inner {
    fn append(&mut self, row: Row) -> Result<(), String> {
        let line = serde_json::to_string(&row).map_err(|e| e.to_string())?;
        writeln!(self.file, "{line}").map_err(|e| e.to_string())?;
        if self.consistency.requires_sync() {
            self.file.sync_data().map_err(|e| e.to_string())?;
        }
        self.rows.insert(row.id, row.body);
        Ok(())
    }
}

fn load_from_disk(file_path: &Path) -> Result<HashMap<String, String>, RelayError> {
    let mut rows = HashMap::new();
    if !file_path.exists() {
        return Ok(rows);
    }
    let file = File::open(file_path).map_err(|e| RelayError::Backend(e.to_string()))?;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| RelayError::Backend(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let row: Row = serde_json::from_str(&line).map_err(|e| RelayError::Backend(e.to_string()))?;
        rows.insert(row.id, row.body);
    }
    Ok(rows)
}

#[async_trait]
impl StoreClient for FileStore {
    async fn save(&self, id: &str, body: &str) -> Result<(), RelayError> {
        let row = Row {
            id: id.to_string(),
            body: body.to_string(),
        };
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.lock().append(row))
            .await
            .map_err(|e| RelayError::StoreWrite(e.to_string()))?
            .map_err(RelayError::StoreWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_write_wins_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path(), "relay", Consistency::Quorum).unwrap();
            store.save("123", "Hello").await.unwrap();
            store.save("456", "World").await.unwrap();
            store.save("123", "Hello again").await.unwrap();
        }

        let store = FileStore::open(dir.path(), "relay", Consistency::One).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("123").as_deref(), Some("Hello again"));
        assert_eq!(store.get("456").as_deref(), Some("World"));
        assert!(store.path().ends_with("relay/messages.jsonl"));
    }

    #[tokio::test]
    async fn test_failed_write_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), "relay", Consistency::One).unwrap();
        // Swap the open log for a read-only handle
        store.inner.lock().file = File::open(store.path()).unwrap();

        let result = store.save("123", "Hello").await;
        assert!(matches!(result, Err(RelayError::StoreWrite(_))));
        assert!(store.is_empty());
    }
}
