//! SQLite store backend via sqlx.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::config::Consistency;
use crate::core::{RelayError, StoreClient};

/// Keyed store writing into the `messages` table of `<contact_point>/<keyspace>.db`.
///
/// The pool is created once and shared by every caller; each save is a single
/// parameterized upsert.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to (creating if missing) the database for `keyspace`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Backend`] if the directory, connection, or table
    /// cannot be created.
    pub async fn connect(
        contact_point: impl AsRef<Path>,
        keyspace: &str,
        consistency: Consistency,
    ) -> Result<Self, RelayError> {
        let dir = contact_point.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| RelayError::Backend(e.to_string()))?;
        let filename = dir.join(format!("{keyspace}.db"));
        tracing::info!(path = %filename.display(), ?consistency, "initializing SQLite store");

        let options = SqliteConnectOptions::new()
            .filename(&filename)
            .create_if_missing(true)
            .synchronous(synchronous_for(consistency));

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| RelayError::Backend(e.to_string()))?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<(), RelayError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                body TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RelayError::Backend(e.to_string()))?;
        Ok(())
    }

    /// Body stored under `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Backend`] if the query fails.
    pub async fn fetch(&self, id: &str) -> Result<Option<String>, RelayError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT body FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RelayError::Backend(e.to_string()))?;
        Ok(row.map(|(body,)| body))
    }

    /// Number of stored rows.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Backend`] if the query fails.
    pub async fn count(&self) -> Result<i64, RelayError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RelayError::Backend(e.to_string()))?;
        Ok(count)
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

const fn synchronous_for(consistency: Consistency) -> SqliteSynchronous {
    match consistency {
        Consistency::Any => SqliteSynchronous::Off,
        Consistency::One => SqliteSynchronous::Normal,
        Consistency::Quorum => SqliteSynchronous::Full,
        Consistency::All => SqliteSynchronous::Extra,
    }
}

#[async_trait]
impl StoreClient for SqliteStore {
    async fn save(&self, id: &str, body: &str) -> Result<(), RelayError> {
        sqlx::query(
            r"
            INSERT INTO messages (id, body) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET body = excluded.body
            ",
        )
        .bind(id)
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(|e| RelayError::StoreWrite(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::connect(dir.path(), "relay", Consistency::Quorum)
            .await
            .unwrap();

        store.save("123", "Hello").await.unwrap();
        store.save("123", "Hello again").await.unwrap();
        store.save("456", "World").await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.fetch("123").await.unwrap().as_deref(), Some("Hello again"));
        assert!(store.fetch("789").await.unwrap().is_none());
        store.close().await;
    }

    #[tokio::test]
    async fn test_save_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::connect(dir.path(), "relay", Consistency::One)
            .await
            .unwrap();
        store.close().await;

        let result = store.save("123", "Hello").await;
        assert!(matches!(result, Err(RelayError::StoreWrite(_))));
    }
}
