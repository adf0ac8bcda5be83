//! Cassandra store backend via the `scylla` CQL driver.

use async_trait::async_trait;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::prepared::PreparedStatement;
use scylla::statement::Consistency as CqlConsistency;

use crate::config::Consistency;
use crate::core::{RelayError, StoreClient};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS messages (id text PRIMARY KEY, body text)";
const INSERT: &str = "INSERT INTO messages (id, body) VALUES (?, ?)";

/// Keyed store writing into `<keyspace>.messages` on a Cassandra cluster.
///
/// The session is opened once and the insert is prepared once with the
/// configured consistency; each save is a single execution of it. CQL inserts
/// are upserts, so a redelivered message overwrites its earlier row.
pub struct CassandraStore {
    session: Session,
    insert: PreparedStatement,
    contact_point: String,
}

impl CassandraStore {
    /// Connect to the cluster through `contact_point` (`host[:port]`, default
    /// port 9042) and use `keyspace`, which must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Backend`] if the cluster is unreachable, the keyspace
    /// is missing, or the table cannot be created.
    pub async fn connect(
        contact_point: &str,
        keyspace: &str,
        consistency: Consistency,
    ) -> Result<Self, RelayError> {
        tracing::info!(%contact_point, %keyspace, ?consistency, "connecting to Cassandra");
        let backend = |e: &dyn std::fmt::Display| RelayError::Backend(e.to_string());

        let session = SessionBuilder::new()
            .known_node(contact_point)
            .build()
            .await
            .map_err(|e| backend(&e))?;
        session
            .use_keyspace(keyspace, false)
            .await
            .map_err(|e| backend(&e))?;
        session
            .query_unpaged(CREATE_TABLE, ())
            .await
            .map_err(|e| backend(&e))?;

        let mut insert = session.prepare(INSERT).await.map_err(|e| backend(&e))?;
        insert.set_consistency(cql_consistency(consistency));

        Ok(Self {
            session,
            insert,
            contact_point: contact_point.to_string(),
        })
    }

    /// Contact point the session was opened through.
    #[must_use]
    pub fn contact_point(&self) -> &str {
        &self.contact_point
    }
}

const fn cql_consistency(consistency: Consistency) -> CqlConsistency {
    match consistency {
        Consistency::Any => CqlConsistency::Any,
        Consistency::One => CqlConsistency::One,
        Consistency::Quorum => CqlConsistency::Quorum,
        Consistency::All => CqlConsistency::All,
    }
}

#[async_trait]
impl StoreClient for CassandraStore {
    async fn save(&self, id: &str, body: &str) -> Result<(), RelayError> {
        self.session
            .execute_unpaged(&self.insert, (id, body))
            .await
            .map(|_| ())
            .map_err(|e| RelayError::StoreWrite(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistency_levels_map_to_cql() {
        assert_eq!(cql_consistency(Consistency::Any), CqlConsistency::Any);
        assert_eq!(cql_consistency(Consistency::One), CqlConsistency::One);
        assert_eq!(cql_consistency(Consistency::Quorum), CqlConsistency::Quorum);
        assert_eq!(cql_consistency(Consistency::All), CqlConsistency::All);
    }
}
