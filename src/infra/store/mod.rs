//! Store backends.

pub mod cassandra;
pub mod file;
pub mod memory;
pub mod sqlite;

pub use cassandra::CassandraStore;
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
