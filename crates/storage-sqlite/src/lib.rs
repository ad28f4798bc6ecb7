//! SQLite storage for the device-local mirror of household collections.

pub mod db;
pub mod errors;
pub mod local_cache;
pub mod schema;

pub use db::{create_pool, get_connection, run_migrations, DbPool, WriteHandle};
pub use errors::StorageError;
pub use local_cache::SqliteLocalCache;
