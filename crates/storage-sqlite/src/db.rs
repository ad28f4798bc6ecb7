//! Connection pool, embedded migrations and the serialized write path.

use std::path::Path;
use std::sync::Arc;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, info};
use tokio::sync::Mutex;

use crate::errors::StorageError;

pub type DbPool = Arc<Pool<ConnectionManager<SqliteConnection>>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")
            .map_err(r2d2::Error::QueryError)
    }
}

/// Opens (or creates) the database file and returns a pool over it.
pub fn create_pool(path: impl AsRef<Path>) -> Result<DbPool, StorageError> {
    let url = path.as_ref().to_string_lossy().to_string();
    debug!("[LocalCache] Opening database at {}", url);

    let manager = ConnectionManager::<SqliteConnection>::new(url);
    let pool = Pool::builder()
        .max_size(4)
        .connection_customizer(Box::new(ConnectionOptions))
        .build(manager)?;
    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &DbPool) -> Result<DbConnection, StorageError> {
    Ok(pool.get()?)
}

/// Applies every pending embedded migration.
pub fn run_migrations(pool: &DbPool) -> Result<(), StorageError> {
    let mut conn = get_connection(pool)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StorageError::Migration(e.to_string()))?;
    if !applied.is_empty() {
        info!("[LocalCache] Applied {} migration(s)", applied.len());
    }
    Ok(())
}

/// Runs writes one at a time on the blocking pool.
#[derive(Clone)]
pub struct WriteHandle {
    pool: DbPool,
    lock: Arc<Mutex<()>>,
}

impl WriteHandle {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn exec<F, T>(&self, job: F) -> larder_core::Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> larder_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || {
            let mut conn = get_connection(&pool)?;
            job(&mut conn)
        })
        .await
        .map_err(StorageError::from)?
    }
}
