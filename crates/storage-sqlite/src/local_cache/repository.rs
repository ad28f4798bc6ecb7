//! SQLite-backed [`LocalCache`].

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use larder_core::households::LocalCache;
use larder_core::{HouseholdId, Result};
use log::{debug, warn};

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::local_cache;

use super::model::LocalCacheEntryDB;

/// Keeps the last loaded copy of each collection so the app can show data
/// before the backend answers. One row per cache key; the household that
/// wrote a row owns it until another household overwrites it.
pub struct SqliteLocalCache {
    pool: DbPool,
    writer: WriteHandle,
}

impl SqliteLocalCache {
    pub fn new(pool: DbPool) -> Self {
        let writer = WriteHandle::new(pool.clone());
        Self { pool, writer }
    }

    /// Removes every cached collection.
    pub async fn clear(&self) -> Result<usize> {
        self.writer
            .exec(|conn| {
                let removed = diesel::delete(local_cache::table)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(removed)
            })
            .await
    }
}

fn read_entry(pool: &DbPool, key: String) -> Result<Option<LocalCacheEntryDB>> {
    let mut conn = get_connection(pool)?;
    let entry = local_cache::table
        .find(key)
        .select(LocalCacheEntryDB::as_select())
        .first::<LocalCacheEntryDB>(&mut conn)
        .optional()
        .map_err(StorageError::from)?;
    Ok(entry)
}

#[async_trait]
impl LocalCache for SqliteLocalCache {
    async fn store(
        &self,
        household_id: &HouseholdId,
        key: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        let row = LocalCacheEntryDB {
            cache_key: key.to_string(),
            household_id: Some(household_id.as_str().to_string()),
            payload: serde_json::to_string(&payload)?,
            updated_at: Utc::now().to_rfc3339(),
        };

        self.writer
            .exec(move |conn| {
                diesel::insert_into(local_cache::table)
                    .values(&row)
                    .on_conflict(local_cache::cache_key)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        debug!("[LocalCache] Stored '{}'", key);
        Ok(())
    }

    async fn load(
        &self,
        household_id: &HouseholdId,
        key: &str,
    ) -> Result<Option<serde_json::Value>> {
        let pool = self.pool.clone();
        let owned_key = key.to_string();
        let entry = tokio::task::spawn_blocking(move || read_entry(&pool, owned_key))
            .await
            .map_err(StorageError::from)??;

        let Some(entry) = entry else {
            return Ok(None);
        };
        if entry.household_id.as_deref() != Some(household_id.as_str()) {
            debug!(
                "[LocalCache] '{}' belongs to another household, ignoring",
                key
            );
            return Ok(None);
        }

        match serde_json::from_str(&entry.payload) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("[LocalCache] Discarding unreadable '{}': {}", key, e);
                Ok(None)
            }
        }
    }
}
