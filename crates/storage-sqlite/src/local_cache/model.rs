//! Database model for the local cache table.

use diesel::prelude::*;

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(primary_key(cache_key))]
#[diesel(table_name = crate::schema::local_cache)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct LocalCacheEntryDB {
    pub cache_key: String,
    pub household_id: Option<String>,
    pub payload: String,
    pub updated_at: String,
}
