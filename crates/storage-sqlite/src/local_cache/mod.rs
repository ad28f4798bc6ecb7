mod model;
mod repository;

pub use model::LocalCacheEntryDB;
pub use repository::SqliteLocalCache;
