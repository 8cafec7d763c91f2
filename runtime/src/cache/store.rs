//! Durable cache tier.
//!
//! [`SqliteStore`] keeps two tables: `search_cache` (one row per postal code
//! and radius) and `brewery_cache` (one row per place id). Timestamps are
//! stored as unix milliseconds. Every write is a single `INSERT OR REPLACE`,
//! so a failed write leaves the previous row untouched.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Durable tier failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cache payload could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("cache database lock poisoned")]
    Poisoned,

    #[error("cache directory could not be created: {0}")]
    Io(#[from] std::io::Error),
}

/// A cached search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCacheEntry {
    pub cache_key: String,
    pub postal_code: String,
    pub radius_miles: u32,
    /// JSON-encoded brewery list.
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SearchCacheEntry {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// A cached brewery with its tap list.
#[derive(Debug, Clone, PartialEq)]
pub struct BreweryDetailCacheEntry {
    pub place_id: String,
    /// JSON-encoded brewery.
    pub payload: String,
    pub last_updated: DateTime<Utc>,
    /// Set only when the cached brewery carried beers.
    pub tap_list_updated: Option<DateTime<Utc>>,
}

/// Row counts for cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub searches_total: usize,
    pub searches_valid: usize,
    pub details_total: usize,
    pub details_recent: usize,
}

/// Storage backend for the durable tier.
pub trait CacheStore: Send + Sync {
    fn load_search(&self, cache_key: &str) -> Result<Option<SearchCacheEntry>, StoreError>;
    fn save_search(&self, entry: &SearchCacheEntry) -> Result<(), StoreError>;
    fn load_detail(&self, place_id: &str) -> Result<Option<BreweryDetailCacheEntry>, StoreError>;
    fn save_detail(&self, entry: &BreweryDetailCacheEntry) -> Result<(), StoreError>;
    /// Delete search rows with `expires_at <= now`.
    fn delete_expired_searches(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
    /// Delete detail rows last updated before `cutoff`.
    fn delete_details_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
    /// Delete every search row for a postal code, returning the removed keys.
    fn delete_searches_for(&self, postal_code: &str) -> Result<Vec<String>, StoreError>;
    /// `recent_since` bounds which detail rows count as recent.
    fn counts(
        &self,
        now: DateTime<Utc>,
        recent_since: DateTime<Utc>,
    ) -> Result<StoreCounts, StoreError>;
}

fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// SQLite-backed durable tier.
pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the cache database, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    /// In-memory database, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(db: Connection) -> Result<Self, StoreError> {
        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS search_cache (
                cache_key TEXT PRIMARY KEY,
                postal_code TEXT NOT NULL,
                radius_miles INTEGER NOT NULL,
                payload TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_search_cache_postal_code
                ON search_cache (postal_code);
            CREATE TABLE IF NOT EXISTS brewery_cache (
                place_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                last_updated INTEGER NOT NULL,
                tap_list_updated INTEGER
            );",
        )?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.db.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl CacheStore for SqliteStore {
    fn load_search(&self, cache_key: &str) -> Result<Option<SearchCacheEntry>, StoreError> {
        let db = self.conn()?;
        let entry = db
            .query_row(
                "SELECT cache_key, postal_code, radius_miles, payload, created_at, expires_at
                 FROM search_cache WHERE cache_key = ?1",
                rusqlite::params![cache_key],
                |row| {
                    Ok(SearchCacheEntry {
                        cache_key: row.get(0)?,
                        postal_code: row.get(1)?,
                        radius_miles: row.get(2)?,
                        payload: row.get(3)?,
                        created_at: from_millis(row.get(4)?),
                        expires_at: from_millis(row.get(5)?),
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    fn save_search(&self, entry: &SearchCacheEntry) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO search_cache
                (cache_key, postal_code, radius_miles, payload, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                entry.cache_key,
                entry.postal_code,
                entry.radius_miles,
                entry.payload,
                to_millis(entry.created_at),
                to_millis(entry.expires_at),
            ],
        )?;
        Ok(())
    }

    fn load_detail(&self, place_id: &str) -> Result<Option<BreweryDetailCacheEntry>, StoreError> {
        let db = self.conn()?;
        let entry = db
            .query_row(
                "SELECT place_id, payload, last_updated, tap_list_updated
                 FROM brewery_cache WHERE place_id = ?1",
                rusqlite::params![place_id],
                |row| {
                    let tap_list_updated: Option<i64> = row.get(3)?;
                    Ok(BreweryDetailCacheEntry {
                        place_id: row.get(0)?,
                        payload: row.get(1)?,
                        last_updated: from_millis(row.get(2)?),
                        tap_list_updated: tap_list_updated.map(from_millis),
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    fn save_detail(&self, entry: &BreweryDetailCacheEntry) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO brewery_cache
                (place_id, payload, last_updated, tap_list_updated)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                entry.place_id,
                entry.payload,
                to_millis(entry.last_updated),
                entry.tap_list_updated.map(to_millis),
            ],
        )?;
        Ok(())
    }

    fn delete_expired_searches(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let removed = self.conn()?.execute(
            "DELETE FROM search_cache WHERE expires_at <= ?1",
            rusqlite::params![to_millis(now)],
        )?;
        Ok(removed)
    }

    fn delete_details_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let removed = self.conn()?.execute(
            "DELETE FROM brewery_cache WHERE last_updated < ?1",
            rusqlite::params![to_millis(cutoff)],
        )?;
        Ok(removed)
    }

    fn delete_searches_for(&self, postal_code: &str) -> Result<Vec<String>, StoreError> {
        let mut db = self.conn()?;
        let tx = db.transaction()?;
        let keys = {
            let mut stmt = tx.prepare("SELECT cache_key FROM search_cache WHERE postal_code = ?1")?;
            let rows = stmt.query_map(rusqlite::params![postal_code], |row| row.get(0))?;
            rows.collect::<Result<Vec<String>, _>>()?
        };
        tx.execute(
            "DELETE FROM search_cache WHERE postal_code = ?1",
            rusqlite::params![postal_code],
        )?;
        tx.commit()?;
        Ok(keys)
    }

    fn counts(
        &self,
        now: DateTime<Utc>,
        recent_since: DateTime<Utc>,
    ) -> Result<StoreCounts, StoreError> {
        let db = self.conn()?;
        let count = |sql: &str, params: &[&dyn rusqlite::ToSql]| -> Result<usize, StoreError> {
            let n: i64 = db.query_row(sql, params, |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or(0))
        };

        Ok(StoreCounts {
            searches_total: count("SELECT COUNT(*) FROM search_cache", &[])?,
            searches_valid: count(
                "SELECT COUNT(*) FROM search_cache WHERE expires_at > ?1",
                &[&to_millis(now)],
            )?,
            details_total: count("SELECT COUNT(*) FROM brewery_cache", &[])?,
            details_recent: count(
                "SELECT COUNT(*) FROM brewery_cache WHERE last_updated > ?1",
                &[&to_millis(recent_since)],
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn search_entry(key: &str, postal_code: &str, now: DateTime<Utc>) -> SearchCacheEntry {
        SearchCacheEntry {
            cache_key: key.to_string(),
            postal_code: postal_code.to_string(),
            radius_miles: 15,
            payload: "[]".to_string(),
            created_at: now,
            expires_at: now + Duration::hours(24),
        }
    }

    #[test]
    fn test_search_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.db");
        let store = SqliteStore::open(&path).unwrap();
        let now = Utc::now();

        store.save_search(&search_entry("k1", "94556", now)).unwrap();
        let loaded = store.load_search("k1").unwrap().unwrap();
        assert_eq!(loaded.postal_code, "94556");
        assert_eq!(loaded.radius_miles, 15);
        assert_eq!(loaded.expires_at.timestamp_millis(), (now + Duration::hours(24)).timestamp_millis());
        assert!(store.load_search("missing").unwrap().is_none());
    }

    #[test]
    fn test_save_search_overwrites() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        store.save_search(&search_entry("k1", "94556", now)).unwrap();

        let mut newer = search_entry("k1", "94556", now);
        newer.payload = r#"[{"name":"x"}]"#.to_string();
        store.save_search(&newer).unwrap();

        assert_eq!(store.load_search("k1").unwrap().unwrap().payload, newer.payload);
        assert_eq!(store.counts(now, now).unwrap().searches_total, 1);
    }

    #[test]
    fn test_detail_tap_list_timestamp_optional() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .save_detail(&BreweryDetailCacheEntry {
                place_id: "p1".into(),
                payload: "{}".into(),
                last_updated: now,
                tap_list_updated: None,
            })
            .unwrap();
        let loaded = store.load_detail("p1").unwrap().unwrap();
        assert!(loaded.tap_list_updated.is_none());
    }

    #[test]
    fn test_delete_searches_for_postal_code() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        store.save_search(&search_entry("a", "94556", now)).unwrap();
        store.save_search(&search_entry("b", "94556", now)).unwrap();
        store.save_search(&search_entry("c", "94103", now)).unwrap();

        let mut removed = store.delete_searches_for("94556").unwrap();
        removed.sort();
        assert_eq!(removed, vec!["a", "b"]);
        assert!(store.load_search("c").unwrap().is_some());
    }
}
