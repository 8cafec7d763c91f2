//! Two-tier brewery cache.
//!
//! Reads consult the in-process [`memory::MemoryTier`] first and fall back
//! to the durable [`store::CacheStore`]; a durable hit repopulates the fast
//! tier. Writes go to both. Durable failures never surface to callers: a
//! failed read is a miss and a failed write is logged and abandoned in both
//! tiers.
//!
//! ## Keys
//!
//! Search entries are keyed by the FNV-1a hash of `"<postal code>:<radius>"`
//! in hex. Detail entries are keyed by the provider place id.

pub mod memory;
pub mod store;

use crate::config::PipelineConfig;
use crate::model::serializer::{decode_breweries, decode_brewery, encode_breweries, encode_brewery};
use crate::model::Brewery;
use chrono::{DateTime, Utc};
use memory::MemoryTier;
use serde::Serialize;
use std::hash::Hasher;
use std::sync::{Arc, Mutex};
use store::{BreweryDetailCacheEntry, CacheStore, SearchCacheEntry, SqliteStore, StoreError};
use tracing::{debug, warn};

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

/// Counts reported by [`BreweryCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub search_entries_total: usize,
    pub search_entries_valid: usize,
    pub detail_entries_total: usize,
    pub detail_entries_recent: usize,
    pub fast_tier_entries: usize,
    pub ttl_hours: u64,
}

/// Rows removed by [`BreweryCache::cleanup_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub searches_removed: usize,
    pub details_removed: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.searches_removed + self.details_removed
    }
}

/// Stable cache key for a search.
pub fn search_key(postal_code: &str, radius_miles: u32) -> String {
    let mut hasher = fnv::FnvHasher::default();
    hasher.write(format!("{postal_code}:{radius_miles}").as_bytes());
    format!("{:016x}", hasher.finish())
}

fn fast_search_key(key: &str) -> String {
    format!("search:{key}")
}

fn fast_detail_key(place_id: &str) -> String {
    format!("detail:{place_id}")
}

fn to_chrono(d: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}

fn saturating_add(at: DateTime<Utc>, by: chrono::Duration) -> DateTime<Utc> {
    at.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn saturating_sub(at: DateTime<Utc>, by: chrono::Duration) -> DateTime<Utc> {
    at.checked_sub_signed(by).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Search and brewery-detail cache fronting discovery and scraping.
pub struct BreweryCache {
    fast: MemoryTier,
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    retention: chrono::Duration,
    ttl_hours: u64,
}

impl BreweryCache {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, config: &PipelineConfig) -> Self {
        Self {
            fast: MemoryTier::new(),
            store,
            clock,
            ttl: to_chrono(config.cache_ttl),
            retention: to_chrono(config.detail_retention),
            ttl_hours: config.cache_ttl_hours(),
        }
    }

    /// Cache backed by the SQLite file at `config.cache_db_path`.
    pub fn open(config: &PipelineConfig) -> Result<Self, StoreError> {
        let store = SqliteStore::open(&config.cache_db_path)?;
        Ok(Self::new(Arc::new(store), Arc::new(SystemClock), config))
    }

    /// Cached search result, if one exists and has not expired.
    pub fn get_search(&self, postal_code: &str, radius_miles: u32) -> Option<Vec<Brewery>> {
        let key = search_key(postal_code, radius_miles);
        let fast_key = fast_search_key(&key);
        let now = self.clock.now();

        if let Some(payload) = self.fast.get(&fast_key, now) {
            match decode_breweries(&payload) {
                Ok(breweries) => {
                    debug!(postal_code, radius_miles, "search cache hit (memory)");
                    return Some(breweries);
                }
                Err(e) => {
                    warn!(error = %e, "dropping undecodable fast-tier search entry");
                    self.fast.remove(&fast_key);
                }
            }
        }

        let entry = match self.store.load_search(&key) {
            Ok(Some(entry)) if entry.is_valid_at(now) => entry,
            Ok(_) => return None,
            Err(e) => {
                warn!(postal_code, error = %e, "search cache read failed; treating as miss");
                return None;
            }
        };

        match decode_breweries(&entry.payload) {
            Ok(breweries) => {
                debug!(postal_code, radius_miles, "search cache hit (durable)");
                self.fast.insert(fast_key, entry.payload, entry.expires_at);
                Some(breweries)
            }
            Err(e) => {
                warn!(postal_code, error = %e, "cached search payload is corrupt; treating as miss");
                None
            }
        }
    }

    /// Store a search result, replacing any previous one for the key.
    pub fn put_search(&self, postal_code: &str, radius_miles: u32, breweries: &[Brewery]) {
        let payload = match encode_breweries(breweries) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(postal_code, error = %e, "could not encode search result; not cached");
                return;
            }
        };
        let now = self.clock.now();
        let entry = SearchCacheEntry {
            cache_key: search_key(postal_code, radius_miles),
            postal_code: postal_code.to_string(),
            radius_miles,
            payload,
            created_at: now,
            expires_at: saturating_add(now, self.ttl),
        };

        if let Err(e) = self.store.save_search(&entry) {
            warn!(postal_code, error = %e, "search cache write failed; skipped");
            return;
        }
        self.fast
            .insert(fast_search_key(&entry.cache_key), entry.payload, entry.expires_at);
    }

    /// Cached brewery for a place id, valid while younger than the TTL.
    pub fn get_brewery_detail(&self, place_id: &str) -> Option<Brewery> {
        let fast_key = fast_detail_key(place_id);
        let now = self.clock.now();

        if let Some(payload) = self.fast.get(&fast_key, now) {
            if let Ok(brewery) = decode_brewery(&payload) {
                return Some(brewery);
            }
            self.fast.remove(&fast_key);
        }

        let entry = match self.store.load_detail(place_id) {
            Ok(Some(entry)) if now - entry.last_updated < self.ttl => entry,
            Ok(_) => return None,
            Err(e) => {
                warn!(place_id, error = %e, "detail cache read failed; treating as miss");
                return None;
            }
        };

        match decode_brewery(&entry.payload) {
            Ok(brewery) => {
                self.fast
                    .insert(fast_key, entry.payload, saturating_add(entry.last_updated, self.ttl));
                Some(brewery)
            }
            Err(e) => {
                warn!(place_id, error = %e, "cached brewery payload is corrupt; treating as miss");
                None
            }
        }
    }

    /// Upsert a brewery. The tap-list timestamp is only set when beers are
    /// attached.
    pub fn put_brewery_detail(&self, brewery: &Brewery, place_id: &str) {
        let payload = match encode_brewery(brewery) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(place_id, error = %e, "could not encode brewery; not cached");
                return;
            }
        };
        let now = self.clock.now();
        let entry = BreweryDetailCacheEntry {
            place_id: place_id.to_string(),
            payload,
            last_updated: now,
            tap_list_updated: (!brewery.beers.is_empty()).then_some(now),
        };

        if let Err(e) = self.store.save_detail(&entry) {
            warn!(place_id, error = %e, "detail cache write failed; skipped");
            return;
        }
        self.fast
            .insert(fast_detail_key(place_id), entry.payload, saturating_add(now, self.ttl));
    }

    /// Purge expired searches and detail rows older than the retention
    /// window. Only the durable tier is touched.
    pub fn cleanup_expired(&self) -> Result<CleanupReport, StoreError> {
        let now = self.clock.now();
        let searches_removed = self.store.delete_expired_searches(now)?;
        let details_removed = self.store.delete_details_before(saturating_sub(now, self.retention))?;
        Ok(CleanupReport {
            searches_removed,
            details_removed,
        })
    }

    /// Remove every cached search for a postal code from both tiers.
    pub fn clear_postal_code(&self, postal_code: &str) -> Result<usize, StoreError> {
        let keys = self.store.delete_searches_for(postal_code)?;
        for key in &keys {
            self.fast.remove(&fast_search_key(key));
        }
        Ok(keys.len())
    }

    pub fn stats(&self) -> Result<CacheStats, StoreError> {
        let now = self.clock.now();
        let counts = self.store.counts(now, saturating_sub(now, self.ttl))?;
        Ok(CacheStats {
            search_entries_total: counts.searches_total,
            search_entries_valid: counts.searches_valid,
            detail_entries_total: counts.details_total,
            detail_entries_recent: counts.details_recent,
            fast_tier_entries: self.fast.len(),
            ttl_hours: self.ttl_hours,
        })
    }
}
