//! Process-local fast tier.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Debug, Clone)]
struct FastEntry {
    payload: String,
    expires_at: DateTime<Utc>,
}

/// Sharded in-memory map of serialized payloads with expiry.
///
/// Expired entries are dropped lazily when read.
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: DashMap<String, FastEntry>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<String> {
        if let Some(entry) = self.entries.get(key) {
            if now < entry.expires_at {
                return Some(entry.payload.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| now >= entry.expires_at);
        None
    }

    pub fn insert(&self, key: impl Into<String>, payload: String, expires_at: DateTime<Utc>) {
        self.entries
            .insert(key.into(), FastEntry { payload, expires_at });
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
