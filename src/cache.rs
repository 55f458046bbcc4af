//! Time-boxed response memoization.
//!
//! Entries keep the raw response body and are decoded on read, so a body
//! that stops parsing is dropped and reported as a miss.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
struct CacheEntry {
    body: String,
    stored_at: Instant,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_valid(&self, now: Instant) -> bool {
        now <= self.expires_at
    }
}

/// Snapshot of one cached entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntryInfo {
    pub key: String,
    pub age: Duration,
    /// Zero once expired.
    pub expires_in: Duration,
    pub is_expired: bool,
}

/// Snapshot of the whole cache.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub entries: Vec<CacheEntryInfo>,
}

#[derive(Debug)]
pub(crate) struct ResponseCache {
    map: HashMap<String, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl ResponseCache {
    pub(crate) fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            ttl,
            max_entries,
        }
    }

    /// Returns the decoded payload for `key`, removing it if it has expired
    /// or no longer parses.
    pub(crate) fn get(&mut self, key: &str) -> Option<serde_json::Value> {
        let now = Instant::now();
        let entry = self.map.get(key)?;
        if !entry.is_valid(now) {
            #[cfg(feature = "tracing")]
            tracing::debug!(key, "cache entry expired");
            self.map.remove(key);
            return None;
        }
        match serde_json::from_str(&entry.body) {
            Ok(value) => Some(value),
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(key, "dropping unparseable cache entry");
                self.map.remove(key);
                None
            }
        }
    }

    pub(crate) fn insert(&mut self, key: String, body: String) {
        if self.max_entries == 0 {
            return;
        }
        let now = Instant::now();
        if !self.map.contains_key(&key) && self.map.len() >= self.max_entries {
            self.make_room(now);
        }
        self.map.insert(
            key,
            CacheEntry {
                body,
                stored_at: now,
                expires_at: now + self.ttl,
            },
        );
    }

    pub(crate) fn remove(&mut self, key: &str) -> bool {
        self.map.remove(key).is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
    }

    pub(crate) fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut entries: Vec<CacheEntryInfo> = self
            .map
            .iter()
            .map(|(key, entry)| CacheEntryInfo {
                key: key.clone(),
                age: now.saturating_duration_since(entry.stored_at),
                expires_in: entry.expires_at.saturating_duration_since(now),
                is_expired: !entry.is_valid(now),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        CacheStats {
            total_entries: entries.len(),
            entries,
        }
    }

    fn make_room(&mut self, now: Instant) {
        self.map.retain(|_, entry| entry.is_valid(now));
        if self.map.len() < self.max_entries {
            return;
        }
        let oldest = self
            .map
            .iter()
            .min_by_key(|(_, entry)| entry.expires_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.map.remove(&key);
        }
    }
}
