use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Whole-response cache for the home feed.
///
/// Entries are keyed by request path and query string and expire after a
/// fixed interval. Nothing invalidates an entry early except [`PageCache::clear`].
pub struct PageCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedPage>>,
}

struct CachedPage {
    body: String,
    stored_at: Instant,
}

impl CachedPage {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: RwLock::new(HashMap::new()) }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    pub fn put(&self, key: String, body: String) {
        self.put_at(key, body, Instant::now());
    }

    pub fn clear(&self) {
        self.write_entries().clear();
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<String> {
        self.read_entries()
            .get(key)
            .filter(|page| page.is_fresh(self.ttl, now))
            .map(|page| page.body.clone())
    }

    fn put_at(&self, key: String, body: String, now: Instant) {
        if self.ttl.is_zero() {
            return;
        }
        let ttl = self.ttl;
        let mut entries = self.write_entries();
        // Drop stale pages so arbitrary query strings cannot grow the map forever.
        entries.retain(|_, page| page.is_fresh(ttl, now));
        entries.insert(key, CachedPage { body, stored_at: now });
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, CachedPage>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            log::error!("RwLock for the page cache was poisoned on read! Recovering lock.");
            poisoned.into_inner()
        })
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, CachedPage>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            log::error!("RwLock for the page cache was poisoned on write! Recovering lock.");
            poisoned.into_inner()
        })
    }
}
