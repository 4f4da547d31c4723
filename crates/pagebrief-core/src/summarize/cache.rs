use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

/// Cache key: digest of the exact input text, no normalization
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

struct CacheEntry {
    summary: String,
    created_at: Instant,
}

/// Process-wide summary cache. Entries expire after the TTL; once the
/// capacity is reached, inserting evicts the entry with the oldest creation
/// time. Lives for the process lifetime, never persisted.
pub struct SummaryCache {
    capacity: usize,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl SummaryCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached summary for `text` if a live entry exists. Expired
    /// entries are removed on the way out.
    pub fn lookup(&self, text: &str) -> Option<String> {
        self.lookup_at(text, Instant::now())
    }

    /// Remember the summary for `text`, evicting the oldest entry at capacity.
    pub fn store(&self, text: &str, summary: &str) {
        self.store_at(text, summary, Instant::now());
    }

    fn lookup_at(&self, text: &str, now: Instant) -> Option<String> {
        let key = fingerprint(text);
        let mut entries = self.entries.lock().expect("cache lock poisoned");

        match entries.get(&key) {
            Some(entry) if now.duration_since(entry.created_at) < self.ttl => {
                Some(entry.summary.clone())
            }
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    fn store_at(&self, text: &str, summary: &str, now: Instant) {
        let key = fingerprint(text);
        let mut entries = self.entries.lock().expect("cache lock poisoned");

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                summary: summary.to_string(),
                created_at: now,
            },
        );
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }
}
