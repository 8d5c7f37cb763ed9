//! In-memory LRU tier.

use std::collections::{HashMap, VecDeque};

use super::CacheEntry;

/// Least-recently-used map bounded by entry count and optionally by an
/// approximate byte total. Expiry is the caller's concern; this tier only
/// orders and bounds.
#[derive(Debug)]
pub struct MemoryCache {
    entries: HashMap<String, CacheEntry>,
    /// Front is least recently used.
    order: VecDeque<String>,
    max_entries: usize,
    max_bytes: Option<u64>,
    bytes: u64,
}

impl MemoryCache {
    pub fn new(max_entries: usize, max_bytes: Option<u64>) -> Self {
        Self {
            entries: HashMap::with_capacity(max_entries),
            order: VecDeque::with_capacity(max_entries),
            max_entries,
            max_bytes,
            bytes: 0,
        }
    }

    /// Look up an entry, marking it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.entries.get(key)
    }

    /// Insert an entry under its own key, evicting from the LRU end until
    /// both bounds hold.
    pub fn insert(&mut self, entry: CacheEntry) {
        self.remove(&entry.key);

        self.bytes += entry.size_bytes();
        self.order.push_back(entry.key.clone());
        self.entries.insert(entry.key.clone(), entry);

        while self.entries.len() > self.max_entries || self.over_byte_bound() {
            let Some(lru) = self.order.front().cloned() else {
                break;
            };
            self.remove(&lru);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        self.bytes -= entry.size_bytes();
        Some(entry)
    }

    /// Drop all expired entries; returns how many were removed.
    pub fn evict_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .values()
            .filter(|e| e.is_expired())
            .map(|e| e.key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Approximate bytes held.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    fn over_byte_bound(&self) -> bool {
        // Never evict down to empty on the byte bound; a single oversized
        // entry is still served.
        match self.max_bytes {
            Some(max) => self.bytes > max && self.entries.len() > 1,
            None => false,
        }
    }

    fn touch(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.to_string());
    }
}
