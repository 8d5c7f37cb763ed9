// src/cache/mod.rs

//! Two-tier content cache: a small in-memory LRU in front of a disk tier.
//!
//! Reads check memory first, then disk (promoting hits back into memory).
//! Writes land on disk first, then in memory, so the memory tier only ever
//! holds keys the disk tier also has. Entries expire after a TTL: an
//! expired entry reads as a miss and is dropped from memory, but its disk
//! file is only ever deleted by an explicit `sweep`. Hit and miss counters
//! feed the engine's health report.

mod disk;
mod memory;

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CacheConfig, PageContent};

pub use disk::DiskCache;
pub use memory::MemoryCache;

/// One cached page with its expiry envelope. The same structure is held in
/// memory and serialized to disk, so a promoted entry keeps its original
/// expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: PageContent,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: &str, value: PageContent, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            key: key.to_string(),
            value,
            stored_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Approximate in-memory footprint, used for the optional byte bound on
    /// the memory tier.
    pub fn size_bytes(&self) -> u64 {
        let meta = &self.value.metadata;
        (self.key.len()
            + self.value.markdown.len()
            + meta.source_url.len()
            + meta.title.as_ref().map_or(0, String::len)) as u64
    }
}

/// Counters and tier sizes reported by `stats`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub memory_entries: usize,
    pub memory_bytes: u64,
    pub disk_entries: usize,
    pub disk_bytes: u64,
}

impl CacheStats {
    /// Hit ratio over all lookups so far; 0 when nothing has been looked up.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// The two-tier cache used by the engine for extracted page content.
#[derive(Debug)]
pub struct ContentCache {
    memory: Mutex<MemoryCache>,
    disk: DiskCache,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ContentCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            memory: Mutex::new(MemoryCache::new(
                config.memory_capacity,
                config.max_memory_bytes,
            )),
            disk: DiskCache::new(&config.dir),
            ttl: Duration::hours(config.ttl_hours as i64),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up content by key. An expired entry is a miss: it is dropped
    /// from memory, while its disk file stays until `sweep`. A disk hit is
    /// promoted into memory.
    pub async fn get(&self, key: &str) -> Option<PageContent> {
        // Memory tier. The lock is dropped before any disk I/O.
        let from_memory = {
            let mut memory = lock_unpoisoned(&self.memory);
            match memory.get(key) {
                Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
                Some(_) => {
                    memory.remove(key);
                    None
                }
                None => None,
            }
        };
        if let Some(value) = from_memory {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(value);
        }

        // Disk tier.
        match self.disk.read(key).await {
            Some(entry) if !entry.is_expired() => {
                let value = entry.value.clone();
                lock_unpoisoned(&self.memory).insert(entry);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store content under a key. Disk is written first; the memory tier is
    /// only updated when the disk write succeeds, so memory stays a subset
    /// of disk.
    pub async fn put(&self, key: &str, value: PageContent) {
        let entry = CacheEntry::new(key, value, self.ttl);
        match self.disk.write(&entry).await {
            Ok(()) => lock_unpoisoned(&self.memory).insert(entry),
            Err(e) => log::warn!("Disk cache write failed for {}: {}", key, e),
        }
    }

    /// Remove expired entries from both tiers. Returns the number removed.
    pub async fn sweep(&self) -> usize {
        let from_memory = lock_unpoisoned(&self.memory).evict_expired();
        let from_disk = self.disk.sweep().await;
        from_memory + from_disk
    }

    pub async fn stats(&self) -> CacheStats {
        let (memory_entries, memory_bytes) = {
            let memory = lock_unpoisoned(&self.memory);
            (memory.len(), memory.bytes())
        };
        let (disk_entries, disk_bytes) = self.disk.stats().await;
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            memory_entries,
            memory_bytes,
            disk_entries,
            disk_bytes,
        }
    }
}

/// Take the memory lock, recovering from a poisoned mutex. The cache holds
/// no invariants that a panicked holder could break mid-update.
fn lock_unpoisoned(mutex: &Mutex<MemoryCache>) -> std::sync::MutexGuard<'_, MemoryCache> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> CacheConfig {
        CacheConfig {
            ttl_hours: 24,
            memory_capacity: 3,
            max_memory_bytes: None,
            dir: dir.path().to_path_buf(),
        }
    }

    fn content(text: &str, url: &str) -> PageContent {
        PageContent::new(text.to_string(), None, url)
    }

    #[tokio::test]
    async fn test_put_then_get_hits_memory() {
        let dir = TempDir::new().unwrap();
        let cache = ContentCache::new(&config(&dir));

        cache.put("k1", content("# Rapport", "https://example.se/a/")).await;
        let got = cache.get("k1").await.unwrap();
        assert_eq!(got.markdown, "# Rapport");

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.memory_entries, 1);
        assert_eq!(stats.disk_entries, 1);
    }

    #[tokio::test]
    async fn test_disk_hit_promotes_to_memory() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);

        // First cache instance writes; a fresh instance has cold memory.
        {
            let cache = ContentCache::new(&cfg);
            cache.put("k1", content("innehåll", "https://example.se/a/")).await;
        }

        let cache = ContentCache::new(&cfg);
        assert!(cache.get("k1").await.is_some());

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.memory_entries, 1);
    }

    #[tokio::test]
    async fn test_miss_counts() {
        let dir = TempDir::new().unwrap();
        let cache = ContentCache::new(&config(&dir));

        assert!(cache.get("absent").await.is_none());
        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_ratio(), 0.0);
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss_but_disk_file_stays() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&dir);
        cfg.ttl_hours = 0; // everything expires immediately
        let cache = ContentCache::new(&cfg);

        cache.put("k1", content("text", "https://example.se/a/")).await;
        assert!(cache.get("k1").await.is_none());

        // Only sweep deletes from disk.
        let stats = cache.stats().await;
        assert_eq!(stats.memory_entries, 0);
        assert_eq!(stats.disk_entries, 1);
    }

    #[tokio::test]
    async fn test_lru_eviction_keeps_disk_tier() {
        let dir = TempDir::new().unwrap();
        let cache = ContentCache::new(&config(&dir));

        for i in 0..4 {
            let key = format!("k{i}");
            cache.put(&key, content("text", "https://example.se/a/")).await;
        }

        let stats = cache.stats().await;
        assert_eq!(stats.memory_entries, 3);
        assert_eq!(stats.disk_entries, 4);

        // The memory-evicted entry is still served from disk.
        assert!(cache.get("k0").await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_removes_expired() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&dir);
        cfg.ttl_hours = 0;
        let cache = ContentCache::new(&cfg);

        cache.put("k1", content("text", "https://example.se/a/")).await;
        cache.put("k2", content("text", "https://example.se/b/")).await;

        let removed = cache.sweep().await;
        assert!(removed >= 2);
        assert_eq!(cache.stats().await.disk_entries, 0);
    }

    #[tokio::test]
    async fn test_hit_ratio() {
        let dir = TempDir::new().unwrap();
        let cache = ContentCache::new(&config(&dir));

        cache.put("k1", content("text", "https://example.se/a/")).await;
        cache.get("k1").await;
        cache.get("missing").await;

        let stats = cache.stats().await;
        assert_eq!(stats.hit_ratio(), 0.5);
    }
}
