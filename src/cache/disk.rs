//! Disk tier of the content cache.
//!
//! Entries are JSON files named by the SHA-256 of the cache key, written
//! atomically (temp file + rename) so a crash mid-write never leaves a
//! truncated entry. Reads never delete; `sweep` is the only path that
//! removes files (expired or corrupt ones).

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;

use super::CacheEntry;
use crate::error::Result;

#[derive(Debug)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Read an entry. Missing files and unreadable or corrupt entries are
    /// misses; corrupt files are left for `sweep` to collect.
    pub async fn read(&self, key: &str) -> Option<CacheEntry> {
        let path = self.path_for(key);
        let bytes = fs::read(&path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Ignoring corrupt cache file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Write an entry atomically under its key.
    pub async fn write(&self, entry: &CacheEntry) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(&entry.key);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(entry)?;

        fs::write(&tmp, &json).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Delete expired and corrupt entries. Returns how many files were
    /// removed.
    pub async fn sweep(&self) -> usize {
        let Ok(mut dir) = fs::read_dir(&self.dir).await else {
            return 0;
        };

        let mut removed = 0;
        while let Ok(Some(item)) = dir.next_entry().await {
            let path = item.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let drop_it = match fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice::<CacheEntry>(&bytes) {
                    Ok(entry) => entry.is_expired(),
                    Err(_) => true,
                },
                Err(_) => false,
            };
            if drop_it && fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Entry count and total bytes on disk.
    pub async fn stats(&self) -> (usize, u64) {
        let Ok(mut dir) = fs::read_dir(&self.dir).await else {
            return (0, 0);
        };

        let (mut entries, mut bytes) = (0usize, 0u64);
        while let Ok(Some(item)) = dir.next_entry().await {
            let path = item.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            entries += 1;
            if let Ok(meta) = item.metadata().await {
                bytes += meta.len();
            }
        }
        (entries, bytes)
    }
}
