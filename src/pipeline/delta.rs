//! Delta computation between the indexed record set and a freshly scraped
//! listing, plus the persisted refresh record.
//!
//! Fingerprints (over title, date and URL) decide whether a publication
//! changed. Only added and updated publications need their content fetched
//! on refresh; removed ids are dropped from the index.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::Result;
use crate::index::PublicationIndex;
use crate::models::RemoteSummary;

/// What a refresh found when comparing the listing to the index.
#[derive(Debug, Default)]
pub struct DeltaOutcome {
    pub added: Vec<RemoteSummary>,
    pub updated: Vec<RemoteSummary>,
    pub removed: Vec<String>,
    pub unchanged: usize,
}

impl DeltaOutcome {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Compare a scraped listing against the current index.
pub fn compute_delta(index: &PublicationIndex, remote: &[RemoteSummary]) -> DeltaOutcome {
    let mut outcome = DeltaOutcome::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(remote.len());

    for summary in remote {
        // Listings occasionally repeat an entry across pages.
        if !seen.insert(summary.id.as_str()) {
            continue;
        }
        match index.get(&summary.id) {
            None => outcome.added.push(summary.clone()),
            Some(record) if record.fingerprint() != summary.fingerprint => {
                outcome.updated.push(summary.clone());
            }
            Some(_) => outcome.unchanged += 1,
        }
    }

    for record in index.records() {
        if !seen.contains(record.id.as_str()) {
            outcome.removed.push(record.id.clone());
        }
    }

    outcome
}

/// Persisted state of the last successful refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaRecord {
    pub last_refresh_at: DateTime<Utc>,
    /// id -> fingerprint at the time of the refresh
    pub fingerprints: HashMap<String, String>,
}

impl DeltaRecord {
    /// Snapshot the current index state.
    pub fn from_index(index: &PublicationIndex) -> Self {
        Self {
            last_refresh_at: Utc::now(),
            fingerprints: index
                .records()
                .map(|r| (r.id.clone(), r.fingerprint()))
                .collect(),
        }
    }

    /// Load a previously saved record. Missing files mean no refresh has
    /// run; corrupt files are treated the same way, with a warning.
    pub async fn load(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Ignoring corrupt refresh record {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save atomically (temp file + rename).
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(&tmp, &json).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}
