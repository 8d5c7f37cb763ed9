// src/index/mod.rs

//! In-memory publication index with derived ranking statistics.
//!
//! Holds the record set together with the statistics BM25 ranking needs:
//! per-document term frequencies, document lengths, the corpus average
//! length, and a token -> postings inverted structure. Any record addition,
//! update, or removal incrementally updates the affected statistics, so the
//! index is always consistent with its record set. On refresh the engine
//! builds a fresh index and swaps it in atomically; readers never observe a
//! partially-rebuilt index.

mod tokenize;

use std::collections::HashMap;

use crate::models::PublicationRecord;

pub use tokenize::tokenize;

/// A single posting: a document slot and the term frequency within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc: u32,
    pub tf: u32,
}

/// Per-document entry: the record plus its term statistics.
#[derive(Debug, Clone)]
struct DocEntry {
    record: PublicationRecord,
    terms: HashMap<String, u32>,
    len: u32,
}

/// Insertion-ordered collection of publication records with ranking stats.
#[derive(Debug, Clone, Default)]
pub struct PublicationIndex {
    /// Document slots; removed documents leave a hole so that posting
    /// lists stay valid without renumbering.
    docs: Vec<Option<DocEntry>>,
    by_id: HashMap<String, u32>,
    postings: HashMap<String, Vec<Posting>>,
    /// Indexed tokens bucketed by character length, for edit-distance
    /// candidate lookup without scanning the full vocabulary.
    tokens_by_len: HashMap<usize, Vec<String>>,
    total_len: u64,
    live: usize,
}

impl PublicationIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a full record set.
    pub fn from_records(records: impl IntoIterator<Item = PublicationRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(record);
        }
        index
    }

    /// Insert or update a record. A record with an already-indexed `id`
    /// replaces the previous version.
    pub fn insert(&mut self, record: PublicationRecord) {
        if self.by_id.contains_key(&record.id) {
            self.remove(&record.id);
        }

        let slot = self.docs.len() as u32;
        let terms = term_frequencies(&record);
        let len: u32 = terms.values().sum();

        for (token, &tf) in &terms {
            let list = self.postings.entry(token.clone()).or_insert_with(|| {
                self.tokens_by_len
                    .entry(token.chars().count())
                    .or_default()
                    .push(token.clone());
                Vec::new()
            });
            list.push(Posting { doc: slot, tf });
        }

        self.by_id.insert(record.id.clone(), slot);
        self.total_len += u64::from(len);
        self.live += 1;
        self.docs.push(Some(DocEntry { record, terms, len }));
    }

    /// Remove a record by id. Returns true if it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(slot) = self.by_id.remove(id) else {
            return false;
        };
        let Some(entry) = self.docs[slot as usize].take() else {
            return false;
        };

        for token in entry.terms.keys() {
            if let Some(list) = self.postings.get_mut(token) {
                list.retain(|p| p.doc != slot);
                if list.is_empty() {
                    self.postings.remove(token);
                    if let Some(bucket) = self.tokens_by_len.get_mut(&token.chars().count()) {
                        bucket.retain(|t| t != token);
                    }
                }
            }
        }

        self.total_len -= u64::from(entry.len);
        self.live -= 1;
        true
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Average document length over live records.
    pub fn avg_doc_len(&self) -> f64 {
        if self.live == 0 {
            0.0
        } else {
            self.total_len as f64 / self.live as f64
        }
    }

    /// Look up a record by id.
    pub fn get(&self, id: &str) -> Option<&PublicationRecord> {
        let slot = *self.by_id.get(id)?;
        self.docs[slot as usize].as_ref().map(|e| &e.record)
    }

    /// Record at a document slot, if live.
    pub fn doc(&self, slot: u32) -> Option<&PublicationRecord> {
        self.docs.get(slot as usize)?.as_ref().map(|e| &e.record)
    }

    /// Token count of the document at a slot.
    pub fn doc_len(&self, slot: u32) -> u32 {
        self.docs
            .get(slot as usize)
            .and_then(|d| d.as_ref())
            .map_or(0, |e| e.len)
    }

    /// Posting list for an exact token.
    pub fn postings(&self, token: &str) -> Option<&[Posting]> {
        self.postings.get(token).map(Vec::as_slice)
    }

    /// Number of documents containing a token.
    pub fn doc_freq(&self, token: &str) -> usize {
        self.postings.get(token).map_or(0, Vec::len)
    }

    /// Indexed tokens with the given character length.
    pub fn tokens_with_char_len(&self, len: usize) -> &[String] {
        self.tokens_by_len.get(&len).map_or(&[], Vec::as_slice)
    }

    /// Iterate live records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &PublicationRecord> {
        self.docs.iter().filter_map(|d| d.as_ref().map(|e| &e.record))
    }

    /// Iterate live (slot, record) pairs in insertion order.
    pub fn docs(&self) -> impl Iterator<Item = (u32, &PublicationRecord)> {
        self.docs
            .iter()
            .enumerate()
            .filter_map(|(slot, d)| d.as_ref().map(|e| (slot as u32, &e.record)))
    }

    /// Clone the live records, e.g. for snapshot persistence.
    pub fn to_records(&self) -> Vec<PublicationRecord> {
        self.records().cloned().collect()
    }
}

/// Term frequencies over a record's searchable text (title, summary, themes).
fn term_frequencies(record: &PublicationRecord) -> HashMap<String, u32> {
    let mut text = record.title.clone();
    if let Some(summary) = &record.summary {
        text.push(' ');
        text.push_str(summary);
    }
    for theme in &record.themes {
        text.push(' ');
        text.push_str(theme);
    }

    let mut terms: HashMap<String, u32> = HashMap::new();
    for token in tokenize(&text) {
        *terms.entry(token).or_insert(0) += 1;
    }
    terms
}
