//! Hybrid BM25 + fuzzy ranking over the publication index.
//!
//! Scoring combines BM25 over the index statistics with a fuzzy-match bonus
//! for query tokens that exactly match nothing in the vocabulary but sit
//! within a small edit distance of an indexed token. Filters are applied as
//! a pre-filter so documents that would be discarded are never scored.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::index::{PublicationIndex, tokenize};
use crate::models::{PublicationRecord, PublicationType, SearchConfig};
use crate::search::fuzzy::edit_distance_within;

/// Filters applied before scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Municipality (case-insensitive exact match)
    pub kommun: Option<String>,

    /// Publication type
    #[serde(rename = "type")]
    pub kind: Option<PublicationType>,

    /// Publication year
    pub year: Option<i32>,

    /// Inspection theme (case-insensitive exact match)
    pub theme: Option<String>,
}

impl SearchFilters {
    /// Whether a record passes all set filters.
    pub fn matches(&self, record: &PublicationRecord) -> bool {
        if let Some(kommun) = &self.kommun {
            match &record.kommun {
                Some(k) if k.eq_ignore_ascii_case(kommun) => {}
                _ => return false,
            }
        }
        if let Some(kind) = self.kind {
            if record.kind != kind {
                return false;
            }
        }
        if let Some(year) = self.year {
            match record.published {
                Some(date) if chrono::Datelike::year(&date) == year => {}
                _ => return false,
            }
        }
        if let Some(theme) = &self.theme {
            if !record.themes.iter().any(|t| t.eq_ignore_ascii_case(theme)) {
                return false;
            }
        }
        true
    }
}

/// A ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub record: PublicationRecord,
    pub score: f64,
}

impl SearchHit {
    /// Human-readable relevance indicator for the normalized score.
    pub fn relevance_label(&self) -> &'static str {
        if self.score >= 0.9 {
            "Mycket hög relevans"
        } else if self.score >= 0.7 {
            "Hög relevans"
        } else if self.score >= 0.5 {
            "Medelhög relevans"
        } else {
            "Låg relevans"
        }
    }
}

/// Rank publications matching `query` under `filters`.
///
/// Returns hits ordered by descending score, then descending publication
/// date, then ascending id. An empty query returns the filtered set ordered
/// by date; a query matching nothing (even fuzzily) returns an empty list.
pub fn rank(
    index: &PublicationIndex,
    query: &str,
    filters: &SearchFilters,
    params: &SearchConfig,
) -> Vec<SearchHit> {
    let candidates: HashSet<u32> = index
        .docs()
        .filter(|(_, record)| filters.matches(record))
        .map(|(slot, _)| slot)
        .collect();

    if candidates.is_empty() {
        return Vec::new();
    }

    // Repeated query tokens score once, wherever they appear in the query.
    let mut query_tokens = tokenize(query);
    let mut seen = HashSet::new();
    query_tokens.retain(|t| seen.insert(t.clone()));

    if query_tokens.is_empty() {
        return filtered_by_date(index, &candidates, params.max_results);
    }

    let mut scores: HashMap<u32, f64> = HashMap::new();
    for token in &query_tokens {
        if index.postings(token).is_some() {
            accumulate_bm25(index, &candidates, token, 1.0, params, &mut scores);
        } else {
            for near in fuzzy_candidates(index, token, params.fuzzy_max_edit_distance) {
                accumulate_bm25(
                    index,
                    &candidates,
                    &near,
                    params.fuzzy_weight,
                    params,
                    &mut scores,
                );
            }
        }
    }

    let max_score = scores.values().copied().fold(0.0_f64, f64::max);
    if max_score <= 0.0 {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = scores
        .into_iter()
        .filter(|(_, score)| *score > 0.0)
        .filter_map(|(slot, score)| {
            index.doc(slot).map(|record| SearchHit {
                record: record.clone(),
                score: score / max_score,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.record.published.cmp(&a.record.published))
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    hits.truncate(params.max_results);
    hits
}

/// BM25 contribution of one indexed token, scaled by `weight`, added to
/// every candidate document in its posting list.
fn accumulate_bm25(
    index: &PublicationIndex,
    candidates: &HashSet<u32>,
    token: &str,
    weight: f64,
    params: &SearchConfig,
    scores: &mut HashMap<u32, f64>,
) {
    let Some(postings) = index.postings(token) else {
        return;
    };

    let n = index.len() as f64;
    let df = postings.len() as f64;
    let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
    let avgdl = index.avg_doc_len().max(1.0);
    let (k1, b) = (params.bm25_k1, params.bm25_b);

    for posting in postings {
        if !candidates.contains(&posting.doc) {
            continue;
        }
        let tf = posting.tf as f64;
        let dl = index.doc_len(posting.doc) as f64;
        let norm = tf + k1 * (1.0 - b + b * dl / avgdl);
        *scores.entry(posting.doc).or_insert(0.0) += weight * idf * tf * (k1 + 1.0) / norm;
    }
}

/// Indexed tokens within `max_dist` edits of a query token, found via the
/// index's length-bucketed vocabulary rather than a full scan.
fn fuzzy_candidates(index: &PublicationIndex, token: &str, max_dist: u32) -> Vec<String> {
    let token_len = token.chars().count();
    let lo = token_len.saturating_sub(max_dist as usize);
    let hi = token_len + max_dist as usize;

    let mut matched = Vec::new();
    for len in lo..=hi {
        for candidate in index.tokens_with_char_len(len) {
            if edit_distance_within(token, candidate, max_dist).is_some() {
                matched.push(candidate.clone());
            }
        }
    }
    matched
}

/// Empty-query result: the filtered set ordered by publication date
/// descending, score undefined (reported as 0).
fn filtered_by_date(
    index: &PublicationIndex,
    candidates: &HashSet<u32>,
    max_results: usize,
) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = candidates
        .iter()
        .filter_map(|&slot| {
            index.doc(slot).map(|record| SearchHit {
                record: record.clone(),
                score: 0.0,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.record
            .published
            .cmp(&a.record.published)
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    hits.truncate(max_results);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(id: &str, title: &str, kind: PublicationType, year: i32) -> PublicationRecord {
        PublicationRecord {
            id: id.to_string(),
            title: title.to_string(),
            url: format!("/pub/{id}/"),
            published: NaiveDate::from_ymd_opt(year, 6, 1),
            diarienummer: None,
            kind,
            kommun: None,
            themes: vec![],
            summary: None,
        }
    }

    fn params() -> SearchConfig {
        SearchConfig::default()
    }

    #[test]
    fn test_type_filter_limits_results() {
        // Three quality reviews and two press releases; only quality
        // reviews may surface with the type filter set.
        let index = PublicationIndex::from_records(vec![
            record(
                "q1",
                "Styrning av skolans huvudman",
                PublicationType::QualityReview,
                2024,
            ),
            record(
                "q2",
                "Granskning av huvudman i Norrköping",
                PublicationType::QualityReview,
                2023,
            ),
            record("q3", "Studiero i gymnasiet", PublicationType::QualityReview, 2025),
            record(
                "p1",
                "Pressmeddelande om huvudman",
                PublicationType::PressRelease,
                2025,
            ),
            record("p2", "Nya siffror om skolval", PublicationType::PressRelease, 2024),
        ]);

        let filters = SearchFilters {
            kind: Some(PublicationType::QualityReview),
            ..Default::default()
        };
        let hits = rank(&index, "huvudman", &filters, &params());

        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.record.kind == PublicationType::QualityReview));
    }

    #[test]
    fn test_exact_beats_fuzzy() {
        // "studiero" matches doc a exactly; the misspelled "klassrumet"
        // only reaches doc b through the fuzzy path at half weight.
        let index = PublicationIndex::from_records(vec![
            record("a", "studiero", PublicationType::Other, 2024),
            record("b", "klassrummet", PublicationType::Other, 2024),
        ]);

        let hits = rank(
            &index,
            "studiero klassrumet",
            &SearchFilters::default(),
            &params(),
        );
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.id, "a");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_fuzzy_skipped_when_token_matches_exactly() {
        // A typo variant of an exactly-matched query token earns nothing.
        let index = PublicationIndex::from_records(vec![
            record("exact", "studiero i klassrummet", PublicationType::Other, 2024),
            record("typo", "studiiero i klassrummet", PublicationType::Other, 2024),
        ]);

        let hits = rank(&index, "studiero", &SearchFilters::default(), &params());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "exact");
    }

    #[test]
    fn test_fuzzy_tolerates_typo() {
        let index = PublicationIndex::from_records(vec![record(
            "a",
            "matematikundervisning",
            PublicationType::Other,
            2024,
        )]);

        let hits = rank(
            &index,
            "matematikundervisnig",
            &SearchFilters::default(),
            &params(),
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "a");
    }

    #[test]
    fn test_no_match_returns_empty() {
        let index =
            PublicationIndex::from_records(vec![record("a", "trygghet", PublicationType::Other, 2024)]);
        let hits = rank(&index, "zzzzzzzzzzzz", &SearchFilters::default(), &params());
        assert!(hits.is_empty());
    }

    #[test]
    fn test_empty_query_with_filters_orders_by_date() {
        let index = PublicationIndex::from_records(vec![
            record("old", "rapport", PublicationType::QualityReview, 2020),
            record("new", "rapport", PublicationType::QualityReview, 2025),
            record("press", "rapport", PublicationType::PressRelease, 2024),
        ]);

        let filters = SearchFilters {
            kind: Some(PublicationType::QualityReview),
            ..Default::default()
        };
        let hits = rank(&index, "", &filters, &params());

        let ids: Vec<_> = hits.iter().map(|h| h.record.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert!(hits.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn test_year_filter() {
        let index = PublicationIndex::from_records(vec![
            record("a", "laslust", PublicationType::Other, 2024),
            record("b", "laslust", PublicationType::Other, 2025),
        ]);

        let filters = SearchFilters {
            year: Some(2025),
            ..Default::default()
        };
        let hits = rank(&index, "laslust", &filters, &params());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "b");
    }

    #[test]
    fn test_tiebreak_deterministic() {
        // Identical text and date; ascending id decides.
        let index = PublicationIndex::from_records(vec![
            record("b", "trygghet", PublicationType::Other, 2024),
            record("a", "trygghet", PublicationType::Other, 2024),
        ]);

        let hits = rank(&index, "trygghet", &SearchFilters::default(), &params());
        let ids: Vec<_> = hits.iter().map(|h| h.record.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_theme_filter_case_insensitive() {
        let mut rec = record("a", "rapport", PublicationType::Other, 2024);
        rec.themes = vec!["Studiero".to_string()];
        let index = PublicationIndex::from_records(vec![rec]);

        let filters = SearchFilters {
            theme: Some("studiero".to_string()),
            ..Default::default()
        };
        assert_eq!(rank(&index, "rapport", &filters, &params()).len(), 1);
    }

    #[test]
    fn test_repeated_query_token_scores_once() {
        // "skola trygghet skola" must not double-weight "skola": both docs
        // match one distinct token each, so both normalize to 1.0.
        let index = PublicationIndex::from_records(vec![
            record("a", "skola", PublicationType::Other, 2024),
            record("b", "trygghet", PublicationType::Other, 2024),
        ]);

        let hits = rank(
            &index,
            "skola trygghet skola",
            &SearchFilters::default(),
            &params(),
        );
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].score, 1.0);
        assert_eq!(hits[1].score, 1.0);
    }

    #[test]
    fn test_scores_normalized() {
        let index = PublicationIndex::from_records(vec![
            record("a", "studiero studiero studiero", PublicationType::Other, 2024),
            record("b", "studiero och annat innehall", PublicationType::Other, 2024),
        ]);
        let hits = rank(&index, "studiero", &SearchFilters::default(), &params());
        assert_eq!(hits[0].score, 1.0);
        assert!(hits[1].score > 0.0 && hits[1].score < 1.0);
    }
}
