//! Publication records and remote listing summaries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Category of a Skolinspektionen publication.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PublicationType {
    QualityReview,
    GovernmentReport,
    StatisticsReport,
    AnnualReport,
    PressRelease,
    #[default]
    Other,
}

impl PublicationType {
    /// Map a type slug (English kebab-case or the Swedish slug used on the
    /// origin site) to a publication type. Unknown slugs become `Other`.
    pub fn from_slug(slug: &str) -> Self {
        match slug.trim().to_lowercase().as_str() {
            "quality-review" | "kvalitetsgranskning" | "tematisk-kvalitetsgranskning"
            | "regelbunden-kvalitetsgranskning" => Self::QualityReview,
            "government-report" | "regeringsrapporter" => Self::GovernmentReport,
            "statistics-report" | "statistikrapporter" => Self::StatisticsReport,
            "annual-report" | "arsrapporter" | "arsredovisning" => Self::AnnualReport,
            "press-release" | "pressmeddelande" | "pressmeddelanden" => Self::PressRelease,
            _ => Self::Other,
        }
    }

    /// Kebab-case label, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QualityReview => "quality-review",
            Self::GovernmentReport => "government-report",
            Self::StatisticsReport => "statistics-report",
            Self::AnnualReport => "annual-report",
            Self::PressRelease => "press-release",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for PublicationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A publication from Skolinspektionen. Immutable once indexed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicationRecord {
    /// Stable identifier derived from the URL path
    pub id: String,

    /// Publication title
    pub title: String,

    /// Site-relative URL path
    pub url: String,

    /// Publication date
    pub published: Option<NaiveDate>,

    /// Case reference number (e.g., "SI 2023:1204")
    pub diarienummer: Option<String>,

    /// Publication category
    #[serde(rename = "type")]
    pub kind: PublicationType,

    /// Municipality the publication concerns, if any
    pub kommun: Option<String>,

    /// Inspection themes
    #[serde(default)]
    pub themes: Vec<String>,

    /// Short summary text
    pub summary: Option<String>,
}

impl PublicationRecord {
    /// Content fingerprint used for change detection during delta updates.
    ///
    /// Stable hash over visible metadata (title, date, url); changes whenever
    /// any of those change, without requiring a full-content fetch.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.title, self.published.as_ref(), &self.url)
    }
}

/// Lightweight publication summary from the authoritative remote listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteSummary {
    pub id: String,
    pub url: String,
    pub fingerprint: String,
    pub title: String,
    pub published: Option<NaiveDate>,
    #[serde(rename = "type", default)]
    pub kind: PublicationType,
    #[serde(default)]
    pub diarienummer: Option<String>,
    #[serde(default)]
    pub kommun: Option<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl RemoteSummary {
    /// Build a summary from listing metadata, deriving id and fingerprint.
    pub fn from_listing(
        url: &str,
        title: &str,
        published: Option<NaiveDate>,
        kind: PublicationType,
    ) -> Self {
        Self {
            id: crate::utils::url::record_id(url),
            url: url.to_string(),
            fingerprint: fingerprint(title, published.as_ref(), url),
            title: title.to_string(),
            published,
            kind,
            diarienummer: None,
            kommun: None,
            themes: Vec::new(),
            summary: None,
        }
    }

    /// Convert into a full index record.
    pub fn to_record(&self) -> PublicationRecord {
        PublicationRecord {
            id: self.id.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            published: self.published,
            diarienummer: self.diarienummer.clone(),
            kind: self.kind,
            kommun: self.kommun.clone(),
            themes: self.themes.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// Stable metadata fingerprint over (title, date, url).
pub fn fingerprint(title: &str, published: Option<&NaiveDate>, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    if let Some(date) = published {
        hasher.update(date.to_string().as_bytes());
    }
    hasher.update(b"|");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
