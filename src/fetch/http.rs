//! HTTP fetcher for the Skolinspektionen site.
//!
//! Fetches pages with a shared `reqwest` client and parses the publication
//! listing with the configured CSS selectors. Status codes are classified
//! into transient errors (retryable, breaker-visible) and client errors
//! (terminal).

use chrono::NaiveDate;
use regex::Regex;
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use super::ContentFetcher;
use crate::error::{AppError, Result};
use crate::models::{HttpConfig, ListingConfig, PublicationType, RemoteSummary};
use crate::utils::url::resolve;

pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    listing: ListingConfig,
    diarienummer: Regex,
}

impl HttpFetcher {
    pub fn new(http: &HttpConfig, listing: &ListingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&http.user_agent)
            .timeout(Duration::from_secs(http.timeout_secs))
            .build()?;

        // "SI 2024:1204", "Dnr 2024:1204", "SI-2024:1204"
        let diarienummer = Regex::new(r"(?i)\b(?:SI|Dnr)[ \-]?(\d{4}:\d+)")
            .map_err(|e| AppError::parse(e.to_string()))?;

        Ok(Self {
            client,
            base_url: http.base_url.clone(),
            listing: listing.clone(),
            diarienummer,
        })
    }

    async fn get(&self, url: &str) -> Result<String> {
        let absolute = resolve(&self.base_url, url);
        log::debug!("GET {}", absolute);

        let response = self.client.get(&absolute).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                AppError::transient(&absolute, e)
            } else {
                AppError::Http(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.text().await?);
        }
        if status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
            || status.is_server_error()
        {
            return Err(AppError::transient(
                &absolute,
                format!("status {}", status.as_u16()),
            ));
        }
        Err(AppError::client(
            &absolute,
            Some(status.as_u16()),
            "request rejected",
        ))
    }

    fn parse_listing(&self, html: &str) -> Result<Vec<RemoteSummary>> {
        parse_summaries(html, &self.listing, &self.diarienummer)
    }
}

#[async_trait::async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch_raw_content(&self, url: &str) -> Result<String> {
        self.get(url).await
    }

    async fn fetch_publication_summaries(&self) -> Result<Vec<RemoteSummary>> {
        let html = self.get(&self.listing.path).await?;
        let summaries = self.parse_listing(&html)?;
        log::info!("Listing scrape found {} publications", summaries.len());
        Ok(summaries)
    }
}

/// Parse listing HTML into summaries using the configured selectors.
fn parse_summaries(
    html: &str,
    listing: &ListingConfig,
    diarienummer: &Regex,
) -> Result<Vec<RemoteSummary>> {
    let row_sel = selector(&listing.row_selector)?;
    let title_sel = selector(&listing.title_selector)?;
    let date_sel = selector(&listing.date_selector)?;
    let type_sel = listing
        .type_selector
        .as_deref()
        .map(selector)
        .transpose()?;

    let document = Html::parse_document(html);
    let mut summaries = Vec::new();

    for row in document.select(&row_sel) {
        let Some(link) = row.select(&title_sel).next() else {
            continue;
        };
        let Some(href) = link.attr(listing.link_attr.as_str()) else {
            continue;
        };
        let title = collapse_whitespace(&link.text().collect::<String>());
        if title.is_empty() {
            continue;
        }

        let published = row
            .select(&date_sel)
            .next()
            .and_then(|el| parse_date_element(&el));

        let kind = type_sel
            .as_ref()
            .and_then(|sel| row.select(sel).next())
            .map(|el| {
                let text = collapse_whitespace(&el.text().collect::<String>());
                PublicationType::from_slug(&slugify(&text))
            })
            .unwrap_or_default();

        let mut summary = RemoteSummary::from_listing(href, &title, published, kind);

        let row_text = row.text().collect::<String>();
        if let Some(capture) = diarienummer.captures(&row_text) {
            summary.diarienummer = Some(format!("SI {}", &capture[1]));
        }

        summaries.push(summary);
    }

    Ok(summaries)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::parse(format!("bad selector {:?}: {}", css, e)))
}

/// Date from a listing element: prefer a machine-readable `datetime`
/// attribute, fall back to the visible text.
fn parse_date_element(el: &ElementRef) -> Option<NaiveDate> {
    if let Some(datetime) = el.attr("datetime") {
        if let Some(date) = parse_date(datetime) {
            return Some(date);
        }
    }
    parse_date(&collapse_whitespace(&el.text().collect::<String>()))
}

/// Parse ISO dates and written-out Swedish dates ("14 mars 2025").
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    // Truncate a datetime attribute like "2025-03-14T00:00:00".
    if text.len() >= 10 {
        if let Ok(date) = NaiveDate::parse_from_str(&text[..10], "%Y-%m-%d") {
            return Some(date);
        }
    }

    let mut parts = text.split_whitespace();
    let day: u32 = parts.next()?.parse().ok()?;
    let month = swedish_month(parts.next()?)?;
    let year: i32 = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn swedish_month(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "januari" | "jan" => 1,
        "februari" | "feb" => 2,
        "mars" | "mar" => 3,
        "april" | "apr" => 4,
        "maj" => 5,
        "juni" | "jun" => 6,
        "juli" | "jul" => 7,
        "augusti" | "aug" => 8,
        "september" | "sep" => 9,
        "oktober" | "okt" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Category label to slug: lowercase, ASCII-fold Swedish vowels, hyphens.
fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'å' | 'ä' => 'a',
            'ö' => 'o',
            ' ' => '-',
            c => c,
        })
        .collect()
}
