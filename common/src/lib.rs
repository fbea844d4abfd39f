//! Shared data model for the jobs.ch scraper.
//!
//! Field names serialize in camelCase so the JSON returned by the server
//! matches what API consumers already expect (`contractType`, `keyInfo`, ...).

use serde::{Deserialize, Serialize};

/// One vacancy, first filled from its listing card and then enriched from
/// its detail page.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub title: String,
    pub company: String,
    pub location: String,
    pub workload: String,
    pub contract_type: String,
    /// Relative posting age as printed on the card ("3 days ago").
    pub posted_text: String,
    /// Absolute detail-page URL. Unique within a result set.
    pub link: String,
    pub description: String,
    pub key_info: KeyInfo,
}

/// Key facts printed on a detail page. Every key is always present; a
/// missing fact is an empty string.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyInfo {
    pub publication_date: String,
    pub workload: String,
    pub contract_type: String,
    pub language: String,
    pub place_of_work: String,
}

impl KeyInfo {
    pub fn is_empty(&self) -> bool {
        self.publication_date.is_empty()
            && self.workload.is_empty()
            && self.contract_type.is_empty()
            && self.language.is_empty()
            && self.place_of_work.is_empty()
    }
}

/// Body of a successful `GET /scrape`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScrapeResponse {
    pub meta: ScrapeMeta,
    pub data: Vec<JobSummary>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeMeta {
    pub term: String,
    pub max_pages: u32,
    pub publication_date_days: u32,
    pub count: usize,
    pub source: String,
}

/// Body of a failed request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthBody {
    pub status: String,
}
