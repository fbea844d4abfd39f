//! Crawl settings and the fixed timing budget.

use crate::error::{Result, ScrapeError};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.jobs.ch";
pub const SEARCH_PATH: &str = "/en/vacancies/";
pub const DEFAULT_TERM: &str = "software engineer";
pub const DEFAULT_MAX_PAGES: u32 = 5;

/// Only vacancies published within this many days are requested.
pub const PUBLICATION_DATE_DAYS: u32 = 7;

/// Reported as `meta.source` on every response.
pub const META_SOURCE: &str = "https://www.jobs.ch/en/vacancies/?publication-date=7";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";
pub const DEFAULT_LOCALE: &str = "en-US";

pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(15);
pub const CLICK_LOAD_TIMEOUT: Duration = Duration::from_secs(20);
pub const ANCHOR_WAIT_TIMEOUT: Duration = Duration::from_secs(8);
pub const CONSENT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
pub const EXPANDER_PROBE_TIMEOUT: Duration = Duration::from_millis(500);
pub const NEXT_CONTROL_TIMEOUT: Duration = Duration::from_secs(2);

pub const LISTING_SETTLE: Duration = Duration::from_millis(800);
pub const SCROLL_SETTLE: Duration = Duration::from_millis(400);
pub const SCROLL_PASSES: usize = 3;
pub const DETAIL_SETTLE: Duration = Duration::from_millis(1200);
pub const EXPANDER_SETTLE: Duration = Duration::from_millis(150);
pub const POLITE_DELAY: Duration = Duration::from_millis(200);

/// Expanders clicked per candidate selector on a detail page.
pub const MAX_EXPANDER_CLICKS: usize = 5;

/// Parameters of one scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub term: String,
    pub max_pages: u32,
    pub base_url: String,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            term: DEFAULT_TERM.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ScrapeOptions {
    pub fn search_url(&self) -> Result<String> {
        search_url(&self.base_url, &self.term)
    }
}

/// How the headless browser is launched.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub user_agent: String,
    pub locale: String,
    /// Chromium executable. Looked up on `PATH` when unset.
    pub executable: Option<PathBuf>,
    pub args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            executable: None,
            // Flags needed in containers
            args: vec![
                "--no-sandbox".into(),
                "--disable-setuid-sandbox".into(),
                "--disable-dev-shm-usage".into(),
                "--disable-gpu".into(),
            ],
        }
    }
}

/// Builds `<base>/en/vacancies/?term=<term>&publication-date=7`.
pub fn search_url(base_url: &str, term: &str) -> Result<String> {
    let base = Url::parse(base_url)
        .map_err(|e| ScrapeError::Config(format!("base url {base_url:?}: {e}")))?;
    let mut url = base
        .join(SEARCH_PATH)
        .map_err(|e| ScrapeError::Config(format!("search path: {e}")))?;
    url.query_pairs_mut()
        .append_pair("term", term)
        .append_pair("publication-date", &PUBLICATION_DATE_DAYS.to_string());
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_term() {
        assert_eq!(
            search_url(DEFAULT_BASE_URL, "software engineer").unwrap(),
            "https://www.jobs.ch/en/vacancies/?term=software+engineer&publication-date=7"
        );
    }

    #[test]
    fn test_search_url_ignores_base_path() {
        assert_eq!(
            search_url("https://www.jobs.ch/de/", "nurse").unwrap(),
            "https://www.jobs.ch/en/vacancies/?term=nurse&publication-date=7"
        );
    }

    #[test]
    fn test_search_url_rejects_bad_base() {
        assert!(matches!(
            search_url("not a url", "nurse"),
            Err(ScrapeError::Config(_))
        ));
    }
}
