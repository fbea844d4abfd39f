//! Process configuration read from the environment at start-up.

use jobsch_scraper::config::{BrowserSettings, DEFAULT_BASE_URL, DEFAULT_MAX_PAGES};
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Page bound for requests that do not ask for one.
    pub max_pages: u32,
    pub base_url: String,
    pub browser: BrowserSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_pages: DEFAULT_MAX_PAGES,
            base_url: DEFAULT_BASE_URL.to_string(),
            browser: BrowserSettings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`. Unusable values are logged
    /// and replaced by their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("PORT") {
            match raw.trim().parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!(value = %raw, default = DEFAULT_PORT, "invalid PORT"),
            }
        }
        if let Some(raw) = lookup("MAX_PAGES") {
            match parse_page_count(&raw) {
                Some(pages) => config.max_pages = pages,
                None => warn!(value = %raw, default = DEFAULT_MAX_PAGES, "invalid MAX_PAGES"),
            }
        }
        if let Some(agent) = lookup("USER_AGENT").filter(|v| !v.trim().is_empty()) {
            config.browser.user_agent = agent;
        }
        if let Some(path) = lookup("CHROME_PATH").filter(|v| !v.trim().is_empty()) {
            config.browser.executable = Some(PathBuf::from(path));
        }
        if let Some(base) = lookup("JOBS_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = base.trim().trim_end_matches('/').to_string();
        }
        config
    }
}

/// Reads a page count the lenient way: leading whitespace is skipped and
/// the leading run of digits is used ("3abc" is 3). Zero, negative and
/// unreadable values give `None`.
pub fn parse_page_count(raw: &str) -> Option<u32> {
    let s = raw.trim_start();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let value: u32 = rest[..end].parse().ok()?;
    (!negative && value > 0).then_some(value)
}
