//! Error types for a scrape run.

use std::time::Duration;
use thiserror::Error;

/// Errors that can abort a scrape or a single navigation.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The browser process could not be started.
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// A page could not be loaded.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// A bounded wait ran out.
    #[error("{what} timed out after {millis}ms")]
    Timeout { what: String, millis: u128 },

    /// Any other failure reported by the browser (script errors, closed targets).
    #[error("browser error: {0}")]
    Browser(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ScrapeError {
    pub fn navigation(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ScrapeError::Navigation {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        ScrapeError::Timeout {
            what: what.into(),
            millis: after.as_millis(),
        }
    }

    pub fn browser(err: impl std::fmt::Display) -> Self {
        ScrapeError::Browser(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
