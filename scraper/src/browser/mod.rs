//! Browser abstraction the crawl is written against.
//!
//! A [`BrowserLauncher`] yields one [`BrowserSession`] per scrape; a session
//! hands out navigable [`BrowserPage`]s. Chromium (via chromiumoxide) is the
//! production engine.

pub mod chromium;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Element query used for interactive controls: a CSS selector, optionally
/// narrowed to elements whose text contains `text` (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    pub css: &'static str,
    pub text: Option<&'static str>,
}

impl Locator {
    pub const fn css(css: &'static str) -> Self {
        Self { css, text: None }
    }

    pub const fn with_text(css: &'static str, text: &'static str) -> Self {
        Self {
            css,
            text: Some(text),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.text {
            Some(text) => write!(f, "{}:has-text({text:?})", self.css),
            None => f.write_str(self.css),
        }
    }
}

/// Starts a browser for one scrape run.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// A running browser with a single context.
#[async_trait]
pub trait BrowserSession: Send {
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>>;
    /// Shuts the browser down. Called exactly once per session.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A single tab.
#[async_trait]
pub trait BrowserPage: Send {
    /// Navigates and waits for the document to be parsed.
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()>;
    async fn wait_for_network_idle(&mut self, timeout: Duration) -> Result<()>;
    /// Returns whether an element matching `css` appeared within `timeout`.
    async fn wait_for_selector(&mut self, css: &str, timeout: Duration) -> Result<bool>;
    /// Serialized DOM of the current document.
    async fn content(&mut self) -> Result<String>;
    async fn url(&mut self) -> Result<String>;
    async fn count(&mut self, locator: &Locator) -> Result<usize>;
    async fn is_visible(&mut self, locator: &Locator, nth: usize, timeout: Duration)
        -> Result<bool>;
    /// Clicks the `nth` match. Following a link may change the current document.
    async fn click(&mut self, locator: &Locator, nth: usize, timeout: Duration) -> Result<()>;
    async fn scroll_to_bottom(&mut self) -> Result<()>;

    /// Fixed wall-clock wait for client-side rendering.
    async fn settle(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::css("a[rel=\"next\"]").to_string(), "a[rel=\"next\"]");
        assert_eq!(
            Locator::with_text("button", "OK").to_string(),
            "button:has-text(\"OK\")"
        );
    }
}
