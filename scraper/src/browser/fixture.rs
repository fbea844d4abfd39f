//! In-memory browser serving canned HTML, for tests.
//!
//! Pages are looked up by exact URL. Clicking an element that carries an
//! `href` navigates to it; visibility is decided by `hidden`,
//! `aria-hidden="true"` and inline `display: none` on the element or an
//! ancestor. Waits return immediately.

use super::{BrowserLauncher, BrowserPage, BrowserSession, Locator};
use crate::dom::{inner_text, resolve_href};
use crate::error::{Result, ScrapeError};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

type PageGenerator = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// The pages a [`FixtureBrowser`] can reach.
#[derive(Clone, Default)]
pub struct FixtureSite {
    pages: HashMap<String, String>,
    generator: Option<PageGenerator>,
}

impl FixtureSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Serves URLs not registered with [`FixtureSite::page`].
    pub fn generator(
        mut self,
        generator: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.generator = Some(Arc::new(generator));
        self
    }

    fn lookup(&self, url: &str) -> Option<String> {
        self.pages
            .get(url)
            .cloned()
            .or_else(|| self.generator.as_ref().and_then(|g| g(url)))
    }
}

/// What the browser was asked to do.
#[derive(Debug, Clone, Default)]
pub struct FixtureLog {
    pub launches: usize,
    pub closes: usize,
    pub pages_opened: usize,
    /// Every URL successfully loaded, in order.
    pub visited: Vec<String>,
    pub clicks: Vec<String>,
}

#[derive(Clone)]
pub struct FixtureBrowser {
    site: Arc<FixtureSite>,
    log: Arc<Mutex<FixtureLog>>,
    fail_launch: bool,
}

impl FixtureBrowser {
    pub fn new(site: FixtureSite) -> Self {
        Self {
            site: Arc::new(site),
            log: Arc::new(Mutex::new(FixtureLog::default())),
            fail_launch: false,
        }
    }

    /// A browser whose launch always fails.
    pub fn unlaunchable() -> Self {
        Self {
            fail_launch: true,
            ..Self::new(FixtureSite::new())
        }
    }

    pub fn log(&self) -> FixtureLog {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Opens a page directly, outside any session.
    pub fn open_page(&self) -> FixturePage {
        record(&self.log, |log| log.pages_opened += 1);
        FixturePage {
            site: Arc::clone(&self.site),
            log: Arc::clone(&self.log),
            url: "about:blank".to_string(),
            html: String::new(),
        }
    }
}

fn record(log: &Mutex<FixtureLog>, f: impl FnOnce(&mut FixtureLog)) {
    f(&mut log.lock().unwrap_or_else(PoisonError::into_inner));
}

#[async_trait]
impl BrowserLauncher for FixtureBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        if self.fail_launch {
            return Err(ScrapeError::Launch("fixture browser refuses to start".into()));
        }
        record(&self.log, |log| log.launches += 1);
        Ok(Box::new(FixtureSession {
            browser: self.clone(),
        }))
    }
}

pub struct FixtureSession {
    browser: FixtureBrowser,
}

#[async_trait]
impl BrowserSession for FixtureSession {
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>> {
        Ok(Box::new(self.browser.open_page()))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        record(&self.browser.log, |log| log.closes += 1);
        Ok(())
    }
}

pub struct FixturePage {
    site: Arc<FixtureSite>,
    log: Arc<Mutex<FixtureLog>>,
    url: String,
    html: String,
}

/// A matched element, extracted before any await.
struct Matched {
    href: Option<String>,
    visible: bool,
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    let el = element.value();
    el.attr("hidden").is_some()
        || el.attr("aria-hidden") == Some("true")
        || el
            .attr("style")
            .is_some_and(|s| s.replace(' ', "").contains("display:none"))
}

fn find_matches(html: &str, locator: &Locator) -> Vec<Matched> {
    let Ok(selector) = Selector::parse(locator.css) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let needle = locator.text.map(str::to_lowercase);
    doc.select(&selector)
        .filter(|el| match &needle {
            Some(text) => inner_text(*el).to_lowercase().contains(text.as_str()),
            None => true,
        })
        .map(|el| Matched {
            href: el.value().attr("href").map(str::to_string),
            visible: !is_hidden(el)
                && !el.ancestors().filter_map(ElementRef::wrap).any(is_hidden),
        })
        .collect()
}

fn has_match(html: &str, css: &str) -> bool {
    Selector::parse(css)
        .map(|selector| Html::parse_document(html).select(&selector).next().is_some())
        .unwrap_or(false)
}

#[async_trait]
impl BrowserPage for FixturePage {
    async fn goto(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        let html = self
            .site
            .lookup(url)
            .ok_or_else(|| ScrapeError::navigation(url, "net::ERR_NAME_NOT_RESOLVED"))?;
        self.url = url.to_string();
        self.html = html;
        record(&self.log, |log| log.visited.push(url.to_string()));
        Ok(())
    }

    async fn wait_for_network_idle(&mut self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn wait_for_selector(&mut self, css: &str, _timeout: Duration) -> Result<bool> {
        Ok(has_match(&self.html, css))
    }

    async fn content(&mut self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn url(&mut self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn count(&mut self, locator: &Locator) -> Result<usize> {
        Ok(find_matches(&self.html, locator).len())
    }

    async fn is_visible(
        &mut self,
        locator: &Locator,
        nth: usize,
        _timeout: Duration,
    ) -> Result<bool> {
        Ok(find_matches(&self.html, locator)
            .get(nth)
            .is_some_and(|m| m.visible))
    }

    async fn click(&mut self, locator: &Locator, nth: usize, timeout: Duration) -> Result<()> {
        let href = {
            let matches = find_matches(&self.html, locator);
            let target = matches
                .get(nth)
                .ok_or_else(|| ScrapeError::Browser(format!("nothing to click for {locator}")))?;
            target.href.clone()
        };
        record(&self.log, |log| log.clicks.push(locator.to_string()));
        match href.and_then(|h| resolve_href(&h, &self.url)) {
            Some(url) => self.goto(&url, timeout).await,
            None => Ok(()),
        }
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        Ok(())
    }

    async fn settle(&mut self, _duration: Duration) {}
}
