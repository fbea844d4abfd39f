//! Headless Chromium driven over CDP with chromiumoxide.

use super::{BrowserLauncher, BrowserPage, BrowserSession, Locator};
use crate::config::BrowserSettings;
use crate::error::{Result, ScrapeError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Finds the Chromium binary: explicit setting first, then the usual names on `PATH`.
pub fn find_chromium(settings: &BrowserSettings) -> Option<PathBuf> {
    if let Some(path) = &settings.executable {
        if path.exists() {
            return Some(path.clone());
        }
        warn!(path = %path.display(), "configured Chromium executable does not exist");
    }
    ["chromium", "chromium-browser", "google-chrome", "google-chrome-stable"]
        .into_iter()
        .find_map(|name| which::which(name).ok())
}

/// Launches a fresh headless Chromium for every scrape.
pub struct ChromiumLauncher {
    settings: BrowserSettings,
}

impl ChromiumLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let executable = find_chromium(&self.settings).ok_or_else(|| {
            ScrapeError::Launch("Chromium not found; set CHROME_PATH".to_string())
        })?;

        let config = BrowserConfig::builder()
            .chrome_executable(executable)
            .args(self.settings.args.iter().cloned())
            .arg(format!("--user-agent={}", self.settings.user_agent))
            .arg(format!("--lang={}", self.settings.locale))
            .build()
            .map_err(ScrapeError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "cdp handler event error");
                }
            }
        });

        Ok(Box::new(ChromiumSession { browser, handler }))
    }
}

pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(ScrapeError::browser)?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumSession {
            mut browser,
            handler,
        } = *self;
        let closed = browser.close().await.map_err(ScrapeError::browser);
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "waiting for Chromium to exit failed");
        }
        handler.abort();
        closed.map(|_| ())
    }
}

pub struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    async fn eval<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        self.page
            .evaluate(script)
            .await
            .map_err(ScrapeError::browser)?
            .into_value::<T>()
            .map_err(|e| ScrapeError::Browser(format!("failed to convert JS result: {e:?}")))
    }
}

/// JS expression evaluating to the array of elements `locator` matches.
fn matches_js(locator: &Locator) -> String {
    let css = serde_json::Value::from(locator.css).to_string();
    let text = locator
        .text
        .map(|t| serde_json::Value::from(t.to_lowercase()).to_string())
        .unwrap_or_else(|| "null".to_string());
    format!(
        "Array.from(document.querySelectorAll({css})).filter((el) => {text} === null || \
         (el.innerText || el.textContent || '').toLowerCase().includes({text}))"
    )
}

fn visible_js(locator: &Locator, nth: usize) -> String {
    format!(
        "(() => {{ const el = {}[{nth}]; if (!el) return false; \
         const s = window.getComputedStyle(el); const r = el.getBoundingClientRect(); \
         return s.visibility !== 'hidden' && s.display !== 'none' && r.width > 0 && r.height > 0; }})()",
        matches_js(locator)
    )
}

fn click_js(locator: &Locator, nth: usize) -> String {
    format!(
        "(() => {{ const el = {}[{nth}]; if (!el) return false; \
         el.scrollIntoView({{ block: 'center' }}); el.click(); return true; }})()",
        matches_js(locator)
    )
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ScrapeError::navigation(url, e)),
            Err(_) => Err(ScrapeError::navigation(
                url,
                format!("timed out after {}ms", timeout.as_millis()),
            )),
        }
    }

    /// CDP offers no network-idle event through chromiumoxide, so this waits
    /// for `readyState == "complete"` and a resource count that stopped growing.
    async fn wait_for_network_idle(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut last_count: Option<u64> = None;
        while Instant::now() < deadline {
            let (state, count): (String, u64) = self
                .eval("[document.readyState, performance.getEntriesByType('resource').length]")
                .await?;
            if state == "complete" && last_count == Some(count) {
                return Ok(());
            }
            last_count = Some(count);
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
        Err(ScrapeError::timeout("network idle", timeout))
    }

    async fn wait_for_selector(&mut self, css: &str, timeout: Duration) -> Result<bool> {
        let script = format!(
            "document.querySelector({}) !== null",
            serde_json::Value::from(css)
        );
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval::<bool>(&script).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn content(&mut self) -> Result<String> {
        self.eval("document.documentElement.outerHTML").await
    }

    async fn url(&mut self) -> Result<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(ScrapeError::browser)?
            .map(|u| u.to_string())
            .unwrap_or_default())
    }

    async fn count(&mut self, locator: &Locator) -> Result<usize> {
        self.eval(&format!("{}.length", matches_js(locator))).await
    }

    async fn is_visible(
        &mut self,
        locator: &Locator,
        nth: usize,
        timeout: Duration,
    ) -> Result<bool> {
        let script = visible_js(locator, nth);
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval::<bool>(&script).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&mut self, locator: &Locator, nth: usize, timeout: Duration) -> Result<()> {
        let script = click_js(locator, nth);
        match tokio::time::timeout(timeout, self.eval::<bool>(&script)).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(ScrapeError::Browser(format!("nothing to click for {locator}"))),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ScrapeError::timeout(format!("click on {locator}"), timeout)),
        }
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        self.eval::<bool>("(() => { window.scrollTo(0, document.body.scrollHeight); return true; })()")
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_js_escapes_arguments() {
        let js = matches_js(&Locator::with_text("button[aria-label*=\"accept\" i]", "OK"));
        assert!(js.contains(r#"querySelectorAll("button[aria-label*=\"accept\" i]")"#));
        assert!(js.contains(r#"includes("ok")"#));
        assert!(matches_js(&Locator::css("a")).contains("null === null"));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_navigate_and_click() {
        let launcher = ChromiumLauncher::new(BrowserSettings::default());
        let mut session = launcher.launch().await.expect("failed to launch");
        let mut page = session.new_page().await.expect("failed to open page");

        page.goto(
            "data:text/html,<main><h1>Hello</h1><button onclick=\"this.remove()\">OK</button></main>",
            Duration::from_secs(10),
        )
        .await
        .expect("navigation failed");

        let html = page.content().await.expect("content failed");
        assert!(html.contains("<h1>Hello</h1>"));

        let ok = Locator::with_text("button", "ok");
        assert_eq!(page.count(&ok).await.unwrap(), 1);
        assert!(page.is_visible(&ok, 0, Duration::from_secs(1)).await.unwrap());
        page.click(&ok, 0, Duration::from_secs(1)).await.unwrap();
        assert_eq!(page.count(&ok).await.unwrap(), 0);

        session.close().await.expect("close failed");
    }
}
