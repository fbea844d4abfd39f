//! Walking the results pages and dismissing overlays on the way.

use crate::browser::{BrowserPage, Locator};
use crate::config::{
    ANCHOR_WAIT_TIMEOUT, CLICK_LOAD_TIMEOUT, CONSENT_PROBE_TIMEOUT, LISTING_SETTLE,
    NAVIGATION_TIMEOUT, NETWORK_IDLE_TIMEOUT, NEXT_CONTROL_TIMEOUT, SCROLL_PASSES, SCROLL_SETTLE,
};
use crate::dom::{resolve_href, selector};
use crate::error::Result;
use crate::listing::VACANCY_ANCHORS;
use crate::locale::{self, NEXT_LABEL_EN};
use scraper::Html;
use tracing::{debug, info, warn};

pub const REL_NEXT: Locator = Locator::css(r#"a[rel="next"]"#);
pub const NEXT_CONTROL: Locator = Locator::with_text("a", NEXT_LABEL_EN);

/// How to reach the following results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// A `rel="next"` link with a resolvable target.
    Link(String),
    /// A control that has to be clicked.
    Control(Locator),
}

/// Clicks the first visible consent button, if any. Returns what was clicked.
pub async fn accept_cookies(page: &mut dyn BrowserPage) -> Option<Locator> {
    for candidate in locale::consent_candidates() {
        // Skip absent controls without waiting on them
        match page.count(&candidate).await {
            Ok(0) => continue,
            Ok(_) => {}
            Err(e) => {
                debug!(control = %candidate, error = %e, "consent probe failed");
                continue;
            }
        }
        match page.is_visible(&candidate, 0, CONSENT_PROBE_TIMEOUT).await {
            Ok(true) => {
                if let Err(e) = page.click(&candidate, 0, CONSENT_PROBE_TIMEOUT).await {
                    debug!(control = %candidate, error = %e, "consent click failed");
                }
                return Some(candidate);
            }
            Ok(false) => {}
            Err(e) => debug!(control = %candidate, error = %e, "consent probe failed"),
        }
    }
    None
}

fn rel_next_href(html: &str, page_url: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let href = doc
        .select(&selector(REL_NEXT.css))
        .next()?
        .value()
        .attr("href")?
        .to_string();
    resolve_href(&href, page_url)
}

async fn visible(page: &mut dyn BrowserPage, locator: &Locator) -> bool {
    match page.count(locator).await {
        Ok(0) => false,
        Ok(_) => page
            .is_visible(locator, 0, NEXT_CONTROL_TIMEOUT)
            .await
            .unwrap_or(false),
        Err(e) => {
            debug!(control = %locator, error = %e, "next-page probe failed");
            false
        }
    }
}

/// Looks for a visible `rel="next"` link, then a visible "Next" control.
/// `None` means the last page was reached.
pub async fn find_next_page(page: &mut dyn BrowserPage) -> Option<NextPage> {
    if visible(page, &REL_NEXT).await {
        let html = page.content().await.ok()?;
        let url = page.url().await.ok()?;
        return Some(match rel_next_href(&html, &url) {
            Some(link) => NextPage::Link(link),
            None => NextPage::Control(REL_NEXT),
        });
    }
    if visible(page, &NEXT_CONTROL).await {
        return Some(NextPage::Control(NEXT_CONTROL));
    }
    None
}

async fn click_next(page: &mut dyn BrowserPage, control: &Locator) -> Result<()> {
    page.click(control, 0, NEXT_CONTROL_TIMEOUT).await?;
    if let Ok(false) = page.wait_for_selector("body", CLICK_LOAD_TIMEOUT).await {
        debug!("no document after clicking next");
    }
    if let Err(e) = page.wait_for_network_idle(NETWORK_IDLE_TIMEOUT).await {
        debug!(error = %e, "network did not settle after clicking next");
    }
    Ok(())
}

/// Gets a freshly loaded results page ready for extraction: consent
/// dismissed, cards rendered, lazy content triggered.
async fn prepare_listing(page: &mut dyn BrowserPage) {
    if let Err(e) = page.wait_for_network_idle(NETWORK_IDLE_TIMEOUT).await {
        debug!(error = %e, "listing network did not settle");
    }
    accept_cookies(page).await;
    page.settle(LISTING_SETTLE).await;
    match page.wait_for_selector(VACANCY_ANCHORS, ANCHOR_WAIT_TIMEOUT).await {
        Ok(true) => {}
        Ok(false) => debug!("no vacancy links rendered"),
        Err(e) => debug!(error = %e, "waiting for vacancy links failed"),
    }
    for _ in 0..SCROLL_PASSES {
        if let Err(e) = page.scroll_to_bottom().await {
            debug!(error = %e, "scroll failed");
        }
        page.settle(SCROLL_SETTLE).await;
    }
}

/// Visits up to `max_pages` results pages starting at `start_url`, handing
/// each page's HTML and URL to `visit`. Returns the number of pages visited.
///
/// Stops early when no next page is found or advancing fails; navigation
/// errors on a page that must be loaded are returned.
pub async fn paginate<F>(
    page: &mut dyn BrowserPage,
    start_url: &str,
    max_pages: u32,
    mut visit: F,
) -> Result<u32>
where
    F: FnMut(u32, &str, &str) + Send,
{
    let mut pending = Some(start_url.to_string());
    let mut visited = 0;

    for index in 0..max_pages {
        if let Some(url) = pending.take() {
            page.goto(&url, NAVIGATION_TIMEOUT).await?;
        }
        prepare_listing(page).await;

        let html = page.content().await?;
        let url = page.url().await?;
        visit(index, &html, &url);
        visited += 1;

        if index + 1 == max_pages {
            info!(max_pages, "page bound reached");
            break;
        }
        match find_next_page(page).await {
            Some(NextPage::Link(link)) => pending = Some(link),
            Some(NextPage::Control(control)) => {
                if let Err(e) = click_next(page, &control).await {
                    warn!(control = %control, error = %e, "could not advance to next page");
                    break;
                }
            }
            None => {
                info!(pages = visited, "last page reached");
                break;
            }
        }
    }
    Ok(visited)
}
