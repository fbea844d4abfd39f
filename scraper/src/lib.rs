//! jobs.ch vacancy scraper.
//!
//! Drives a headless browser through the search results for a term,
//! collects the job cards of every page and enriches each job from its
//! detail page. Extraction works on the rendered HTML and is independent
//! of the browser engine.

pub mod browser;
pub mod config;
pub mod crawl;
pub mod detail;
pub mod dom;
pub mod error;
pub mod listing;
pub mod locale;
pub mod normalize;
pub mod pagination;

pub use browser::chromium::ChromiumLauncher;
pub use browser::{BrowserLauncher, BrowserPage, BrowserSession, Locator};
pub use config::{BrowserSettings, ScrapeOptions};
pub use crawl::{scrape_jobs, JobAccumulator};
pub use detail::{extract_detail, JobDetail};
pub use error::{Result, ScrapeError};
pub use listing::extract_page_jobs;
