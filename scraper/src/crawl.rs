//! One scrape run: paginate the search results, then enrich every job.

use crate::browser::{BrowserLauncher, BrowserPage, BrowserSession};
use crate::config::{ScrapeOptions, POLITE_DELAY};
use crate::detail::enrich;
use crate::error::Result;
use crate::listing::extract_page_jobs;
use crate::pagination::paginate;
use jobsch_common::JobSummary;
use std::collections::HashMap;
use tracing::{info, warn};

/// Jobs keyed by detail link, kept in first-seen order.
#[derive(Debug, Default)]
pub struct JobAccumulator {
    jobs: Vec<JobSummary>,
    by_link: HashMap<String, usize>,
}

impl JobAccumulator {
    /// Adds jobs whose link has not been seen yet. Returns how many were new.
    pub fn merge(&mut self, jobs: impl IntoIterator<Item = JobSummary>) -> usize {
        let mut added = 0;
        for job in jobs {
            if self.by_link.contains_key(&job.link) {
                continue;
            }
            self.by_link.insert(job.link.clone(), self.jobs.len());
            self.jobs.push(job);
            added += 1;
        }
        added
    }

    pub fn get(&self, link: &str) -> Option<&JobSummary> {
        self.by_link.get(link).map(|&i| &self.jobs[i])
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut JobSummary> {
        self.jobs.iter_mut()
    }

    pub fn into_jobs(self) -> Vec<JobSummary> {
        self.jobs
    }
}

/// Runs a complete scrape with a fresh browser. The browser is closed
/// before returning, whatever the outcome.
pub async fn scrape_jobs(
    launcher: &dyn BrowserLauncher,
    options: &ScrapeOptions,
) -> Result<Vec<JobSummary>> {
    let search_url = options.search_url()?;
    info!(term = %options.term, max_pages = options.max_pages, url = %search_url, "starting scrape");

    let mut session = launcher.launch().await?;
    let result = run(session.as_mut(), &search_url, options.max_pages).await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "failed to close browser");
    }

    match &result {
        Ok(jobs) => info!(count = jobs.len(), "scrape complete"),
        Err(e) => warn!(error = %e, "scrape failed"),
    }
    result
}

async fn run(
    session: &mut dyn BrowserSession,
    search_url: &str,
    max_pages: u32,
) -> Result<Vec<JobSummary>> {
    let mut listing = session.new_page().await?;
    let mut details = session.new_page().await?;

    let mut jobs = JobAccumulator::default();
    let pages = paginate(listing.as_mut(), search_url, max_pages, |index, html, url| {
        let found = extract_page_jobs(html, url);
        let found_count = found.len();
        let added = jobs.merge(found);
        info!(
            page = index + 1,
            found = found_count,
            added,
            total = jobs.len(),
            "listing page extracted"
        );
    })
    .await?;

    info!(pages, jobs = jobs.len(), "listing complete, fetching details");
    enrich_all(details.as_mut(), &mut jobs).await;
    Ok(jobs.into_jobs())
}

/// Visits every detail page in listing order. A job whose page fails keeps
/// its listing fields with an empty description and key facts.
async fn enrich_all(page: &mut dyn BrowserPage, jobs: &mut JobAccumulator) {
    let total = jobs.len();
    for (index, job) in jobs.iter_mut().enumerate() {
        match enrich(page, &job.link).await {
            Ok(detail) => {
                detail.apply_to(job);
                page.settle(POLITE_DELAY).await;
            }
            Err(e) => {
                warn!(link = %job.link, error = %e, "detail page failed, keeping listing data");
            }
        }
        if (index + 1) % 10 == 0 {
            info!(done = index + 1, total, "details progress");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(link: &str, title: &str) -> JobSummary {
        JobSummary {
            title: title.into(),
            link: link.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_accumulator_keeps_first_seen() {
        let mut acc = JobAccumulator::default();
        assert_eq!(acc.merge([job("a", "A1"), job("b", "B1")]), 2);
        assert_eq!(acc.merge([job("b", "B2"), job("c", "C1"), job("c", "C2")]), 1);

        assert_eq!(acc.len(), 3);
        assert_eq!(acc.get("b").map(|j| j.title.as_str()), Some("B1"));
        assert_eq!(acc.get("c").map(|j| j.title.as_str()), Some("C1"));
        let links: Vec<_> = acc.into_jobs().into_iter().map(|j| j.link).collect();
        assert_eq!(links, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_accumulator_empty() {
        let acc = JobAccumulator::default();
        assert!(acc.is_empty());
        assert!(acc.get("a").is_none());
    }
}
