//! Job cards on a search-results page.

use crate::dom::{closest, inner_text, resolve_href, selector};
use crate::locale::CARD_LABELS;
use crate::normalize::{parse_card_text_to_fields, strip_html};
use jobsch_common::JobSummary;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Anything that looks like a vacancy link; used to wait for rendering.
pub const VACANCY_ANCHORS: &str = r#"a[href*="/vacanc"], a[href*="/vacancies/detail/"]"#;

const FALLBACK_TITLE_CHARS: usize = 140;

static CARD_ANCHORS: LazyLock<Selector> = LazyLock::new(|| selector(r#"main a[href*="/vacanc"]"#));
static DETAIL_ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"a[href*="/vacancies/detail/"]"#));
static TITLE_HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"h3, h2, [data-testid="job-title"], .job-title"#));
static VACANCY_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/vacanc").expect("valid vacancy pattern"));

/// Title sources tried in order before the card's first text line.
const TITLE_STRATEGIES: &[fn(ElementRef<'_>) -> Option<String>] =
    &[heading_in_card, heading_in_article];

/// Extracts the job cards of one rendered results page, in document order.
///
/// Cards are vacancy links inside `<main>` whose text carries at least one
/// metadata label. When none qualify, every detail link on the page is
/// taken instead, with only a title derived from its text.
pub fn extract_page_jobs(html: &str, page_url: &str) -> Vec<JobSummary> {
    let doc = Html::parse_document(html);
    let jobs = card_jobs(&doc, page_url);
    if !jobs.is_empty() {
        return jobs;
    }
    detail_link_jobs(&doc, page_url)
}

fn card_jobs(doc: &Html, page_url: &str) -> Vec<JobSummary> {
    let mut seen = HashSet::new();
    doc.select(&CARD_ANCHORS)
        .filter_map(|anchor| card_job(anchor, page_url, &mut seen))
        .collect()
}

fn card_job(anchor: ElementRef<'_>, page_url: &str, seen: &mut HashSet<String>) -> Option<JobSummary> {
    let link = resolve_href(anchor.value().attr("href")?, page_url)?;
    // Skip non-vacancy links and duplicates on the same page
    if !VACANCY_URL_RE.is_match(&link) || !seen.insert(link.clone()) {
        return None;
    }

    // A card carries at least one metadata label
    let flat = strip_html(&anchor.inner_html()).to_lowercase();
    if !CARD_LABELS
        .iter()
        .any(|label| flat.contains(&label.to_lowercase()))
    {
        return None;
    }

    let fields = parse_card_text_to_fields(&inner_text(anchor));
    // Prefer a heading over the first text line
    let title = TITLE_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(anchor).filter(|t| !t.is_empty()))
        .unwrap_or(fields.title);

    Some(JobSummary {
        title,
        company: fields.company,
        location: fields.location,
        workload: fields.workload,
        contract_type: fields.contract_type,
        posted_text: fields.posted_text,
        link,
        ..Default::default()
    })
}

fn heading_in_card(anchor: ElementRef<'_>) -> Option<String> {
    anchor
        .select(&TITLE_HEADINGS)
        .next()
        .map(|h| strip_html(&h.inner_html()))
}

fn heading_in_article(anchor: ElementRef<'_>) -> Option<String> {
    closest(anchor, "article")?
        .select(&TITLE_HEADINGS)
        .next()
        .map(|h| strip_html(&h.inner_html()))
}

fn detail_link_jobs(doc: &Html, page_url: &str) -> Vec<JobSummary> {
    let mut seen = HashSet::new();
    doc.select(&DETAIL_ANCHORS)
        .filter_map(|anchor| {
            let link = resolve_href(anchor.value().attr("href")?, page_url)?;
            if !seen.insert(link.clone()) {
                return None;
            }
            let title = strip_html(&anchor.inner_html())
                .chars()
                .take(FALLBACK_TITLE_CHARS)
                .collect();
            Some(JobSummary {
                title,
                link,
                ..Default::default()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str = "https://www.jobs.ch/en/vacancies/?term=nurse&publication-date=7";

    fn card(href: &str, title: &str, company: &str) -> String {
        format!(
            r#"<a href="{href}">
                <div><h2>{title}</h2></div>
                <div>3 days ago</div>
                <div>{company}</div>
                <div>Place of work: <span>Zurich</span></div>
                <div>Workload: 80 &ndash; 100%</div>
                <div>Contract type: Permanent position</div>
                <div>Easy apply</div>
            </a>"#
        )
    }

    #[test]
    fn test_extract_cards_in_document_order() {
        let html = format!(
            r#"<html><body><nav><a href="/en/vacancies/">Find a job</a></nav><main>
                {}{}
                <a href="/en/vacancies/?page=2">Next</a>
            </main></body></html>"#,
            card("/en/vacancies/detail/1/", "Nurse &amp; Midwife", "Spital AG"),
            card("/en/vacancies/detail/2/", "Night Nurse", "Klinik Bern"),
        );
        let jobs = extract_page_jobs(&html, PAGE_URL);

        assert_eq!(jobs.len(), 2);
        let first = &jobs[0];
        assert_eq!(first.title, "Nurse & Midwife");
        assert_eq!(first.company, "Spital AG");
        assert_eq!(first.location, "Zurich");
        assert_eq!(first.workload, "80 – 100%");
        assert_eq!(first.contract_type, "Permanent position");
        assert_eq!(first.posted_text, "3 days ago");
        assert_eq!(first.link, "https://www.jobs.ch/en/vacancies/detail/1/");
        assert_eq!(first.description, "");
        assert!(first.key_info.is_empty());
        assert_eq!(jobs[1].link, "https://www.jobs.ch/en/vacancies/detail/2/");
    }

    #[test]
    fn test_duplicate_links_within_page_keep_first() {
        let html = format!(
            "<main>{}{}</main>",
            card("/en/vacancies/detail/1/", "First", "A AG"),
            card("https://www.jobs.ch/en/vacancies/detail/1/", "Second", "B AG"),
        );
        let jobs = extract_page_jobs(&html, PAGE_URL);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "First");
    }

    #[test]
    fn test_title_from_enclosing_article() {
        let html = r#"<main><article>
            <h3>Pflegefachperson HF</h3>
            <a href="/de/vacancies/detail/9/">
                <div>Pflegefachperson HF 80%</div>
                <div>Spitex Zürich</div>
                <div>Workload: 80%</div>
            </a>
        </article></main>"#;
        let jobs = extract_page_jobs(html, PAGE_URL);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Pflegefachperson HF");
        assert_eq!(jobs[0].company, "Spitex Zürich");
    }

    #[test]
    fn test_title_falls_back_to_first_line() {
        let html = r#"<main><a href="/en/vacancies/detail/3/">
            <div>Data Engineer</div><div>Acme AG</div><div>Workload: 100%</div>
        </a></main>"#;
        let jobs = extract_page_jobs(html, PAGE_URL);
        assert_eq!(jobs[0].title, "Data Engineer");
    }

    #[test]
    fn test_anchors_without_metadata_are_not_cards() {
        let html = format!(
            r#"<main>{}<a href="/en/vacancies/detail/77/">Similar jobs</a></main>"#,
            card("/en/vacancies/detail/1/", "Nurse", "Spital AG")
        );
        let jobs = extract_page_jobs(&html, PAGE_URL);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Nurse");
    }

    #[test]
    fn test_anchors_outside_main_are_ignored_when_cards_exist() {
        let html = format!(
            "<body>{}<main>{}</main></body>",
            card("/en/vacancies/detail/5/", "Outside", "X"),
            card("/en/vacancies/detail/6/", "Inside", "Y")
        );
        let jobs = extract_page_jobs(&html, PAGE_URL);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Inside");
    }

    #[test]
    fn test_fallback_uses_any_detail_link() {
        let long_title = "x".repeat(200);
        let html = format!(
            r#"<body>
                <div><a href="/en/vacancies/detail/1/"><b>Cook</b> at <i>Hotel</i></a></div>
                <div><a href="/en/vacancies/detail/1/">Cook again</a></div>
                <div><a href="/en/vacancies/detail/2/">{long_title}</a></div>
                <div><a href="">empty</a></div>
            </body>"#
        );
        let jobs = extract_page_jobs(&html, PAGE_URL);

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].title, "Cook at Hotel");
        assert_eq!(jobs[0].company, "");
        assert_eq!(jobs[0].posted_text, "");
        assert_eq!(jobs[1].title.chars().count(), 140);
    }

    #[test]
    fn test_empty_page() {
        assert!(extract_page_jobs("<html><body><main></main></body></html>", PAGE_URL).is_empty());
    }
}
