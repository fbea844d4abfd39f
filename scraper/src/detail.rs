//! Authoritative fields from a vacancy's detail page.
//!
//! Key facts are resolved from two label maps: definition-list pairs, then
//! short `Label: value` blocks. A field matches when a map key equals or
//! contains the canonical form of one of its synonyms. Whatever is still
//! missing is looked up by walking the content tree for the field's label.

use crate::browser::BrowserPage;
use crate::config::{
    DETAIL_SETTLE, EXPANDER_PROBE_TIMEOUT, EXPANDER_SETTLE, MAX_EXPANDER_CLICKS,
    NAVIGATION_TIMEOUT, NETWORK_IDLE_TIMEOUT,
};
use crate::dom::{inner_text, next_element_sibling, selector, word_count};
use crate::error::Result;
use crate::locale::{
    self, COMPANY_BOILERPLATE_EN, COMPANY_SYNONYMS, CONTRACT_TYPE_SYNONYMS, LANGUAGE_SYNONYMS,
    PLACE_OF_WORK_SYNONYMS, PUBLICATION_DATE_SYNONYMS, WORKLOAD_SYNONYMS,
};
use crate::normalize::{collapse_whitespace, LabelPattern};
use crate::pagination::accept_cookies;
use jobsch_common::{JobSummary, KeyInfo};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

const MAX_PAIR_BLOCK_CHARS: usize = 600;
const MAX_COMPANY_CHARS: usize = 160;
const MIN_SECTION_BODY_CHARS: usize = 60;
const MIN_SIBLING_WORDS: usize = 5;
const MIN_FALLBACK_WORDS: usize = 20;

static CONTENT_ROOTS: LazyLock<Selector> = LazyLock::new(|| selector("main, article, section"));
static PAIR_BLOCKS: LazyLock<Selector> = LazyLock::new(|| selector("p, li, div"));
static TEXT_BLOCKS: LazyLock<Selector> = LazyLock::new(|| selector("p, li"));
static DEFINITION_LISTS: LazyLock<Selector> = LazyLock::new(|| selector("dl"));
static TERMS: LazyLock<Selector> = LazyLock::new(|| selector("dt"));
static SECTION_HEADINGS: LazyLock<Selector> = LazyLock::new(|| selector("h2, h3"));
static MAIN: LazyLock<Selector> = LazyLock::new(|| selector("main"));
static ARTICLE: LazyLock<Selector> = LazyLock::new(|| selector("article"));
static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static MAIN_H1: LazyLock<Selector> = LazyLock::new(|| selector("main h1"));
static ANY_H1: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static COMPANY_MARKERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        r#"main [data-testid="company-name"]"#,
        r#"main a[href*="/companies/"]"#,
        r#"main a[href*="/company/"]"#,
        r#"main a[rel="noopener"][target="_blank"]"#,
    ]
    .into_iter()
    .map(selector)
    .collect()
});
static SECTION_RE: LazyLock<Regex> = LazyLock::new(locale::section_heading_pattern);
static LABEL_PATTERNS: LazyLock<Vec<LabelPattern>> =
    LazyLock::new(|| locale::all_label_synonyms().map(LabelPattern::new).collect());

/// Strips a trailing colon, collapses whitespace and lowercases.
fn norm_label(label: &str) -> String {
    let collapsed = collapse_whitespace(label);
    collapsed
        .trim_end_matches(|c: char| c == ':' || c.is_whitespace())
        .trim()
        .to_lowercase()
}

/// Lowercased label with everything but ASCII letters removed.
pub fn canonical_key(label: &str) -> String {
    norm_label(label)
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

/// Label to value pairs in first-insertion order. Re-inserting a key keeps
/// its position and replaces the value.
#[derive(Debug, Default, Clone)]
struct LabelMap {
    entries: Vec<(String, String)>,
}

impl LabelMap {
    fn insert(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    fn lookup(&self, synonyms: &[&str]) -> Option<&str> {
        let canonical: Vec<String> = synonyms.iter().map(|s| canonical_key(s)).collect();
        self.entries.iter().find_map(|(key, value)| {
            let key = key.to_lowercase();
            canonical
                .iter()
                .any(|can| key == *can || key.contains(can.as_str()))
                .then_some(value.as_str())
        })
    }
}

fn content_roots(doc: &Html) -> Vec<ElementRef<'_>> {
    let roots: Vec<_> = doc.select(&CONTENT_ROOTS).collect();
    if roots.is_empty() {
        doc.select(&BODY).collect()
    } else {
        roots
    }
}

fn definition_pairs(doc: &Html) -> LabelMap {
    let mut map = LabelMap::default();
    for dl in doc.select(&DEFINITION_LISTS) {
        for dt in dl.select(&TERMS) {
            let label = norm_label(&inner_text(dt));
            if label.is_empty() {
                continue;
            }
            let Some(dd) = next_element_sibling(dt).filter(|el| el.value().name() == "dd") else {
                continue;
            };
            let value = inner_text(dd);
            if value.is_empty() {
                continue;
            }
            map.insert(canonical_key(&label), value.clone());
            map.insert(label, value);
        }
    }
    map
}

fn scanned_pairs(roots: &[ElementRef<'_>]) -> LabelMap {
    let mut map = LabelMap::default();
    for root in roots {
        for block in root.select(&PAIR_BLOCKS) {
            let text = inner_text(block);
            if text.is_empty() || text.chars().count() > MAX_PAIR_BLOCK_CHARS || !text.contains(':') {
                continue;
            }
            for pattern in LABEL_PATTERNS.iter() {
                if let Some(value) = pattern.value_in(&text) {
                    map.insert(canonical_key(pattern.label()), value);
                }
            }
        }
    }
    map
}

/// Walks every element under the content roots for one whose text is
/// `label: value`, or is exactly the label with the value in the next
/// sibling element.
pub fn find_value_by_prefix(roots: &[ElementRef<'_>], pattern: &LabelPattern) -> Option<String> {
    let label = pattern.label().to_lowercase();
    for root in roots {
        for el in root.descendants().skip(1).filter_map(ElementRef::wrap) {
            let text = inner_text(el);
            if text.is_empty() {
                continue;
            }
            if let Some(value) = pattern.value_in(&text) {
                return Some(value);
            }
            if text.replacen(':', "", 1).trim().to_lowercase() == label {
                if let Some(sibling) = next_element_sibling(el) {
                    return Some(inner_text(sibling)).filter(|v| !v.is_empty());
                }
            }
        }
    }
    None
}

struct KeyFacts<'a> {
    roots: Vec<ElementRef<'a>>,
    definitions: LabelMap,
    scanned: LabelMap,
}

impl<'a> KeyFacts<'a> {
    fn collect(doc: &'a Html) -> Self {
        let roots = content_roots(doc);
        let scanned = scanned_pairs(&roots);
        Self {
            definitions: definition_pairs(doc),
            scanned,
            roots,
        }
    }

    fn by_synonyms(&self, synonyms: &[&str]) -> Option<String> {
        self.definitions
            .lookup(synonyms)
            .or_else(|| self.scanned.lookup(synonyms))
            .map(str::to_string)
    }

    /// Resolves a key fact; `synonyms[0]` is the label printed on the site.
    fn resolve(&self, synonyms: &'static [&'static str]) -> String {
        let pattern = LabelPattern::new(synonyms[0]);
        // Definition list, then scanned blocks, then a walk of the page
        self.by_synonyms(synonyms)
            .or_else(|| find_value_by_prefix(&self.roots, &pattern))
            // Values sometimes still carry their label
            .map(|value| pattern.strip_from(&value.replace('\u{a0}', " ")))
            .unwrap_or_default()
    }

    fn key_info(&self) -> KeyInfo {
        KeyInfo {
            publication_date: self.resolve(PUBLICATION_DATE_SYNONYMS),
            workload: self.resolve(WORKLOAD_SYNONYMS),
            contract_type: self.resolve(CONTRACT_TYPE_SYNONYMS),
            language: self.resolve(LANGUAGE_SYNONYMS),
            place_of_work: self.resolve(PLACE_OF_WORK_SYNONYMS),
        }
    }
}

const TITLE_STRATEGIES: &[fn(&Html) -> Option<String>] = &[title_in_main, any_title];

fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector).next().map(inner_text)
}

fn title_in_main(doc: &Html) -> Option<String> {
    first_text(doc, &MAIN_H1)
}

fn any_title(doc: &Html) -> Option<String> {
    first_text(doc, &ANY_H1)
}

fn is_company_name(text: &str) -> bool {
    !text.is_empty()
        && text.chars().count() <= MAX_COMPANY_CHARS
        && !COMPANY_BOILERPLATE_EN
            .iter()
            .any(|boilerplate| text.eq_ignore_ascii_case(boilerplate))
}

fn company_from_markers(doc: &Html) -> Option<String> {
    COMPANY_MARKERS
        .iter()
        .filter_map(|marker| first_text(doc, marker))
        .find(|text| is_company_name(text))
}

fn description_root(doc: &Html) -> Option<ElementRef<'_>> {
    [&*MAIN, &*ARTICLE, &*BODY]
        .into_iter()
        .find_map(|sel| doc.select(sel).next())
}

fn is_section_heading(el: &ElementRef<'_>) -> bool {
    matches!(el.value().name(), "h2" | "h3")
}

/// Text of the siblings following `heading` up to the next section heading.
fn section_body(heading: ElementRef<'_>) -> String {
    let mut chunks = Vec::new();
    for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
        // Stop at the next section
        if is_section_heading(&sibling) {
            break;
        }
        let blocks: Vec<_> = sibling.select(&TEXT_BLOCKS).collect();
        if blocks.is_empty() {
            // Bare text only counts when it reads like a sentence
            let text = inner_text(sibling);
            if word_count(&text) > MIN_SIBLING_WORDS {
                chunks.push(text);
            }
        } else {
            chunks.extend(
                blocks
                    .into_iter()
                    .map(inner_text)
                    .filter(|text| !text.is_empty()),
            );
        }
    }
    chunks.join("\n")
}

fn sectioned_description(root: ElementRef<'_>) -> Option<String> {
    let mut parts = Vec::new();
    for heading in root.select(&SECTION_HEADINGS) {
        let title = inner_text(heading);
        if !SECTION_RE.is_match(&title) {
            continue;
        }
        let body = section_body(heading);
        if body.chars().count() > MIN_SECTION_BODY_CHARS {
            parts.push(title);
            parts.push(body);
        }
    }
    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

fn longest_block(root: ElementRef<'_>) -> Option<String> {
    let mut best = String::new();
    for block in root.select(&TEXT_BLOCKS) {
        let text = inner_text(block);
        if word_count(&text) > MIN_FALLBACK_WORDS && text.chars().count() > best.chars().count() {
            best = text;
        }
    }
    (!best.is_empty()).then_some(best)
}

fn extract_description(doc: &Html) -> String {
    let Some(root) = description_root(doc) else {
        return String::new();
    };
    sectioned_description(root)
        .or_else(|| longest_block(root))
        .unwrap_or_default()
}

/// Everything read from one detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDetail {
    pub title: String,
    pub company: String,
    pub description: String,
    pub key_info: KeyInfo,
}

impl JobDetail {
    /// Overlays the detail data on a listing record. Description and key
    /// facts are always replaced; other fields only when the detail page
    /// had a value.
    pub fn apply_to(self, job: &mut JobSummary) {
        if !self.title.is_empty() {
            job.title = self.title;
        }
        if !self.company.is_empty() {
            job.company = self.company;
        }
        let info = &self.key_info;
        if !info.place_of_work.is_empty() {
            job.location = info.place_of_work.clone();
        }
        if !info.workload.is_empty() {
            job.workload = info.workload.clone();
        }
        if !info.contract_type.is_empty() {
            job.contract_type = info.contract_type.clone();
        }
        job.description = self.description;
        job.key_info = self.key_info;
    }
}

/// Extracts title, company, description and key facts from a rendered
/// detail page.
pub fn extract_detail(html: &str) -> JobDetail {
    let doc = Html::parse_document(html);
    let facts = KeyFacts::collect(&doc);

    let title = TITLE_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(&doc).filter(|t| !t.is_empty()))
        .unwrap_or_default();
    let company = company_from_markers(&doc)
        .or_else(|| facts.by_synonyms(COMPANY_SYNONYMS))
        .unwrap_or_default();

    JobDetail {
        title,
        company,
        description: extract_description(&doc),
        key_info: facts.key_info(),
    }
}

/// Opens collapsed description sections. Failures are ignored.
pub async fn expand_description(page: &mut dyn BrowserPage) {
    for candidate in locale::expander_candidates() {
        let count = match page.count(&candidate).await {
            Ok(count) => count.min(MAX_EXPANDER_CLICKS),
            Err(e) => {
                debug!(control = %candidate, error = %e, "expander probe failed");
                continue;
            }
        };
        for nth in 0..count {
            if let Ok(true) = page.is_visible(&candidate, nth, EXPANDER_PROBE_TIMEOUT).await {
                if let Err(e) = page.click(&candidate, nth, EXPANDER_PROBE_TIMEOUT).await {
                    debug!(control = %candidate, error = %e, "expander click failed");
                }
                page.settle(EXPANDER_SETTLE).await;
            }
        }
    }
}

/// Loads `link` in `page` and extracts its detail fields.
pub async fn enrich(page: &mut dyn BrowserPage, link: &str) -> Result<JobDetail> {
    page.goto(link, NAVIGATION_TIMEOUT).await?;
    if let Err(e) = page.wait_for_network_idle(NETWORK_IDLE_TIMEOUT).await {
        debug!(link, error = %e, "detail network did not settle");
    }
    accept_cookies(page).await;
    page.settle(DETAIL_SETTLE).await;
    expand_description(page).await;
    let html = page.content().await?;
    Ok(extract_detail(&html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fixture::{FixtureBrowser, FixtureSite};

    const DETAIL: &str = r#"<html><body>
        <header><a href="/en/companies/">Explore companies</a><h1>jobs.ch</h1></header>
        <main>
            <h1>Senior Backend Engineer (Rust)</h1>
            <a href="/en/companies/acme-ag/">Acme AG</a>
            <dl>
                <dt>Publication date:</dt><dd>14 October 2026</dd>
                <dt>Workload:</dt><dd>80 – 100%</dd>
                <dt>Contract type:</dt><dd>Unlimited employment</dd>
                <dt>Language:</dt><dd>English (Fluent), German (Basic)</dd>
                <dt>Place of work:</dt><dd>Zürich</dd>
            </dl>
            <section>
                <h2>About the job</h2>
                <p>You will design and operate the services that power our payment platform.</p>
                <h2>Your tasks</h2>
                <ul>
                    <li>Build reliable services in Rust and keep them running smoothly.</li>
                    <li>Review code and mentor engineers across two product teams.</li>
                </ul>
                <h2>Contact</h2>
                <p>Jane Doe, Talent Acquisition, will happily answer all of your questions.</p>
            </section>
        </main>
    </body></html>"#;

    #[test]
    fn test_extract_detail_from_definition_list() {
        let detail = extract_detail(DETAIL);

        assert_eq!(detail.title, "Senior Backend Engineer (Rust)");
        assert_eq!(detail.company, "Acme AG");
        assert_eq!(
            detail.key_info,
            KeyInfo {
                publication_date: "14 October 2026".into(),
                workload: "80 – 100%".into(),
                contract_type: "Unlimited employment".into(),
                language: "English (Fluent), German (Basic)".into(),
                place_of_work: "Zürich".into(),
            }
        );
    }

    #[test]
    fn test_description_joins_recognized_sections() {
        let detail = extract_detail(DETAIL);
        assert_eq!(
            detail.description,
            "About the job\n\n\
             You will design and operate the services that power our payment platform.\n\n\
             Your tasks\n\n\
             Build reliable services in Rust and keep them running smoothly.\n\
             Review code and mentor engineers across two product teams."
        );
        assert!(!detail.description.contains("Jane Doe"));
    }

    #[test]
    fn test_short_sections_are_dropped() {
        let html = r#"<main>
            <h2>Requirements</h2><p>Rust.</p>
            <h3>Other</h3>
            <p>This paragraph is long enough to be picked as the fallback description because it has well over twenty words in it, which is the threshold.</p>
        </main>"#;
        let detail = extract_detail(html);
        assert!(detail.description.starts_with("This paragraph is long enough"));
    }

    #[test]
    fn test_description_empty_when_nothing_qualifies() {
        let detail = extract_detail("<main><p>Too short.</p></main>");
        assert_eq!(detail.description, "");
    }

    #[test]
    fn test_sibling_text_used_when_no_blocks() {
        let html = r#"<main>
            <h2>Ihr Profil</h2>
            <div>Abgeschlossene Ausbildung als Informatiker oder Informatikerin mit mehreren Jahren Erfahrung</div>
            <div>Kurz</div>
        </main>"#;
        let detail = extract_detail(html);
        assert_eq!(
            detail.description,
            "Ihr Profil\n\nAbgeschlossene Ausbildung als Informatiker oder Informatikerin mit mehreren Jahren Erfahrung"
        );
    }

    #[test]
    fn test_synonym_resolves_employment_type() {
        let html = r#"<main><ul>
            <li>Employment type: Full-time</li>
            <li>Location: Basel</li>
            <li>Language: German</li>
        </ul></main>"#;
        let info = extract_detail(html).key_info;
        assert_eq!(info.contract_type, "Full-time");
        assert_eq!(info.place_of_work, "Basel");
        assert_eq!(info.language, "German");
        assert_eq!(info.workload, "");
        assert_eq!(info.publication_date, "");
    }

    #[test]
    fn test_definition_list_wins_over_scanned_blocks() {
        let html = r#"<main>
            <dl><dt>Workload</dt><dd>60%</dd></dl>
            <p>Workload: 100%</p>
        </main>"#;
        assert_eq!(extract_detail(html).key_info.workload, "60%");
    }

    #[test]
    fn test_label_prefix_stripped_from_value() {
        let html = r#"<main><dl><dt>Place of work</dt><dd>Place of work: Lausanne</dd></dl></main>"#;
        assert_eq!(extract_detail(html).key_info.place_of_work, "Lausanne");
    }

    #[test]
    fn test_label_in_separate_element_uses_sibling() {
        let html = r#"<main><div><span>Workload</span><strong>50%</strong></div></main>"#;
        // The div reads "Workload50%" and is matched as a whole.
        assert_eq!(extract_detail(html).key_info.workload, "50%");

        let html = r#"<main><div><h4>Language</h4><p>French</p></div></main>"#;
        assert_eq!(extract_detail(html).key_info.language, "French");
    }

    #[test]
    fn test_company_skips_boilerplate_and_falls_back_to_label() {
        let html = r#"<main>
            <a href="/en/companies/">Explore companies</a>
            <p>Employer: Stadt Bern</p>
        </main>"#;
        assert_eq!(extract_detail(html).company, "Stadt Bern");
    }

    #[test]
    fn test_company_rejects_overlong_text() {
        let long = "A".repeat(161);
        let html = format!(
            r#"<main><span data-testid="company-name">{long}</span><a href="/en/company/x">Migros</a></main>"#
        );
        assert_eq!(extract_detail(&html).company, "Migros");
    }

    #[test]
    fn test_title_prefers_main() {
        let html = "<body><h1>Site</h1><main><h1>Pflegefachperson</h1></main></body>";
        assert_eq!(extract_detail(html).title, "Pflegefachperson");
        assert_eq!(extract_detail("<h1>Only</h1>").title, "Only");
    }

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_key("Place of work:"), "placeofwork");
        assert_eq!(canonical_key("  Contract   type : "), "contracttype");
        assert_eq!(canonical_key("Arbeitsort"), "arbeitsort");
    }

    #[test]
    fn test_apply_overrides_only_non_empty() {
        let mut job = JobSummary {
            title: "Listing title".into(),
            company: "Listing company".into(),
            location: "Bern".into(),
            workload: "100%".into(),
            contract_type: "Permanent".into(),
            posted_text: "Today".into(),
            link: "https://www.jobs.ch/en/vacancies/detail/1/".into(),
            ..Default::default()
        };
        JobDetail {
            title: "Detail title".into(),
            company: String::new(),
            description: "Text".into(),
            key_info: KeyInfo {
                place_of_work: "Zürich".into(),
                ..Default::default()
            },
        }
        .apply_to(&mut job);

        assert_eq!(job.title, "Detail title");
        assert_eq!(job.company, "Listing company");
        assert_eq!(job.location, "Zürich");
        assert_eq!(job.workload, "100%");
        assert_eq!(job.contract_type, "Permanent");
        assert_eq!(job.posted_text, "Today");
        assert_eq!(job.description, "Text");
        assert_eq!(job.key_info.place_of_work, "Zürich");
    }

    #[tokio::test]
    async fn test_enrich_expands_and_extracts() {
        let link = "https://www.jobs.ch/en/vacancies/detail/1/";
        let html = DETAIL.replace(
            "<main>",
            r#"<main><button aria-expanded="false">Show more</button>"#,
        );
        let browser = FixtureBrowser::new(FixtureSite::new().page(link, html));
        let mut page = browser.open_page();

        let detail = enrich(&mut page, link).await.unwrap();
        assert_eq!(detail.title, "Senior Backend Engineer (Rust)");
        assert_eq!(
            browser.log().clicks,
            vec![
                "button:has-text(\"Show more\")".to_string(),
                "button[aria-expanded=\"false\"]".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_expanders_clicked_at_most_five_times_each() {
        let link = "https://www.jobs.ch/en/vacancies/detail/2/";
        let html = format!(
            "<html><body><main>{}</main></body></html>",
            "<button>Show more</button>".repeat(7)
        );
        let browser = FixtureBrowser::new(FixtureSite::new().page(link, html));
        let mut page = browser.open_page();
        page.goto(link, NAVIGATION_TIMEOUT).await.unwrap();

        expand_description(&mut page).await;

        let clicks = browser.log().clicks;
        assert_eq!(clicks.len(), MAX_EXPANDER_CLICKS);
        assert!(clicks
            .iter()
            .all(|c| c == "button:has-text(\"Show more\")"));
    }

    #[test]
    fn test_scanned_blocks_longer_than_cap_are_skipped() {
        let filler = "a".repeat(MAX_PAIR_BLOCK_CHARS);
        let html = format!(
            "<html><body><main><p>Contract type: Permanent</p><p>Workload: 80% {filler}</p></main></body></html>"
        );
        let doc = Html::parse_document(&html);
        let scanned = scanned_pairs(&content_roots(&doc));

        assert_eq!(scanned.lookup(CONTRACT_TYPE_SYNONYMS), Some("Permanent"));
        assert_eq!(scanned.lookup(WORKLOAD_SYNONYMS), None);
    }

    #[test]
    fn test_scanned_block_at_cap_is_kept() {
        let label = "Workload: ";
        let value = "8".repeat(MAX_PAIR_BLOCK_CHARS - label.len());
        let html = format!("<html><body><main><p>{label}{value}</p></main></body></html>");
        let doc = Html::parse_document(&html);
        let scanned = scanned_pairs(&content_roots(&doc));

        assert_eq!(scanned.lookup(WORKLOAD_SYNONYMS), Some(value.as_str()));
    }

    #[tokio::test]
    async fn test_enrich_unreachable_page_is_an_error() {
        let browser = FixtureBrowser::new(FixtureSite::new());
        let mut page = browser.open_page();
        assert!(enrich(&mut page, "https://www.jobs.ch/en/vacancies/detail/x/")
            .await
            .is_err());
    }
}
