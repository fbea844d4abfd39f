//! Helpers over parsed documents.

use crate::normalize::collapse_whitespace;
use scraper::{ElementRef, Selector};
use url::Url;

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary",
    "table", "tr", "ul",
];
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Parses a selector that is known at compile time.
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e:?}"))
}

/// Approximates the browser's `innerText`: block elements and `<br>` break
/// lines, whitespace inside a line collapses, empty lines are dropped.
pub fn inner_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_text(element, &mut raw);
    raw.split('\n')
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }
        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child_el.value().name();
        if SKIPPED_TAGS.contains(&name) {
            continue;
        }
        if name == "br" {
            out.push('\n');
        } else if BLOCK_TAGS.contains(&name) {
            out.push('\n');
            push_text(child_el, out);
            out.push('\n');
        } else {
            push_text(child_el, out);
        }
    }
}

pub fn next_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

pub fn closest<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == tag)
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Resolves an anchor's `href`. Absolute `http(s)` links are kept as they
/// are; anything else is joined onto the page's origin.
pub fn resolve_href(href: &str, page_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http") {
        return Some(href.to_string());
    }
    let page = Url::parse(page_url).ok()?;
    let origin = Url::parse(&page.origin().ascii_serialization()).ok()?;
    origin.join(href).ok().map(|u| u.to_string())
}
