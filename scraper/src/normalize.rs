//! Text normalization shared by the listing and detail extractors.

use crate::locale::{self, CARD_LABELS, CONTRACT_TYPE_LABEL, PLACE_OF_WORK_LABEL, WORKLOAD_LABEL};
use regex::Regex;
use std::sync::LazyLock;

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(\d+);").expect("valid entity pattern"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
static TIME_RE: LazyLock<Regex> = LazyLock::new(locale::time_pattern);

const NAMED_ENTITIES: [(&str, &str); 7] = [
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#039;", "'"),
    ("&#x27;", "'"),
];

/// Replaces the handful of entities the site emits. Unknown entities are
/// left as they are.
pub fn decode_entities(text: &str) -> String {
    let mut out = text.to_string();
    for (entity, literal) in NAMED_ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, literal);
        }
    }
    NUMERIC_ENTITY_RE
        .replace_all(&out, |caps: &regex::Captures| {
            caps[1]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Removes tags, decodes entities and collapses whitespace.
///
/// Tags are matched without any nesting awareness, so broken markup can
/// run neighbouring text together.
pub fn strip_html(html: &str) -> String {
    let without_tags = TAG_RE.replace_all(html, " ");
    collapse_whitespace(&decode_entities(&without_tags))
}

/// Collapses every whitespace run (including non-breaking spaces) to one
/// space and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// A key-fact label compiled into its matching patterns.
#[derive(Debug, Clone)]
pub struct LabelPattern {
    label: &'static str,
    with_value: Regex,
    prefix: Regex,
}

impl LabelPattern {
    pub fn new(label: &'static str) -> Self {
        let escaped = regex::escape(label);
        Self {
            label,
            with_value: Regex::new(&format!(r"(?i)^\s*{escaped}\s*:?\s*(.+)$"))
                .expect("escaped label is a valid pattern"),
            prefix: Regex::new(&format!(r"(?i)^\s*{escaped}\s*:?\s*"))
                .expect("escaped label is a valid pattern"),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Returns the text following the label (and an optional colon) when
    /// `text` starts with it. The value must run to the end of `text` on
    /// one line.
    pub fn value_in(&self, text: &str) -> Option<String> {
        self.with_value
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Cleans a key-fact value and drops a leading `label:` if the matched
    /// block still carried it.
    pub fn strip_from(&self, value: &str) -> String {
        let cleaned = collapse_whitespace(value);
        self.prefix.replace(&cleaned, "").trim().to_string()
    }
}

pub fn is_relative_time(line: &str) -> bool {
    TIME_RE.is_match(line)
}

fn is_metadata_line(line: &str) -> bool {
    CARD_LABELS.iter().any(|label| line.contains(label))
        || line.to_lowercase().contains(locale::EASY_APPLY_EN)
        || is_relative_time(line)
}

/// Fields read from the text of one listing card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFields {
    pub title: String,
    pub company: String,
    pub location: String,
    pub workload: String,
    pub contract_type: String,
    pub posted_text: String,
}

/// Parses a card's line-broken text.
///
/// The first line is the title. The company is the first later line that
/// is not metadata. The posting age is searched from the end since it
/// trails the card.
pub fn parse_card_text_to_fields(card_text: &str) -> CardFields {
    let lines: Vec<&str> = card_text
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let title = lines.first().copied().unwrap_or_default().to_string();

    let company = lines
        .iter()
        .skip(1)
        .find(|l| !is_metadata_line(l))
        .map(|l| l.to_string())
        .unwrap_or_default();

    let find_after = |label: &str| -> String {
        lines
            .iter()
            .find_map(|l| {
                l.get(..label.len())
                    .filter(|prefix| prefix.eq_ignore_ascii_case(label))
                    .map(|_| l[label.len()..].trim().to_string())
            })
            .unwrap_or_default()
    };

    let posted_text = lines
        .iter()
        .rev()
        .find(|l| is_relative_time(l))
        .map(|l| l.to_string())
        .unwrap_or_default();

    CardFields {
        title,
        company,
        location: find_after(PLACE_OF_WORK_LABEL),
        workload: find_after(WORKLOAD_LABEL),
        contract_type: find_after(CONTRACT_TYPE_LABEL),
        posted_text,
    }
}
