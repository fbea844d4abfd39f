//! Fixed wording the site uses, one table per language.
//!
//! Adding a locale means adding its tables here and chaining them in
//! the corresponding `*_candidates`/`*_pattern` helper.

use crate::browser::Locator;
use regex::Regex;

/// Card metadata labels, matched case-insensitively at line start.
pub const PLACE_OF_WORK_LABEL: &str = "Place of work:";
pub const WORKLOAD_LABEL: &str = "Workload:";
pub const CONTRACT_TYPE_LABEL: &str = "Contract type:";
pub const CARD_LABELS: [&str; 3] = [PLACE_OF_WORK_LABEL, WORKLOAD_LABEL, CONTRACT_TYPE_LABEL];

pub const EASY_APPLY_EN: &str = "easy apply";

/// Units that make a card line a relative posting age ("3 days ago").
pub const TIME_WORDS_EN: &[&str] = &[
    "weeks?",
    "days?",
    "hours?",
    "minutes?",
    "months?",
    "yesterday",
    "today",
    "new",
];

pub const CONSENT_LABELS_EN: &[&str] = &["Accept", "I accept", "Agree", "Allow all", "OK"];
pub const CONSENT_LABELS_DE: &[&str] = &["Akzeptieren", "Alle akzeptieren"];
pub const CONSENT_LABELS_FR: &[&str] = &["Tout accepter"];

/// Consent-manager vendors (OneTrust, Didomi, Usercentrics) and a generic aria fallback.
pub const CONSENT_VENDOR_SELECTORS: &[&str] = &[
    "#onetrust-accept-btn-handler",
    "button#onetrust-accept-btn-handler",
    "#didomi-notice-agree-button",
    "button[id=\"didomi-notice-agree-button\"]",
    "[data-testid=\"uc-accept-all-button\"]",
    "button[aria-label*=\"accept\" i]",
];

pub const EXPANDER_LABELS_EN: &[&str] = &["Show more"];
pub const EXPANDER_LABELS_DE: &[&str] = &["Mehr anzeigen"];
pub const EXPANDER_LABELS_FR: &[&str] = &["Afficher plus"];
pub const EXPANDER_SELECTORS: &[&str] = &[
    "button[aria-expanded=\"false\"]",
    "[data-testid=\"expand-button\"]",
];

pub const NEXT_LABEL_EN: &str = "Next";

/// Detail-page section titles worth keeping in the description.
pub const SECTION_HEADINGS_EN: &[&str] = &[
    "Introduction",
    "About the job",
    "Responsibilities",
    "Your tasks",
    "Requirements",
    "What we offer",
];
pub const SECTION_HEADINGS_DE: &[&str] = &[
    "Ihre Aufgaben",
    "Aufgaben",
    "Ihr Profil",
    "Profil",
    "Unser Angebot",
    "Angebot",
];
pub const SECTION_HEADINGS_FR: &[&str] = &[
    "Vos tâches",
    "Votre profil",
    "Nous offrons",
    "Notre offre",
    "À propos du poste",
];

/// Link texts in the site chrome that are never a company name.
pub const COMPANY_BOILERPLATE_EN: &[&str] = &[
    "Explore companies",
    "Find a job",
    "Salary estimator",
    "Recruiter area",
    "Login",
];

pub const PUBLICATION_DATE_SYNONYMS: &[&str] = &["Publication date", "Published"];
pub const WORKLOAD_SYNONYMS: &[&str] = &["Workload"];
pub const CONTRACT_TYPE_SYNONYMS: &[&str] = &["Contract type", "Employment type", "Contract"];
pub const LANGUAGE_SYNONYMS: &[&str] = &["Language", "Languages"];
pub const PLACE_OF_WORK_SYNONYMS: &[&str] = &["Place of work", "Location", "Place"];
pub const COMPANY_SYNONYMS: &[&str] = &["Company", "Employer"];

/// Every label the detail page is scanned for, in lookup order.
pub fn all_label_synonyms() -> impl Iterator<Item = &'static str> {
    [
        PUBLICATION_DATE_SYNONYMS,
        WORKLOAD_SYNONYMS,
        CONTRACT_TYPE_SYNONYMS,
        LANGUAGE_SYNONYMS,
        PLACE_OF_WORK_SYNONYMS,
        COMPANY_SYNONYMS,
    ]
    .into_iter()
    .flatten()
    .copied()
}

pub fn time_pattern() -> Regex {
    let words = TIME_WORDS_EN.join("|");
    Regex::new(&format!(r"(?i)\b(?:{words})\b")).expect("time pattern is valid")
}

pub fn section_heading_pattern() -> Regex {
    let titles = [SECTION_HEADINGS_EN, SECTION_HEADINGS_DE, SECTION_HEADINGS_FR]
        .into_iter()
        .flatten()
        .map(|title| regex::escape(title))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i)(?:{titles})")).expect("section pattern is valid")
}

pub fn consent_candidates() -> Vec<Locator> {
    [CONSENT_LABELS_EN, CONSENT_LABELS_DE, CONSENT_LABELS_FR]
        .into_iter()
        .flatten()
        .map(|label| Locator::with_text("button", label))
        .chain(CONSENT_VENDOR_SELECTORS.iter().map(|css| Locator::css(css)))
        .collect()
}

pub fn expander_candidates() -> Vec<Locator> {
    [EXPANDER_LABELS_EN, EXPANDER_LABELS_DE, EXPANDER_LABELS_FR]
        .into_iter()
        .flatten()
        .map(|label| Locator::with_text("button", label))
        .chain(EXPANDER_SELECTORS.iter().map(|css| Locator::css(css)))
        .collect()
}
