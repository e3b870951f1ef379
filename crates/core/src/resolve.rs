use crate::domain::fund::{Catalog, FundRecord};
use once_cell::sync::Lazy;
use regex::Regex;

// Intent words, plan/option qualifiers and filler words stripped before
// matching. Matching happens on whole words so "navy" style substrings
// survive.
const STOP_WORDS: &[&str] = &[
    "nav", "return", "returns", "risk", "details", "tell", "me", "about", "show", "what", "is",
    "fund", "direct", "regular", "plan", "option", "compare", "vs", "with", "of",
];

static STOP_WORDS_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"\b(?:{})\b", STOP_WORDS.join("|"));
    Regex::new(&pattern).expect("stop-word pattern must compile")
});

static NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s]").expect("alnum pattern must compile"));

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern must compile"));

/// Normalizes a free-text query down to the tokens worth matching on:
/// lower-case, stop words removed, punctuation stripped, whitespace
/// collapsed.
pub fn clean_query(text: &str) -> String {
    let lowered = text.to_lowercase();
    let no_stop_words = STOP_WORDS_RE.replace_all(&lowered, "");
    let alnum_only = NON_ALNUM_RE.replace_all(&no_stop_words, "");
    WHITESPACE_RE
        .replace_all(&alnum_only, " ")
        .trim()
        .to_string()
}

/// Conjunctive substring match: every whitespace token of the cleaned
/// query must appear somewhere in the case-folded name. Substrings of
/// longer words count ("cap" matches anywhere).
pub fn name_matches(name: &str, cleaned_query: &str) -> bool {
    if cleaned_query.is_empty() {
        return false;
    }
    let folded = name.to_lowercase();
    cleaned_query
        .split_whitespace()
        .all(|token| folded.contains(token))
}

/// Outcome of resolving a free-text query against the catalog.
#[derive(Debug, Clone)]
pub enum Resolution {
    NoMatch,
    Single(FundRecord),
    /// All matching records in catalog order.
    Multiple(Vec<FundRecord>),
}

pub fn resolve(catalog: &Catalog, raw_query: &str) -> Resolution {
    let cleaned = clean_query(raw_query);
    let matches: Vec<&FundRecord> = catalog
        .records()
        .iter()
        .filter(|r| name_matches(&r.fund_name, &cleaned))
        .collect();

    match matches.len() {
        0 => Resolution::NoMatch,
        1 => Resolution::Single(matches[0].clone()),
        _ => Resolution::Multiple(matches.into_iter().cloned().collect()),
    }
}

// Retail flows default to the Direct-Growth plan variant unless the
// investor says otherwise.
const PLAN_PRIORITY: &[&str] = &["direct plan growth", "direct growth", "growth"];

/// Picks one record out of a multiple-match set. Must be called with a
/// non-empty slice; falls back to the first record in catalog order when
/// no plan-variant keyword matches.
pub fn select_best_scheme(matches: &[FundRecord]) -> &FundRecord {
    for needle in PLAN_PRIORITY {
        if let Some(found) = matches
            .iter()
            .find(|r| r.fund_name.to_lowercase().contains(needle))
        {
            return found;
        }
    }
    &matches[0]
}
