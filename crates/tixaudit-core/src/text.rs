//! Text helpers shared by the checks.
//!
//! Every comparison against configured names and keywords is
//! case-insensitive and whitespace-trimmed.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum characters kept in an evidence snippet.
pub const MAX_SNIPPET_CHARS: usize = 300;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.)[^\s<>\]\)]+").expect("url regex is valid")
});

static LIST_ITEM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:[-*\u{2022}]|\d+[.)])\s+\S").expect("list item regex is valid")
});

/// Normalizes a name for comparison.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Case-insensitive, trimmed equality.
#[must_use]
pub fn same_name(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Returns `true` if `haystack` contains any of `needles`
/// (case-insensitive).
#[must_use]
pub fn contains_any<S: AsRef<str>>(haystack: &str, needles: &[S]) -> bool {
    let haystack = haystack.to_lowercase();
    needles
        .iter()
        .map(|n| n.as_ref().trim().to_lowercase())
        .any(|n| !n.is_empty() && haystack.contains(&n))
}

/// Words that negate a keyword when they appear just before it.
pub const NEGATIONS: &[&str] = &[
    "not", "no", "never", "without", "isn't", "wasn't", "didn't", "don't", "cannot", "can't",
    "won't",
];

/// Returns `true` if `haystack` affirms any of `needles` (case-insensitive).
///
/// A keyword only counts when it starts a word, so `unapproved` and
/// `dis-approval` do not match, and when neither of the two preceding words
/// is one of [`NEGATIONS`].
#[must_use]
pub fn affirms_any<S: AsRef<str>>(haystack: &str, needles: &[S]) -> bool {
    let haystack = haystack.to_lowercase();
    needles
        .iter()
        .map(|n| n.as_ref().trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .any(|needle| {
            haystack
                .match_indices(needle.as_str())
                .any(|(at, _)| affirmed_at(&haystack[..at]))
        })
}

fn affirmed_at(before: &str) -> bool {
    let joined = |c: char| c.is_alphanumeric() || c == '-' || c == '\'';
    if before.chars().next_back().is_some_and(joined) {
        return false;
    }
    !before
        .split_whitespace()
        .rev()
        .take(2)
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .any(|w| NEGATIONS.contains(&w))
}

/// Counts whitespace-separated words.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Truncates to [`MAX_SNIPPET_CHARS`] on a character boundary.
#[must_use]
pub fn snippet(value: &str) -> String {
    value.chars().take(MAX_SNIPPET_CHARS).collect()
}

/// Returns `true` if every word of `text` is one of the generic terms.
///
/// Punctuation around words is ignored. Blank text is generic.
#[must_use]
pub fn is_generic<S: AsRef<str>>(text: &str, generic_terms: &[S]) -> bool {
    let terms: Vec<String> = generic_terms.iter().map(|t| normalize(t.as_ref())).collect();
    let normalized = normalize(text);
    if terms.iter().any(|t| *t == normalized) {
        return true;
    }
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .all(|w| terms.contains(&w))
}

/// Extracts URLs.
pub fn urls(text: &str) -> impl Iterator<Item = &str> {
    URL_PATTERN.find_iter(text).map(|m| m.as_str())
}

/// Returns the text with every URL removed.
#[must_use]
pub fn strip_urls(text: &str) -> String {
    URL_PATTERN.replace_all(text, " ").into_owned()
}

/// Counts bulleted or numbered list items.
#[must_use]
pub fn list_item_count(text: &str) -> usize {
    LIST_ITEM_PATTERN.find_iter(text).count()
}
