//! URL detection in message text.

use regex::Regex;
use std::sync::LazyLock;

/// `http://…`, `https://…` or `www.…`, case-insensitive, up to the next whitespace.
/// Matches anywhere, including glued to a preceding word.
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://|www\.)\S+").expect("link pattern is valid")
});

/// Whether the text contains at least one URL-like token.
pub fn contains_link(text: &str) -> bool {
    LINK_RE.is_match(text)
}

/// All URL-like tokens, in order of appearance.
pub fn find_links(text: &str) -> Vec<&str> {
    LINK_RE.find_iter(text).map(|m| m.as_str()).collect()
}
