use crate::config::CATEGORY_PREFIX;
use crate::models::Page;
use once_cell::sync::Lazy;
use regex::Regex;

/// `[[Target]]` or `[[Target|label]]`; group 1 is the target.
pub static LINK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^|\]]+?)(?:\|[^\]]+)?\]\]").unwrap());

static CATEGORY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[Category:(.+?)\]\]").unwrap());

/// Link targets in order of appearance, category references excluded.
/// Targets are kept verbatim and duplicates are preserved.
pub fn extract_links(text: &str) -> Vec<String> {
    LINK_REGEX
        .captures_iter(text)
        .map(|c| c.get(1).map_or("", |m| m.as_str()))
        .filter(|target| !target.starts_with(CATEGORY_PREFIX))
        .map(str::to_string)
        .collect()
}

/// Category names in order of appearance, with the prefix stripped and
/// surrounding spaces, tabs and pipes trimmed.
pub fn extract_categories(text: &str) -> Vec<String> {
    CATEGORY_REGEX
        .captures_iter(text)
        .map(|c| trim_category(&c[1]).to_string())
        .collect()
}

fn trim_category(raw: &str) -> &str {
    raw.trim_matches(|ch: char| ch == ' ' || ch == '\t' || ch == '|')
}

impl Page {
    /// Replaces `links` with the links found in the revision text.
    pub fn link(&mut self) {
        self.links = extract_links(self.text());
    }

    /// Replaces `categories` with the categories found in the revision text.
    pub fn categorize(&mut self) {
        self.categories = extract_categories(self.text());
    }
}
