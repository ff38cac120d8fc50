use once_cell::sync::Lazy;
use regex::bytes::Regex;

static REDIRECT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#REDIRECT[ \t].*?\[\[.*?\]\]").unwrap());

/// True if the block carries a `#REDIRECT [[Target]]` directive (case-sensitive).
pub fn is_redirect(block: &[u8]) -> bool {
    REDIRECT_REGEX.is_match(block)
}
