use std::sync::OnceLock;

use regex::Regex;

/// Anything that is neither in the Arabic block (U+0600..=U+06FF) nor whitespace.
fn non_persian() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\x{0600}-\x{06FF}\s]").expect("static regex"))
}

/// Cleans a raw query for retrieval only; generation still gets the raw text.
pub fn normalize(raw_query: &str) -> String {
    non_persian()
        .replace_all(raw_query, "")
        .trim()
        .to_string()
}
