// MIT License

//! Narrow scraping interface for the IP module's HTML pages.
//!
//! The module embeds all of its data as JavaScript literal arrays inside
//! HTML, so "parsing" means locating a marker-delimited substring and
//! tokenizing it. All panel-specific quirks live here; the rest of the
//! crate works with clean token lists and never touches raw page bodies.

/// Extract the substring strictly between `prefix` and `suffix`.
///
/// Returns `None` when either marker is missing. The suffix is searched
/// only after the prefix, so a suffix occurring earlier in the body does
/// not truncate the result.
pub fn extract_between<'a>(body: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    let start = body.find(prefix)? + prefix.len();
    let rest = &body[start..];
    let end = rest.find(suffix)?;
    Some(&rest[..end])
}

/// Split a comma-separated JS literal list into trimmed, quote-stripped tokens.
///
/// `"Front door","Garage"` becomes `["Front door", "Garage"]`. Both single
/// and double quotes are stripped; interior whitespace is preserved.
pub fn split_quoted_list(s: &str) -> Vec<String> {
    s.split(',').map(strip_token).collect()
}

/// Return the token at `index` of a comma-separated list, quote-stripped.
pub fn nth_token(s: &str, index: usize) -> Option<String> {
    s.split(',').nth(index).map(|t| strip_token(t))
}

/// Return the token at `index` parsed as an integer, or `None` if absent
/// or non-numeric.
pub fn nth_token_int(s: &str, index: usize) -> Option<i64> {
    nth_token(s, index)?.parse().ok()
}

/// Number of comma-separated tokens in the list. Empty input has no tokens.
pub fn token_count(s: &str) -> usize {
    if s.trim().is_empty() {
        0
    } else {
        s.split(',').count()
    }
}

fn strip_token(t: &str) -> String {
    t.trim().trim_matches(|c| c == '"' || c == '\'').to_string()
}
