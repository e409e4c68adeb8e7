//! Diacritic- and case-insensitive string comparison primitives.
//!
//! All text matching in the engine goes through [`normalize`]: Unicode NFD
//! decomposition, combining-mark removal, lowercasing. `"Décès à Orléans"`
//! and `"deces a orleans"` normalize to the same string.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// How [`array_contains`] combines multiple needles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Every needle must be found somewhere in the field.
    All,
    /// At least one needle must be found.
    One,
}

/// NFD-decompose, strip combining marks, lowercase. Pure and deterministic.
pub fn normalize(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Normalized substring test.
///
/// With `word_boundary`, the match must not be glued to alphanumeric
/// neighbors: `contains("gendarme", "arme", true)` is `false`.
pub fn contains(haystack: &str, needle: &str, word_boundary: bool) -> bool {
    let haystack = normalize(haystack);
    let needle = normalize(needle);
    if needle.is_empty() {
        return false;
    }

    if !word_boundary {
        return haystack.contains(&needle);
    }

    let mut start = 0;
    while let Some(pos) = haystack[start..].find(&needle) {
        let begin = start + pos;
        let end = begin + needle.len();
        let left_ok = haystack[..begin]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let right_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        if left_ok && right_ok {
            return true;
        }
        start = end;
    }
    false
}

/// Match a set of needles against a field that is one string or many.
///
/// `MatchMode::All` requires every needle found (as a normalized substring)
/// somewhere in the field; `MatchMode::One` requires at least one. An empty
/// needle list never matches.
pub fn array_contains(field: &[String], needles: &[String], mode: MatchMode) -> bool {
    if needles.is_empty() {
        return false;
    }
    let found = |needle: &String| field.iter().any(|part| contains(part, needle, false));
    match mode {
        MatchMode::All => needles.iter().all(found),
        MatchMode::One => needles.iter().any(found),
    }
}
