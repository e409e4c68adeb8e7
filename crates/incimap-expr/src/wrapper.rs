//! Recognition of the `expr:(...)` filter-value wrapper.

use std::sync::OnceLock;

use regex::Regex;

fn wrapper_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^expr:\(\s?(.*)\s?\)$").expect("wrapper regex is valid"))
}

/// Extract the expression body from an `expr:(...)` wrapped filter value.
///
/// Returns `None` when the input is not expression-shaped, which tells the
/// filter engine to treat the value as a literal search term instead.
///
/// # Examples
///
/// ```
/// use incimap_expr::get_evaluable;
///
/// assert_eq!(get_evaluable("expr:(death.count > 1)"), Some("death.count > 1"));
/// assert_eq!(get_evaluable("paris"), None);
/// ```
pub fn get_evaluable(raw: &str) -> Option<&str> {
    wrapper_regex()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Whether a raw filter value is expression-shaped.
pub fn is_evaluable(raw: &str) -> bool {
    get_evaluable(raw).is_some()
}
