//! Loose string matching used for categories and place names

/// Separators used in hierarchical category strings ("Théâtre » Comédie")
pub const HIERARCHY_DELIMITERS: &[char] = &['»', '>'];

/// Case-insensitive substring match in either direction.
///
/// Blank strings never match: a missing name must not count as a hit.
pub fn fuzzy_match(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Leftmost segment of a hierarchical category, trimmed
pub fn category_root(raw: &str) -> &str {
    raw.split(HIERARCHY_DELIMITERS).next().unwrap_or(raw).trim()
}

/// Case-insensitive containment of `needle` in `haystack`; blank needles never match
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}
