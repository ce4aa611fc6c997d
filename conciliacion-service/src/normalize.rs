//! Canonical text normalization for dictionary keys and keyword matching.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonicalize free text: uppercase, strip diacritics, keep only ASCII
/// letters, digits and spaces, collapse whitespace runs, trim.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .to_uppercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
