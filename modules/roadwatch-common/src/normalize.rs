//! Place-name canonicalization for cross-source comparison.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonical form of a place name: lowercase, decomposed to NFD with combining
/// marks dropped, runs of whitespace collapsed to one space, trimmed.
///
/// `"  San Jerónimo "` and `"SAN JERONIMO"` both become `"san jeronimo"`.
/// Only used for comparison and lookup keys; displayed names keep the
/// provider's original text.
pub fn normalize_name(name: &str) -> String {
    let folded: String = name
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
