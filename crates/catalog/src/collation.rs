//! Case- and accent-insensitive text ordering.
//!
//! SQLite's built-in `NOCASE` only folds ASCII, so "éclair" would sort after
//! "Zebra". Every pooled connection registers [`COLLATION`] instead; queries
//! use it as `COLLATE <name>` wherever text is ordered for display.

use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Name of the collation registered on every catalog connection.
pub const COLLATION: &str = "tome_nocase";

/// Compatibility-decompose, drop combining marks and lowercase.
fn fold(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).flat_map(char::to_lowercase).collect()
}

/// Compare by folded form, then by case-folded form, then byte-wise, so
/// that distinct strings never compare equal.
pub(crate) fn compare(a: &str, b: &str) -> Ordering {
    fold(a)
        .cmp(&fold(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("éclair", "Émile", Ordering::Less)]
    #[case("Émile", "Zebra", Ordering::Less)]
    #[case("apple", "Banana", Ordering::Less)]
    #[case("Straße", "strasse", Ordering::Greater)]
    #[case("Ångström", "angstrom", Ordering::Greater)]
    #[case("same", "same", Ordering::Equal)]
    fn test_compare(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(compare(a, b), expected);
    }

    #[test]
    fn test_sorts_accented_titles_alphabetically() {
        let mut titles = vec!["Zebra", "Émile", "éclair", "apple"];
        titles.sort_by(|a, b| compare(a, b));
        assert_eq!(titles, ["apple", "éclair", "Émile", "Zebra"]);
    }
}
