//! Series collapsing.
//!
//! With collapsing on, a series whose books match the listing is shown as a
//! single row: one of its books stands in for the whole series and the
//! others are left out. Which books match is decided by the same predicate
//! as the listing, so counts never include books the user can't see.

use crate::error::{ErrorKind, Result};
use crate::predicate::{Builder, Predicate};
use crate::sort::leading_number;
use exn::ResultExt;
use serde::Serialize;
use sqlx::SqliteConnection;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tome_catalog::COLLATION;
use tracing::{debug, instrument};

/// A series folded into its representative book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollapsedSeries {
    pub id: String,
    pub name: String,
    pub name_ignore_prefix: String,
    /// The representative's position in this series.
    pub sequence: Option<String>,
    pub num_books: u32,
    pub library_item_ids: Vec<String>,
    /// Positions the collapsed books hold in the filtered series, as ranges
    /// ("1-3, 5"). Only set when listing a single series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_sequence_list: Option<String>,
}

/// Which books disappear and which stand in for a series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collapse {
    pub exclusions: HashSet<String>,
    /// Keyed by representative book id.
    pub representatives: HashMap<String, CollapsedSeries>,
}

impl Collapse {
    /// The title each representative sorts under, as a JSON object keyed
    /// by book id.
    pub(crate) fn display_titles(&self, ignore_prefix: bool) -> String {
        self.representatives
            .iter()
            .map(|(book_id, series)| {
                let name = if ignore_prefix { &series.name_ignore_prefix } else { &series.name };
                (book_id.clone(), serde_json::Value::String(name.clone()))
            })
            .collect::<serde_json::Value>()
            .to_string()
    }
}

/// A qualifying book of a series.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SeriesBookRow {
    pub series_id: String,
    pub series_name: String,
    pub series_name_ignore_prefix: String,
    pub book_id: String,
    pub item_id: String,
    pub sequence: Option<String>,
    /// The book's position in the filtered series, if listing one.
    pub filter_sequence: Option<String>,
}

/// Compute the collapse partition for a book listing.
#[instrument(level = "debug", skip_all, fields(library_id = %predicate.library.id))]
pub(crate) async fn collapse(conn: &mut SqliteConnection, predicate: &Predicate<'_>) -> Result<Collapse> {
    let mut qb = Builder::new(
        "SELECT s.id AS series_id, s.name AS series_name, s.name_ignore_prefix AS series_name_ignore_prefix, \
         m.id AS book_id, li.id AS item_id, bs.sequence",
    );
    qb.push(if predicate.series_id().is_some() {
        ", fbs.sequence AS filter_sequence"
    } else {
        ", NULL AS filter_sequence"
    });
    qb.push(
        " FROM series s \
         INNER JOIN book_series bs ON bs.series_id = s.id \
         INNER JOIN books m ON m.id = bs.book_id \
         INNER JOIN library_items li ON li.media_id = m.id AND li.media_type = 'book'",
    );
    predicate.push_joins(&mut qb);
    qb.push(" WHERE s.library_id = ");
    qb.push_bind(predicate.library.id.clone());
    qb.push(" AND li.library_id = ");
    qb.push_bind(predicate.library.id.clone());
    predicate.push_conditions(&mut qb);
    if let Some(series_id) = predicate.series_id() {
        // The listed series itself stays expanded.
        qb.push(" AND s.id <> ");
        qb.push_bind(series_id.to_string());
    }
    qb.push(format_args!(
        " ORDER BY s.id ASC, {} ASC NULLS LAST, m.title COLLATE {COLLATION} ASC, m.id ASC",
        leading_number("bs.sequence")
    ));
    let rows: Vec<SeriesBookRow> =
        qb.build_query_as().fetch_all(&mut *conn).await.or_raise(|| ErrorKind::Database)?;
    let collapse = partition(rows, predicate.library.settings.hide_single_book_series);
    debug!(
        representatives = collapse.representatives.len(),
        exclusions = collapse.exclusions.len(),
        "collapsed series"
    );
    Ok(collapse)
}

/// Walk series in order, picking a representative for each.
///
/// `rows` must be grouped by series and ordered within each series. The
/// first book not already representing an earlier series represents this
/// one; the rest are excluded unless they represent some other series.
pub(crate) fn partition(rows: Vec<SeriesBookRow>, hide_single_book_series: bool) -> Collapse {
    let mut collapse = Collapse::default();
    for books in rows.chunk_by(|a, b| a.series_id == b.series_id) {
        if hide_single_book_series && books.len() == 1 {
            continue;
        }
        let Some(representative) = books.iter().find(|b| !collapse.representatives.contains_key(&b.book_id)) else {
            continue;
        };
        let filter_sequences: Vec<&str> = books.iter().filter_map(|b| b.filter_sequence.as_deref()).collect();
        collapse.representatives.insert(
            representative.book_id.clone(),
            CollapsedSeries {
                id: representative.series_id.clone(),
                name: representative.series_name.clone(),
                name_ignore_prefix: representative.series_name_ignore_prefix.clone(),
                sequence: representative.sequence.clone(),
                num_books: books.len() as u32,
                library_item_ids: books.iter().map(|b| b.item_id.clone()).collect(),
                series_sequence_list: (!filter_sequences.is_empty()).then(|| sequence_ranges(&filter_sequences)),
            },
        );
        collapse
            .exclusions
            .extend(books.iter().filter(|b| b.book_id != representative.book_id).map(|b| b.book_id.clone()));
    }
    let representatives = &collapse.representatives;
    collapse.exclusions.retain(|book_id| !representatives.contains_key(book_id));
    collapse
}

/// A plain decimal ("3", "2.5", ".5"), as opposed to free-form text.
fn plain_number(sequence: &str) -> Option<f64> {
    let (int, frac) = sequence.split_once('.').unwrap_or((sequence, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let valid = digits(int) && digits(frac) && !(int.is_empty() && frac.is_empty());
    if valid { sequence.parse().ok() } else { None }
}

/// Render sequences as sorted, comma-separated ranges: consecutive numbers
/// merge into `start-end`, anything else stands alone.
pub(crate) fn sequence_ranges(sequences: &[&str]) -> String {
    let mut sorted: Vec<(&str, Option<f64>)> = sequences
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| (*s, plain_number(s)))
        .collect();
    sorted.sort_by(|a, b| match (a.1, b.1) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.0.cmp(b.0),
    });

    let mut ranges: Vec<(String, String, Option<f64>)> = Vec::new();
    for (raw, number) in sorted {
        let label = number.map_or_else(|| raw.to_string(), format_number);
        let extends = matches!((ranges.last(), number), (Some((_, _, Some(last))), Some(n)) if last + 1.0 == n);
        match ranges.last_mut() {
            Some(range) if extends => {
                range.1 = label;
                range.2 = number;
            },
            _ => ranges.push((label.clone(), label, number)),
        }
    }
    ranges
        .into_iter()
        .map(|(start, end, _)| if start == end { start } else { format!("{start}-{end}") })
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 { format!("{}", n as i64) } else { n.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(series: &str, book: &str) -> SeriesBookRow {
        SeriesBookRow {
            series_id: series.to_string(),
            series_name: format!("Series {series}"),
            series_name_ignore_prefix: format!("Series {series}"),
            book_id: book.to_string(),
            item_id: format!("li-{book}"),
            sequence: None,
            filter_sequence: None,
        }
    }

    #[test]
    fn test_first_book_represents_series() {
        let collapse = partition(vec![row("s1", "b1"), row("s1", "b2"), row("s1", "b3")], false);
        let series = &collapse.representatives["b1"];
        assert_eq!(series.num_books, 3);
        assert_eq!(series.library_item_ids, ["li-b1", "li-b2", "li-b3"]);
        assert_eq!(collapse.exclusions, HashSet::from(["b2".to_string(), "b3".to_string()]));
    }

    #[test]
    fn test_book_in_two_series() {
        // b1 opens both series; the lower series id claims it first.
        let rows = vec![row("s1", "b1"), row("s1", "b2"), row("s2", "b1"), row("s2", "b3")];
        let collapse = partition(rows, false);
        assert_eq!(collapse.representatives["b1"].id, "s1");
        assert_eq!(collapse.representatives["b3"].id, "s2");
        assert_eq!(collapse.representatives["b3"].num_books, 2);
        assert_eq!(collapse.exclusions, HashSet::from(["b2".to_string()]));
    }

    #[test]
    fn test_representative_is_never_excluded() {
        // b2 is hidden by s1 but goes on to represent s2.
        let rows = vec![row("s1", "b1"), row("s1", "b2"), row("s2", "b2")];
        let collapse = partition(rows, false);
        assert_eq!(collapse.representatives.len(), 2);
        assert!(collapse.exclusions.is_empty());
    }

    #[test]
    fn test_single_book_series() {
        let collapse = partition(vec![row("s1", "b1")], false);
        assert_eq!(collapse.representatives["b1"].num_books, 1);
        let collapse = partition(vec![row("s1", "b1")], true);
        assert!(collapse.representatives.is_empty());
    }

    #[test]
    fn test_empty() {
        assert_eq!(partition(Vec::new(), false), Collapse::default());
    }

    #[test]
    fn test_filter_sequences() {
        let mut rows = vec![row("s2", "b1"), row("s2", "b2"), row("s2", "b3")];
        for (row, seq) in rows.iter_mut().zip(["3", "1", "2"]) {
            row.filter_sequence = Some(seq.to_string());
        }
        let collapse = partition(rows, false);
        assert_eq!(collapse.representatives["b1"].series_sequence_list.as_deref(), Some("1-3"));
    }

    #[rstest]
    #[case(&["1", "2", "3", "5"], "1-3, 5")]
    #[case(&["5", "1", "2"], "1-2, 5")]
    #[case(&["1", "1.5", "3.5"], "1, 1.5, 3.5")]
    #[case(&["1.5", "2.5"], "1.5-2.5")]
    #[case(&["01", "2"], "1-2")]
    #[case(&["Prequel", "1", "2", ""], "1-2, Prequel")]
    #[case(&["4"], "4")]
    fn test_sequence_ranges(#[case] input: &[&str], #[case] expected: &str) {
        assert_eq!(sequence_ranges(input), expected);
    }

    #[test]
    fn test_display_titles() {
        let collapse = partition(vec![row("s1", "b1"), row("s1", "b2")], false);
        let titles: serde_json::Value = serde_json::from_str(&collapse.display_titles(false)).unwrap();
        assert_eq!(titles["b1"], "Series s1");
    }
}
