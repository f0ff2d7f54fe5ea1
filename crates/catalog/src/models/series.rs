use serde::Serialize;

/// One row of the book/series association, joined with the series.
#[derive(Debug, sqlx::FromRow)]
pub struct BookSeriesRow {
    pub book_id: String,
    pub series_id: String,
    pub name: String,
    pub name_ignore_prefix: String,
    pub sequence: Option<String>,
}

/// A series membership as shown on a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesRef {
    pub id: String,
    pub name: String,
    pub name_ignore_prefix: String,
    /// Free-form position within the series ("1", "2.5", "Book 3").
    pub sequence: Option<String>,
}

impl From<BookSeriesRow> for SeriesRef {
    fn from(row: BookSeriesRow) -> Self {
        Self {
            id: row.series_id,
            name: row.name,
            name_ignore_prefix: row.name_ignore_prefix,
            sequence: row.sequence,
        }
    }
}
