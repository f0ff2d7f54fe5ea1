use crate::error::{Error, Result};
use crate::models::{AuthorRef, SeriesRef, from_json};
use serde::Serialize;
use serde_json::Value;

/// Book columns. Expects the `books` table aliased as `m`.
pub const BOOK_COLUMNS: &str = "m.id AS book_id, m.title, m.title_ignore_prefix, m.subtitle, \
    m.narrators, m.genres, m.tags, m.language, m.publisher, m.published_year, m.isbn, m.asin, \
    m.description, m.cover_path, m.explicit, m.abridged, m.duration, m.audio_files, m.ebook_file";

#[derive(sqlx::FromRow)]
pub struct BookRow {
    pub book_id: String,
    pub title: String,
    pub title_ignore_prefix: String,
    pub subtitle: Option<String>,
    pub narrators: String,
    pub genres: String,
    pub tags: String,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<String>,
    pub isbn: Option<String>,
    pub asin: Option<String>,
    pub description: Option<String>,
    pub cover_path: Option<String>,
    pub explicit: bool,
    pub abridged: bool,
    pub duration: f64,
    pub audio_files: String,
    pub ebook_file: Option<String>,
}
impl BookRow {
    pub const COLUMNS: &'static str = BOOK_COLUMNS;
}

/// Book media record.
///
/// `authors` and `series` are populated by a separate eager load, ordered by
/// association creation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub title_ignore_prefix: String,
    pub subtitle: Option<String>,
    pub narrators: Vec<String>,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<String>,
    pub isbn: Option<String>,
    pub asin: Option<String>,
    pub description: Option<String>,
    pub cover_path: Option<String>,
    pub explicit: bool,
    pub abridged: bool,
    pub duration: f64,
    pub audio_files: Vec<Value>,
    pub ebook_file: Option<Value>,
    pub authors: Vec<AuthorRef>,
    pub series: Vec<SeriesRef>,
}

impl Book {
    pub fn num_tracks(&self) -> usize {
        self.audio_files.len()
    }

    pub fn has_media_entities(&self) -> bool {
        !self.audio_files.is_empty() || self.ebook_file.is_some()
    }
}

impl TryFrom<BookRow> for Book {
    type Error = Error;
    fn try_from(row: BookRow) -> Result<Self> {
        Ok(Self {
            id: row.book_id,
            title: row.title,
            title_ignore_prefix: row.title_ignore_prefix,
            subtitle: row.subtitle,
            narrators: from_json(&row.narrators, "narrators")?,
            genres: from_json(&row.genres, "genres")?,
            tags: from_json(&row.tags, "tags")?,
            language: row.language,
            publisher: row.publisher,
            published_year: row.published_year,
            isbn: row.isbn,
            asin: row.asin,
            description: row.description,
            cover_path: row.cover_path,
            explicit: row.explicit,
            abridged: row.abridged,
            duration: row.duration,
            audio_files: from_json(&row.audio_files, "audio files")?,
            ebook_file: row.ebook_file.as_deref().map(|raw| from_json(raw, "ebook file")).transpose()?,
            authors: Vec::new(),
            series: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn row() -> BookRow {
        BookRow {
            book_id: "book-1".to_string(),
            title: "The Hobbit".to_string(),
            title_ignore_prefix: "Hobbit, The".to_string(),
            subtitle: None,
            narrators: r#"["Andy Serkis"]"#.to_string(),
            genres: r#"["Fantasy"]"#.to_string(),
            tags: r#"["classic","sci-fi-extended"]"#.to_string(),
            language: Some("English".to_string()),
            publisher: None,
            published_year: Some("1937".to_string()),
            isbn: None,
            asin: None,
            description: None,
            cover_path: None,
            explicit: false,
            abridged: false,
            duration: 39_000.5,
            audio_files: r#"[{"index":1},{"index":2}]"#.to_string(),
            ebook_file: None,
        }
    }

    #[test]
    fn test_row_to_model() {
        let book = Book::try_from(row()).unwrap();
        assert_eq!(book.tags, vec!["classic".to_string(), "sci-fi-extended".to_string()]);
        assert_eq!(book.num_tracks(), 2);
        assert!(book.has_media_entities());
        assert!(book.authors.is_empty());
    }

    #[test]
    fn test_row_with_corrupt_tags() {
        let mut row = row();
        row.tags = "classic, sci-fi".to_string();
        let err = Book::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("tags")));
    }
}
