use crate::error::{Error, Result};
use crate::models::{MediaType, from_millis, serialize_millis};
use serde::Serialize;
use time::UtcDateTime;

#[derive(sqlx::FromRow)]
pub struct LibraryRow {
    pub id: String,
    pub name: String,
    pub media_type: String,
    pub hide_single_book_series: bool,
    pub sorting_ignore_prefix: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    pub id: String,
    pub name: String,
    pub media_type: MediaType,
    pub settings: LibrarySettings,
    #[serde(serialize_with = "serialize_millis")]
    pub created_at: UtcDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrarySettings {
    /// Series with a single visible book are not collapsed.
    pub hide_single_book_series: bool,
    /// Title and series-name ordering uses the precomputed "ignore prefix"
    /// forms ("Hobbit, The" rather than "The Hobbit").
    pub sorting_ignore_prefix: bool,
}

impl Library {
    pub fn is_book(&self) -> bool {
        self.media_type == MediaType::Book
    }
}

impl TryFrom<LibraryRow> for Library {
    type Error = Error;
    fn try_from(row: LibraryRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            name: row.name,
            media_type: row.media_type.parse()?,
            settings: LibrarySettings {
                hide_single_book_series: row.hide_single_book_series,
                sorting_ignore_prefix: row.sorting_ignore_prefix,
            },
            created_at: from_millis(row.created_at, "library created at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_model() {
        let row = LibraryRow {
            id: "lib-1".to_string(),
            name: "Audiobooks".to_string(),
            media_type: "book".to_string(),
            hide_single_book_series: true,
            sorting_ignore_prefix: false,
            created_at: 1_700_000_000_000,
        };
        let library = Library::try_from(row).unwrap();
        assert!(library.is_book());
        assert!(library.settings.hide_single_book_series);
        assert!(!library.settings.sorting_ignore_prefix);
    }

    #[test]
    fn test_row_with_unknown_media_type() {
        let row = LibraryRow {
            id: "lib-1".to_string(),
            name: "Mixed".to_string(),
            media_type: "video".to_string(),
            hide_single_book_series: false,
            sorting_ignore_prefix: false,
            created_at: 0,
        };
        assert!(Library::try_from(row).is_err());
    }
}
