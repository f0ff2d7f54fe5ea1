use crate::error::{Error, ErrorKind, Result};
use crate::models::{MediaType, from_json, from_millis, serialize_millis};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

/// Library item columns, aliased so they can be flattened next to a media
/// row without clashing. Expects the `library_items` table aliased as `li`.
pub const LIBRARY_ITEM_COLUMNS: &str = "li.id AS item_id, li.library_id AS item_library_id, \
    li.media_id AS item_media_id, li.media_type AS item_media_type, li.size AS item_size, \
    li.birthtime AS item_birthtime, li.mtime AS item_mtime, li.is_missing AS item_is_missing, \
    li.is_invalid AS item_is_invalid, li.library_files AS item_library_files, \
    li.created_at AS item_created_at";

#[derive(sqlx::FromRow)]
pub struct LibraryItemRow {
    pub item_id: String,
    pub item_library_id: String,
    pub item_media_id: String,
    pub item_media_type: String,
    pub item_size: i64,
    pub item_birthtime: i64,
    pub item_mtime: i64,
    pub item_is_missing: bool,
    pub item_is_invalid: bool,
    pub item_library_files: String,
    pub item_created_at: i64,
}
impl LibraryItemRow {
    pub const COLUMNS: &'static str = LIBRARY_ITEM_COLUMNS;
}

/// A catalog entry, independent of the media record it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    pub id: String,
    pub library_id: String,
    pub media_id: String,
    pub media_type: MediaType,
    pub size: u64,
    #[serde(serialize_with = "serialize_millis")]
    pub birthtime: UtcDateTime,
    #[serde(serialize_with = "serialize_millis")]
    pub mtime: UtcDateTime,
    pub is_missing: bool,
    pub is_invalid: bool,
    pub library_files: Vec<LibraryFile>,
    #[serde(serialize_with = "serialize_millis")]
    pub created_at: UtcDateTime,
}

/// A file belonging to a library item, as recorded by the scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryFile {
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_supplementary: Option<bool>,
}

impl TryFrom<LibraryItemRow> for LibraryItem {
    type Error = Error;
    fn try_from(row: LibraryItemRow) -> Result<Self> {
        Ok(Self {
            id: row.item_id,
            library_id: row.item_library_id,
            media_id: row.item_media_id,
            media_type: row.item_media_type.parse()?,
            size: u64::try_from(row.item_size).or_raise(|| ErrorKind::InvalidData("item size"))?,
            birthtime: from_millis(row.item_birthtime, "item birthtime")?,
            mtime: from_millis(row.item_mtime, "item mtime")?,
            is_missing: row.item_is_missing,
            is_invalid: row.item_is_invalid,
            library_files: from_json(&row.item_library_files, "library files")?,
            created_at: from_millis(row.item_created_at, "item created at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> LibraryItemRow {
        LibraryItemRow {
            item_id: "li-1".to_string(),
            item_library_id: "lib-1".to_string(),
            item_media_id: "book-1".to_string(),
            item_media_type: "book".to_string(),
            item_size: 4096,
            item_birthtime: 1_600_000_000_000,
            item_mtime: 1_600_000_500_000,
            item_is_missing: false,
            item_is_invalid: false,
            item_library_files: r#"[{"path":"a.m4b"},{"path":"b.epub","isSupplementary":true}]"#.to_string(),
            item_created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_row_to_model() {
        let item = LibraryItem::try_from(row()).unwrap();
        assert_eq!(item.media_type, MediaType::Book);
        assert_eq!(item.size, 4096);
        assert_eq!(item.library_files.len(), 2);
        assert_eq!(item.library_files[1].is_supplementary, Some(true));
    }

    #[test]
    fn test_negative_size_is_rejected() {
        let mut row = row();
        row.item_size = -1;
        let err = LibraryItem::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("item size")));
    }
}
