mod author;
mod book;
mod feed;
mod item;
mod library;
mod podcast;
mod progress;
mod series;

pub use self::author::{AuthorRef, BookAuthorRow};
pub use self::book::{Book, BookRow};
pub use self::feed::{Feed, FeedRow};
pub use self::item::{LibraryFile, LibraryItem, LibraryItemRow};
pub use self::library::{Library, LibraryRow, LibrarySettings};
pub use self::podcast::{Podcast, PodcastRow};
pub use self::progress::{MediaItemKind, MediaItemRef, MediaProgress, MediaProgressRow};
pub use self::series::{BookSeriesRow, SeriesRef};

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use time::UtcDateTime;

/// The kind of media a library (and each of its items) holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Book,
    Podcast,
}
impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Book => "book",
            MediaType::Podcast => "podcast",
        }
    }

    /// Table holding this kind of media record.
    pub fn table(&self) -> &'static str {
        match self {
            MediaType::Book => "books",
            MediaType::Podcast => "podcasts",
        }
    }
}
impl FromStr for MediaType {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "book" => Self::Book,
            "podcast" => Self::Podcast,
            _ => exn::bail!(ErrorKind::InvalidData("media type")),
        })
    }
}
impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Decode a unix millisecond timestamp column.
pub(crate) fn from_millis(ms: i64, field: &'static str) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).or_raise(|| ErrorKind::InvalidData(field))
}

/// Encode a timestamp as unix milliseconds, the catalog's wire format.
pub fn to_millis(at: &UtcDateTime) -> i64 {
    // Every timestamp the catalog can decode fits: it came from an i64 of ms.
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

pub(crate) fn serialize_millis<S: Serializer>(at: &UtcDateTime, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_i64(to_millis(at))
}

/// Decode a JSON column.
pub(crate) fn from_json<T: DeserializeOwned>(raw: &str, field: &'static str) -> Result<T> {
    serde_json::from_str(raw).or_raise(|| ErrorKind::InvalidData(field))
}
