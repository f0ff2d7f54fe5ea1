use crate::error::{Error, ErrorKind, Result};
use crate::models::{from_millis, serialize_millis};
use serde::Serialize;
use std::str::FromStr;
use time::UtcDateTime;

/// What a progress record tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaItemKind {
    Book,
    PodcastEpisode,
}
impl MediaItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaItemKind::Book => "book",
            MediaItemKind::PodcastEpisode => "podcastEpisode",
        }
    }
}
impl FromStr for MediaItemKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "book" => Self::Book,
            "podcastEpisode" => Self::PodcastEpisode,
            _ => exn::bail!(ErrorKind::InvalidData("media item type")),
        })
    }
}

/// The target of a progress lookup.
///
/// Book progress is keyed by the book itself. Podcast progress is keyed by
/// episode, so an item's progress is that of its most recently touched
/// episode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaItemRef {
    Book { book_id: String },
    PodcastEpisode { podcast_id: String },
}
impl MediaItemRef {
    pub fn kind(&self) -> MediaItemKind {
        match self {
            MediaItemRef::Book { .. } => MediaItemKind::Book,
            MediaItemRef::PodcastEpisode { .. } => MediaItemKind::PodcastEpisode,
        }
    }

    /// Id of the media record that owns the progress.
    pub fn owner_id(&self) -> &str {
        match self {
            MediaItemRef::Book { book_id } => book_id,
            MediaItemRef::PodcastEpisode { podcast_id } => podcast_id,
        }
    }
}

#[derive(sqlx::FromRow)]
pub struct MediaProgressRow {
    /// Book or podcast id the row was looked up for.
    pub owner_id: String,
    pub id: String,
    pub user_id: String,
    pub media_item_id: String,
    pub media_item_type: String,
    pub position_seconds: f64,
    pub duration: f64,
    pub is_finished: bool,
    pub ebook_progress: f64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaProgress {
    pub id: String,
    pub user_id: String,
    pub media_item_id: String,
    pub media_item_type: MediaItemKind,
    pub current_time: f64,
    pub duration: f64,
    pub is_finished: bool,
    pub ebook_progress: f64,
    #[serde(serialize_with = "serialize_millis")]
    pub updated_at: UtcDateTime,
}

impl TryFrom<MediaProgressRow> for MediaProgress {
    type Error = Error;
    fn try_from(row: MediaProgressRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            media_item_id: row.media_item_id,
            media_item_type: row.media_item_type.parse()?,
            current_time: row.position_seconds,
            duration: row.duration,
            is_finished: row.is_finished,
            ebook_progress: row.ebook_progress,
            updated_at: from_millis(row.updated_at, "progress updated at")?,
        })
    }
}
