use crate::error::{Error, ErrorKind, Result};
use crate::models::from_json;
use exn::ResultExt;
use serde::Serialize;

/// Podcast columns plus the derived episode count. Expects the `podcasts`
/// table aliased as `m`.
pub const PODCAST_COLUMNS: &str = "m.id AS podcast_id, m.title, m.title_ignore_prefix, m.author, \
    m.genres, m.tags, m.language, m.description, m.cover_path, m.explicit, \
    (SELECT count(*) FROM podcast_episodes pe WHERE pe.podcast_id = m.id) AS num_episodes";

#[derive(sqlx::FromRow)]
pub struct PodcastRow {
    pub podcast_id: String,
    pub title: String,
    pub title_ignore_prefix: String,
    pub author: Option<String>,
    pub genres: String,
    pub tags: String,
    pub language: Option<String>,
    pub description: Option<String>,
    pub cover_path: Option<String>,
    pub explicit: bool,
    pub num_episodes: i64,
}
impl PodcastRow {
    pub const COLUMNS: &'static str = PODCAST_COLUMNS;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Podcast {
    pub id: String,
    pub title: String,
    pub title_ignore_prefix: String,
    pub author: Option<String>,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub cover_path: Option<String>,
    pub explicit: bool,
    pub num_episodes: u32,
}

impl TryFrom<PodcastRow> for Podcast {
    type Error = Error;
    fn try_from(row: PodcastRow) -> Result<Self> {
        Ok(Self {
            id: row.podcast_id,
            title: row.title,
            title_ignore_prefix: row.title_ignore_prefix,
            author: row.author,
            genres: from_json(&row.genres, "genres")?,
            tags: from_json(&row.tags, "tags")?,
            language: row.language,
            description: row.description,
            cover_path: row.cover_path,
            explicit: row.explicit,
            num_episodes: u32::try_from(row.num_episodes).or_raise(|| ErrorKind::InvalidData("episode count"))?,
        })
    }
}
