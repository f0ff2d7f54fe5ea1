use crate::error::{Error, Result};
use crate::models::{from_millis, serialize_millis};
use serde::Serialize;
use time::UtcDateTime;

#[derive(sqlx::FromRow)]
pub struct FeedRow {
    pub id: String,
    pub entity_id: String,
    pub slug: String,
    pub feed_url: String,
    pub created_at: i64,
}

/// An open RSS feed for a library item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub id: String,
    pub entity_id: String,
    pub slug: String,
    pub feed_url: String,
    #[serde(serialize_with = "serialize_millis")]
    pub created_at: UtcDateTime,
}

impl TryFrom<FeedRow> for Feed {
    type Error = Error;
    fn try_from(row: FeedRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            entity_id: row.entity_id,
            slug: row.slug,
            feed_url: row.feed_url,
            created_at: from_millis(row.created_at, "feed created at")?,
        })
    }
}
