//! Read transaction over the catalog.
//!
//! Every read a single listing request makes goes through one [`Snapshot`],
//! so the collapse pass, the count, the page and the eager loads all observe
//! the same state of the catalog even while a collaborator is writing.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{
    AuthorRef, BookAuthorRow, BookSeriesRow, Feed, FeedRow, Library, LibraryRow, MediaItemKind, MediaItemRef,
    MediaProgress, MediaProgressRow, SeriesRef,
};
use exn::{OptionExt, ResultExt};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use std::collections::HashMap;

/// Encode ids as a JSON array, for binding to `json_each(?)`.
pub fn json_list<I, S>(ids: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter()
        .map(|id| serde_json::Value::String(id.as_ref().to_owned()))
        .collect::<serde_json::Value>()
        .to_string()
}

pub struct Snapshot {
    tx: Transaction<'static, Sqlite>,
}

impl Database {
    /// Begin a read transaction.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let tx = self.pool().begin().await.or_raise(|| ErrorKind::Database)?;
        Ok(Snapshot { tx })
    }
}

impl Snapshot {
    /// The connection the transaction runs on, for dynamically built queries.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// End the transaction. Dropping a snapshot rolls it back instead, which
    /// for a read-only transaction is equivalent.
    pub async fn finish(self) -> Result<()> {
        self.tx.commit().await.or_raise(|| ErrorKind::Database)
    }

    // =========================================================================
    // Libraries
    // =========================================================================

    pub async fn library(&mut self, id: &str) -> Result<Library> {
        let row: Option<LibraryRow> = sqlx::query_as(include_str!("../queries/get_library.sql"))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.ok_or_raise(|| ErrorKind::LibraryNotFound(id.to_string()))?.try_into()
    }

    // =========================================================================
    // Eager loads
    // =========================================================================

    /// Authors of each book, in association order.
    pub async fn book_authors(&mut self, book_ids: &[&str]) -> Result<HashMap<String, Vec<AuthorRef>>> {
        if book_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<BookAuthorRow> = sqlx::query_as(include_str!("../queries/book_authors.sql"))
            .bind(json_list(book_ids))
            .fetch_all(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut authors: HashMap<String, Vec<AuthorRef>> = HashMap::new();
        for row in rows {
            authors.entry(row.book_id.clone()).or_default().push(row.into());
        }
        Ok(authors)
    }

    /// Series memberships of each book, in association order.
    pub async fn book_series(&mut self, book_ids: &[&str]) -> Result<HashMap<String, Vec<SeriesRef>>> {
        if book_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<BookSeriesRow> = sqlx::query_as(include_str!("../queries/book_series.sql"))
            .bind(json_list(book_ids))
            .fetch_all(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut series: HashMap<String, Vec<SeriesRef>> = HashMap::new();
        for row in rows {
            series.entry(row.book_id.clone()).or_default().push(row.into());
        }
        Ok(series)
    }

    /// The oldest open feed of each library item.
    pub async fn item_feeds(&mut self, item_ids: &[&str]) -> Result<HashMap<String, Feed>> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<FeedRow> = sqlx::query_as(include_str!("../queries/item_feeds.sql"))
            .bind(json_list(item_ids))
            .fetch_all(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut feeds = HashMap::new();
        for row in rows {
            if !feeds.contains_key(&row.entity_id) {
                feeds.insert(row.entity_id.clone(), Feed::try_from(row)?);
            }
        }
        Ok(feeds)
    }

    /// A user's progress on each target.
    ///
    /// Targets without progress are absent from the map.
    pub async fn media_progress(
        &mut self,
        user_id: &str,
        targets: &[MediaItemRef],
    ) -> Result<HashMap<MediaItemRef, MediaProgress>> {
        let mut progress = HashMap::new();
        for kind in [MediaItemKind::Book, MediaItemKind::PodcastEpisode] {
            let owners: Vec<&str> = targets.iter().filter(|t| t.kind() == kind).map(MediaItemRef::owner_id).collect();
            if owners.is_empty() {
                continue;
            }
            let query = match kind {
                MediaItemKind::Book => include_str!("../queries/book_progress.sql"),
                MediaItemKind::PodcastEpisode => include_str!("../queries/episode_progress.sql"),
            };
            let rows: Vec<MediaProgressRow> = sqlx::query_as(query)
                .bind(user_id)
                .bind(json_list(&owners))
                .fetch_all(&mut *self.tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            for row in rows {
                let target = match kind {
                    MediaItemKind::Book => MediaItemRef::Book { book_id: row.owner_id.clone() },
                    MediaItemKind::PodcastEpisode => MediaItemRef::PodcastEpisode { podcast_id: row.owner_id.clone() },
                };
                // Rows arrive newest first per podcast; keep the first.
                if !progress.contains_key(&target) {
                    progress.insert(target, MediaProgress::try_from(row)?);
                }
            }
        }
        Ok(progress)
    }

    /// Number of episodes of each podcast the user has not finished.
    ///
    /// Without a user every episode counts as incomplete.
    pub async fn incomplete_episode_counts(
        &mut self,
        user_id: Option<&str>,
        podcast_ids: &[&str],
    ) -> Result<HashMap<String, u32>> {
        if podcast_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(String, i64)> = sqlx::query_as(include_str!("../queries/incomplete_episode_counts.sql"))
            .bind(user_id)
            .bind(json_list(podcast_ids))
            .fetch_all(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter()
            .map(|(id, count)| -> Result<(String, u32)> {
                Ok((id, u32::try_from(count).or_raise(|| ErrorKind::InvalidData("episode count"))?))
            })
            .collect()
    }
}
