//! Counting and fetching one page of library items.

use crate::collapse::Collapse;
use crate::error::{Error, ErrorKind, Result};
use crate::predicate::{Builder, Predicate};
use crate::sort::ResolvedSort;
use exn::ResultExt;
use sqlx::SqliteConnection;
use tome_catalog::json_list;
use tome_catalog::models::{
    Book, BookRow, LibraryItem, LibraryItemRow, MediaItemRef, MediaType, Podcast, PodcastRow,
};
use tracing::debug;

#[derive(sqlx::FromRow)]
pub(crate) struct BookItemRow {
    #[sqlx(flatten)]
    item: LibraryItemRow,
    #[sqlx(flatten)]
    book: BookRow,
}

#[derive(sqlx::FromRow)]
pub(crate) struct PodcastItemRow {
    #[sqlx(flatten)]
    item: LibraryItemRow,
    #[sqlx(flatten)]
    podcast: PodcastRow,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MediaRecord {
    Book(Book),
    Podcast(Podcast),
}

/// A library item with its media, before eager loads.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ItemRecord {
    pub item: LibraryItem,
    pub media: MediaRecord,
}

impl ItemRecord {
    pub fn book(&self) -> Option<&Book> {
        match &self.media {
            MediaRecord::Book(book) => Some(book),
            MediaRecord::Podcast(_) => None,
        }
    }

    /// Where the user's progress on this item is recorded.
    pub fn progress_target(&self) -> MediaItemRef {
        match &self.media {
            MediaRecord::Book(book) => MediaItemRef::Book { book_id: book.id.clone() },
            MediaRecord::Podcast(podcast) => MediaItemRef::PodcastEpisode { podcast_id: podcast.id.clone() },
        }
    }
}

impl TryFrom<BookItemRow> for ItemRecord {
    type Error = Error;
    fn try_from(row: BookItemRow) -> Result<Self> {
        Ok(Self {
            item: LibraryItem::try_from(row.item).or_raise(|| ErrorKind::Database)?,
            media: MediaRecord::Book(Book::try_from(row.book).or_raise(|| ErrorKind::Database)?),
        })
    }
}

impl TryFrom<PodcastItemRow> for ItemRecord {
    type Error = Error;
    fn try_from(row: PodcastItemRow) -> Result<Self> {
        Ok(Self {
            item: LibraryItem::try_from(row.item).or_raise(|| ErrorKind::Database)?,
            media: MediaRecord::Podcast(Podcast::try_from(row.podcast).or_raise(|| ErrorKind::Database)?),
        })
    }
}

/// Everything that shapes the result set of a listing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ItemQuery<'a> {
    pub predicate: Predicate<'a>,
    pub sort: &'a ResolvedSort,
    pub collapse: Option<&'a Collapse>,
}

impl ItemQuery<'_> {
    fn push_exclusions(&self, qb: &mut Builder) {
        if let Some(collapse) = self.collapse.filter(|c| !c.exclusions.is_empty()) {
            qb.push(" AND m.id NOT IN (SELECT value FROM json_each(");
            qb.push_bind(json_list(&collapse.exclusions));
            qb.push("))");
        }
    }

    /// Total number of rows across all pages.
    pub async fn count(&self, conn: &mut SqliteConnection) -> Result<u64> {
        let mut qb = Builder::new("SELECT count(*)");
        self.predicate.push_from_where(&mut qb);
        self.push_exclusions(&mut qb);
        let count: i64 = qb.build_query_scalar().fetch_one(&mut *conn).await.or_raise(|| ErrorKind::Database)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// One page of rows. A zero limit means every row from the offset on.
    pub async fn page(&self, conn: &mut SqliteConnection, limit: u32, offset: u32) -> Result<Vec<ItemRecord>> {
        let media_columns = match self.predicate.media_type() {
            MediaType::Book => BookRow::COLUMNS,
            MediaType::Podcast => PodcastRow::COLUMNS,
        };
        let mut qb = Builder::new(format!("SELECT {}, {media_columns}", LibraryItemRow::COLUMNS));
        self.predicate.push_from(&mut qb);
        if let Some(collapse) = self.collapse.filter(|_| self.sort.uses_display_title()) {
            qb.push(" LEFT JOIN json_each(");
            qb.push_bind(collapse.display_titles(self.predicate.library.settings.sorting_ignore_prefix));
            qb.push(") ct ON ct.key = m.id");
        }
        self.predicate.push_where(&mut qb);
        self.push_exclusions(&mut qb);
        self.sort.push_order_by(&mut qb);
        if limit > 0 {
            qb.push(" LIMIT ");
            qb.push_bind(i64::from(limit));
            qb.push(" OFFSET ");
            qb.push_bind(i64::from(offset));
        } else if offset > 0 {
            qb.push(" LIMIT -1 OFFSET ");
            qb.push_bind(i64::from(offset));
        }

        let records = match self.predicate.media_type() {
            MediaType::Book => {
                let rows: Vec<BookItemRow> =
                    qb.build_query_as().fetch_all(&mut *conn).await.or_raise(|| ErrorKind::Database)?;
                rows.into_iter().map(ItemRecord::try_from).collect::<Result<Vec<_>>>()?
            },
            MediaType::Podcast => {
                let rows: Vec<PodcastItemRow> =
                    qb.build_query_as().fetch_all(&mut *conn).await.or_raise(|| ErrorKind::Database)?;
                rows.into_iter().map(ItemRecord::try_from).collect::<Result<Vec<_>>>()?
            },
        };
        debug!(rows = records.len(), limit, offset, "fetched page");
        Ok(records)
    }
}
