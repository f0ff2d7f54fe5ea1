use crate::collapse;
use crate::count::{CountCache, CountKey};
use crate::error::{ErrorKind, Result};
use crate::executor::{ItemQuery, ItemRecord};
use crate::filter::{Filter, FilterDescriptor, FilterGroup};
use crate::permission::PermissionPredicate;
use crate::predicate::Predicate;
use crate::projector::Projection;
use crate::request::{LibraryItemsPage, LibraryItemsRequest, UserPermissions};
use crate::sort::{ResolvedSort, SortContext};
use exn::ResultExt;
use std::ops::Deref;
use std::sync::Arc;
use time::{Duration, UtcDateTime};
use tome_catalog::error::ErrorKind as CatalogErrorKind;
use tome_catalog::models::{Library, to_millis};
use tome_catalog::{Database, Snapshot};
use tome_config::QueryConfig;
use tracing::{debug, instrument};

/// Serves filtered, sorted and paginated listings of a library.
///
/// Cheap to clone; clones share the database pool and the count cache.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    db: Database,
    counts: Option<Arc<CountCache>>,
    recent_window: Duration,
    default_limit: u32,
}

impl QueryEngine {
    /// Create an engine over a catalog.
    ///
    /// A count cache is only used when `config.count_cache` is on. Pass the
    /// same cache to every engine that serves the same catalog, and to the
    /// code that writes to it so it can invalidate.
    pub fn new(db: Database, config: &QueryConfig, counts: Option<Arc<CountCache>>) -> Self {
        Self {
            db,
            counts: counts.filter(|_| config.count_cache),
            recent_window: Duration::days(i64::from(config.recent_window_days)),
            default_limit: config.default_limit,
        }
    }

    pub fn count_cache(&self) -> Option<&Arc<CountCache>> {
        self.counts.as_ref()
    }

    /// List the items of a library.
    #[instrument(
        skip(self, request),
        fields(library_id = %request.library_id, filter = ?request.filter_by, sort = ?request.sort_by)
    )]
    pub async fn library_items(&self, request: &LibraryItemsRequest) -> Result<LibraryItemsPage> {
        let descriptor = FilterDescriptor::parse(request.filter_by.as_deref())?;
        self.execute(request, &descriptor, false).await
    }

    /// Books the user is part way through listening to (or reading, with
    /// `ebook`), most recently touched first. Podcast libraries have none.
    #[instrument(skip(self, user))]
    pub async fn items_in_progress(
        &self,
        library_id: &str,
        user: &UserPermissions,
        include: &[String],
        limit: u32,
        ebook: bool,
    ) -> Result<LibraryItemsPage> {
        let value = if ebook { "ebook-in-progress" } else { "audio-in-progress" };
        let request = LibraryItemsRequest {
            sort_by: Some("progress".to_string()),
            sort_desc: true,
            include: include.to_vec(),
            limit: Some(limit),
            ..LibraryItemsRequest::new(library_id, Some(user.clone()))
        };
        let descriptor = FilterDescriptor::new(FilterGroup::Progress, value);
        self.execute(&request, &descriptor, true).await
    }

    /// The most recently added items, newest first.
    #[instrument(skip(self, user))]
    pub async fn recently_added(
        &self,
        library_id: &str,
        user: Option<&UserPermissions>,
        include: &[String],
        limit: u32,
    ) -> Result<LibraryItemsPage> {
        let request = LibraryItemsRequest {
            sort_by: Some("addedAt".to_string()),
            sort_desc: true,
            include: include.to_vec(),
            limit: Some(limit),
            ..LibraryItemsRequest::new(library_id, user.cloned())
        };
        self.execute(&request, &FilterDescriptor::default(), false).await
    }

    async fn execute(
        &self,
        request: &LibraryItemsRequest,
        descriptor: &FilterDescriptor,
        books_only: bool,
    ) -> Result<LibraryItemsPage> {
        let permission = PermissionPredicate::for_user(request.user.as_ref());
        let limit = request.limit.unwrap_or(self.default_limit);

        let mut snapshot = self.db.snapshot().await.or_raise(|| ErrorKind::Database)?;
        let library = load_library(&mut snapshot, &request.library_id).await?;
        if books_only && !library.is_book() {
            return Ok(LibraryItemsPage { library_items: Vec::new(), count: 0 });
        }
        let filter = descriptor.compile(library.media_type);
        let collapsing = request.collapse_series && library.is_book();
        let predicate = Predicate {
            library: &library,
            filter: filter.as_ref(),
            permission: &permission,
            user_id: request.user_id(),
            recent_cutoff: to_millis(&(UtcDateTime::now() - self.recent_window)),
        };
        let sort = ResolvedSort::resolve(
            request.sort_by.as_deref(),
            request.sort_desc,
            &SortContext {
                media_type: library.media_type,
                series_filter: predicate.series_id().is_some(),
                progress_filter: predicate.has_progress_filter(),
                ignore_prefix: library.settings.sorting_ignore_prefix,
                collapse: collapsing,
            },
        );

        let collapse = if collapsing { Some(collapse::collapse(snapshot.conn(), &predicate).await?) } else { None };
        let query = ItemQuery { predicate, sort: &sort, collapse: collapse.as_ref() };
        let count = self.count(&mut snapshot, &query, &permission, collapsing).await?;
        let records = query.page(snapshot.conn(), limit, request.offset).await?;

        let mut projection = Projection {
            series_id: predicate.series_id(),
            collapse: collapse.as_ref(),
            ..Projection::default()
        };
        load_annotations(&mut snapshot, &records, &mut projection, request, filter.as_ref()).await?;
        snapshot.finish().await.or_raise(|| ErrorKind::Database)?;

        let library_items: Vec<_> = records.into_iter().map(|record| projection.project(record)).collect();
        debug!(items = library_items.len(), count, "listed library items");
        Ok(LibraryItemsPage { library_items, count })
    }

    /// The total for the listing, from the cache when its shape allows.
    async fn count(
        &self,
        snapshot: &mut Snapshot,
        query: &ItemQuery<'_>,
        permission: &PermissionPredicate,
        collapsing: bool,
    ) -> Result<u64> {
        let cacheable = query.predicate.filter.is_none() && permission.is_unrestricted() && !collapsing;
        let Some(counts) = self.counts.as_deref().filter(|_| cacheable) else {
            return query.count(snapshot.conn()).await;
        };
        let key = CountKey::new(query.predicate.library.id.clone(), query.predicate.media_type());
        if let Some(count) = counts.get(&key) {
            return Ok(count);
        }
        let count = query.count(snapshot.conn()).await?;
        counts.insert(key, count);
        Ok(count)
    }
}

async fn load_library(snapshot: &mut Snapshot, id: &str) -> Result<Library> {
    match snapshot.library(id).await {
        Ok(library) => Ok(library),
        Err(e) if matches!(e.deref(), CatalogErrorKind::LibraryNotFound(_)) => {
            Err(e).or_raise(|| ErrorKind::LibraryNotFound(id.to_string()))
        },
        Err(e) => Err(e).or_raise(|| ErrorKind::Database),
    }
}

/// Eager-load everything the page's items are annotated with.
async fn load_annotations(
    snapshot: &mut Snapshot,
    records: &[ItemRecord],
    projection: &mut Projection<'_>,
    request: &LibraryItemsRequest,
    filter: Option<&Filter>,
) -> Result<()> {
    let includes = request.includes();
    let book_ids: Vec<&str> = records.iter().filter_map(ItemRecord::book).map(|b| b.id.as_str()).collect();
    projection.authors = snapshot.book_authors(&book_ids).await.or_raise(|| ErrorKind::Database)?;
    projection.series = snapshot.book_series(&book_ids).await.or_raise(|| ErrorKind::Database)?;

    if includes.rss_feed || filter == Some(&Filter::FeedOpen) {
        let item_ids: Vec<&str> = records.iter().map(|r| r.item.id.as_str()).collect();
        projection.feeds = snapshot.item_feeds(&item_ids).await.or_raise(|| ErrorKind::Database)?;
    }
    if let Some(user_id) = request.user_id().filter(|_| includes.progress) {
        let targets: Vec<_> = records.iter().map(ItemRecord::progress_target).collect();
        projection.progress = snapshot.media_progress(user_id, &targets).await.or_raise(|| ErrorKind::Database)?;
    }
    if includes.num_episodes_incomplete {
        let podcast_ids: Vec<&str> = records
            .iter()
            .filter(|r| r.book().is_none())
            .map(|r| r.item.media_id.as_str())
            .collect();
        projection.incomplete_episodes = snapshot
            .incomplete_episode_counts(request.user_id(), &podcast_ids)
            .await
            .or_raise(|| ErrorKind::Database)?;
    }
    Ok(())
}
