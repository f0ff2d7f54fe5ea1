//! Shaping fetched rows into the listing's wire form.

use crate::collapse::{Collapse, CollapsedSeries};
use crate::executor::{ItemRecord, MediaRecord};
use serde::Serialize;
use std::collections::HashMap;
use tome_catalog::models::{AuthorRef, Book, Feed, LibraryItem, MediaItemRef, MediaProgress, Podcast, SeriesRef};

/// A library item with its media and every requested annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItemAggregate {
    #[serde(flatten)]
    pub item: LibraryItem,
    pub media: Media,
    /// The item's place in the series being listed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<SeriesPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed_series: Option<CollapsedSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rss_feed: Option<Feed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_episodes_incomplete: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_progress: Option<MediaProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Media {
    Book(Book),
    Podcast(Podcast),
}

impl Media {
    pub fn title(&self) -> &str {
        match self {
            Media::Book(book) => &book.title,
            Media::Podcast(podcast) => &podcast.title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPosition {
    pub id: String,
    pub name: String,
    pub sequence: Option<String>,
}

/// Eager-loaded data for one page, consumed as items are projected.
#[derive(Debug, Default)]
pub(crate) struct Projection<'a> {
    pub series_id: Option<&'a str>,
    pub collapse: Option<&'a Collapse>,
    pub authors: HashMap<String, Vec<AuthorRef>>,
    pub series: HashMap<String, Vec<SeriesRef>>,
    pub feeds: HashMap<String, Feed>,
    pub progress: HashMap<MediaItemRef, MediaProgress>,
    pub incomplete_episodes: HashMap<String, u32>,
}

impl Projection<'_> {
    pub fn project(&mut self, record: ItemRecord) -> LibraryItemAggregate {
        let media_progress = self.progress.remove(&record.progress_target());
        let ItemRecord { item, media } = record;
        let mut series = None;
        let mut collapsed_series = None;
        let mut num_episodes_incomplete = None;
        let media = match media {
            MediaRecord::Book(mut book) => {
                book.authors = self.authors.remove(&book.id).unwrap_or_default();
                book.series = self.series.remove(&book.id).unwrap_or_default();
                series = self.series_id.and_then(|id| book.series.iter().find(|s| s.id == id)).map(|s| {
                    SeriesPosition {
                        id: s.id.clone(),
                        name: s.name.clone(),
                        sequence: s.sequence.clone(),
                    }
                });
                collapsed_series = self.collapse.and_then(|c| c.representatives.get(&book.id)).cloned();
                Media::Book(book)
            },
            MediaRecord::Podcast(podcast) => {
                num_episodes_incomplete = self.incomplete_episodes.remove(&podcast.id);
                Media::Podcast(podcast)
            },
        };
        LibraryItemAggregate {
            rss_feed: self.feeds.remove(&item.id),
            item,
            media,
            series,
            collapsed_series,
            num_episodes_incomplete,
            media_progress,
        }
    }
}
