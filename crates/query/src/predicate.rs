//! The combined row predicate shared by every query of a listing.
//!
//! The page, its count and the series-collapse pass must agree on which
//! media rows qualify, so all three are built from the same [`Predicate`].
//! Table aliases are fixed: `li` is the library item, `m` its media row,
//! `fbs` the membership of the filtered series and `mp` the requesting
//! user's progress. Column names only ever come from closed enums; every
//! value is a bound parameter.

use crate::filter::{EbookFilter, Filter, MissingField, ProgressFilter, TrackCount};
use crate::permission::PermissionPredicate;
use sqlx::{QueryBuilder, Sqlite};
use tome_catalog::models::{Library, MediaType};

pub(crate) type Builder = QueryBuilder<'static, Sqlite>;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Predicate<'a> {
    pub library: &'a Library,
    pub filter: Option<&'a Filter>,
    pub permission: &'a PermissionPredicate,
    pub user_id: Option<&'a str>,
    /// Items created at or after this unix millisecond count as recent.
    pub recent_cutoff: i64,
}

impl Predicate<'_> {
    pub fn media_type(&self) -> MediaType {
        self.library.media_type
    }

    pub fn series_id(&self) -> Option<&str> {
        self.filter.and_then(Filter::series_id)
    }

    pub fn has_progress_filter(&self) -> bool {
        self.filter.is_some_and(Filter::is_progress)
    }

    /// Append `FROM library_items li` joined to its media and everything
    /// the filter needs, followed by the `WHERE` clause.
    pub fn push_from_where(&self, qb: &mut Builder) {
        self.push_from(qb);
        self.push_where(qb);
    }

    pub fn push_from(&self, qb: &mut Builder) {
        qb.push(" FROM library_items li INNER JOIN ");
        qb.push(self.media_type().table());
        qb.push(" m ON m.id = li.media_id");
        self.push_joins(qb);
    }

    pub fn push_where(&self, qb: &mut Builder) {
        qb.push(" WHERE li.library_id = ");
        qb.push_bind(self.library.id.clone());
        qb.push(" AND li.media_type = ");
        qb.push_bind(self.media_type().as_str());
        self.push_conditions(qb);
    }

    /// Joins required by the filter, relative to `li` and `m`.
    pub fn push_joins(&self, qb: &mut Builder) {
        if let Some(series_id) = self.series_id() {
            qb.push(" INNER JOIN book_series fbs ON fbs.book_id = m.id AND fbs.series_id = ");
            qb.push_bind(series_id.to_string());
        }
        if self.has_progress_filter() {
            qb.push(" LEFT JOIN media_progresses mp ON mp.media_item_id = m.id AND mp.user_id = ");
            qb.push_bind(self.user_id.map(str::to_string));
        }
    }

    /// Filter and permission conditions, each prefixed with `AND`.
    pub fn push_conditions(&self, qb: &mut Builder) {
        if let Some(filter) = self.filter {
            self.push_filter(qb, filter);
        }
        self.permission.push_conditions(qb);
    }

    fn push_filter(&self, qb: &mut Builder, filter: &Filter) {
        match filter {
            Filter::Genre(value) => push_token_member(qb, "m.genres", value),
            Filter::Tag(value) => push_token_member(qb, "m.tags", value),
            Filter::Narrator(value) => push_token_member(qb, "m.narrators", value),
            // Expressed by the `fbs` join.
            Filter::Series(_) => {},
            Filter::NoSeries => {
                qb.push(" AND NOT EXISTS (SELECT 1 FROM book_series x WHERE x.book_id = m.id)");
            },
            Filter::Author(id) => {
                qb.push(" AND EXISTS (SELECT 1 FROM book_authors x WHERE x.book_id = m.id AND x.author_id = ");
                qb.push_bind(id.clone());
                qb.push(")");
            },
            Filter::Publisher(value) => {
                qb.push(" AND m.publisher = ");
                qb.push_bind(value.clone());
            },
            Filter::Language(value) => {
                qb.push(" AND m.language = ");
                qb.push_bind(value.clone());
            },
            Filter::Progress(progress) => {
                qb.push(match progress {
                    ProgressFilter::Finished => " AND mp.is_finished = 1",
                    ProgressFilter::NotFinished => " AND (mp.is_finished IS NULL OR mp.is_finished = 0)",
                    ProgressFilter::NotStarted => {
                        " AND (mp.position_seconds IS NULL OR mp.position_seconds = 0) \
                         AND (mp.is_finished IS NULL OR mp.is_finished = 0)"
                    },
                    ProgressFilter::InProgress => {
                        " AND (mp.position_seconds > 0 OR mp.ebook_progress > 0) AND mp.is_finished = 0"
                    },
                    ProgressFilter::AudioInProgress => " AND mp.position_seconds > 0 AND mp.is_finished = 0",
                    ProgressFilter::EbookInProgress => " AND mp.ebook_progress > 0 AND mp.is_finished = 0",
                });
            },
            Filter::Tracks(TrackCount::Single) => {
                qb.push(" AND json_array_length(m.audio_files) = 1");
            },
            Filter::Tracks(TrackCount::Multi) => {
                qb.push(" AND json_array_length(m.audio_files) > 1");
            },
            Filter::Ebooks(EbookFilter::Ebook) => {
                qb.push(" AND m.ebook_file IS NOT NULL");
            },
            Filter::Ebooks(EbookFilter::NoEbook) => {
                qb.push(" AND m.ebook_file IS NULL");
            },
            Filter::Ebooks(EbookFilter::Supplementary) => {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM json_each(li.library_files) f \
                     WHERE json_extract(f.value, '$.isSupplementary') = 1)",
                );
            },
            Filter::Missing(field) => push_missing(qb, *field),
            Filter::Issues => {
                qb.push(" AND (li.is_missing = 1 OR li.is_invalid = 1)");
            },
            Filter::Abridged => {
                qb.push(" AND m.abridged = 1");
            },
            Filter::FeedOpen => {
                qb.push(" AND EXISTS (SELECT 1 FROM feeds x WHERE x.entity_id = li.id)");
            },
            Filter::Recent => {
                qb.push(" AND li.created_at >= ");
                qb.push_bind(self.recent_cutoff);
            },
        }
    }
}

/// Exact element match on a JSON array column.
fn push_token_member(qb: &mut Builder, column: &'static str, value: &str) {
    qb.push(" AND EXISTS (SELECT 1 FROM json_each(");
    qb.push(column);
    qb.push(") WHERE json_each.value = ");
    qb.push_bind(value.to_string());
    qb.push(")");
}

fn push_missing(qb: &mut Builder, field: MissingField) {
    let scalar = match field {
        MissingField::Asin => "m.asin",
        MissingField::Isbn => "m.isbn",
        MissingField::Subtitle => "m.subtitle",
        MissingField::PublishedYear => "m.published_year",
        MissingField::Description => "m.description",
        MissingField::Publisher => "m.publisher",
        MissingField::Language => "m.language",
        MissingField::Cover => "m.cover_path",
        MissingField::Genres => return push_empty_list(qb, "m.genres"),
        MissingField::Tags => return push_empty_list(qb, "m.tags"),
        MissingField::Narrators => return push_empty_list(qb, "m.narrators"),
        MissingField::Authors => {
            qb.push(" AND NOT EXISTS (SELECT 1 FROM book_authors x WHERE x.book_id = m.id)");
            return;
        },
        MissingField::Series => {
            qb.push(" AND NOT EXISTS (SELECT 1 FROM book_series x WHERE x.book_id = m.id)");
            return;
        },
    };
    qb.push(format_args!(" AND ({scalar} IS NULL OR {scalar} = '')"));
}

fn push_empty_list(qb: &mut Builder, column: &'static str) {
    qb.push(format_args!(" AND ({column} IS NULL OR json_array_length({column}) = 0)"));
}
