//! Sort keys and their `ORDER BY` expressions.
//!
//! Resolution never fails: a key that is unknown, or that makes no sense
//! for the library and filter at hand, sorts by title instead.

use crate::predicate::Builder;
use tome_catalog::COLLATION;
use tome_catalog::models::MediaType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    AddedAt,
    Size,
    FileBirthtime,
    FileMtime,
    Duration,
    PublishedYear,
    AuthorName,
    AuthorNameLastFirst,
    Title,
    /// Position within the filtered series.
    Sequence,
    /// When the user last touched the item.
    Progress,
    Random,
    /// The podcast's own author field.
    PodcastAuthor,
    NumEpisodes,
}

impl SortKey {
    /// Parse a client sort key, including legacy `media.metadata.*` spellings.
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.strip_prefix("media.metadata.").map_or(key, |rest| rest);
        let key = key.strip_prefix("media.").map_or(key, |rest| rest);
        Some(match key {
            "addedAt" => Self::AddedAt,
            "size" => Self::Size,
            "fileBirthtime" | "birthtimeMs" => Self::FileBirthtime,
            "fileMtime" | "mtimeMs" => Self::FileMtime,
            "duration" => Self::Duration,
            "publishedYear" => Self::PublishedYear,
            "authorName" => Self::AuthorName,
            "authorNameLF" => Self::AuthorNameLastFirst,
            "title" => Self::Title,
            "sequence" => Self::Sequence,
            "progress" => Self::Progress,
            "random" => Self::Random,
            "author" => Self::PodcastAuthor,
            "numTracks" => Self::NumEpisodes,
            _ => return None,
        })
    }

    fn applies_to(&self, media_type: MediaType) -> bool {
        match self {
            Self::Duration | Self::PublishedYear | Self::AuthorName | Self::AuthorNameLastFirst | Self::Sequence => {
                media_type == MediaType::Book
            },
            Self::PodcastAuthor | Self::NumEpisodes => media_type == MediaType::Podcast,
            _ => true,
        }
    }
}

/// What the sort may depend on besides the key itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortContext {
    pub media_type: MediaType,
    pub series_filter: bool,
    pub progress_filter: bool,
    pub ignore_prefix: bool,
    pub collapse: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSort {
    pub key: SortKey,
    pub descending: bool,
    ignore_prefix: bool,
    /// Collapsed representatives sort by their series name.
    display_title: bool,
}

impl ResolvedSort {
    pub fn resolve(sort_by: Option<&str>, descending: bool, ctx: &SortContext) -> Self {
        let key = sort_by
            .and_then(SortKey::parse)
            .filter(|key| key.applies_to(ctx.media_type))
            .filter(|key| match key {
                SortKey::Sequence => ctx.series_filter,
                SortKey::Progress => ctx.progress_filter,
                _ => true,
            })
            .unwrap_or(SortKey::Title);
        Self {
            key,
            descending,
            ignore_prefix: ctx.ignore_prefix,
            display_title: ctx.collapse && key == SortKey::Title,
        }
    }

    pub fn uses_display_title(&self) -> bool {
        self.display_title
    }

    /// Append `ORDER BY`, ending with the item id as a tie-break.
    ///
    /// The display-title ordering expects the collapsed series names joined
    /// as `ct` (key: book id, value: name).
    pub(crate) fn push_order_by(&self, qb: &mut Builder) {
        let dir = if self.descending { "DESC" } else { "ASC" };
        // Explicit for keys whose missing values sort last ascending and
        // first descending.
        let nulls = if self.descending { "DESC NULLS FIRST" } else { "ASC NULLS LAST" };
        let title = if self.ignore_prefix { "m.title_ignore_prefix" } else { "m.title" };
        qb.push(" ORDER BY ");
        match self.key {
            SortKey::AddedAt => qb.push(format_args!("li.created_at {dir}")),
            SortKey::Size => qb.push(format_args!("li.size {dir}")),
            SortKey::FileBirthtime => qb.push(format_args!("li.birthtime {dir}")),
            SortKey::FileMtime => qb.push(format_args!("li.mtime {dir}")),
            SortKey::Duration => qb.push(format_args!("m.duration {dir}")),
            SortKey::PublishedYear => qb.push(format_args!("{} {nulls}", leading_number("m.published_year"))),
            SortKey::AuthorName => qb.push(format_args!("{} COLLATE {COLLATION} {dir}", author_names("a.name"))),
            SortKey::AuthorNameLastFirst => {
                qb.push(format_args!("{} COLLATE {COLLATION} {dir}", author_names("a.last_first")))
            },
            SortKey::Title if self.display_title => {
                qb.push(format_args!("COALESCE(ct.value, {title}) COLLATE {COLLATION} {dir}"))
            },
            SortKey::Title => qb.push(format_args!("{title} COLLATE {COLLATION} {dir}")),
            SortKey::Sequence => qb.push(format_args!("{} {nulls}", leading_number("fbs.sequence"))),
            SortKey::Progress => qb.push(format_args!("mp.updated_at {nulls}")),
            SortKey::Random => qb.push("RANDOM()"),
            SortKey::PodcastAuthor => qb.push(format_args!("m.author COLLATE {COLLATION} {nulls}")),
            SortKey::NumEpisodes => {
                qb.push(format_args!("(SELECT count(*) FROM podcast_episodes pe WHERE pe.podcast_id = m.id) {dir}"))
            },
        };
        qb.push(", li.id ASC");
    }
}

/// Comma-joined author names of the book `m`, in association order.
fn author_names(column: &str) -> String {
    format!(
        "(SELECT group_concat({column}, ', ' ORDER BY ba.created_at, ba.id) \
         FROM book_authors ba INNER JOIN authors a ON a.id = ba.author_id WHERE ba.book_id = m.id)"
    )
}

/// The leading number of a free-form text column, or NULL when it doesn't
/// start with one ("2.5", "3 - Part One", ".5" and "-1" all count).
pub(crate) fn leading_number(column: &str) -> String {
    format!(
        "(CASE WHEN trim({column}) GLOB '[0-9]*' OR trim({column}) GLOB '.[0-9]*' \
         OR trim({column}) GLOB '-[0-9]*' OR trim({column}) GLOB '-.[0-9]*' \
         THEN CAST(trim({column}) AS REAL) END)"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ctx() -> SortContext {
        SortContext {
            media_type: MediaType::Book,
            series_filter: false,
            progress_filter: false,
            ignore_prefix: false,
            collapse: false,
        }
    }

    fn order_by(sort: &ResolvedSort) -> String {
        let mut qb = Builder::new("");
        sort.push_order_by(&mut qb);
        qb.sql().to_owned()
    }

    #[rstest]
    #[case("addedAt", SortKey::AddedAt)]
    #[case("birthtimeMs", SortKey::FileBirthtime)]
    #[case("fileMtime", SortKey::FileMtime)]
    #[case("media.duration", SortKey::Duration)]
    #[case("media.metadata.publishedYear", SortKey::PublishedYear)]
    #[case("media.metadata.authorNameLF", SortKey::AuthorNameLastFirst)]
    #[case("media.title", SortKey::Title)]
    #[case("random", SortKey::Random)]
    fn test_parse(#[case] key: &str, #[case] expected: SortKey) {
        assert_eq!(SortKey::parse(key), Some(expected));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("media.metadata.colour"))]
    // Requires a single-series filter.
    #[case(Some("sequence"))]
    // Requires a progress filter.
    #[case(Some("progress"))]
    // Podcast only.
    #[case(Some("media.numTracks"))]
    fn test_fallback_to_title(#[case] key: Option<&str>) {
        assert_eq!(ResolvedSort::resolve(key, false, &ctx()).key, SortKey::Title);
    }

    #[test]
    fn test_context_enables_keys() {
        let ctx = SortContext { series_filter: true, progress_filter: true, ..ctx() };
        assert_eq!(ResolvedSort::resolve(Some("sequence"), false, &ctx).key, SortKey::Sequence);
        assert_eq!(ResolvedSort::resolve(Some("progress"), true, &ctx).key, SortKey::Progress);
        let podcasts = SortContext { media_type: MediaType::Podcast, ..ctx };
        assert_eq!(ResolvedSort::resolve(Some("media.author"), false, &podcasts).key, SortKey::PodcastAuthor);
        assert_eq!(ResolvedSort::resolve(Some("media.duration"), false, &podcasts).key, SortKey::Title);
    }

    #[test]
    fn test_title_order() {
        let sort = ResolvedSort::resolve(Some("media.metadata.title"), true, &ctx());
        assert_eq!(order_by(&sort), " ORDER BY m.title COLLATE tome_nocase DESC, li.id ASC");
        let sort = ResolvedSort::resolve(None, false, &SortContext { ignore_prefix: true, ..ctx() });
        assert_eq!(order_by(&sort), " ORDER BY m.title_ignore_prefix COLLATE tome_nocase ASC, li.id ASC");
    }

    #[test]
    fn test_collapsed_title_uses_display_title() {
        let sort = ResolvedSort::resolve(Some("media.title"), false, &SortContext { collapse: true, ..ctx() });
        assert!(sort.uses_display_title());
        assert_eq!(order_by(&sort), " ORDER BY COALESCE(ct.value, m.title) COLLATE tome_nocase ASC, li.id ASC");
        let sort = ResolvedSort::resolve(Some("addedAt"), false, &SortContext { collapse: true, ..ctx() });
        assert!(!sort.uses_display_title());
    }

    #[test]
    fn test_sequence_nulls_placement() {
        let ctx = SortContext { series_filter: true, ..ctx() };
        let asc = order_by(&ResolvedSort::resolve(Some("sequence"), false, &ctx));
        let desc = order_by(&ResolvedSort::resolve(Some("sequence"), true, &ctx));
        assert!(asc.ends_with("END) ASC NULLS LAST, li.id ASC"));
        assert!(desc.ends_with("END) DESC NULLS FIRST, li.id ASC"));
    }
}
