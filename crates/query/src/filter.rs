//! Filter tokens.
//!
//! Clients send a single `filterBy` string. It is either a bare keyword
//! (`issues`, `abridged`, `recent`, `feed-open`) or `<group>.<value>`, where
//! the value is base64 (standard alphabet, padding optional) and may also be
//! percent-encoded by the client's URL handling.
//!
//! Parsing is lenient about structure and strict about encoding: a token
//! that doesn't look like a filter is ignored, but a filter whose payload
//! can't be decoded is rejected.

use crate::error::{ErrorKind, Result};
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use exn::ResultExt;
use std::fmt::{Display, Formatter, Result as FmtResult};
use tome_catalog::models::MediaType;
use tracing::debug;

const FILTER_VALUE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Sentinel value of the `series` group meaning "in no series at all".
pub const NO_SERIES: &str = "no-series";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterGroup {
    Genres,
    Tags,
    Series,
    Authors,
    Narrators,
    Publishers,
    Languages,
    Progress,
    Tracks,
    Ebooks,
    Missing,
    Issues,
    Abridged,
    Recent,
    FeedOpen,
}

impl FilterGroup {
    /// Groups that carry an encoded value.
    const VALUED: [FilterGroup; 11] = [
        Self::Genres,
        Self::Tags,
        Self::Series,
        Self::Authors,
        Self::Narrators,
        Self::Publishers,
        Self::Languages,
        Self::Progress,
        Self::Tracks,
        Self::Ebooks,
        Self::Missing,
    ];
    const KEYWORDS: [FilterGroup; 4] = [Self::Issues, Self::Abridged, Self::Recent, Self::FeedOpen];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Genres => "genres",
            Self::Tags => "tags",
            Self::Series => "series",
            Self::Authors => "authors",
            Self::Narrators => "narrators",
            Self::Publishers => "publishers",
            Self::Languages => "languages",
            Self::Progress => "progress",
            Self::Tracks => "tracks",
            Self::Ebooks => "ebooks",
            Self::Missing => "missing",
            Self::Issues => "issues",
            Self::Abridged => "abridged",
            Self::Recent => "recent",
            Self::FeedOpen => "feed-open",
        }
    }
}

impl Display for FilterGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A parsed, not yet interpreted, filter token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDescriptor {
    pub group: Option<FilterGroup>,
    pub value: Option<String>,
}

impl FilterDescriptor {
    pub fn new(group: FilterGroup, value: impl Into<String>) -> Self {
        Self { group: Some(group), value: Some(value.into()) }
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_none()
    }

    /// Parse a `filterBy` token.
    ///
    /// Returns an empty descriptor for a missing token, an unknown group or
    /// a malformed structure. Fails with [`ErrorKind::Decode`] when the
    /// payload is not valid percent-encoding, base64 or UTF-8.
    pub fn parse(token: Option<&str>) -> Result<Self> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(Self::default());
        };
        if let Some(group) = FilterGroup::KEYWORDS.into_iter().find(|g| g.as_str() == token) {
            return Ok(Self { group: Some(group), value: None });
        }
        let Some((prefix, payload)) = token.split_once('.') else {
            debug!(token, "ignoring unrecognised filter");
            return Ok(Self::default());
        };
        let Some(group) = FilterGroup::VALUED.into_iter().find(|g| g.as_str() == prefix) else {
            debug!(group = prefix, "ignoring unknown filter group");
            return Ok(Self::default());
        };
        if payload.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self { group: Some(group), value: Some(decode_value(payload)?) })
    }

    /// Interpret the descriptor for a library of the given media type.
    ///
    /// Unknown values and groups that don't apply to the media type compile
    /// to no filter at all.
    pub fn compile(&self, media_type: MediaType) -> Option<Filter> {
        let group = self.group?;
        let value = self.value.as_deref();
        let filter = match (group, value) {
            (FilterGroup::Genres, Some(v)) => Filter::Genre(v.to_string()),
            (FilterGroup::Tags, Some(v)) => Filter::Tag(v.to_string()),
            (FilterGroup::Narrators, Some(v)) => Filter::Narrator(v.to_string()),
            (FilterGroup::Series, Some(NO_SERIES)) => Filter::NoSeries,
            (FilterGroup::Series, Some(v)) => Filter::Series(v.to_string()),
            (FilterGroup::Authors, Some(v)) => Filter::Author(v.to_string()),
            (FilterGroup::Publishers, Some(v)) => Filter::Publisher(v.to_string()),
            (FilterGroup::Languages, Some(v)) => Filter::Language(v.to_string()),
            (FilterGroup::Progress, Some(v)) => Filter::Progress(ProgressFilter::parse(v)?),
            (FilterGroup::Tracks, Some(v)) => Filter::Tracks(TrackCount::parse(v)?),
            (FilterGroup::Ebooks, Some(v)) => Filter::Ebooks(EbookFilter::parse(v)?),
            (FilterGroup::Missing, Some(v)) => Filter::Missing(MissingField::parse(v)?),
            (FilterGroup::Issues, _) => Filter::Issues,
            (FilterGroup::Abridged, _) => Filter::Abridged,
            (FilterGroup::Recent, _) => Filter::Recent,
            (FilterGroup::FeedOpen, _) => Filter::FeedOpen,
            (_, None) => return None,
        };
        filter.applies_to(media_type).then_some(filter)
    }
}

fn decode_value(payload: &str) -> Result<String> {
    let unescaped = urlencoding::decode(payload).or_raise(|| ErrorKind::Decode("invalid percent-encoding".into()))?;
    let bytes = FILTER_VALUE.decode(unescaped.as_bytes()).or_raise(|| ErrorKind::Decode("invalid base64".into()))?;
    String::from_utf8(bytes).or_raise(|| ErrorKind::Decode("value is not UTF-8".into()))
}

/// A filter the query builder knows how to express.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Genre(String),
    Tag(String),
    Narrator(String),
    Series(String),
    NoSeries,
    Author(String),
    Publisher(String),
    Language(String),
    Progress(ProgressFilter),
    Tracks(TrackCount),
    Ebooks(EbookFilter),
    Missing(MissingField),
    Issues,
    Abridged,
    FeedOpen,
    Recent,
}

impl Filter {
    fn applies_to(&self, media_type: MediaType) -> bool {
        match media_type {
            MediaType::Book => true,
            MediaType::Podcast => matches!(
                self,
                Self::Genre(_) | Self::Tag(_) | Self::Language(_) | Self::Issues | Self::FeedOpen | Self::Recent
            ),
        }
    }

    /// The series a single-series filter selects.
    pub fn series_id(&self) -> Option<&str> {
        match self {
            Self::Series(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_progress(&self) -> bool {
        matches!(self, Self::Progress(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressFilter {
    Finished,
    NotFinished,
    NotStarted,
    InProgress,
    AudioInProgress,
    EbookInProgress,
}

impl ProgressFilter {
    fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "finished" => Self::Finished,
            "not-finished" => Self::NotFinished,
            "not-started" => Self::NotStarted,
            "in-progress" => Self::InProgress,
            "audio-in-progress" => Self::AudioInProgress,
            "ebook-in-progress" => Self::EbookInProgress,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackCount {
    Single,
    Multi,
}

impl TrackCount {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "single" => Some(Self::Single),
            "multi" => Some(Self::Multi),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EbookFilter {
    Ebook,
    NoEbook,
    /// Has an ebook among its supplementary library files.
    Supplementary,
}

impl EbookFilter {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "ebook" => Some(Self::Ebook),
            "no-ebook" => Some(Self::NoEbook),
            "supplementary" => Some(Self::Supplementary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Asin,
    Isbn,
    Subtitle,
    PublishedYear,
    Description,
    Publisher,
    Language,
    Cover,
    Genres,
    Tags,
    Narrators,
    Authors,
    Series,
}

impl MissingField {
    fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "asin" => Self::Asin,
            "isbn" => Self::Isbn,
            "subtitle" => Self::Subtitle,
            "publishedYear" => Self::PublishedYear,
            "description" => Self::Description,
            "publisher" => Self::Publisher,
            "language" => Self::Language,
            "cover" => Self::Cover,
            "genres" => Self::Genres,
            "tags" => Self::Tags,
            "narrator" | "narrators" => Self::Narrators,
            "authors" => Self::Authors,
            "series" => Self::Series,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(token: &str) -> FilterDescriptor {
        FilterDescriptor::parse(Some(token)).unwrap()
    }

    #[rstest]
    #[case("genres.RmFudGFzeQ==", FilterGroup::Genres, "Fantasy")]
    #[case("genres.RmFudGFzeQ", FilterGroup::Genres, "Fantasy")]
    #[case("genres.RmFudGFzeQ%3D%3D", FilterGroup::Genres, "Fantasy")]
    #[case("series.bm8tc2VyaWVz", FilterGroup::Series, "no-series")]
    #[case("progress.ZmluaXNoZWQ=", FilterGroup::Progress, "finished")]
    #[case("tags.c2NpLWZp", FilterGroup::Tags, "sci-fi")]
    fn test_parse_valued(#[case] token: &str, #[case] group: FilterGroup, #[case] value: &str) {
        assert_eq!(parse(token), FilterDescriptor::new(group, value));
    }

    #[rstest]
    #[case("issues", FilterGroup::Issues)]
    #[case("abridged", FilterGroup::Abridged)]
    #[case("recent", FilterGroup::Recent)]
    #[case("feed-open", FilterGroup::FeedOpen)]
    fn test_parse_keyword(#[case] token: &str, #[case] group: FilterGroup) {
        assert_eq!(parse(token), FilterDescriptor { group: Some(group), value: None });
    }

    #[rstest]
    #[case("")]
    #[case("colour.cmVk")]
    #[case("genres")]
    #[case("genres.")]
    #[case("whatever")]
    fn test_parse_lenient(#[case] token: &str) {
        assert!(parse(token).is_empty());
    }

    #[test]
    fn test_parse_none() {
        assert!(FilterDescriptor::parse(None).unwrap().is_empty());
    }

    #[rstest]
    #[case("genres.!!!notbase64")]
    #[case("genres.%E0%A4%A")]
    #[case("tags.%FF")]
    // "/w==" decodes to the single byte 0xFF, which is not UTF-8.
    #[case("tags./w==")]
    fn test_parse_rejects_bad_encoding(#[case] token: &str) {
        let err = FilterDescriptor::parse(Some(token)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Decode(_)));
        assert!(err.is_client_error());
    }

    #[rstest]
    #[case(FilterDescriptor::new(FilterGroup::Series, "no-series"), Some(Filter::NoSeries))]
    #[case(FilterDescriptor::new(FilterGroup::Series, "s1"), Some(Filter::Series("s1".into())))]
    #[case(FilterDescriptor::new(FilterGroup::Tracks, "multi"), Some(Filter::Tracks(TrackCount::Multi)))]
    #[case(FilterDescriptor::new(FilterGroup::Tracks, "several"), None)]
    #[case(FilterDescriptor::new(FilterGroup::Missing, "narrator"), Some(Filter::Missing(MissingField::Narrators)))]
    #[case(FilterDescriptor::new(FilterGroup::Ebooks, "supplementary"), Some(Filter::Ebooks(EbookFilter::Supplementary)))]
    #[case(
        FilterDescriptor::new(FilterGroup::Progress, "ebook-in-progress"),
        Some(Filter::Progress(ProgressFilter::EbookInProgress))
    )]
    #[case(FilterDescriptor { group: Some(FilterGroup::Issues), value: None }, Some(Filter::Issues))]
    #[case(FilterDescriptor::default(), None)]
    fn test_compile_for_books(#[case] descriptor: FilterDescriptor, #[case] expected: Option<Filter>) {
        assert_eq!(descriptor.compile(MediaType::Book), expected);
    }

    #[rstest]
    #[case(FilterDescriptor::new(FilterGroup::Tags, "news"), true)]
    #[case(FilterDescriptor::new(FilterGroup::Languages, "en"), true)]
    #[case(FilterDescriptor { group: Some(FilterGroup::FeedOpen), value: None }, true)]
    #[case(FilterDescriptor::new(FilterGroup::Series, "s1"), false)]
    #[case(FilterDescriptor::new(FilterGroup::Progress, "finished"), false)]
    #[case(FilterDescriptor { group: Some(FilterGroup::Abridged), value: None }, false)]
    fn test_compile_for_podcasts(#[case] descriptor: FilterDescriptor, #[case] applies: bool) {
        assert_eq!(descriptor.compile(MediaType::Podcast).is_some(), applies);
    }
}
