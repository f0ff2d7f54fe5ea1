use serde::Deserialize;

/// What the requesting user may see, as supplied by the auth layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPermissions {
    pub user_id: String,
    pub can_access_explicit_content: bool,
    pub access_all_tags: bool,
    pub item_tags_selected: Vec<String>,
    /// Flips `item_tags_selected` from an allow-list into a deny-list.
    pub selected_tags_not_accessible: bool,
}

impl UserPermissions {
    /// A user that may see everything.
    pub fn unrestricted(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            can_access_explicit_content: true,
            access_all_tags: true,
            ..Self::default()
        }
    }
}

/// Listing parameters for one library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LibraryItemsRequest {
    pub library_id: String,
    pub user: Option<UserPermissions>,
    /// `group.base64value` or a bare keyword such as `issues`.
    pub filter_by: Option<String>,
    pub sort_by: Option<String>,
    pub sort_desc: bool,
    /// Ignored for podcast libraries.
    pub collapse_series: bool,
    pub include: Vec<String>,
    /// Page size. Zero means no limit; left unset, the engine's configured
    /// default applies.
    pub limit: Option<u32>,
    pub offset: u32,
}

impl LibraryItemsRequest {
    pub fn new(library_id: impl Into<String>, user: Option<UserPermissions>) -> Self {
        Self {
            library_id: library_id.into(),
            user,
            ..Self::default()
        }
    }

    pub(crate) fn includes(&self) -> Includes {
        Includes::parse(&self.include)
    }

    pub(crate) fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.user_id.as_str())
    }
}

/// Optional eager loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Includes {
    pub rss_feed: bool,
    pub num_episodes_incomplete: bool,
    pub progress: bool,
}

impl Includes {
    /// Names are case-insensitive, and each entry may itself be a
    /// comma-separated list as sent in a query string.
    fn parse(include: &[String]) -> Self {
        let mut includes = Self::default();
        for name in include.iter().flat_map(|entry| entry.split(',')) {
            match name.trim().to_ascii_lowercase().as_str() {
                "rssfeed" => includes.rss_feed = true,
                "numepisodesincomplete" => includes.num_episodes_incomplete = true,
                "progress" => includes.progress = true,
                _ => {},
            }
        }
        includes
    }
}

/// One page of library items plus the total across all pages.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItemsPage {
    pub library_items: Vec<crate::projector::LibraryItemAggregate>,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_includes_parse() {
        let includes = Includes::parse(&["RSSFeed,progress".to_string(), "bogus".to_string()]);
        assert!(includes.rss_feed);
        assert!(includes.progress);
        assert!(!includes.num_episodes_incomplete);
    }

    #[test]
    fn test_request_from_json() {
        let request: LibraryItemsRequest = serde_json::from_str(
            r#"{"libraryId":"lib","filterBy":"issues","sortDesc":true,"limit":10,"user":{"userId":"u1","accessAllTags":true}}"#,
        )
        .unwrap();
        assert_eq!(request.library_id, "lib");
        assert_eq!(request.filter_by.as_deref(), Some("issues"));
        assert!(request.sort_desc);
        assert_eq!(request.limit, Some(10));
        let user = request.user.unwrap();
        assert!(user.access_all_tags);
        assert!(!user.can_access_explicit_content);
    }

    #[test]
    fn test_limit_defaults_to_unset() {
        let request: LibraryItemsRequest = serde_json::from_str(r#"{"libraryId":"lib"}"#).unwrap();
        assert_eq!(request.limit, None);
        let request: LibraryItemsRequest = serde_json::from_str(r#"{"libraryId":"lib","limit":0}"#).unwrap();
        assert_eq!(request.limit, Some(0));
    }
}
