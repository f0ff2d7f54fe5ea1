//! Per-user visibility rules, expressed as SQL conditions on the media row.

use crate::request::UserPermissions;
use sqlx::{QueryBuilder, Sqlite};
use tome_catalog::json_list;

#[derive(Debug, Clone, PartialEq, Eq)]
enum TagRule {
    /// Only media carrying at least one of these tags.
    Allow(Vec<String>),
    /// No media carrying any of these tags.
    Deny(Vec<String>),
}

/// The restriction a user's permissions impose on every listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionPredicate {
    exclude_explicit: bool,
    tags: Option<TagRule>,
}

impl PermissionPredicate {
    /// Build the predicate for a user.
    ///
    /// Without a permission descriptor the predicate fails closed: explicit
    /// media is hidden.
    pub fn for_user(user: Option<&UserPermissions>) -> Self {
        let Some(user) = user else {
            return Self { exclude_explicit: true, tags: None };
        };
        let tags = (!user.access_all_tags && !user.item_tags_selected.is_empty()).then(|| {
            let mut tags = user.item_tags_selected.clone();
            tags.sort();
            tags.dedup();
            if user.selected_tags_not_accessible { TagRule::Deny(tags) } else { TagRule::Allow(tags) }
        });
        Self { exclude_explicit: !user.can_access_explicit_content, tags }
    }

    /// Whether the predicate admits every media row.
    pub fn is_unrestricted(&self) -> bool {
        !self.exclude_explicit && self.tags.is_none()
    }

    /// Append the conditions, each prefixed with `AND`. Expects the media
    /// table aliased as `m`.
    pub(crate) fn push_conditions(&self, qb: &mut QueryBuilder<'static, Sqlite>) {
        if self.exclude_explicit {
            qb.push(" AND m.explicit = 0");
        }
        let (negate, tags) = match &self.tags {
            None => return,
            Some(TagRule::Allow(tags)) => ("", tags),
            Some(TagRule::Deny(tags)) => ("NOT ", tags),
        };
        qb.push(format_args!(
            " AND {negate}EXISTS (SELECT 1 FROM json_each(m.tags) t WHERE t.value IN (SELECT value FROM json_each("
        ));
        qb.push_bind(json_list(tags));
        qb.push(")))");
    }
}
