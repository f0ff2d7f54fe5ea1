//! Library listing queries over the tome catalog.
//!
//! A listing request names a library, an optional encoded filter token, a
//! sort key, pagination and the annotations the client wants. The engine
//! turns it into one snapshot-consistent read:
//!
//! - **Filtering**: the token is decoded into a [`Filter`], combined with the
//!   requesting user's [`PermissionPredicate`] into a single row predicate.
//! - **Collapsing**: optionally, books sharing a series are folded into one
//!   representative carrying a [`CollapsedSeries`] summary.
//! - **Sorting**: the requested key is resolved against the library and the
//!   filter into a deterministic `ORDER BY`.
//! - **Paging**: the page and its total are computed from the same
//!   predicate; unfiltered totals may come from a shared [`CountCache`].
//! - **Projecting**: items are eager-loaded with authors, series, feeds and
//!   progress, then shaped into [`LibraryItemAggregate`]s.

mod collapse;
mod count;
mod engine;
pub mod error;
mod executor;
mod filter;
mod permission;
mod predicate;
mod projector;
mod request;
mod sort;

pub use crate::collapse::{Collapse, CollapsedSeries};
pub use crate::count::{CountCache, CountKey};
pub use crate::engine::QueryEngine;
pub use crate::filter::{EbookFilter, Filter, FilterDescriptor, FilterGroup, MissingField, ProgressFilter, TrackCount};
pub use crate::permission::PermissionPredicate;
pub use crate::projector::{LibraryItemAggregate, Media, SeriesPosition};
pub use crate::request::{LibraryItemsPage, LibraryItemsRequest, UserPermissions};
pub use crate::sort::{ResolvedSort, SortContext, SortKey};
