//! SQLite catalog store for tome media libraries.
//!
//! The catalog is the relational record of every library, its items and the
//! media they own:
//!
//! - **Libraries** hold either books or podcasts, plus display settings.
//! - **Library items** own exactly one media record (a book or a podcast).
//! - **Books** link to authors and series; series memberships carry a
//!   free-form sequence.
//! - **Media progress** and **feeds** are written by collaborators and only
//!   read here.
//!
//! This crate owns the schema, the connection pool and the row/model types.
//! Reads for a request go through a [`Snapshot`].

mod collation;
mod db;
pub mod error;
pub mod models;
mod snapshot;

pub use crate::collation::COLLATION;
pub use crate::db::Database;
pub use crate::snapshot::{Snapshot, json_list};
