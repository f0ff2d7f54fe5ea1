//! Query Error Types

use derive_more::{Display, Error};

/// A query error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for query operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The filter token could not be decoded; the request must be fixed.
    #[display("malformed filter value: {_0}")]
    Decode(#[error(not(source))] String),
    #[display("library not found: ({_0})")]
    LibraryNotFound(#[error(not(source))] String),
    #[display("catalog error")]
    Database,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Returns `true` if the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::LibraryNotFound(_))
    }
}
