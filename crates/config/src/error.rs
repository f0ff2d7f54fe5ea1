//! Config Error Types
//!
//! Same shape as every other crate in the workspace: an `exn` tree wrapping
//! an actionable [`ErrorKind`].

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The configuration file exists but could not be read or parsed, or a
    /// value has the wrong type.
    #[display("invalid configuration")]
    Invalid,
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// A value parsed fine but is out of range.
    #[display("invalid configuration value for {_0}")]
    OutOfRange(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
