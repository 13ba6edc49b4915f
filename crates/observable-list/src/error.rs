//! List error types.

use thiserror::Error;

/// Errors raised by list operations.
///
/// Bad indices are never errors: reads return `None` and mutators clamp or
/// ignore them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    /// The length was set to a negative value.
    #[error("Illegal length: {requested}")]
    IllegalLength { requested: isize },

    /// Proxy mode was requested over storage that is not dense.
    #[error("Unsupported proxy source: no value at index {index}")]
    UnsupportedProxySource { index: usize },
}

/// Result type for list operations.
pub type Result<T> = std::result::Result<T, ListError>;
