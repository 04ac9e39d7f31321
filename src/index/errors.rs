//! Index error types

use thiserror::Error;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors raised by secondary index maintenance
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    /// An index must cover at least one field
    #[error("index {0:?} declares no fields")]
    NoFields(String),

    /// Composite keys must be non-empty
    #[error("null key rejected by index {0:?}")]
    NullKey(String),
}
