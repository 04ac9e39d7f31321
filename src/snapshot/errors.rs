//! Snapshot error types

use thiserror::Error;

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors raised while writing or reconstructing a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line violates the snapshot grammar; the load aborts and partial
    /// state is discarded.
    #[error("malformed snapshot line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    /// The file holds no lines at all
    #[error("snapshot file is empty")]
    Empty,
}

impl SnapshotError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        SnapshotError::MalformedLine {
            line,
            reason: reason.into(),
        }
    }
}
