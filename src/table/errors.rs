//! Table error types

use thiserror::Error;

use crate::index::IndexError;
use crate::node::NodeError;
use crate::snapshot::SnapshotError;

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;

/// Errors raised by table operations.
///
/// Mutation errors leave the table in an unspecified state: a failed
/// insert or update may have touched some indexes and not others. Callers
/// should treat them as fatal for the table.
#[derive(Debug, Error)]
pub enum TableError {
    /// A lookup named an unregistered index
    #[error("unknown index: {0}")]
    UnknownIndex(String),

    /// An index name was registered twice
    #[error("index already exists: {0}")]
    IndexExists(String),

    /// No record carries the given id
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// The operation needs the other table mode (documents vs scalars)
    #[error("table {table:?} holds {holds}, operation needs {needs}")]
    WrongMode {
        table: String,
        holds: &'static str,
        needs: &'static str,
    },

    /// A record lost its `_id` field
    #[error("record has no _id")]
    MissingId,

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
