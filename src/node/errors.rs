//! Node model error types

use thiserror::Error;

use crate::value::ValueKind;

/// Result type for node operations
pub type NodeResult<T> = Result<T, NodeError>;

/// Errors raised by node mutation and parsing
#[derive(Debug, Error)]
pub enum NodeError {
    /// Operation expects a specific node kind
    #[error("expected {expected} node, found {found}")]
    ShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Path navigation failed to reach a node
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// Value array elements must share one primitive type
    #[error("value array holds {existing:?} elements, cannot insert {incoming:?}")]
    HeterogeneousElement {
        existing: ValueKind,
        incoming: Option<ValueKind>,
    },

    /// Operation has no meaning for this node kind
    #[error("{op} is not supported on a {kind} node")]
    Unsupported { op: &'static str, kind: &'static str },

    /// JSON text rejected by the parser
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// JSON text parsed but has the wrong top-level shape
    #[error("expected a JSON {expected}")]
    JsonShape { expected: &'static str },
}

impl NodeError {
    pub(crate) fn shape(expected: &'static str, found: &'static str) -> Self {
        NodeError::ShapeMismatch { expected, found }
    }

    pub(crate) fn unsupported(op: &'static str, kind: &'static str) -> Self {
        NodeError::Unsupported { op, kind }
    }
}
