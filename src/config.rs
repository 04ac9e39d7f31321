//! Runtime options for jsondb
//!
//! Options are carried as an explicit context object and threaded through
//! node, table, and snapshot operations. There is no ambient global state:
//! two tables with different options coexist in one process.

use serde::{Deserialize, Serialize};

/// Default field separator for the value codec and snapshot lines.
pub const DEFAULT_SEPARATOR: char = ',';

/// Literal written in place of an absent value or key.
pub const DEFAULT_NULL_SENTINEL: &str = "__null__";

/// Default B+ tree order.
pub const DEFAULT_BTREE_ORDER: usize = 10;

/// Runtime configuration shared by the node model, table, and snapshot codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Options {
    /// Keep object children in ascending ordinal key order.
    pub sort: bool,
    /// Binary-search object children by key. Only effective together with
    /// `sort`; lookups fall back to linear scan otherwise.
    pub binary_search: bool,
    /// Treat each path segment as findable at any descendant depth instead
    /// of strictly one child per segment.
    pub recursive_mode: bool,
    /// Build lazy child nodes when parsing JSON; subtrees materialize on
    /// first structural access.
    pub enable_lazy: bool,
    /// Field separator used by the value codec and the snapshot format.
    /// Reserved: string payloads containing it are escaped on write.
    pub separator: char,
    /// Literal standing in for an absent value or key in snapshot lines.
    pub null_sentinel: String,
    /// Order of the B+ trees backing secondary indexes. Rounded down to an
    /// even number, minimum 4.
    pub btree_order: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            sort: false,
            binary_search: false,
            recursive_mode: false,
            enable_lazy: false,
            separator: DEFAULT_SEPARATOR,
            null_sentinel: DEFAULT_NULL_SENTINEL.to_string(),
            btree_order: DEFAULT_BTREE_ORDER,
        }
    }
}

impl Options {
    /// Options with sorted object children and binary search enabled.
    pub fn sorted() -> Self {
        Self {
            sort: true,
            binary_search: true,
            ..Self::default()
        }
    }

    /// Options with lazy subtree parsing enabled.
    pub fn lazy() -> Self {
        Self {
            enable_lazy: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Options::default();
        assert!(!opts.sort);
        assert!(!opts.recursive_mode);
        assert_eq!(opts.separator, ',');
        assert_eq!(opts.null_sentinel, "__null__");
        assert_eq!(opts.btree_order, 10);
    }

    #[test]
    fn test_sorted_preset() {
        let opts = Options::sorted();
        assert!(opts.sort);
        assert!(opts.binary_search);
    }
}
