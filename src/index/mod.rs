//! Secondary indexes over document fields
//!
//! An index maps a composite key, the comma-joined textual forms of the
//! configured field values, to record ids in a B+ tree. A unique index
//! keeps one id per key (latest insert wins); a multi index keeps a list.
//!
//! Comparator defaulting: ordinal string compare orders keys unless the
//! index was registered with its own order comparator. Prefix queries use
//! the registered prefix comparator, or a synthesized starts-with
//! comparator falling back to the index order.

mod errors;
mod manager;

pub use errors::{IndexError, IndexResult};
pub use manager::{Comparator, Index};

use std::cmp::Ordering;

/// Ordinal (byte-wise) string comparison; the default key order.
pub fn ordinal_cmp(a: &str, b: &str) -> Ordering {
    a.cmp(b)
}

/// Compare keys numerically when both parse, ordinally otherwise.
/// Useful for indexes over numeric fields, whose composite keys are text.
pub fn numeric_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}
