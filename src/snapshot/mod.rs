//! Snapshot codec
//!
//! A snapshot is a line-oriented dump of a document tree, one node per
//! LF-terminated UTF-8 line, optionally gzip-compressed. There is no
//! header and no version tag; the first line is the root.
//!
//! Line grammar (`SEP` is the configured separator):
//!
//! ```text
//! <depth><SEP><kind><SEP><key>[<SEP><value-kind><SEP><payload>]
//! ```
//!
//! - `depth` starts at 0 for the root and increments per descent.
//! - `kind` is the integer code of [`crate::node::NodeKind`].
//! - `key` is the node key, or the null sentinel at the root and for
//!   array elements.
//! - Scalars carry a tagged value; value arrays carry the element tag
//!   once and then every element; lazy nodes carry their raw JSON text
//!   under the string tag. Objects and object arrays end after the key,
//!   their children following on deeper lines.
//!
//! String payloads are escaped per [`crate::value::escape`], so the
//! separator and embedded newlines survive the trip.

mod errors;
mod reader;
mod writer;

pub use errors::{SnapshotError, SnapshotResult};
pub use reader::read_snapshot;
pub use writer::write_snapshot;

/// Split one line on unescaped separators, leaving each token escaped.
/// Tokens are unescaped individually by the consumer.
pub(crate) fn split_line(line: &str, separator: char) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            current.push(ch);
            if let Some(next) = chars.next() {
                current.push(next);
            }
        } else if ch == separator {
            tokens.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    tokens.push(current);
    tokens
}
