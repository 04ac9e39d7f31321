//! Snapshot reader
//!
//! Reconstructs a tree line by line against a stack of open containers.
//! The sort option is forced off for the duration of the load so children
//! come back in file order; any malformed line aborts the whole load.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::debug;

use crate::config::Options;
use crate::node::{Node, NodeKind};
use crate::value::{decode_value, unescape, ValueKind};

use super::errors::{SnapshotError, SnapshotResult};
use super::split_line;

/// Read a snapshot file back into a tree, returning the root node.
pub fn read_snapshot(path: &Path, compress: bool, opts: &Options) -> SnapshotResult<Node> {
    let file = File::open(path)?;
    let root = if compress {
        read_lines(BufReader::new(GzDecoder::new(file)), opts)
    } else {
        read_lines(BufReader::new(file), opts)
    }?;
    debug!(path = %path.display(), compress, "snapshot loaded");
    Ok(root)
}

fn read_lines<R: Read>(source: BufReader<R>, opts: &Options) -> SnapshotResult<Node> {
    // Children must come back in file order regardless of the caller's
    // sort setting; the caller's options resume after the load.
    let mut load_opts = opts.clone();
    load_opts.sort = false;
    let sep = load_opts.separator;

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    for (index, line) in source.lines().enumerate() {
        let lineno = index + 1;
        let line = line?;
        let tokens = split_line(&line, sep);
        if tokens.len() < 3 {
            return Err(SnapshotError::malformed(lineno, "fewer than 3 fields"));
        }

        let depth: usize = tokens[0]
            .parse()
            .map_err(|_| SnapshotError::malformed(lineno, "bad depth"))?;
        let kind = tokens[1]
            .parse::<u8>()
            .ok()
            .and_then(NodeKind::from_code)
            .ok_or_else(|| SnapshotError::malformed(lineno, "bad node kind"))?;
        let key = if tokens[2] == load_opts.null_sentinel {
            None
        } else {
            Some(
                unescape(&tokens[2], sep)
                    .map_err(|e| SnapshotError::malformed(lineno, e.to_string()))?,
            )
        };

        while stack.len() > depth {
            stack.pop();
        }
        if stack.len() != depth {
            return Err(SnapshotError::malformed(lineno, "depth skips a level"));
        }

        let node = build_node(kind, key.as_deref(), &tokens, lineno, &load_opts)?;

        match stack.last() {
            Some(parent) => match parent.kind() {
                NodeKind::Object => parent
                    .add_child(node.clone(), &load_opts)
                    .map_err(|e| SnapshotError::malformed(lineno, e.to_string()))?,
                NodeKind::ObjectArray => parent
                    .add_element(node.clone(), &load_opts)
                    .map_err(|e| SnapshotError::malformed(lineno, e.to_string()))?,
                other => {
                    return Err(SnapshotError::malformed(
                        lineno,
                        format!("{} node cannot hold children", other.as_str()),
                    ))
                }
            },
            None => {
                if root.is_some() {
                    return Err(SnapshotError::malformed(lineno, "second root"));
                }
                root = Some(node.clone());
            }
        }

        if matches!(kind, NodeKind::Object | NodeKind::ObjectArray) {
            stack.push(node);
        }
    }

    root.ok_or(SnapshotError::Empty)
}

fn build_node(
    kind: NodeKind,
    key: Option<&str>,
    tokens: &[String],
    lineno: usize,
    opts: &Options,
) -> SnapshotResult<Node> {
    let sep = opts.separator;
    match kind {
        NodeKind::Object => Ok(Node::object(key)),
        NodeKind::ObjectArray => Ok(Node::object_array(key)),
        NodeKind::Scalar => {
            let (tag, text) = value_columns(tokens, lineno)?;
            let value = decode_value(tag, text, sep, &opts.null_sentinel)
                .map_err(|e| SnapshotError::malformed(lineno, e.to_string()))?;
            Ok(Node::scalar(key, value))
        }
        NodeKind::ValueArray => {
            if tokens.len() < 4 {
                return Err(SnapshotError::malformed(lineno, "value array without element tag"));
            }
            let tag = single_char(&tokens[3], lineno)?;
            let elem = ValueKind::from_tag(tag)
                .ok_or_else(|| SnapshotError::malformed(lineno, "bad element tag"))?;
            let mut values = Vec::with_capacity(tokens.len().saturating_sub(4));
            for token in &tokens[4..] {
                let value = decode_value(tag, token, sep, &opts.null_sentinel)
                    .map_err(|e| SnapshotError::malformed(lineno, e.to_string()))?;
                values.push(value);
            }
            // A type is only established once a non-null element exists.
            let elem = values.iter().any(|v| !v.is_null()).then_some(elem);
            Ok(Node::value_array_of(key, elem, values))
        }
        NodeKind::LazyObject | NodeKind::LazyArray => {
            let (tag, text) = value_columns(tokens, lineno)?;
            if tag != '2' {
                return Err(SnapshotError::malformed(lineno, "lazy node without string tag"));
            }
            let raw = unescape(text, sep)
                .map_err(|e| SnapshotError::malformed(lineno, e.to_string()))?;
            let element: serde_json::Value = serde_json::from_str(&raw)
                .map_err(|e| SnapshotError::malformed(lineno, e.to_string()))?;
            match kind {
                NodeKind::LazyObject if element.is_object() => {
                    Ok(Node::lazy_object(key, element))
                }
                NodeKind::LazyArray if element.is_array() => Ok(Node::lazy_array(key, element)),
                _ => Err(SnapshotError::malformed(
                    lineno,
                    "lazy payload shape does not match node kind",
                )),
            }
        }
    }
}

fn value_columns<'a>(tokens: &'a [String], lineno: usize) -> SnapshotResult<(char, &'a str)> {
    if tokens.len() != 5 {
        return Err(SnapshotError::malformed(lineno, "expected 5 fields"));
    }
    Ok((single_char(&tokens[3], lineno)?, tokens[4].as_str()))
}

fn single_char(token: &str, lineno: usize) -> SnapshotResult<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch),
        _ => Err(SnapshotError::malformed(lineno, "expected 1-char tag")),
    }
}
