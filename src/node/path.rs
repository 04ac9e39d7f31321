//! Dotted-path navigation
//!
//! A path is a dot-separated sequence of segments. A plain segment matches
//! an object child by key; a `$N` segment is a 1-based index into an array
//! payload. Navigation is strictly one child per segment unless the
//! `recursive_mode` option is set, in which case each segment may match at
//! any descendant depth.

use crate::config::Options;
use crate::node::{Node, NodeKind};

/// Outcome of path resolution. Value-array elements are not nodes, so they
/// resolve to the holding array plus a 0-based element index.
pub(crate) enum Target {
    Node(Node),
    Element { array: Node, index: usize },
}

/// Parse a `$N` segment into a 1-based index.
fn parse_index(segment: &str) -> Option<usize> {
    let n = segment.strip_prefix('$')?.parse::<usize>().ok()?;
    (n >= 1).then_some(n)
}

/// Resolve `path` starting at `start`. The empty path resolves to the
/// start node itself. Any missing segment yields `None`.
pub(crate) fn resolve(start: &Node, path: &str, opts: &Options) -> Option<Target> {
    if path.is_empty() {
        return Some(Target::Node(start.clone()));
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    if opts.recursive_mode {
        resolve_recursive(start, &segments, 0, opts)
    } else {
        resolve_loop(start, &segments, opts)
    }
}

fn resolve_loop(start: &Node, segments: &[&str], opts: &Options) -> Option<Target> {
    let mut curr = start.clone();
    let mut index = 0;
    loop {
        let segment = segments[index];
        let terminal = index + 1 == segments.len();
        match curr.kind() {
            NodeKind::Scalar => {
                // A scalar can only satisfy a terminal segment naming itself.
                return (terminal && curr.key().as_deref() == Some(segment))
                    .then(|| Target::Node(curr.clone()));
            }
            NodeKind::Object | NodeKind::LazyObject => {
                let child = curr.find_child(segment, opts)?;
                if terminal {
                    return Some(Target::Node(child));
                }
                curr = child;
            }
            NodeKind::ValueArray => {
                let n = parse_index(segment)?;
                if n > curr.len() || !terminal {
                    return None;
                }
                return Some(Target::Element {
                    array: curr.clone(),
                    index: n - 1,
                });
            }
            NodeKind::ObjectArray | NodeKind::LazyArray => {
                if curr.kind() == NodeKind::LazyArray {
                    curr.materialize(opts).ok()?;
                    continue;
                }
                let n = parse_index(segment)?;
                let children = curr.children();
                let element = children.get(n - 1)?.clone();
                if terminal {
                    return Some(Target::Node(element));
                }
                curr = element;
            }
        }
        index += 1;
    }
}

fn resolve_recursive(
    node: &Node,
    segments: &[&str],
    mut index: usize,
    opts: &Options,
) -> Option<Target> {
    if index >= segments.len() {
        return Some(Target::Node(node.clone()));
    }
    let segment = segments[index];
    let terminal = index + 1 == segments.len();

    if node.key().as_deref() == Some(segment) {
        if terminal {
            return Some(Target::Node(node.clone()));
        }
        index += 1;
    }

    // Positional segments address this node's own array payload.
    if let Some(n) = parse_index(segments[index]) {
        if node.kind() == NodeKind::LazyArray {
            node.materialize(opts).ok()?;
        }
        match node.kind() {
            NodeKind::ValueArray => {
                if index + 1 == segments.len() && n <= node.len() {
                    return Some(Target::Element {
                        array: node.clone(),
                        index: n - 1,
                    });
                }
                return None;
            }
            NodeKind::ObjectArray => {
                let children = node.children();
                let element = children.get(n - 1)?;
                if index + 1 == segments.len() {
                    return Some(Target::Node(element.clone()));
                }
                return resolve_recursive(element, segments, index + 1, opts);
            }
            _ => {}
        }
    }

    node.materialize(opts).ok()?;
    for child in node.children() {
        if let Some(hit) = resolve_recursive(&child, segments, index, opts) {
            return Some(hit);
        }
    }
    None
}
