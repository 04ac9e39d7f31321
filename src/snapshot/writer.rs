//! Snapshot writer
//!
//! Depth-first pre-order walk over the tree, one line per node. The write
//! goes straight to the target path; a failure partway leaves a corrupt
//! file (there is no atomic rename).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::config::Options;
use crate::node::{Node, NodeKind};
use crate::value::{encode_value, escape, Value};

use super::errors::SnapshotResult;

/// Serialize a tree rooted at `root` to `path`, gzip-compressed when
/// `compress` is set (fastest level).
pub fn write_snapshot(
    root: &Node,
    path: &Path,
    compress: bool,
    opts: &Options,
) -> SnapshotResult<()> {
    let file = File::create(path)?;
    if compress {
        let mut sink = GzEncoder::new(BufWriter::new(file), Compression::fast());
        write_tree(&mut sink, root, 0, opts)?;
        sink.finish()?.flush()?;
    } else {
        let mut sink = BufWriter::new(file);
        write_tree(&mut sink, root, 0, opts)?;
        sink.flush()?;
    }
    debug!(path = %path.display(), compress, "snapshot written");
    Ok(())
}

fn write_tree<W: Write>(
    sink: &mut W,
    node: &Node,
    depth: usize,
    opts: &Options,
) -> SnapshotResult<()> {
    let sep = opts.separator;
    let mut line = String::new();
    line.push_str(&depth.to_string());
    line.push(sep);
    line.push_str(&node.kind().code().to_string());
    line.push(sep);
    match node.key() {
        Some(key) => line.push_str(&escape(&key, sep)),
        None => line.push_str(&opts.null_sentinel),
    }

    match node.kind() {
        NodeKind::Scalar => {
            line.push(sep);
            let value = node.value().unwrap_or(Value::Null);
            encode_value(&mut line, &value, sep, &opts.null_sentinel);
        }
        NodeKind::ValueArray => {
            let (elem, values) = node.values().unwrap_or((None, Vec::new()));
            line.push(sep);
            line.push(elem.map(|k| k.tag()).unwrap_or('2'));
            for value in &values {
                line.push(sep);
                match value {
                    Value::Null => line.push_str(&opts.null_sentinel),
                    Value::Str(s) => line.push_str(&escape(s, sep)),
                    other => line.push_str(&other.render(&opts.null_sentinel)),
                }
            }
        }
        NodeKind::LazyObject | NodeKind::LazyArray => {
            let raw = node
                .lazy_element()
                .map(|e| e.to_string())
                .unwrap_or_default();
            line.push(sep);
            line.push('2');
            line.push(sep);
            line.push_str(&escape(&raw, sep));
        }
        // Containers end after the key; children follow on deeper lines.
        NodeKind::Object | NodeKind::ObjectArray => {}
    }

    sink.write_all(line.as_bytes())?;
    sink.write_all(b"\n")?;

    if matches!(node.kind(), NodeKind::Object | NodeKind::ObjectArray) {
        for child in node.children() {
            write_tree(sink, &child, depth + 1, opts)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::parse_node;
    use tempfile::TempDir;

    #[test]
    fn test_line_layout() {
        let opts = Options::default();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.db");

        let root = Node::object(None);
        let doc = parse_node(None, r#"{"name":"a,b","age":7,"tags":[1,2]}"#, &opts).unwrap();
        let arr = Node::object_array(Some("rows"));
        arr.add_element(doc, &opts).unwrap();
        root.add_child(arr, &opts).unwrap();

        write_snapshot(&root, &path, false, &opts).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "0,1,__null__");
        assert_eq!(lines[1], "1,3,rows");
        assert_eq!(lines[2], "2,1,__null__");
        assert_eq!(lines[3], "3,0,name,2,a\\,b");
        assert_eq!(lines[4], "3,0,age,3,7");
        assert_eq!(lines[5], "3,2,tags,3,1,2");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_lazy_line_holds_raw_json() {
        let opts = Options::lazy();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.db");

        let root = parse_node(None, r#"{"inner":{"a":1}}"#, &opts).unwrap();
        write_snapshot(&root, &path, false, &opts).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "1,4,inner,2,{\"a\":1}");
    }

    #[test]
    fn test_compressed_output_is_gzip() {
        let opts = Options::default();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.db.gz");

        let root = Node::object(None);
        write_snapshot(&root, &path, true, &opts).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }
}
