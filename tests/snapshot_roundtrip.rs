//! Snapshot Round-Trip Tests
//!
//! load(serialize(t)) must reproduce the table exactly: same ids, same
//! record order, same per-field values, for both plain and gzip files.

use std::rc::Rc;

use jsondb::index::{numeric_cmp, Comparator};
use jsondb::{Options, Table};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn populated_table() -> Table {
    let mut t = Table::create("students");
    t.insert(r#"{"name":"张三","age":10,"tags":[1,2,3]}"#).unwrap();
    t.insert(r#"{"name":"李四","age":15,"note":"a,b\nc"}"#).unwrap();
    t.insert(r#"{"name":"王五","age":20,"job":{"title":"dev"}}"#)
        .unwrap();
    t
}

fn assert_tables_equal(a: &Table, b: &Table) {
    assert_eq!(a.len(), b.len());
    assert_eq!(a.ids(), b.ids());
    for pos in 1..=a.len() {
        let left = a.get_at(pos).unwrap();
        let right = b.get_at(pos).unwrap();
        assert_eq!(left.to_json(), right.to_json());
    }
}

// =============================================================================
// Round-Trip Laws
// =============================================================================

/// Plain and compressed snapshots both reproduce the table.
#[test]
fn test_round_trip_both_compressions() {
    let dir = TempDir::new().unwrap();
    let t = populated_table();

    for (compress, file) in [(false, "plain.db"), (true, "packed.db")] {
        let path = dir.path().join(file);
        t.serialize(&path, compress).unwrap();

        let mut restored = Table::create("students");
        restored.load(&path, compress).unwrap();
        assert_tables_equal(&t, &restored);
    }
}

/// A mutation history (insert, update, path set, delete) survives the trip.
#[test]
fn test_round_trip_after_mutations() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("s.db");

    let mut t = populated_table();
    let ids = t.ids();
    t.update(&ids[0], r#"{"name":"张三","age":11}"#).unwrap();
    t.set_path(&ids[1], "age", 16i64).unwrap();
    t.delete(&ids[2]).unwrap();
    t.insert(r#"{"name":"赵六","age":30}"#).unwrap();

    t.serialize(&path, true).unwrap();
    let mut restored = Table::create("students");
    restored.load(&path, true).unwrap();

    assert_tables_equal(&t, &restored);
    let doc = restored.get(&ids[1]).unwrap();
    assert_eq!(doc.get::<i64>("age", restored.options()).unwrap(), 16);
    assert!(restored.get(&ids[2]).is_none());
}

/// Registered indexes answer identically after a load.
#[test]
fn test_indexes_rebuilt_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("s.db");

    let mut t = Table::create("students");
    let cmp: Comparator = Rc::new(numeric_cmp);
    t.add_index_with("age", false, Some(cmp.clone()), None, &["age"])
        .unwrap();
    for age in [10i64, 12, 15, 20, 25] {
        t.insert(&format!(r#"{{"age":{}}}"#, age)).unwrap();
    }
    t.serialize(&path, false).unwrap();

    let mut restored = Table::create("students");
    restored
        .add_index_with("age", false, Some(cmp), None, &["age"])
        .unwrap();
    restored.load(&path, false).unwrap();

    let hits = restored.range_find("age", "12", "20").unwrap();
    let ages: Vec<i64> = hits
        .iter()
        .map(|d| d.get::<i64>("age", restored.options()).unwrap())
        .collect();
    assert_eq!(ages, vec![12, 15, 20]);
}

/// Lazy subtrees written as raw JSON come back lazy and still resolve.
#[test]
fn test_lazy_nodes_survive_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("s.db");

    let mut t = Table::create_with("students", Options::lazy());
    t.insert(r#"{"name":"a","profile":{"city":"西安","zip":"710000"}}"#)
        .unwrap();
    t.serialize(&path, false).unwrap();

    let mut restored = Table::create_with("students", Options::lazy());
    restored.load(&path, false).unwrap();
    assert_eq!(
        restored
            .get_node("$1.profile.city")
            .and_then(|n| n.get::<String>("", restored.options())),
        Some("西安".to_string())
    );
}

/// Separator characters inside strings survive via escaping.
#[test]
fn test_separator_heavy_strings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("s.db");

    let mut t = Table::create("t");
    t.insert(r#"{"csv":"a,b,c","path":"x\\y","text":"line1\nline2"}"#)
        .unwrap();
    t.serialize(&path, false).unwrap();

    let mut restored = Table::create("t");
    restored.load(&path, false).unwrap();
    let doc = restored.get_at(1).unwrap();
    assert_eq!(doc.get::<String>("csv", restored.options()).unwrap(), "a,b,c");
    assert_eq!(doc.get::<String>("path", restored.options()).unwrap(), "x\\y");
    assert_eq!(
        doc.get::<String>("text", restored.options()).unwrap(),
        "line1\nline2"
    );
}

/// parse(to_json(tree)) reproduces the tree's JSON rendering.
#[test]
fn test_to_json_parse_round_trip() {
    let t = populated_table();
    for pos in 1..=t.len() {
        let doc = t.get_at(pos).unwrap();
        let rendered = doc.to_json();
        let reparsed = jsondb::parse_node(None, &rendered, t.options()).unwrap();
        assert_eq!(reparsed.to_json(), rendered);
    }
}

/// A table serialized under a sorted profile loads with file order intact
/// and sorting active again afterwards.
#[test]
fn test_sorted_table_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("s.db");

    let mut t = Table::create_with("t", Options::sorted());
    t.insert(r#"{"b":1,"a":2}"#).unwrap();
    t.serialize(&path, false).unwrap();

    let mut restored = Table::create_with("t", Options::sorted());
    restored.load(&path, false).unwrap();

    let doc = restored.get_at(1).unwrap();
    // Children were written sorted, and binary search still finds them.
    assert_eq!(doc.get::<i64>("a", restored.options()).unwrap(), 2);
    assert_eq!(doc.get::<i64>("b", restored.options()).unwrap(), 1);
    doc.add_entry("c", 3i64, restored.options()).unwrap();
    assert_eq!(doc.get::<i64>("c", restored.options()).unwrap(), 3);
}
