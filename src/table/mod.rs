//! Record container
//!
//! A table owns a root object whose single child, named after the table,
//! is the record array: an object array for JSON documents, or a value
//! array when the table stores bare scalars. Document records each carry a
//! generated `_id` scalar and sit in a primary id map beside any number of
//! secondary indexes.
//!
//! Mutations notify every registered index. Path mutations clone the
//! record first so indexes can compare the prior composite key against the
//! new one. A mutation error leaves the table in an unspecified state and
//! should be treated as fatal.
//!
//! Operations are synchronous and run to completion; the table is not
//! internally synchronized.

mod errors;

pub use errors::{TableError, TableResult};

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;
use uuid::Uuid;

use crate::config::Options;
use crate::index::{Comparator, Index};
use crate::node::{parse_node, Node, NodeKind};
use crate::query::Predicate;
use crate::snapshot::{read_snapshot, write_snapshot};
use crate::value::{FromValue, Value};

/// An in-memory table of JSON documents (or scalars) with secondary
/// indexes and snapshot persistence.
pub struct Table {
    name: String,
    options: Options,
    root: Node,
    table_node: Option<Node>,
    main_table: HashMap<String, Node>,
    indexes: HashMap<String, Index>,
}

impl Table {
    /// Create an empty table. The record array is allocated lazily on the
    /// first insert, which decides between document and scalar mode.
    pub fn create(name: impl Into<String>) -> Self {
        Self::create_with(name, Options::default())
    }

    /// Create an empty table with explicit runtime options.
    pub fn create_with(name: impl Into<String>, options: Options) -> Self {
        Self {
            name: name.into(),
            options,
            root: Node::object(None),
            table_node: None,
            main_table: HashMap::new(),
            indexes: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Root object holding the record array.
    pub fn root(&self) -> Node {
        self.root.clone()
    }

    /// The record array, if anything was ever inserted.
    pub fn table(&self) -> Option<Node> {
        self.table_node.clone()
    }

    /// Number of stored records (documents or scalars).
    pub fn len(&self) -> usize {
        self.table_node.as_ref().map_or(0, Node::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all stored documents, in record array order.
    pub fn ids(&self) -> Vec<String> {
        match &self.table_node {
            Some(table) if table.kind() == NodeKind::ObjectArray => table
                .children()
                .iter()
                .filter_map(|doc| doc.get::<Value>("_id", &self.options))
                .filter(|v| !v.is_null())
                .map(|v| v.as_string())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn doc_table(&mut self) -> TableResult<Node> {
        match &self.table_node {
            Some(table) => {
                if table.kind() != NodeKind::ObjectArray {
                    return Err(self.wrong_mode("scalars", "documents"));
                }
                Ok(table.clone())
            }
            None => {
                let table = Node::object_array(Some(&self.name));
                self.root.add_child(table.clone(), &self.options)?;
                self.table_node = Some(table.clone());
                Ok(table)
            }
        }
    }

    fn value_table(&mut self) -> TableResult<Node> {
        match &self.table_node {
            Some(table) => {
                if table.kind() != NodeKind::ValueArray {
                    return Err(self.wrong_mode("documents", "scalars"));
                }
                Ok(table.clone())
            }
            None => {
                let table = Node::value_array(Some(&self.name));
                self.root.add_child(table.clone(), &self.options)?;
                self.table_node = Some(table.clone());
                Ok(table)
            }
        }
    }

    fn wrong_mode(&self, holds: &'static str, needs: &'static str) -> TableError {
        TableError::WrongMode {
            table: self.name.clone(),
            holds,
            needs,
        }
    }

    fn record(&self, id: &str) -> TableResult<Node> {
        self.main_table
            .get(id)
            .cloned()
            .ok_or_else(|| TableError::RecordNotFound(id.to_string()))
    }

    fn record_id(&self, doc: &Node) -> TableResult<String> {
        doc.get::<Value>("_id", &self.options)
            .filter(|v| !v.is_null())
            .map(|v| v.as_string())
            .ok_or(TableError::MissingId)
    }

    // ----- indexes ----------------------------------------------------

    /// Register a secondary index with default (ordinal) comparators.
    /// Existing records are indexed before this returns.
    pub fn add_index(&mut self, name: &str, unique: bool, fields: &[&str]) -> TableResult<()> {
        self.add_index_with(name, unique, None, None, fields)
    }

    /// Register a secondary index with explicit order and prefix
    /// comparators. Existing records are indexed before this returns.
    pub fn add_index_with(
        &mut self,
        name: &str,
        unique: bool,
        cmp: Option<Comparator>,
        left_cmp: Option<Comparator>,
        fields: &[&str],
    ) -> TableResult<()> {
        if let Some(table) = &self.table_node {
            if table.kind() != NodeKind::ObjectArray {
                return Err(self.wrong_mode("scalars", "documents"));
            }
        }
        if self.indexes.contains_key(name) {
            return Err(TableError::IndexExists(name.to_string()));
        }
        let mut index = Index::new(
            name,
            unique,
            fields.iter().map(|f| f.to_string()).collect(),
            cmp,
            left_cmp,
            self.options.btree_order,
        )?;

        // Back-populate from whatever is already stored.
        let mut populated = 0usize;
        if let Some(table) = &self.table_node {
            for doc in table.children() {
                let id = self.record_id(&doc)?;
                index.insert(&doc, &id, &self.options)?;
                populated += 1;
            }
        }
        debug!(table = %self.name, index = name, unique, populated, "index registered");
        self.indexes.insert(name.to_string(), index);
        Ok(())
    }

    fn index(&self, name: &str) -> TableResult<&Index> {
        self.indexes
            .get(name)
            .ok_or_else(|| TableError::UnknownIndex(name.to_string()))
    }

    // ----- inserts ----------------------------------------------------

    /// Parse a JSON object and store it as a new record. A fresh UUID is
    /// assigned under `_id`; the stored node is returned.
    pub fn insert(&mut self, json: &str) -> TableResult<Node> {
        let doc = parse_node(None, json, &self.options)?;
        self.insert_node(doc)
    }

    /// Store an already-built object node as a new record.
    pub fn insert_node(&mut self, doc: Node) -> TableResult<Node> {
        let table = self.doc_table()?;
        let id = Uuid::new_v4().to_string();
        doc.add_entry("_id", id.as_str(), &self.options)?;
        doc.set_key(None);
        table.add_element(doc.clone(), &self.options)?;
        self.main_table.insert(id.clone(), doc.clone());
        for index in self.indexes.values_mut() {
            index.insert(&doc, &id, &self.options)?;
        }
        debug!(table = %self.name, id = %id, "record inserted");
        Ok(doc)
    }

    /// Append a bare scalar; scalar tables carry no ids and no indexes.
    pub fn insert_value(&mut self, value: impl Into<Value>) -> TableResult<()> {
        let table = self.value_table()?;
        table.add_value(value)?;
        Ok(())
    }

    /// Append several scalars at once.
    pub fn insert_values<T: Into<Value>>(
        &mut self,
        values: impl IntoIterator<Item = T>,
    ) -> TableResult<()> {
        for value in values {
            self.insert_value(value)?;
        }
        Ok(())
    }

    // ----- reads ------------------------------------------------------

    /// O(1) primary lookup by record id.
    pub fn get(&self, id: &str) -> Option<Node> {
        self.main_table.get(id).cloned()
    }

    /// Positional lookup (1-based) into the record array.
    pub fn get_at(&self, position: usize) -> Option<Node> {
        self.table_node
            .as_ref()?
            .get_node(&format!("${}", position), &self.options)
    }

    /// Positional scalar lookup (1-based) for value tables.
    pub fn get_value_at<T: FromValue>(&self, position: usize) -> Option<T> {
        self.table_node
            .as_ref()?
            .get::<T>(&format!("${}", position), &self.options)
    }

    /// Path lookup relative to the record array.
    pub fn get_node(&self, path: &str) -> Option<Node> {
        self.table_node.as_ref()?.get_node(path, &self.options)
    }

    /// Records matching a predicate, in record array order.
    pub fn filter(&self, predicate: &Predicate) -> Vec<Node> {
        match &self.table_node {
            Some(table) if table.kind() == NodeKind::ObjectArray => table
                .children()
                .into_iter()
                .filter(|doc| predicate(doc, &self.options))
                .collect(),
            _ => Vec::new(),
        }
    }

    // ----- index lookups ----------------------------------------------

    fn resolve_ids(&self, ids: Vec<String>) -> Vec<Node> {
        ids.iter()
            .filter_map(|id| self.main_table.get(id))
            .cloned()
            .collect()
    }

    /// Exact index lookup. A unique index yields at most one record.
    pub fn find(&self, index: &str, args: &[&str]) -> TableResult<Vec<Node>> {
        Ok(self.resolve_ids(self.index(index)?.find(args)))
    }

    /// Prefix index lookup in ascending key order.
    pub fn left_find(&self, index: &str, args: &[&str]) -> TableResult<Vec<Node>> {
        Ok(self.resolve_ids(self.index(index)?.left_find(args)))
    }

    /// Inclusive range lookup `[lo, hi]` under the index's key order.
    pub fn range_find(&self, index: &str, lo: &str, hi: &str) -> TableResult<Vec<Node>> {
        Ok(self.resolve_ids(self.index(index)?.range_find(lo, hi, None)))
    }

    /// Inclusive range lookup under a caller-supplied comparator.
    pub fn range_find_with(
        &self,
        index: &str,
        lo: &str,
        hi: &str,
        cmp: &Comparator,
    ) -> TableResult<Vec<Node>> {
        Ok(self.resolve_ids(self.index(index)?.range_find(lo, hi, Some(cmp))))
    }

    // ----- record mutation --------------------------------------------

    /// Replace a record wholesale with reparsed JSON, keeping its id.
    pub fn update(&mut self, id: &str, json: &str) -> TableResult<Node> {
        let doc = parse_node(None, json, &self.options)?;
        self.update_node(id, doc)
    }

    /// Replace a record wholesale with a prepared node, keeping its id.
    pub fn update_node(&mut self, id: &str, doc: Node) -> TableResult<Node> {
        let old = self.record(id)?;
        let table = self.doc_table()?;
        doc.add_entry("_id", id, &self.options)?;
        doc.set_key(None);
        table.replace_child(&old, doc.clone())?;
        for index in self.indexes.values_mut() {
            index.update(&old, &doc, id, &self.options)?;
        }
        self.main_table.insert(id.to_string(), doc.clone());
        debug!(table = %self.name, id = %id, "record replaced");
        Ok(doc)
    }

    /// Replace the record at a 1-based position.
    pub fn update_at(&mut self, position: usize, json: &str) -> TableResult<Node> {
        let doc = self
            .get_at(position)
            .ok_or_else(|| TableError::RecordNotFound(format!("${}", position)))?;
        let id = self.record_id(&doc)?;
        self.update(&id, json)
    }

    /// Apply `set` through a path on one record, re-keying indexes.
    pub fn set_path(
        &mut self,
        id: &str,
        path: &str,
        value: impl Into<Value>,
    ) -> TableResult<()> {
        let doc = self.record(id)?;
        let before = doc.deep_clone();
        doc.set(path, value, &self.options)?;
        self.reindex(id, &before, &doc)
    }

    /// Append a primitive to a value array inside one record.
    pub fn add_path(&mut self, id: &str, path: &str, value: impl Into<Value>) -> TableResult<()> {
        let doc = self.record(id)?;
        let before = doc.deep_clone();
        doc.append(path, value, &self.options)?;
        self.reindex(id, &before, &doc)
    }

    /// Add (or replace) a scalar entry on an object inside one record.
    pub fn add_entry_path(
        &mut self,
        id: &str,
        path: &str,
        key: &str,
        value: impl Into<Value>,
    ) -> TableResult<()> {
        let doc = self.record(id)?;
        let before = doc.deep_clone();
        doc.append_entry(path, key, value, &self.options)?;
        self.reindex(id, &before, &doc)
    }

    /// Parse JSON and append it to an object array inside one record.
    pub fn add_json_path(&mut self, id: &str, path: &str, json: &str) -> TableResult<()> {
        let doc = self.record(id)?;
        let before = doc.deep_clone();
        let target = doc
            .get_node(path, &self.options)
            .ok_or_else(|| TableError::RecordNotFound(path.to_string()))?;
        target.add_json(json, &self.options)?;
        self.reindex(id, &before, &doc)
    }

    /// Parse JSON and attach it under a key on an object inside one record.
    pub fn add_json_entry(
        &mut self,
        id: &str,
        path: &str,
        key: &str,
        json: &str,
    ) -> TableResult<()> {
        let doc = self.record(id)?;
        let before = doc.deep_clone();
        let target = doc
            .get_node(path, &self.options)
            .ok_or_else(|| TableError::RecordNotFound(path.to_string()))?;
        target.add_json_keyed(key, json, &self.options)?;
        self.reindex(id, &before, &doc)
    }

    fn reindex(&mut self, id: &str, before: &Node, after: &Node) -> TableResult<()> {
        for index in self.indexes.values_mut() {
            index.update(before, after, id, &self.options)?;
        }
        Ok(())
    }

    // ----- deletes ----------------------------------------------------

    /// Detach a record by id and drop it from every index.
    pub fn delete(&mut self, id: &str) -> TableResult<()> {
        let doc = self
            .main_table
            .remove(id)
            .ok_or_else(|| TableError::RecordNotFound(id.to_string()))?;
        if let Some(table) = &self.table_node {
            table.detach_child(&doc)?;
        }
        for index in self.indexes.values_mut() {
            index.remove(&doc, id, &self.options);
        }
        debug!(table = %self.name, id = %id, "record deleted");
        Ok(())
    }

    /// Detach a record by node handle.
    pub fn delete_node(&mut self, doc: &Node) -> TableResult<()> {
        let id = self.record_id(doc)?;
        self.delete(&id)
    }

    /// Remove the first matching scalar from a value table.
    pub fn delete_value(&mut self, value: impl Into<Value>) -> TableResult<()> {
        let table = self.value_table()?;
        let needle = value.into();
        let (_, values) = table.values().unwrap_or((None, Vec::new()));
        let pos = values
            .iter()
            .position(|v| *v == needle)
            .ok_or_else(|| TableError::RecordNotFound(needle.to_string()))?;
        table.remove(&format!("${}", pos + 1), &self.options)?;
        Ok(())
    }

    /// Drop every record and empty all registered indexes.
    pub fn clear(&mut self) {
        self.root = Node::object(None);
        self.table_node = None;
        self.main_table.clear();
        for index in self.indexes.values_mut() {
            index.clear();
        }
    }

    // ----- persistence ------------------------------------------------

    /// Dump the whole tree to a snapshot file. The write is not atomic:
    /// a failure partway leaves a corrupt file.
    pub fn serialize(&self, path: impl AsRef<Path>, compress: bool) -> TableResult<()> {
        write_snapshot(&self.root, path.as_ref(), compress, &self.options)?;
        Ok(())
    }

    /// Replace this table's contents with a snapshot. The primary map is
    /// rebuilt from stored `_id` fields and registered indexes are
    /// repopulated.
    pub fn load(&mut self, path: impl AsRef<Path>, compress: bool) -> TableResult<()> {
        let root = read_snapshot(path.as_ref(), compress, &self.options)?;
        let table_node = root.find_child(&self.name, &self.options);

        let mut main_table = HashMap::new();
        if let Some(table) = &table_node {
            if table.kind() == NodeKind::ObjectArray {
                for doc in table.children() {
                    let id = doc
                        .get::<Value>("_id", &self.options)
                        .filter(|v| !v.is_null())
                        .map(|v| v.as_string())
                        .ok_or(TableError::MissingId)?;
                    main_table.insert(id, doc);
                }
            }
        }

        self.root = root;
        self.table_node = table_node;
        self.main_table = main_table;

        // Registered indexes survive a load; rebuild their entries.
        let options = self.options.clone();
        for index in self.indexes.values_mut() {
            index.clear();
        }
        if let Some(table) = self.table_node.clone() {
            if table.kind() == NodeKind::ObjectArray {
                for doc in table.children() {
                    let id = doc
                        .get::<Value>("_id", &options)
                        .filter(|v| !v.is_null())
                        .map(|v| v.as_string())
                        .ok_or(TableError::MissingId)?;
                    for index in self.indexes.values_mut() {
                        index.insert(&doc, &id, &options)?;
                    }
                }
            }
        }
        debug!(table = %self.name, records = self.main_table.len(), "table loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query;

    #[test]
    fn test_insert_assigns_id() {
        let mut t = Table::create("students");
        let doc = t.insert(r#"{"name":"张三","age":1}"#).unwrap();
        let id = doc.get::<String>("_id", t.options()).unwrap();
        assert_eq!(id.len(), 36);
        assert!(t.get(&id).unwrap().same_node(&doc));
    }

    #[test]
    fn test_mode_is_exclusive() {
        let mut t = Table::create("t");
        t.insert(r#"{"a":1}"#).unwrap();
        assert!(matches!(
            t.insert_value(1i64),
            Err(TableError::WrongMode { .. })
        ));

        let mut v = Table::create("v");
        v.insert_values([1i64, 2, 3]).unwrap();
        assert!(matches!(v.insert(r#"{"a":1}"#), Err(TableError::WrongMode { .. })));
        assert_eq!(v.get_value_at::<i64>(2), Some(2));
    }

    #[test]
    fn test_update_preserves_id() {
        let mut t = Table::create("t");
        let doc = t.insert(r#"{"name":"a"}"#).unwrap();
        let id = doc.get::<String>("_id", t.options()).unwrap();

        let updated = t.update(&id, r#"{"name":"b"}"#).unwrap();
        assert_eq!(updated.get::<String>("_id", t.options()).unwrap(), id);
        assert_eq!(updated.get::<String>("name", t.options()).unwrap(), "b");
        assert_eq!(t.len(), 1);
        // Replacement kept the record's array position.
        assert!(t.get_at(1).unwrap().same_node(&updated));
    }

    #[test]
    fn test_delete_detaches_everywhere() {
        let mut t = Table::create("t");
        t.add_index("name", false, &["name"]).unwrap();
        let doc = t.insert(r#"{"name":"a"}"#).unwrap();
        let id = doc.get::<String>("_id", t.options()).unwrap();

        t.delete(&id).unwrap();
        assert!(t.get(&id).is_none());
        assert!(t.is_empty());
        assert!(t.find("name", &["a"]).unwrap().is_empty());
        assert!(matches!(t.delete(&id), Err(TableError::RecordNotFound(_))));
    }

    #[test]
    fn test_unknown_index_rejected() {
        let t = Table::create("t");
        assert!(matches!(
            t.find("nope", &["x"]),
            Err(TableError::UnknownIndex(_))
        ));
    }

    #[test]
    fn test_add_index_back_populates() {
        let mut t = Table::create("t");
        t.insert(r#"{"name":"a"}"#).unwrap();
        t.insert(r#"{"name":"b"}"#).unwrap();

        t.add_index("name", false, &["name"]).unwrap();
        assert_eq!(t.find("name", &["a"]).unwrap().len(), 1);
        assert_eq!(t.find("name", &["b"]).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_index_name_rejected() {
        let mut t = Table::create("t");
        t.add_index("name", false, &["name"]).unwrap();
        assert!(matches!(
            t.add_index("name", true, &["name"]),
            Err(TableError::IndexExists(_))
        ));
    }

    #[test]
    fn test_set_path_rekeys_index() {
        let mut t = Table::create("t");
        t.add_index("name", false, &["name"]).unwrap();
        let doc = t.insert(r#"{"name":"a"}"#).unwrap();
        let id = doc.get::<String>("_id", t.options()).unwrap();

        t.set_path(&id, "name", "z").unwrap();
        assert!(t.find("name", &["a"]).unwrap().is_empty());
        assert_eq!(t.find("name", &["z"]).unwrap().len(), 1);
    }

    #[test]
    fn test_filter_in_insertion_order() {
        let mut t = Table::create("t");
        for age in [10i64, 15, 20] {
            t.insert(&format!(r#"{{"age":{}}}"#, age)).unwrap();
        }
        let hits = t.filter(&query::ge("age", 15i64));
        let ages: Vec<i64> = hits
            .iter()
            .map(|d| d.get::<i64>("age", t.options()).unwrap())
            .collect();
        assert_eq!(ages, vec![15, 20]);
    }

    #[test]
    fn test_delete_value_splices() {
        let mut t = Table::create("v");
        t.insert_values([1i64, 2, 3]).unwrap();
        t.delete_value(2i64).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get_value_at::<i64>(2), Some(3));
        assert!(t.delete_value(9i64).is_err());
    }
}
