//! Index maintenance over document mutations
//!
//! The owning table calls `insert`/`remove`/`update` after each mutation;
//! lookups run against the B+ tree without touching documents.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::btree::BPlusTree;
use crate::config::Options;
use crate::node::Node;
use crate::value::Value;

use super::errors::{IndexError, IndexResult};
use super::ordinal_cmp;

/// Composite keys always join with a comma, independent of the snapshot
/// separator.
const KEY_SEPARATOR: char = ',';

/// User-supplied key comparator.
pub type Comparator = Rc<dyn Fn(&str, &str) -> Ordering>;

/// One secondary index: unique or multi, over one or more field paths.
pub struct Index {
    name: String,
    unique: bool,
    fields: Vec<String>,
    tree: BPlusTree<String, Vec<String>>,
    cmp: Option<Comparator>,
    left_cmp: Option<Comparator>,
}

impl Index {
    /// Build an empty index. `fields` must be non-empty; their declared
    /// order is the composite key order.
    pub fn new(
        name: impl Into<String>,
        unique: bool,
        fields: Vec<String>,
        cmp: Option<Comparator>,
        left_cmp: Option<Comparator>,
        order: usize,
    ) -> IndexResult<Self> {
        let name = name.into();
        if fields.is_empty() {
            return Err(IndexError::NoFields(name));
        }
        Ok(Self {
            name,
            unique,
            fields,
            tree: BPlusTree::new(order),
            cmp,
            left_cmp,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of distinct composite keys.
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Composite key for a document: the textual forms of the configured
    /// field values, in declared order, comma-joined. A missing or
    /// non-scalar field contributes the null sentinel.
    pub fn composite_key(&self, doc: &Node, opts: &Options) -> String {
        let mut key = String::new();
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            let text = doc
                .get::<Value>(field, opts)
                .filter(|v| !v.is_null())
                .map(|v| v.render(&opts.null_sentinel))
                .unwrap_or_else(|| opts.null_sentinel.clone());
            key.push_str(&text);
        }
        key
    }

    /// Probe key for queries: supplied argument values joined in field
    /// order. Fewer arguments than fields yield a prefix probe.
    pub fn probe_key(&self, args: &[&str]) -> String {
        args.join(&KEY_SEPARATOR.to_string())
    }

    /// A composite key is null when every configured field was missing or
    /// held an explicit null, so the key is nothing but joined sentinels.
    /// Such keys carry no record-identifying content and are rejected on
    /// insert, as is the empty key.
    fn is_null_key(&self, key: &str, opts: &Options) -> bool {
        if key.is_empty() {
            return true;
        }
        let all_sentinels =
            vec![opts.null_sentinel.as_str(); self.fields.len()].join(&KEY_SEPARATOR.to_string());
        key == all_sentinels
    }

    /// Key order comparator: the registered one, or ordinal compare.
    /// Cloned out of `self` so lookups can run beside tree mutation.
    fn order_cmp(&self) -> impl Fn(&String, &String) -> Ordering {
        let cmp = self.cmp.clone();
        move |a: &String, b: &String| match &cmp {
            Some(cmp) => cmp(a, b),
            None => ordinal_cmp(a, b),
        }
    }

    /// Prefix comparator: the registered one, or starts-with synthesized
    /// over the key order.
    fn prefix_cmp(&self) -> impl Fn(&String, &String) -> Ordering {
        let left_cmp = self.left_cmp.clone();
        let order = self.cmp.clone();
        move |stored: &String, probe: &String| match &left_cmp {
            Some(cmp) => cmp(stored, probe),
            None if stored.starts_with(probe.as_str()) => Ordering::Equal,
            None => match &order {
                Some(cmp) => cmp(stored, probe),
                None => ordinal_cmp(stored, probe),
            },
        }
    }

    // ----- mutation hooks ---------------------------------------------

    /// Register a record under its composite key. On a unique index a
    /// duplicate key is overwritten; on a multi index the id is appended.
    ///
    /// Precondition: at least one configured field must be present and
    /// non-null, otherwise the composite key is null and the insert is
    /// rejected.
    pub fn insert(&mut self, doc: &Node, id: &str, opts: &Options) -> IndexResult<()> {
        let key = self.composite_key(doc, opts);
        if self.is_null_key(&key, opts) {
            return Err(IndexError::NullKey(self.name.clone()));
        }
        let cmp = self.order_cmp();
        if self.unique {
            self.tree.insert(key, vec![id.to_string()], &cmp);
        } else if let Some(ids) = self.tree.find_mut(&key, &cmp) {
            ids.push(id.to_string());
        } else {
            self.tree.insert(key, vec![id.to_string()], &cmp);
        }
        Ok(())
    }

    /// Drop a record from its composite key; an emptied multi entry is
    /// removed outright.
    pub fn remove(&mut self, doc: &Node, id: &str, opts: &Options) {
        let key = self.composite_key(doc, opts);
        let cmp = self.order_cmp();
        if self.unique {
            self.tree.remove(&key, &cmp);
            return;
        }
        let emptied = match self.tree.find_mut(&key, &cmp) {
            Some(ids) => {
                if let Some(pos) = ids.iter().position(|x| x == id) {
                    ids.remove(pos);
                }
                ids.is_empty()
            }
            None => false,
        };
        if emptied {
            self.tree.remove(&key, &cmp);
        }
    }

    /// Re-key a record after a mutation. A no-op when the composite key
    /// did not change.
    pub fn update(&mut self, old: &Node, new: &Node, id: &str, opts: &Options) -> IndexResult<()> {
        let old_key = self.composite_key(old, opts);
        let new_key = self.composite_key(new, opts);
        if old_key == new_key {
            return Ok(());
        }
        self.remove(old, id, opts);
        self.insert(new, id, opts)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    // ----- lookups ----------------------------------------------------

    /// Exact lookup: record ids stored under the probe key.
    pub fn find(&self, args: &[&str]) -> Vec<String> {
        let key = self.probe_key(args);
        let cmp = self.order_cmp();
        self.tree.find(&key, &cmp).cloned().unwrap_or_default()
    }

    /// Prefix lookup: record ids of every key starting with the probe,
    /// in ascending key order.
    pub fn left_find(&self, args: &[&str]) -> Vec<String> {
        let probe = self.probe_key(args);
        let cmp = self.prefix_cmp();
        self.tree
            .left_find(&probe, &cmp)
            .into_iter()
            .flat_map(|ids| ids.iter().cloned())
            .collect()
    }

    /// Inclusive range lookup over `[lo, hi]`. A caller-supplied
    /// comparator overrides the index order for this query.
    pub fn range_find(&self, lo: &str, hi: &str, cmp: Option<&Comparator>) -> Vec<String> {
        let lo = lo.to_string();
        let hi = hi.to_string();
        let supplied = cmp.cloned();
        let order = self.order_cmp();
        let effective = move |a: &String, b: &String| match &supplied {
            Some(c) => c(a, b),
            None => order(a, b),
        };
        self.tree
            .range_find(&lo, &hi, &effective)
            .into_iter()
            .flat_map(|ids| ids.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::numeric_cmp;
    use crate::node::parse_node;

    fn doc(json: &str) -> Node {
        parse_node(None, json, &Options::default()).unwrap()
    }

    fn name_index(unique: bool) -> Index {
        Index::new("name", unique, vec!["name".into()], None, None, 10).unwrap()
    }

    #[test]
    fn test_composite_key_joins_fields() {
        let opts = Options::default();
        let idx = Index::new(
            "name_sex",
            false,
            vec!["name".into(), "sex".into()],
            None,
            None,
            10,
        )
        .unwrap();
        let d = doc(r#"{"name":"张三","sex":"male"}"#);
        assert_eq!(idx.composite_key(&d, &opts), "张三,male");
    }

    #[test]
    fn test_missing_field_uses_sentinel() {
        let opts = Options::default();
        let idx = Index::new(
            "name_sex",
            false,
            vec!["name".into(), "sex".into()],
            None,
            None,
            10,
        )
        .unwrap();
        let d = doc(r#"{"name":"张三"}"#);
        assert_eq!(idx.composite_key(&d, &opts), "张三,__null__");
    }

    #[test]
    fn test_null_key_rejected() {
        let opts = Options::default();
        let mut idx = name_index(false);

        // Indexed field absent entirely.
        assert!(matches!(
            idx.insert(&doc(r#"{"age":1}"#), "id1", &opts),
            Err(IndexError::NullKey(_))
        ));
        // Indexed field holds an explicit null.
        assert!(matches!(
            idx.insert(&doc(r#"{"name":null}"#), "id2", &opts),
            Err(IndexError::NullKey(_))
        ));
        assert_eq!(idx.key_count(), 0);
    }

    #[test]
    fn test_all_null_composite_rejected() {
        let opts = Options::default();
        let mut idx = Index::new(
            "name_sex",
            false,
            vec!["name".into(), "sex".into()],
            None,
            None,
            10,
        )
        .unwrap();

        // Every configured field missing: the key is joined sentinels.
        assert!(matches!(
            idx.insert(&doc(r#"{"age":1}"#), "id1", &opts),
            Err(IndexError::NullKey(_))
        ));

        // One present field is enough to make the key real.
        idx.insert(&doc(r#"{"name":"张三"}"#), "id2", &opts).unwrap();
        assert_eq!(idx.find(&["张三", "__null__"]), vec!["id2"]);
    }

    #[test]
    fn test_unique_latest_wins() {
        let opts = Options::default();
        let mut idx = name_index(true);
        idx.insert(&doc(r#"{"name":"a"}"#), "id1", &opts).unwrap();
        idx.insert(&doc(r#"{"name":"a"}"#), "id2", &opts).unwrap();
        assert_eq!(idx.find(&["a"]), vec!["id2"]);
    }

    #[test]
    fn test_multi_appends_and_removes() {
        let opts = Options::default();
        let mut idx = name_index(false);
        let d1 = doc(r#"{"name":"a"}"#);
        let d2 = doc(r#"{"name":"a"}"#);
        idx.insert(&d1, "id1", &opts).unwrap();
        idx.insert(&d2, "id2", &opts).unwrap();
        assert_eq!(idx.find(&["a"]), vec!["id1", "id2"]);

        idx.remove(&d1, "id1", &opts);
        assert_eq!(idx.find(&["a"]), vec!["id2"]);

        idx.remove(&d2, "id2", &opts);
        assert!(idx.find(&["a"]).is_empty());
        assert_eq!(idx.key_count(), 0);
    }

    #[test]
    fn test_update_rekeys_only_on_change() {
        let opts = Options::default();
        let mut idx = name_index(false);
        let old = doc(r#"{"name":"a"}"#);
        idx.insert(&old, "id1", &opts).unwrap();

        let same = doc(r#"{"name":"a"}"#);
        idx.update(&old, &same, "id1", &opts).unwrap();
        assert_eq!(idx.find(&["a"]), vec!["id1"]);

        let renamed = doc(r#"{"name":"b"}"#);
        idx.update(&old, &renamed, "id1", &opts).unwrap();
        assert!(idx.find(&["a"]).is_empty());
        assert_eq!(idx.find(&["b"]), vec!["id1"]);
    }

    #[test]
    fn test_left_find_raw_prefix() {
        let opts = Options::default();
        let mut idx = Index::new(
            "name_sex",
            false,
            vec!["name".into(), "sex".into()],
            None,
            None,
            10,
        )
        .unwrap();
        idx.insert(&doc(r#"{"name":"张三1","sex":"male"}"#), "id1", &opts)
            .unwrap();
        idx.insert(&doc(r#"{"name":"张三2","sex":"female"}"#), "id2", &opts)
            .unwrap();

        let both = idx.left_find(&["张三"]);
        assert_eq!(both.len(), 2);
        assert_eq!(idx.left_find(&["张三1"]), vec!["id1"]);
        assert!(idx.left_find(&["李四"]).is_empty());
    }

    #[test]
    fn test_range_with_numeric_comparator() {
        let opts = Options::default();
        let cmp: Comparator = Rc::new(numeric_cmp);
        let mut idx = Index::new(
            "age",
            false,
            vec!["age".into()],
            Some(cmp),
            None,
            10,
        )
        .unwrap();
        for (id, age) in [("a", 10), ("b", 12), ("c", 15), ("d", 20), ("e", 25)] {
            idx.insert(&doc(&format!(r#"{{"age":{}}}"#, age)), id, &opts)
                .unwrap();
        }
        assert_eq!(idx.range_find("12", "20", None), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_no_fields_rejected() {
        assert!(Index::new("bad", false, Vec::new(), None, None, 10).is_err());
    }
}
