//! Document node model
//!
//! A document is a tree of [`Node`]s. Each node has an optional key, a weak
//! back-reference to its parent, and a kind-dependent payload:
//!
//! - `Scalar` holds one typed primitive.
//! - `Object` holds keyed child nodes, optionally kept in ascending ordinal
//!   key order (`sort` option) for binary search.
//! - `ValueArray` holds a homogeneous sequence of primitives; the element
//!   type is fixed by the first insertion.
//! - `ObjectArray` holds object (or lazy object) nodes.
//! - `LazyObject` / `LazyArray` hold an unconverted JSON element and
//!   materialize into the corresponding container on first structural
//!   access. Materialization happens once and preserves node identity.
//!
//! `Node` is a cheap handle: cloning it yields another reference to the same
//! tree position. [`Node::deep_clone`] copies the subtree.

mod errors;
mod json;
mod path;

pub use errors::{NodeError, NodeResult};
pub use json::{parse_array_node, parse_node};

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::config::Options;
use crate::value::{FromValue, Value, ValueKind};

use self::path::Target;

/// Node kind discriminant, stable across the snapshot format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    Object,
    ValueArray,
    ObjectArray,
    LazyObject,
    LazyArray,
}

impl NodeKind {
    /// Integer code used by snapshot lines.
    pub fn code(&self) -> u8 {
        match self {
            NodeKind::Scalar => 0,
            NodeKind::Object => 1,
            NodeKind::ValueArray => 2,
            NodeKind::ObjectArray => 3,
            NodeKind::LazyObject => 4,
            NodeKind::LazyArray => 5,
        }
    }

    /// Inverse of [`NodeKind::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(NodeKind::Scalar),
            1 => Some(NodeKind::Object),
            2 => Some(NodeKind::ValueArray),
            3 => Some(NodeKind::ObjectArray),
            4 => Some(NodeKind::LazyObject),
            5 => Some(NodeKind::LazyArray),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Scalar => "scalar",
            NodeKind::Object => "object",
            NodeKind::ValueArray => "value-array",
            NodeKind::ObjectArray => "object-array",
            NodeKind::LazyObject => "lazy-object",
            NodeKind::LazyArray => "lazy-array",
        }
    }
}

pub(crate) enum Payload {
    Scalar(Value),
    Object(Vec<Node>),
    ValueArray {
        elem: Option<ValueKind>,
        values: Vec<Value>,
    },
    ObjectArray(Vec<Node>),
    LazyObject(serde_json::Value),
    LazyArray(serde_json::Value),
}

impl Payload {
    fn kind(&self) -> NodeKind {
        match self {
            Payload::Scalar(_) => NodeKind::Scalar,
            Payload::Object(_) => NodeKind::Object,
            Payload::ValueArray { .. } => NodeKind::ValueArray,
            Payload::ObjectArray(_) => NodeKind::ObjectArray,
            Payload::LazyObject(_) => NodeKind::LazyObject,
            Payload::LazyArray(_) => NodeKind::LazyArray,
        }
    }
}

pub(crate) struct NodeData {
    key: Option<String>,
    parent: Option<WeakNode>,
    payload: Payload,
}

/// Weak handle used for parent back-references. Never cloned into a deep
/// copy, so clones detach cleanly from the original tree.
pub struct WeakNode(Weak<RefCell<NodeData>>);

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }
}

/// Handle to one position in a document tree.
pub struct Node(Rc<RefCell<NodeData>>);

impl Clone for Node {
    /// Clones the handle, not the subtree. See [`Node::deep_clone`].
    fn clone(&self) -> Self {
        Node(Rc::clone(&self.0))
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("Node")
            .field("key", &data.key)
            .field("kind", &data.payload.kind())
            .finish()
    }
}

impl Node {
    fn new(key: Option<&str>, payload: Payload) -> Self {
        Node(Rc::new(RefCell::new(NodeData {
            key: key.map(str::to_string),
            parent: None,
            payload,
        })))
    }

    /// Build a node from a prepared payload, wiring child parent links.
    pub(crate) fn with_payload(key: Option<&str>, payload: Payload) -> Self {
        let node = Self::new(key, payload);
        for child in node.children() {
            child.set_parent(Some(&node));
        }
        node
    }

    /// New scalar node.
    pub fn scalar(key: Option<&str>, value: Value) -> Self {
        Self::new(key, Payload::Scalar(value))
    }

    /// New empty object node.
    pub fn object(key: Option<&str>) -> Self {
        Self::new(key, Payload::Object(Vec::new()))
    }

    /// New empty value array; the element type is fixed on first insert.
    pub fn value_array(key: Option<&str>) -> Self {
        Self::new(
            key,
            Payload::ValueArray {
                elem: None,
                values: Vec::new(),
            },
        )
    }

    /// New empty object array.
    pub fn object_array(key: Option<&str>) -> Self {
        Self::new(key, Payload::ObjectArray(Vec::new()))
    }

    /// New value array with a known element type and contents; used when
    /// reconstructing a tree from a snapshot.
    pub(crate) fn value_array_of(
        key: Option<&str>,
        elem: Option<ValueKind>,
        values: Vec<Value>,
    ) -> Self {
        Self::new(key, Payload::ValueArray { elem, values })
    }

    /// New lazy object holding an unconverted JSON element.
    pub fn lazy_object(key: Option<&str>, element: serde_json::Value) -> Self {
        Self::new(key, Payload::LazyObject(element))
    }

    /// New lazy array holding an unconverted JSON element.
    pub fn lazy_array(key: Option<&str>, element: serde_json::Value) -> Self {
        Self::new(key, Payload::LazyArray(element))
    }

    // ----- inspectors -------------------------------------------------

    pub fn kind(&self) -> NodeKind {
        self.0.borrow().payload.kind()
    }

    pub fn key(&self) -> Option<String> {
        self.0.borrow().key.clone()
    }

    pub(crate) fn set_key(&self, key: Option<&str>) {
        self.0.borrow_mut().key = key.map(str::to_string);
    }

    pub fn parent(&self) -> Option<Node> {
        self.0.borrow().parent.as_ref().and_then(WeakNode::upgrade)
    }

    /// Whether two handles point at the same tree position.
    pub fn same_node(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of children (object members, array elements). Zero for
    /// scalars; lazy nodes report their stored element's length without
    /// materializing.
    pub fn len(&self) -> usize {
        match &self.0.borrow().payload {
            Payload::Scalar(_) => 0,
            Payload::Object(children) | Payload::ObjectArray(children) => children.len(),
            Payload::ValueArray { values, .. } => values.len(),
            Payload::LazyObject(v) => v.as_object().map_or(0, |m| m.len()),
            Payload::LazyArray(v) => v.as_array().map_or(0, |a| a.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scalar payload, if this is a scalar node.
    pub fn value(&self) -> Option<Value> {
        match &self.0.borrow().payload {
            Payload::Scalar(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Child node handles. Empty for scalars and unmaterialized lazy nodes.
    pub fn children(&self) -> Vec<Node> {
        match &self.0.borrow().payload {
            Payload::Object(children) | Payload::ObjectArray(children) => children.clone(),
            _ => Vec::new(),
        }
    }

    /// Value-array elements together with the established element type.
    pub fn values(&self) -> Option<(Option<ValueKind>, Vec<Value>)> {
        match &self.0.borrow().payload {
            Payload::ValueArray { elem, values } => Some((*elem, values.clone())),
            _ => None,
        }
    }

    /// Raw JSON element stored by a lazy node.
    pub fn lazy_element(&self) -> Option<serde_json::Value> {
        match &self.0.borrow().payload {
            Payload::LazyObject(v) | Payload::LazyArray(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn set_parent(&self, parent: Option<&Node>) {
        self.0.borrow_mut().parent = parent.map(|p| WeakNode(Rc::downgrade(&p.0)));
    }

    // ----- lazy materialization ---------------------------------------

    /// Convert a lazy node into its real container in place. The handle
    /// keeps its identity; repeated calls are no-ops.
    pub(crate) fn materialize(&self, opts: &Options) -> NodeResult<()> {
        let element = {
            let data = self.0.borrow();
            match &data.payload {
                Payload::LazyObject(v) | Payload::LazyArray(v) => v.clone(),
                _ => return Ok(()),
            }
        };
        let payload = match self.kind() {
            NodeKind::LazyObject => json::object_payload(&element, opts)?,
            _ => json::array_payload(&element, opts)?,
        };
        self.0.borrow_mut().payload = payload;
        for child in self.children() {
            child.set_parent(Some(self));
        }
        Ok(())
    }

    // ----- child access -----------------------------------------------

    /// Look up an object child by key. Binary search when the `sort` and
    /// `binary_search` options are both set; first match by insertion
    /// order otherwise. Materializes a lazy object first.
    pub fn find_child(&self, key: &str, opts: &Options) -> Option<Node> {
        if self.kind() == NodeKind::LazyObject {
            self.materialize(opts).ok()?;
        }
        let children = match &self.0.borrow().payload {
            Payload::Object(children) => children.clone(),
            _ => return None,
        };
        if opts.sort && opts.binary_search {
            children
                .binary_search_by(|c| {
                    c.key().as_deref().unwrap_or("").cmp(key)
                })
                .ok()
                .map(|pos| children[pos].clone())
        } else {
            children
                .into_iter()
                .find(|c| c.key().as_deref() == Some(key))
        }
    }

    /// Attach a child to an object node. A duplicate key replaces the
    /// existing child at its position; with the `sort` option new keys are
    /// inserted in ascending ordinal order.
    pub fn add_child(&self, child: Node, opts: &Options) -> NodeResult<()> {
        self.materialize(opts)?;
        let kind = self.kind();
        let mut data = self.0.borrow_mut();
        let children = match &mut data.payload {
            Payload::Object(children) => children,
            _ => return Err(NodeError::shape("object", kind.as_str())),
        };
        let key = child.key();
        if let Some(pos) = children.iter().position(|c| c.key() == key) {
            children[pos].set_parent(None);
            child.set_parent(Some(self));
            children[pos] = child;
            return Ok(());
        }
        child.set_parent(Some(self));
        if opts.sort {
            let key = key.unwrap_or_default();
            let pos = children
                .binary_search_by(|c| c.key().unwrap_or_default().cmp(&key))
                .unwrap_or_else(|p| p);
            children.insert(pos, child);
        } else {
            children.push(child);
        }
        Ok(())
    }

    /// Append a primitive to a value array. The first insert establishes
    /// the element type; later inserts must match it.
    pub fn add_value(&self, value: impl Into<Value>) -> NodeResult<()> {
        let value = value.into();
        let kind = self.kind();
        let mut data = self.0.borrow_mut();
        match &mut data.payload {
            Payload::ValueArray { elem, values } => {
                let incoming = value.kind();
                match (*elem, incoming) {
                    (None, _) => *elem = incoming,
                    (Some(existing), Some(new)) if existing != new => {
                        return Err(NodeError::HeterogeneousElement {
                            existing,
                            incoming,
                        })
                    }
                    _ => {}
                }
                values.push(value);
                Ok(())
            }
            _ => Err(NodeError::unsupported("add value", kind.as_str())),
        }
    }

    /// Append an object node to an object array.
    pub fn add_element(&self, element: Node, opts: &Options) -> NodeResult<()> {
        self.materialize(opts)?;
        let kind = self.kind();
        match element.kind() {
            NodeKind::Object | NodeKind::LazyObject => {}
            other => return Err(NodeError::shape("object", other.as_str())),
        }
        let mut data = self.0.borrow_mut();
        match &mut data.payload {
            Payload::ObjectArray(children) => {
                element.set_parent(Some(self));
                children.push(element);
                Ok(())
            }
            _ => Err(NodeError::shape("object-array", kind.as_str())),
        }
    }

    /// Create (or replace) a scalar child with the given key on an object.
    pub fn add_entry(&self, key: &str, value: impl Into<Value>, opts: &Options) -> NodeResult<()> {
        self.add_child(Node::scalar(Some(key), value.into()), opts)
    }

    /// Parse JSON text into an object and append it to this object array.
    pub fn add_json(&self, json: &str, opts: &Options) -> NodeResult<Node> {
        let element: serde_json::Value = serde_json::from_str(json)?;
        if !element.is_object() {
            return Err(NodeError::JsonShape { expected: "object" });
        }
        let node = json::node_from_json(None, &element, opts)?;
        self.add_element(node.clone(), opts)?;
        Ok(node)
    }

    /// Parse JSON text (object or array) into a child with the given key.
    pub fn add_json_keyed(&self, key: &str, json: &str, opts: &Options) -> NodeResult<Node> {
        if matches!(self.kind(), NodeKind::ValueArray | NodeKind::ObjectArray) {
            return Err(NodeError::unsupported("add keyed json", self.kind().as_str()));
        }
        let element: serde_json::Value = serde_json::from_str(json)?;
        if !element.is_object() && !element.is_array() {
            return Err(NodeError::JsonShape {
                expected: "object or array",
            });
        }
        let node = json::node_from_json(Some(key), &element, opts)?;
        self.add_child(node.clone(), opts)?;
        Ok(node)
    }

    // ----- path operations --------------------------------------------

    /// Resolve a path and extract the terminal value, cast to `T`.
    ///
    /// Missing segments yield `None`; a present value that cannot convert
    /// yields `T`'s default per the cast matrix.
    pub fn get<T: FromValue>(&self, path: &str, opts: &Options) -> Option<T> {
        match path::resolve(self, path, opts)? {
            Target::Node(node) => node.value().map(|v| T::from_value(&v)),
            Target::Element { array, index } => {
                let (_, values) = array.values()?;
                values.get(index).map(T::from_value)
            }
        }
    }

    /// Resolve a path to a node handle. A value-array element resolves to
    /// the array node that holds it.
    pub fn get_node(&self, path: &str, opts: &Options) -> Option<Node> {
        match path::resolve(self, path, opts)? {
            Target::Node(node) => Some(node),
            Target::Element { array, .. } => Some(array),
        }
    }

    /// Overwrite the value at a path.
    ///
    /// - A scalar target converts the incoming value to its current type.
    /// - An object target accepts a JSON string and replaces its contents
    ///   with the reparsed subtree.
    /// - A `$N` terminal on a value array sets the element; on an object
    ///   array it reparses a JSON string into the element object.
    pub fn set(&self, path: &str, value: impl Into<Value>, opts: &Options) -> NodeResult<()> {
        let value = value.into();
        let target = path::resolve(self, path, opts)
            .ok_or_else(|| NodeError::PathNotFound(path.to_string()))?;
        match target {
            Target::Element { array, index } => {
                let mut data = array.0.borrow_mut();
                if let Payload::ValueArray { elem, values } = &mut data.payload {
                    values[index] = match elem {
                        Some(kind) => value.cast_to(*kind),
                        None => value,
                    };
                }
                Ok(())
            }
            Target::Node(node) => node.set_direct(value, opts),
        }
    }

    fn set_direct(&self, value: Value, opts: &Options) -> NodeResult<()> {
        match self.kind() {
            NodeKind::Scalar => {
                let mut data = self.0.borrow_mut();
                if let Payload::Scalar(current) = &mut data.payload {
                    *current = match current.kind() {
                        Some(kind) => value.cast_to(kind),
                        None => value,
                    };
                }
                Ok(())
            }
            NodeKind::Object | NodeKind::LazyObject => {
                let json = match value {
                    Value::Str(s) => s,
                    other => {
                        return Err(NodeError::unsupported(
                            if other.is_null() { "set null" } else { "set non-json value" },
                            "object",
                        ))
                    }
                };
                let element: serde_json::Value = serde_json::from_str(&json)?;
                if !element.is_object() {
                    return Err(NodeError::JsonShape { expected: "object" });
                }
                let payload = json::object_payload(&element, opts)?;
                self.0.borrow_mut().payload = payload;
                for child in self.children() {
                    child.set_parent(Some(self));
                }
                Ok(())
            }
            other => Err(NodeError::unsupported("set", other.as_str())),
        }
    }

    /// Navigate to a value array and append a primitive.
    pub fn append(&self, path: &str, value: impl Into<Value>, opts: &Options) -> NodeResult<()> {
        let node = self
            .get_node(path, opts)
            .ok_or_else(|| NodeError::PathNotFound(path.to_string()))?;
        node.add_value(value)
    }

    /// Navigate to an object and add (or replace) a scalar entry.
    pub fn append_entry(
        &self,
        path: &str,
        key: &str,
        value: impl Into<Value>,
        opts: &Options,
    ) -> NodeResult<()> {
        let node = self
            .get_node(path, opts)
            .ok_or_else(|| NodeError::PathNotFound(path.to_string()))?;
        node.add_entry(key, value, opts)
    }

    /// Remove the node or array element a path points at.
    pub fn remove(&self, path: &str, opts: &Options) -> NodeResult<()> {
        let target = path::resolve(self, path, opts)
            .ok_or_else(|| NodeError::PathNotFound(path.to_string()))?;
        match target {
            Target::Element { array, index } => {
                let mut data = array.0.borrow_mut();
                if let Payload::ValueArray { values, .. } = &mut data.payload {
                    values.remove(index);
                }
                Ok(())
            }
            Target::Node(node) => {
                let parent = node
                    .parent()
                    .ok_or_else(|| NodeError::unsupported("remove", "root"))?;
                parent.detach_child(&node)
            }
        }
    }

    /// Swap a child for a replacement at the same position.
    pub(crate) fn replace_child(&self, old: &Node, new: Node) -> NodeResult<()> {
        let kind = self.kind();
        let mut data = self.0.borrow_mut();
        let children = match &mut data.payload {
            Payload::Object(children) | Payload::ObjectArray(children) => children,
            _ => return Err(NodeError::unsupported("replace child", kind.as_str())),
        };
        match children.iter().position(|c| c.same_node(old)) {
            Some(pos) => {
                children[pos].set_parent(None);
                new.set_parent(Some(self));
                children[pos] = new;
                Ok(())
            }
            None => Err(NodeError::PathNotFound(old.key().unwrap_or_default())),
        }
    }

    /// Unlink a child from this container's payload.
    pub(crate) fn detach_child(&self, child: &Node) -> NodeResult<()> {
        let kind = self.kind();
        let mut data = self.0.borrow_mut();
        let children = match &mut data.payload {
            Payload::Object(children) | Payload::ObjectArray(children) => children,
            _ => return Err(NodeError::unsupported("remove child", kind.as_str())),
        };
        match children.iter().position(|c| c.same_node(child)) {
            Some(pos) => {
                children.remove(pos).set_parent(None);
                Ok(())
            }
            None => Err(NodeError::PathNotFound(
                child.key().unwrap_or_default(),
            )),
        }
    }

    // ----- rendering and cloning --------------------------------------

    /// Canonical JSON rendering. Lazy nodes emit their stored element
    /// compactly, without materializing.
    pub fn to_json(&self) -> String {
        json::json_from_node(self).to_string()
    }

    /// Deep copy of this subtree. Object and array payloads are copied
    /// recursively; lazy payloads copy the stored element only. The copy
    /// has no parent.
    pub fn deep_clone(&self) -> Node {
        let data = self.0.borrow();
        let payload = match &data.payload {
            Payload::Scalar(v) => Payload::Scalar(v.clone()),
            Payload::Object(children) => {
                Payload::Object(children.iter().map(Node::deep_clone).collect())
            }
            Payload::ObjectArray(children) => {
                Payload::ObjectArray(children.iter().map(Node::deep_clone).collect())
            }
            Payload::ValueArray { elem, values } => Payload::ValueArray {
                elem: *elem,
                values: values.clone(),
            },
            Payload::LazyObject(v) => Payload::LazyObject(v.clone()),
            Payload::LazyArray(v) => Payload::LazyArray(v.clone()),
        };
        let copy = Node(Rc::new(RefCell::new(NodeData {
            key: data.key.clone(),
            parent: None,
            payload,
        })));
        for child in copy.children() {
            child.set_parent(Some(&copy));
        }
        copy
    }
}
