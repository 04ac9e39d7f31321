//! JSON interop
//!
//! The external parser is `serde_json`; its `Value` plays the role of the
//! read-only DOM element. Building a node tree from an element is the
//! expensive step, so with the `enable_lazy` option nested containers stay
//! as lazy nodes holding their element until first structural access.

use serde_json::Value as JsonValue;

use crate::config::Options;
use crate::node::{Node, NodeError, NodeResult, Payload};
use crate::value::Value;

/// Parse JSON text that must be an object into a node.
pub fn parse_node(key: Option<&str>, json: &str, opts: &Options) -> NodeResult<Node> {
    let element: JsonValue = serde_json::from_str(json)?;
    if !element.is_object() {
        return Err(NodeError::JsonShape { expected: "object" });
    }
    node_from_json(key, &element, opts)
}

/// Parse JSON text that must be an array into a node.
pub fn parse_array_node(key: Option<&str>, json: &str, opts: &Options) -> NodeResult<Node> {
    let element: JsonValue = serde_json::from_str(json)?;
    if !element.is_array() {
        return Err(NodeError::JsonShape { expected: "array" });
    }
    node_from_json(key, &element, opts)
}

/// Convert a primitive JSON element. Integers that fit in `i32` narrow;
/// wider integers stay 64-bit.
fn value_from_json(element: &JsonValue) -> Option<Value> {
    match element {
        JsonValue::Null => Some(Value::Null),
        JsonValue::Bool(b) => Some(Value::Bool(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(if i32::try_from(i).is_ok() {
                    Value::Int(i as i32)
                } else {
                    Value::Long(i)
                })
            } else {
                n.as_f64().map(Value::Double)
            }
        }
        JsonValue::String(s) => Some(Value::Str(s.clone())),
        _ => None,
    }
}

/// Build a node for any JSON element. Containers become object/array
/// nodes; primitives become scalars.
pub(crate) fn node_from_json(
    key: Option<&str>,
    element: &JsonValue,
    opts: &Options,
) -> NodeResult<Node> {
    let node = match element {
        JsonValue::Object(_) => Node::with_payload(key, object_payload(element, opts)?),
        JsonValue::Array(_) => Node::with_payload(key, array_payload(element, opts)?),
        primitive => {
            let value = value_from_json(primitive).ok_or(NodeError::JsonShape {
                expected: "primitive",
            })?;
            Node::scalar(key, value)
        }
    };
    Ok(node)
}

/// Payload for an object element. With `enable_lazy`, nested containers
/// become lazy children holding their element.
pub(crate) fn object_payload(element: &JsonValue, opts: &Options) -> NodeResult<Payload> {
    let members = element.as_object().ok_or(NodeError::JsonShape {
        expected: "object",
    })?;
    let mut children = Vec::with_capacity(members.len());
    for (key, member) in members {
        let child = match member {
            JsonValue::Object(_) if opts.enable_lazy => {
                Node::lazy_object(Some(key), member.clone())
            }
            JsonValue::Array(_) if opts.enable_lazy => Node::lazy_array(Some(key), member.clone()),
            other => node_from_json(Some(key), other, opts)?,
        };
        children.push(child);
    }
    if opts.sort {
        children.sort_by(|a, b| a.key().cmp(&b.key()));
    }
    Ok(Payload::Object(children))
}

/// Payload for an array element: an object array when the elements are
/// objects, a value array when they are primitives. Mixing the two, or
/// nesting arrays directly, is a shape error.
pub(crate) fn array_payload(element: &JsonValue, opts: &Options) -> NodeResult<Payload> {
    let elements = element.as_array().ok_or(NodeError::JsonShape {
        expected: "array",
    })?;

    if elements.iter().any(JsonValue::is_object) {
        if !elements.iter().all(JsonValue::is_object) {
            return Err(NodeError::shape("object elements", "mixed array"));
        }
        let mut children = Vec::with_capacity(elements.len());
        for member in elements {
            let child = if opts.enable_lazy {
                Node::lazy_object(None, member.clone())
            } else {
                node_from_json(None, member, opts)?
            };
            children.push(child);
        }
        return Ok(Payload::ObjectArray(children));
    }

    let mut elem = None;
    let mut values = Vec::with_capacity(elements.len());
    for member in elements {
        let value = value_from_json(member).ok_or(NodeError::shape(
            "primitive elements",
            "nested array",
        ))?;
        let kind = value.kind();
        match (elem, kind) {
            (None, _) => elem = kind,
            (Some(existing), Some(incoming)) if existing != incoming => {
                return Err(NodeError::HeterogeneousElement {
                    existing,
                    incoming: kind,
                })
            }
            _ => {}
        }
        values.push(value);
    }
    Ok(Payload::ValueArray { elem, values })
}

/// Render a node back into a JSON element. Lazy nodes contribute their
/// stored element as-is.
pub(crate) fn json_from_node(node: &Node) -> JsonValue {
    use crate::node::NodeKind;

    match node.kind() {
        NodeKind::Scalar => match node.value().unwrap_or(Value::Null) {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(b),
            Value::Int(i) => JsonValue::from(i),
            Value::Long(l) => JsonValue::from(l),
            Value::Double(d) => serde_json::Number::from_f64(d)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Str(s) => JsonValue::String(s),
        },
        NodeKind::Object => {
            let mut map = serde_json::Map::new();
            for child in node.children() {
                map.insert(child.key().unwrap_or_default(), json_from_node(&child));
            }
            JsonValue::Object(map)
        }
        NodeKind::ObjectArray => {
            JsonValue::Array(node.children().iter().map(json_from_node).collect())
        }
        NodeKind::ValueArray => {
            let (_, values) = node.values().unwrap_or((None, Vec::new()));
            JsonValue::Array(
                values
                    .into_iter()
                    .map(|v| match v {
                        Value::Null => JsonValue::Null,
                        Value::Bool(b) => JsonValue::Bool(b),
                        Value::Int(i) => JsonValue::from(i),
                        Value::Long(l) => JsonValue::from(l),
                        Value::Double(d) => serde_json::Number::from_f64(d)
                            .map(JsonValue::Number)
                            .unwrap_or(JsonValue::Null),
                        Value::Str(s) => JsonValue::String(s),
                    })
                    .collect(),
            )
        }
        NodeKind::LazyObject | NodeKind::LazyArray => {
            node.lazy_element().unwrap_or(JsonValue::Null)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    #[test]
    fn test_parse_object() {
        let opts = Options::default();
        let node = parse_node(None, r#"{"name":"张三","age":1}"#, &opts).unwrap();
        assert_eq!(node.kind(), NodeKind::Object);
        assert_eq!(node.get::<String>("name", &opts).unwrap(), "张三");
        assert_eq!(node.get::<i64>("age", &opts).unwrap(), 1);
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let opts = Options::default();
        assert!(parse_node(None, "[1,2]", &opts).is_err());
        assert!(parse_node(None, "not json", &opts).is_err());
        assert!(parse_array_node(None, r#"{"a":1}"#, &opts).is_err());
    }

    #[test]
    fn test_array_of_objects() {
        let opts = Options::default();
        let node = parse_array_node(None, r#"[{"a":1},{"a":2}]"#, &opts).unwrap();
        assert_eq!(node.kind(), NodeKind::ObjectArray);
        assert_eq!(node.len(), 2);
    }

    #[test]
    fn test_array_of_primitives() {
        let opts = Options::default();
        let node = parse_array_node(None, "[1,2,3]", &opts).unwrap();
        assert_eq!(node.kind(), NodeKind::ValueArray);
        assert_eq!(node.len(), 3);
    }

    #[test]
    fn test_mixed_array_rejected() {
        let opts = Options::default();
        assert!(parse_array_node(None, r#"[1,{"a":2}]"#, &opts).is_err());
        assert!(parse_array_node(None, r#"[1,"two"]"#, &opts).is_err());
    }

    #[test]
    fn test_lazy_children() {
        let opts = Options::lazy();
        let node = parse_node(None, r#"{"inner":{"a":1},"list":[1,2]}"#, &opts).unwrap();

        let inner = node.get_node("inner", &opts).unwrap();
        // Terminal lookup hands back the lazy node untouched.
        assert_eq!(inner.kind(), NodeKind::LazyObject);

        // Descending materializes it in place, once.
        assert_eq!(node.get::<i64>("inner.a", &opts).unwrap(), 1);
        assert_eq!(inner.kind(), NodeKind::Object);
        let again = node.get_node("inner", &opts).unwrap();
        assert!(again.same_node(&inner));
    }

    #[test]
    fn test_to_json_round_trip() {
        let opts = Options::default();
        let text = r#"{"a":1,"b":"x,y","c":[1,2],"d":{"e":true}}"#;
        let node = parse_node(None, text, &opts).unwrap();
        let rendered = node.to_json();
        let reparsed: JsonValue = serde_json::from_str(&rendered).unwrap();
        let original: JsonValue = serde_json::from_str(text).unwrap();
        assert_eq!(reparsed, original);
    }

    #[test]
    fn test_to_json_escapes_quotes_and_controls() {
        let opts = Options::default();
        let node = parse_node(None, r#"{"s":"a\"b\\c\nd"}"#, &opts).unwrap();
        let rendered = node.to_json();
        assert!(rendered.contains(r#"a\"b\\c\nd"#));
    }

    #[test]
    fn test_lazy_to_json_is_compact() {
        let opts = Options::lazy();
        let node = parse_node(None, "{ \"inner\" : { \"a\" : 1 } }", &opts).unwrap();
        assert_eq!(node.to_json(), r#"{"inner":{"a":1}}"#);
    }
}
