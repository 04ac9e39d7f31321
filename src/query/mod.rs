//! Predicate combinators
//!
//! Each helper returns a boxed closure over a document node; combinators
//! compose them. A missing field never matches (except for [`null`]), and
//! comparisons are numeric-aware: two numeric values compare by magnitude
//! regardless of their stored width.

use std::cmp::Ordering;

use crate::config::Options;
use crate::node::{Node, NodeKind};
use crate::value::Value;

/// A predicate over a stored document.
pub type Predicate = Box<dyn Fn(&Node, &Options) -> bool>;

/// Compare two values when they are comparable: numerically when both are
/// numeric (booleans count as 0/1), ordinally when both are strings.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    let numeric = |v: &Value| match v {
        Value::Int(_) | Value::Long(_) | Value::Double(_) | Value::Bool(_) => Some(v.as_f64()),
        _ => None,
    };
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => match (a, b) {
            (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
            _ => None,
        },
    }
}

fn field_value(doc: &Node, path: &str, opts: &Options) -> Option<Value> {
    doc.get::<Value>(path, opts).filter(|v| !v.is_null())
}

fn ordered(path: &str, expected: Value, accept: fn(Ordering) -> bool) -> Predicate {
    let path = path.to_string();
    Box::new(move |doc, opts| {
        field_value(doc, &path, opts)
            .and_then(|actual| compare_values(&actual, &expected))
            .map(accept)
            .unwrap_or(false)
    })
}

/// Field equals the value.
pub fn eq(path: &str, value: impl Into<Value>) -> Predicate {
    ordered(path, value.into(), |ord| ord == Ordering::Equal)
}

/// Field differs from the value (but is present and comparable).
pub fn ne(path: &str, value: impl Into<Value>) -> Predicate {
    ordered(path, value.into(), |ord| ord != Ordering::Equal)
}

/// Field is strictly less than the value.
pub fn lt(path: &str, value: impl Into<Value>) -> Predicate {
    ordered(path, value.into(), |ord| ord == Ordering::Less)
}

/// Field is at most the value.
pub fn le(path: &str, value: impl Into<Value>) -> Predicate {
    ordered(path, value.into(), |ord| ord != Ordering::Greater)
}

/// Field is strictly greater than the value.
pub fn gt(path: &str, value: impl Into<Value>) -> Predicate {
    ordered(path, value.into(), |ord| ord == Ordering::Greater)
}

/// Field is at least the value.
pub fn ge(path: &str, value: impl Into<Value>) -> Predicate {
    ordered(path, value.into(), |ord| ord != Ordering::Less)
}

/// SQL-style pattern match over a string field: `%` matches any run of
/// characters, `_` matches exactly one.
pub fn like(path: &str, pattern: &str) -> Predicate {
    let path = path.to_string();
    let pattern: Vec<char> = pattern.chars().collect();
    Box::new(move |doc, opts| match field_value(doc, &path, opts) {
        Some(Value::Str(text)) => {
            let text: Vec<char> = text.chars().collect();
            like_match(&text, &pattern)
        }
        _ => false,
    })
}

fn like_match(text: &[char], pattern: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('%') => {
            (0..=text.len()).any(|skip| like_match(&text[skip..], &pattern[1..]))
        }
        Some('_') => !text.is_empty() && like_match(&text[1..], &pattern[1..]),
        Some(&ch) => text.first() == Some(&ch) && like_match(&text[1..], &pattern[1..]),
    }
}

/// Field equals any of the listed values.
pub fn is_in(path: &str, values: Vec<Value>) -> Predicate {
    let path = path.to_string();
    Box::new(move |doc, opts| match field_value(doc, &path, opts) {
        Some(actual) => values
            .iter()
            .any(|v| compare_values(&actual, v) == Some(Ordering::Equal)),
        None => false,
    })
}

/// Field is absent or holds an explicit null.
pub fn null(path: &str) -> Predicate {
    let path = path.to_string();
    Box::new(move |doc, opts| match doc.get_node(&path, opts) {
        None => true,
        Some(node) => node.value().map(|v| v.is_null()).unwrap_or(false),
    })
}

/// Field is present and non-null.
pub fn not_null(path: &str) -> Predicate {
    let path = path.to_string();
    Box::new(move |doc, opts| match doc.get_node(&path, opts) {
        None => false,
        Some(node) => node.value().map(|v| !v.is_null()).unwrap_or(true),
    })
}

/// Container length (or string character count) equals `n`.
pub fn len(path: &str, n: usize) -> Predicate {
    let path = path.to_string();
    Box::new(move |doc, opts| match doc.get_node(&path, opts) {
        Some(node) => match node.kind() {
            NodeKind::Scalar => match node.value() {
                Some(Value::Str(s)) => s.chars().count() == n,
                _ => false,
            },
            _ => node.len() == n,
        },
        None => false,
    })
}

/// All predicates hold.
pub fn and(predicates: Vec<Predicate>) -> Predicate {
    Box::new(move |doc, opts| predicates.iter().all(|p| p(doc, opts)))
}

/// At least one predicate holds.
pub fn or(predicates: Vec<Predicate>) -> Predicate {
    Box::new(move |doc, opts| predicates.iter().any(|p| p(doc, opts)))
}
