//! Cross-type conversion matrix
//!
//! Every conversion is total: identical types pass through, string and
//! number convert via parsing, numeric narrowing truncates, and anything
//! else yields the target type's default. Casts never fail.

use super::Value;

impl Value {
    /// Cast to `i64`. Strings parse as integers first, then as floats
    /// (truncating); booleans map to 0/1.
    pub fn as_i64(&self) -> i64 {
        match self {
            Value::Null => 0,
            Value::Bool(b) => *b as i64,
            Value::Int(i) => *i as i64,
            Value::Long(l) => *l,
            Value::Double(d) => *d as i64,
            Value::Str(s) => s
                .trim()
                .parse::<i64>()
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or_default(),
        }
    }

    /// Cast to `i32`, truncating wider integers.
    pub fn as_i32(&self) -> i32 {
        self.as_i64() as i32
    }

    /// Cast to `f64`.
    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => *b as i64 as f64,
            Value::Int(i) => *i as f64,
            Value::Long(l) => *l as f64,
            Value::Double(d) => *d,
            Value::Str(s) => s.trim().parse::<f64>().unwrap_or_default(),
        }
    }

    /// Cast to `bool`. Numbers are false at zero; strings accept the
    /// literals `true`/`false` and otherwise convert through `f64`.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Long(l) => *l != 0,
            Value::Double(d) => *d != 0.0,
            Value::Str(s) => match s.trim() {
                "true" => true,
                "false" => false,
                other => other.parse::<f64>().map(|f| f != 0.0).unwrap_or_default(),
            },
        }
    }

    /// Cast to `String`. `Null` yields the empty string.
    pub fn as_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            other => other.render(""),
        }
    }
}

/// Typed extraction from a [`Value`], used by `Node::get`.
///
/// Implementations follow the cast matrix: a conversion that cannot
/// succeed produces the type's default rather than an error.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Self;
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Self {
        value.as_i32()
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Self {
        value.as_i64()
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Self {
        value.as_f64()
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Self {
        value.as_bool()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Self {
        value.as_string()
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Self {
        value.clone()
    }
}
