//! Primitive value model
//!
//! A [`Value`] is one typed primitive: the payload of a scalar node and the
//! element type of a value array. Each node and value kind carries a fixed
//! one-character tag used by the snapshot codec.

mod cast;
mod codec;

pub use cast::FromValue;
pub use codec::{decode_value, encode_value, escape, unescape, CodecError, CodecResult};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag alphabet shared by the value codec and the snapshot format.
///
/// `Object`, `ObjectArray`, and `ValueArray` tag container lines; the rest
/// tag scalar payloads and value-array element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Object,
    String,
    Int32,
    Int64,
    Float64,
    Bool,
    ObjectArray,
    ValueArray,
}

impl ValueKind {
    /// One-character tag for this kind.
    pub fn tag(&self) -> char {
        match self {
            ValueKind::Object => '1',
            ValueKind::String => '2',
            ValueKind::Int32 => '3',
            ValueKind::Int64 => '4',
            ValueKind::Float64 => '5',
            ValueKind::Bool => '6',
            ValueKind::ObjectArray => '7',
            ValueKind::ValueArray => '8',
        }
    }

    /// Inverse of [`ValueKind::tag`].
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            '1' => Some(ValueKind::Object),
            '2' => Some(ValueKind::String),
            '3' => Some(ValueKind::Int32),
            '4' => Some(ValueKind::Int64),
            '5' => Some(ValueKind::Float64),
            '6' => Some(ValueKind::Bool),
            '7' => Some(ValueKind::ObjectArray),
            '8' => Some(ValueKind::ValueArray),
            _ => None,
        }
    }
}

/// A single typed primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(String),
}

impl Value {
    /// The kind tag for this value. `Null` has no tag of its own; the codec
    /// renders it as a string-tagged sentinel.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Int(_) => Some(ValueKind::Int32),
            Value::Long(_) => Some(ValueKind::Int64),
            Value::Double(_) => Some(ValueKind::Float64),
            Value::Str(_) => Some(ValueKind::String),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Textual form used by the codec and by composite index keys.
    /// `Null` renders as the supplied sentinel.
    pub fn render(&self, null_sentinel: &str) -> String {
        match self {
            Value::Null => null_sentinel.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Long(l) => l.to_string(),
            Value::Double(d) => d.to_string(),
            Value::Str(s) => s.clone(),
        }
    }

    /// Convert this value to the given kind using the cast matrix.
    /// Conversions that cannot succeed yield the target's default.
    pub fn cast_to(&self, kind: ValueKind) -> Value {
        match kind {
            ValueKind::Int32 => Value::Int(self.as_i32()),
            ValueKind::Int64 => Value::Long(self.as_i64()),
            ValueKind::Float64 => Value::Double(self.as_f64()),
            ValueKind::Bool => Value::Bool(self.as_bool()),
            ValueKind::String => Value::Str(self.as_string()),
            // Container kinds have no scalar representation.
            _ => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Double(d) => write!(f, "{}", d),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
