//! Scalar text codec
//!
//! Primitives serialize as `<tag-char><SEP><text>`. The separator is
//! reserved: string payloads are escaped on write and unescaped on read,
//! so the default `,` survives arbitrary JSON strings. Absent values render
//! as the null sentinel under the string tag.
//!
//! Escape scheme: `\` becomes `\\`, LF becomes `\n`, and the configured
//! separator becomes `\` followed by the separator. Any other escape
//! sequence on read is a malformed input.

use thiserror::Error;

use super::{Value, ValueKind};

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while decoding scalar text
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    #[error("unknown value tag '{0}'")]
    UnknownTag(char),

    #[error("invalid {kind} literal: {text:?}")]
    InvalidLiteral { kind: &'static str, text: String },

    #[error("invalid escape sequence in {0:?}")]
    InvalidEscape(String),

    #[error("value of container kind {0:?} has no scalar text form")]
    ContainerKind(ValueKind),
}

/// Escape a string payload so it can sit between separators on one line.
pub fn escape(text: &str, separator: char) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\\' {
            out.push_str("\\\\");
        } else if ch == '\n' {
            out.push_str("\\n");
        } else if ch == separator {
            out.push('\\');
            out.push(separator);
        } else {
            out.push(ch);
        }
    }
    out
}

/// Inverse of [`escape`]. Rejects unknown escape sequences and a trailing
/// bare backslash.
pub fn unescape(text: &str, separator: char) -> CodecResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some(c) if c == separator => out.push(separator),
            _ => return Err(CodecError::InvalidEscape(text.to_string())),
        }
    }
    Ok(out)
}

/// Encode one value as `<tag><SEP><text>` onto `out`.
///
/// `Null` is written under the string tag with the sentinel literal, which
/// is how the format marks an absent value.
pub fn encode_value(out: &mut String, value: &Value, separator: char, null_sentinel: &str) {
    let tag = value.kind().map(|k| k.tag()).unwrap_or('2');
    out.push(tag);
    out.push(separator);
    match value {
        Value::Null => out.push_str(null_sentinel),
        Value::Str(s) => out.push_str(&escape(s, separator)),
        other => out.push_str(&other.render(null_sentinel)),
    }
}

/// Decode the text form of a value under the given tag.
///
/// The sentinel literal decodes to `Null` regardless of tag. String text
/// arrives escaped and is unescaped here; numeric and boolean literals
/// must parse exactly or the input is malformed.
pub fn decode_value(
    tag: char,
    text: &str,
    separator: char,
    null_sentinel: &str,
) -> CodecResult<Value> {
    if text == null_sentinel {
        return Ok(Value::Null);
    }
    let kind = ValueKind::from_tag(tag).ok_or(CodecError::UnknownTag(tag))?;
    match kind {
        ValueKind::String => Ok(Value::Str(unescape(text, separator)?)),
        ValueKind::Int32 => text
            .parse::<i32>()
            .map(Value::Int)
            .map_err(|_| CodecError::InvalidLiteral {
                kind: "int32",
                text: text.to_string(),
            }),
        ValueKind::Int64 => text
            .parse::<i64>()
            .map(Value::Long)
            .map_err(|_| CodecError::InvalidLiteral {
                kind: "int64",
                text: text.to_string(),
            }),
        ValueKind::Float64 => text
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| CodecError::InvalidLiteral {
                kind: "float64",
                text: text.to_string(),
            }),
        ValueKind::Bool => match text {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(CodecError::InvalidLiteral {
                kind: "bool",
                text: text.to_string(),
            }),
        },
        other => Err(CodecError::ContainerKind(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEP: char = ',';
    const NULL: &str = "__null__";

    fn encode(value: &Value) -> String {
        let mut out = String::new();
        encode_value(&mut out, value, SEP, NULL);
        out
    }

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode(&Value::Int(5)), "3,5");
        assert_eq!(encode(&Value::Long(-9)), "4,-9");
        assert_eq!(encode(&Value::Double(1.5)), "5,1.5");
        assert_eq!(encode(&Value::Bool(true)), "6,true");
        assert_eq!(encode(&Value::Str("abc".into())), "2,abc");
        assert_eq!(encode(&Value::Null), "2,__null__");
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode_value('3', "5", SEP, NULL).unwrap(), Value::Int(5));
        assert_eq!(decode_value('4', "-9", SEP, NULL).unwrap(), Value::Long(-9));
        assert_eq!(
            decode_value('6', "false", SEP, NULL).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(decode_value('2', NULL, SEP, NULL).unwrap(), Value::Null);
    }

    #[test]
    fn test_separator_escaped() {
        let v = Value::Str("a,b\nc\\d".into());
        let encoded = encode(&v);
        assert_eq!(encoded, "2,a\\,b\\nc\\\\d");
        let text = &encoded[2..];
        assert_eq!(decode_value('2', text, SEP, NULL).unwrap(), v);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!(decode_value('x', "1", SEP, NULL).is_err());
    }

    #[test]
    fn test_bad_literal_rejected() {
        assert!(decode_value('3', "abc", SEP, NULL).is_err());
        assert!(decode_value('6', "yes", SEP, NULL).is_err());
    }

    #[test]
    fn test_bad_escape_rejected() {
        assert!(unescape("a\\x", SEP).is_err());
        assert!(unescape("trailing\\", SEP).is_err());
    }

    #[test]
    fn test_unescape_round_trip() {
        for s in ["", "plain", "a,b", "multi\nline", "back\\slash", "混合,文本"] {
            let escaped = escape(s, SEP);
            assert!(!escaped.contains('\n'));
            assert_eq!(unescape(&escaped, SEP).unwrap(), s);
        }
    }
}
