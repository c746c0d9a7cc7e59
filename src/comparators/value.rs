//! Value semantics shared by the comparators
//!
//! Test-case values arrive as JSON. These helpers give them the equality,
//! ordering, length and string rendering that test-case authors expect.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::{Number, Value};

/// Deep equality where numbers compare by value (`1 == 1.0`)
///
/// Booleans form their own kind rather than a subtype of integers:
/// `true != 1`, `[true]` does not contain `1`, and `true` is not an `int`
/// for [`ValueType::matches`]. JSON keeps the two apart and so do the
/// comparators.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => a == b,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    match (as_integer(x), as_integer(y)) {
        (Some(l), Some(r)) => l == r,
        _ => match (x.as_f64(), y.as_f64()) {
            (Some(l), Some(r)) => l == r,
            _ => false,
        },
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    match (as_integer(x), as_integer(y)) {
        (Some(l), Some(r)) => Some(l.cmp(&r)),
        _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}

/// Order two values, or `None` when the pair is not orderable
///
/// Numbers order with numbers, strings with strings, booleans with
/// booleans, and arrays lexicographically by element.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                if values_equal(l, r) {
                    continue;
                }
                return compare_values(l, r);
            }
            Some(x.len().cmp(&y.len()))
        }
        _ => None,
    }
}

/// Length of a string (in characters), array or object
pub fn value_len(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(a) => Some(a.len()),
        Value::Object(o) => Some(o.len()),
        _ => None,
    }
}

/// Whether `needle` is a member of `haystack`
///
/// Arrays test elements, objects test keys and strings test substrings.
/// Returns `None` when `haystack` is not a container or the needle has the
/// wrong shape for it (a non-string looked up in a string).
pub fn contains_value(haystack: &Value, needle: &Value) -> Option<bool> {
    match haystack {
        Value::Array(items) => Some(items.iter().any(|item| values_equal(item, needle))),
        Value::Object(map) => Some(needle.as_str().is_some_and(|key| map.contains_key(key))),
        Value::String(s) => needle.as_str().map(|sub| s.contains(sub)),
        _ => None,
    }
}

/// Short name of a value's kind, for error messages
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Render a value the way test-case authors see it printed
///
/// Strings render bare at the top level and quoted inside containers.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => {
            let mut out = String::new();
            write_repr(&mut out, other);
            out
        }
    }
}

fn write_repr(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_quoted(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_repr(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_quoted(out, key);
                out.push_str(": ");
                write_repr(out, item);
            }
            out.push('}');
        }
    }
}

fn write_number(out: &mut String, n: &Number) {
    if let Some(i) = as_integer(n) {
        out.push_str(&i.to_string());
        return;
    }
    match n.as_f64() {
        Some(f) => out.push_str(&format_float(f)),
        None => out.push_str(&n.to_string()),
    }
}

/// Shortest round-trip digits, positional for exponents in `-4..16`,
/// otherwise `1e-05` / `1.5e+16` style
fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let scientific = format!("{:e}", f);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..16).contains(&exponent) {
        let plain = f.to_string();
        if plain.contains('.') {
            plain
        } else {
            format!("{}.0", plain)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

fn write_quoted(out: &mut String, s: &str) {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

/// Type names understood by `type_match`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Str,
    Int,
    Float,
    Bool,
    List,
    Tuple,
    Dict,
    Set,
    FrozenSet,
    Bytes,
    ByteArray,
    Complex,
    Object,
    NoneType,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Str => "str",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::List => "list",
            ValueType::Tuple => "tuple",
            ValueType::Dict => "dict",
            ValueType::Set => "set",
            ValueType::FrozenSet => "frozenset",
            ValueType::Bytes => "bytes",
            ValueType::ByteArray => "bytearray",
            ValueType::Complex => "complex",
            ValueType::Object => "object",
            ValueType::NoneType => "NoneType",
        }
    }

    /// Whether `value` is an instance of this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueType::Str => value.is_string(),
            // Booleans are not ints
            ValueType::Int => matches!(value, Value::Number(n) if !n.is_f64()),
            ValueType::Float => matches!(value, Value::Number(n) if n.is_f64()),
            ValueType::Bool => value.is_boolean(),
            // JSON arrays stand in for both sequence types
            ValueType::List | ValueType::Tuple => value.is_array(),
            ValueType::Dict => value.is_object(),
            ValueType::NoneType => value.is_null(),
            ValueType::Object => true,
            ValueType::Set
            | ValueType::FrozenSet
            | ValueType::Bytes
            | ValueType::ByteArray
            | ValueType::Complex => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a type name that does not resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownType(pub String);

/// Parse a builtin type name
///
/// Both `NoneType` and `None` name the null type, since test cases have
/// no other way to spell it. Names are case sensitive.
impl FromStr for ValueType {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" => Ok(ValueType::Str),
            "int" => Ok(ValueType::Int),
            "float" => Ok(ValueType::Float),
            "bool" => Ok(ValueType::Bool),
            "list" => Ok(ValueType::List),
            "tuple" => Ok(ValueType::Tuple),
            "dict" => Ok(ValueType::Dict),
            "set" => Ok(ValueType::Set),
            "frozenset" => Ok(ValueType::FrozenSet),
            "bytes" => Ok(ValueType::Bytes),
            "bytearray" => Ok(ValueType::ByteArray),
            "complex" => Ok(ValueType::Complex),
            "object" => Ok(ValueType::Object),
            "NoneType" | "None" => Ok(ValueType::NoneType),
            other => Err(UnknownType(other.to_string())),
        }
    }
}
