//! Built-in comparator functions
//!
//! Every comparator takes `(check, expect)` and either returns `Ok(())` or
//! fails. A mismatch is `CompareError::Assertion`; a violated precondition
//! is `CompareError::Params`.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::Value;

use super::value::{
    compare_values, contains_value, kind_name, stringify, value_len, values_equal, ValueType,
};
use super::CompareError;

type CompareResult = Result<(), CompareError>;

fn ensure(passed: bool, message: impl FnOnce() -> String) -> CompareResult {
    if passed {
        Ok(())
    } else {
        Err(CompareError::Assertion(message()))
    }
}

pub fn equals(check: &Value, expect: &Value) -> CompareResult {
    ensure(values_equal(check, expect), || format!("{} == {}", check, expect))
}

pub fn not_equals(check: &Value, expect: &Value) -> CompareResult {
    ensure(!values_equal(check, expect), || format!("{} != {}", check, expect))
}

fn ordered(check: &Value, expect: &Value) -> Result<Ordering, CompareError> {
    compare_values(check, expect).ok_or_else(|| {
        CompareError::Params(format!(
            "'{}' and '{}' values cannot be ordered",
            kind_name(check),
            kind_name(expect)
        ))
    })
}

pub fn less_than(check: &Value, expect: &Value) -> CompareResult {
    let ord = ordered(check, expect)?;
    ensure(ord == Ordering::Less, || format!("{} < {}", check, expect))
}

pub fn less_than_or_equals(check: &Value, expect: &Value) -> CompareResult {
    let ord = ordered(check, expect)?;
    ensure(ord != Ordering::Greater, || format!("{} <= {}", check, expect))
}

pub fn greater_than(check: &Value, expect: &Value) -> CompareResult {
    let ord = ordered(check, expect)?;
    ensure(ord == Ordering::Greater, || format!("{} > {}", check, expect))
}

pub fn greater_than_or_equals(check: &Value, expect: &Value) -> CompareResult {
    let ord = ordered(check, expect)?;
    ensure(ord != Ordering::Less, || format!("{} >= {}", check, expect))
}

pub fn string_equals(check: &Value, expect: &Value) -> CompareResult {
    let (actual, expected) = (stringify(check), stringify(expect));
    ensure(actual == expected, || format!("'{}' == '{}'", actual, expected))
}

/// Validate a length comparison's arguments, yielding `(len(check), expect)`
///
/// `true`/`false` are not integers here, so a boolean expectation is a
/// `Params` error.
fn lengths(check: &Value, expect: &Value) -> Result<(i128, i128), CompareError> {
    let expected = match expect {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from)),
        _ => None,
    }
    .ok_or_else(|| {
        CompareError::Params(format!(
            "expected length must be an integer, got {} '{}'",
            kind_name(expect),
            expect
        ))
    })?;

    let actual = value_len(check).ok_or_else(|| {
        CompareError::Params(format!("object of type '{}' has no length", kind_name(check)))
    })?;

    Ok((actual as i128, expected))
}

pub fn length_equals(check: &Value, expect: &Value) -> CompareResult {
    let (actual, expected) = lengths(check, expect)?;
    ensure(actual == expected, || format!("len {} == {}", actual, expected))
}

pub fn length_greater_than(check: &Value, expect: &Value) -> CompareResult {
    let (actual, expected) = lengths(check, expect)?;
    ensure(actual > expected, || format!("len {} > {}", actual, expected))
}

pub fn length_greater_than_or_equals(check: &Value, expect: &Value) -> CompareResult {
    let (actual, expected) = lengths(check, expect)?;
    ensure(actual >= expected, || format!("len {} >= {}", actual, expected))
}

pub fn length_less_than(check: &Value, expect: &Value) -> CompareResult {
    let (actual, expected) = lengths(check, expect)?;
    ensure(actual < expected, || format!("len {} < {}", actual, expected))
}

pub fn length_less_than_or_equals(check: &Value, expect: &Value) -> CompareResult {
    let (actual, expected) = lengths(check, expect)?;
    ensure(actual <= expected, || format!("len {} <= {}", actual, expected))
}

fn membership(container: &Value, member: &Value) -> Result<bool, CompareError> {
    contains_value(container, member).ok_or_else(|| {
        if value_len(container).is_none() {
            CompareError::Params(format!(
                "'{}' is not a sequence, set, mapping or string",
                kind_name(container)
            ))
        } else {
            CompareError::Params(format!(
                "'in <string>' requires string as left operand, not {}",
                kind_name(member)
            ))
        }
    })
}

pub fn contains(check: &Value, expect: &Value) -> CompareResult {
    let found = membership(check, expect)?;
    ensure(found, || format!("{} contains {}", check, expect))
}

pub fn contained_by(check: &Value, expect: &Value) -> CompareResult {
    let found = membership(expect, check)?;
    ensure(found, || format!("{} contained by {}", check, expect))
}

/// Resolve a type from its builtin name
pub fn resolve_type(expect: &Value) -> Result<ValueType, CompareError> {
    match expect {
        Value::String(name) => name
            .parse::<ValueType>()
            .map_err(|e| CompareError::Params(format!("unknown type name: {}", e.0))),
        other => Err(CompareError::Params(format!(
            "type must be named by a string, got {}",
            other
        ))),
    }
}

/// `type_match` with an already-resolved type
pub fn type_match_kind(check: &Value, expected: ValueType) -> CompareResult {
    ensure(expected.matches(check), || {
        format!("{} is a {}, not {}", check, kind_name(check), expected)
    })
}

pub fn type_match(check: &Value, expect: &Value) -> CompareResult {
    type_match_kind(check, resolve_type(expect)?)
}

pub fn regex_match(check: &Value, expect: &Value) -> CompareResult {
    let (Value::String(text), Value::String(pattern)) = (check, expect) else {
        return Err(CompareError::Params(format!(
            "regex_match requires strings, got {} and {}",
            kind_name(check),
            kind_name(expect)
        )));
    };

    // Anchored at the start only, trailing text is allowed
    let anchored = Regex::new(&format!(r"\A(?:{})", pattern))
        .map_err(|e| CompareError::Params(format!("invalid regex '{}': {}", pattern, e)))?;

    // `$` also matches just before a single trailing newline
    let matched = anchored.is_match(text)
        || text.strip_suffix('\n').is_some_and(|head| anchored.is_match(head));

    ensure(matched, || {
        format!("'{}' does not match '{}'", text, pattern)
    })
}

pub fn startswith(check: &Value, expect: &Value) -> CompareResult {
    let (actual, prefix) = (stringify(check), stringify(expect));
    ensure(actual.starts_with(&prefix), || {
        format!("'{}' starts with '{}'", actual, prefix)
    })
}

pub fn endswith(check: &Value, expect: &Value) -> CompareResult {
    let (actual, suffix) = (stringify(check), stringify(expect));
    ensure(actual.ends_with(&suffix), || {
        format!("'{}' ends with '{}'", actual, suffix)
    })
}
