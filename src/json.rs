//! JSON utilities
//!
//! Serialization that reproduces the text the test-case runtime produces
//! when it dumps a request body: `", "` and `": "` separators, non-ASCII
//! characters escaped as `\uXXXX`, key order preserved.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::Value;

/// Formatter writing `{"a": 1, "b": [1, 2]}` style output
#[derive(Debug, Default, Clone, Copy)]
pub struct DumpFormatter;

impl Formatter for DumpFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }

        let mut buf = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut buf) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Dump a value to a JSON string in request-body form
pub fn dumps(value: &Value) -> Result<String, serde_json::Error> {
    let mut out = Vec::with_capacity(128);
    let mut ser = Serializer::with_formatter(&mut out, DumpFormatter);
    value.serialize(&mut ser)?;
    // The formatter only ever emits ASCII
    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dumps_separators() {
        assert_eq!(dumps(&json!({"a": 1})).unwrap(), r#"{"a": 1}"#);
        assert_eq!(
            dumps(&json!({"a": [1, 2], "b": {"c": null}})).unwrap(),
            r#"{"a": [1, 2], "b": {"c": null}}"#
        );
    }

    #[test]
    fn test_dumps_preserves_key_order() {
        let value: Value = serde_json::from_str(r#"{"z": 1, "a": 2}"#).unwrap();
        assert_eq!(dumps(&value).unwrap(), r#"{"z": 1, "a": 2}"#);
    }

    #[test]
    fn test_dumps_escapes_non_ascii() {
        assert_eq!(dumps(&json!("é")).unwrap(), r#""\u00e9""#);
        // Astral characters become surrogate pairs
        assert_eq!(dumps(&json!("🦀")).unwrap(), r#""\ud83e\udd80""#);
    }

    #[test]
    fn test_dumps_scalars() {
        assert_eq!(dumps(&json!("plain")).unwrap(), r#""plain""#);
        assert_eq!(dumps(&json!(true)).unwrap(), "true");
        assert_eq!(dumps(&json!("a\"b\n")).unwrap(), r#""a\"b\n""#);
    }
}
