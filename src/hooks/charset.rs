//! Strict text encoding for request bodies
//!
//! Labels resolve through `encoding_rs`, except for the few where its web
//! label table disagrees with the codec names test cases use: `ascii` and
//! `latin-1` are real 7-bit and 8-bit codecs here, not aliases of
//! windows-1252, and bare `utf-16` carries a byte order mark.

use encoding_rs::{Encoding, REPLACEMENT, UTF_16BE, UTF_16LE};

use super::HookError;

const UTF_16LE_BOM: [u8; 2] = [0xff, 0xfe];

/// A resolved charset label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// Code points up to U+007F
    Ascii,
    /// Code points up to U+00FF, one byte each
    Latin1,
    /// Little endian with a leading BOM
    Utf16,
    Utf16Le,
    Utf16Be,
    Other(&'static Encoding),
}

/// Resolve a charset label, accepting `latin_1` / `utf_8` style spellings
pub fn lookup(label: &str) -> Option<Charset> {
    let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
    let charset = match normalized.as_str() {
        "ascii" | "us-ascii" | "us" | "646" | "cp367" | "csascii" | "iso646-us"
        | "ansi-x3.4-1968" => Charset::Ascii,
        "latin-1" | "latin1" | "latin" | "l1" | "iso-8859-1" | "iso8859-1" | "8859"
        | "cp819" | "ibm819" | "iso-ir-100" | "csisolatin1" | "iso-8859-1:1987" => Charset::Latin1,
        "utf-16" | "utf16" => Charset::Utf16,
        "utf-16-le" | "utf-16le" | "utf16le" => Charset::Utf16Le,
        "utf-16-be" | "utf-16be" | "utf16be" => Charset::Utf16Be,
        other => match Encoding::for_label(other.as_bytes())? {
            encoding if encoding == REPLACEMENT => return None,
            encoding if encoding == UTF_16LE => Charset::Utf16Le,
            encoding if encoding == UTF_16BE => Charset::Utf16Be,
            encoding => Charset::Other(encoding),
        },
    };
    Some(charset)
}

/// Encode `text` with `charset`, failing on unrepresentable characters
pub fn encode(text: &str, charset: &str) -> Result<Vec<u8>, HookError> {
    let resolved = lookup(charset).ok_or_else(|| HookError::UnknownCharset(charset.to_string()))?;
    let unencodable = || HookError::Encode {
        charset: charset.to_string(),
    };

    match resolved {
        Charset::Ascii => encode_single_byte(text, 0x7f).ok_or_else(unencodable),
        Charset::Latin1 => encode_single_byte(text, 0xff).ok_or_else(unencodable),
        // encoding_rs only decodes UTF-16, so the byte orders are done here
        Charset::Utf16 => Ok(UTF_16LE_BOM
            .into_iter()
            .chain(text.encode_utf16().flat_map(u16::to_le_bytes))
            .collect()),
        Charset::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
        Charset::Utf16Be => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
        Charset::Other(encoding) => {
            let (bytes, _, had_errors) = encoding.encode(text);
            if had_errors {
                return Err(unencodable());
            }
            Ok(bytes.into_owned())
        }
    }
}

fn encode_single_byte(text: &str, max: u8) -> Option<Vec<u8>> {
    text.chars()
        .map(|c| u8::try_from(c).ok().filter(|b| *b <= max))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_utf8() {
        assert_eq!(encode("héllo", "utf-8").unwrap(), "héllo".as_bytes());
        assert_eq!(encode("x", "UTF8").unwrap(), b"x");
    }

    #[test]
    fn test_encode_legacy_charsets() {
        assert_eq!(encode("é", "latin_1").unwrap(), vec![0xe9]);
        assert_eq!(encode("\u{80}ÿ", "ISO-8859-1").unwrap(), vec![0x80, 0xff]);
        assert_eq!(encode("€", "windows-1252").unwrap(), vec![0x80]);
        assert_eq!(encode("中", "gbk").unwrap(), vec![0xd6, 0xd0]);
    }

    #[test]
    fn test_ascii_rejects_non_ascii() {
        assert_eq!(encode("cafe", "US-ASCII").unwrap(), b"cafe");
        let err = encode("é", "ascii").unwrap_err();
        assert!(matches!(err, HookError::Encode { ref charset } if charset == "ascii"));
    }

    #[test]
    fn test_latin1_rejects_beyond_u00ff() {
        assert!(matches!(encode("€", "iso-8859-1").unwrap_err(), HookError::Encode { .. }));
        assert!(matches!(encode("中", "latin1").unwrap_err(), HookError::Encode { .. }));
    }

    #[test]
    fn test_encode_utf16() {
        assert_eq!(encode("ab", "utf-16").unwrap(), vec![0xff, 0xfe, b'a', 0, b'b', 0]);
        assert_eq!(encode("ab", "utf_16_le").unwrap(), vec![b'a', 0, b'b', 0]);
        assert_eq!(encode("ab", "utf-16be").unwrap(), vec![0, b'a', 0, b'b']);
    }

    #[test]
    fn test_encode_unrepresentable_fails() {
        let err = encode("中", "shift_jis-nope").unwrap_err();
        assert!(matches!(err, HookError::UnknownCharset(_)));
        let err = encode("\u{1f980}", "gbk").unwrap_err();
        assert!(matches!(err, HookError::Encode { .. }));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("ASCII"), Some(Charset::Ascii));
        assert_eq!(lookup("iso8859_1"), Some(Charset::Latin1));
        assert_eq!(lookup("utf-8"), Some(Charset::Other(encoding_rs::UTF_8)));
        assert_eq!(lookup("no-such-charset"), None);
        // Labels that only map to the replacement decoder are rejected
        assert_eq!(lookup("iso-2022-kr"), None);
    }
}
