//! Request parameters and response snapshots handed to hooks

use std::borrow::Cow;
use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::{Map, Value};

use super::HookError;
use crate::comparators::value::{kind_name, stringify};
use crate::middleware::Auth;

/// Request body as it moves through the setup hooks
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Structured data straight from the test case
    Json(Value),
    /// Serialized text
    Text(String),
    /// Encoded bytes, ready to send
    Bytes(Vec<u8>),
}

impl Payload {
    /// Kind name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Json(value) => kind_name(value),
            Payload::Text(_) => "str",
            Payload::Bytes(_) => "bytes",
        }
    }

    /// The payload as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Json(Value::String(s)) | Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The payload as a JSON value, if it can be serialized
    pub fn to_json(&self) -> Option<Cow<'_, Value>> {
        match self {
            Payload::Json(value) => Some(Cow::Borrowed(value)),
            Payload::Text(s) => Some(Cow::Owned(Value::String(s.clone()))),
            Payload::Bytes(_) => None,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

/// Mutable request parameters passed to setup hooks
///
/// `headers`, `data` and `auth` get typed fields; every other entry of the
/// test case's request block lives in `extra`.
#[derive(Debug, Clone, Default)]
pub struct RequestKwargs {
    pub headers: HeaderMap,
    pub data: Option<Payload>,
    pub auth: Option<Auth>,
    pub extra: Map<String, Value>,
}

impl RequestKwargs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a test case's request mapping
    pub fn from_json(value: Value) -> Result<Self, HookError> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(HookError::InvalidKwargs(format!(
                    "request arguments must be a mapping, got {}",
                    kind_name(&other)
                )));
            }
        };

        let mut kwargs = Self::new();

        match map.remove("headers") {
            None | Some(Value::Null) => {}
            Some(Value::Object(headers)) => {
                for (name, value) in headers {
                    kwargs.set_header(&name, &stringify(&value))?;
                }
            }
            Some(other) => {
                return Err(HookError::InvalidKwargs(format!(
                    "headers must be a mapping, got {}",
                    kind_name(&other)
                )));
            }
        }

        kwargs.data = map.remove("data").map(Payload::Json);
        kwargs.extra = map;
        Ok(kwargs)
    }

    /// Builder-style header insertion
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, HookError> {
        self.set_header(name, value)?;
        Ok(self)
    }

    /// Builder-style body
    pub fn data(mut self, data: impl Into<Payload>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), HookError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HookError::InvalidKwargs(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| HookError::InvalidKwargs(format!("invalid value for header '{}': {}", name, e)))?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// The `content-type` header, if present and printable
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.extra.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.extra.remove(key)
    }
}

/// Snapshot of a received response, passed to teardown hooks
#[derive(Debug, Clone, Default)]
pub struct HookResponse {
    pub url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub elapsed: Duration,
}

impl HookResponse {
    pub fn new(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_splits_known_keys() {
        let kwargs = RequestKwargs::from_json(json!({
            "headers": {"Content-Type": "application/json", "X-Retry": 3},
            "data": {"a": 1},
            "params": {"page": 2},
            "timeout": 5
        }))
        .unwrap();

        assert_eq!(kwargs.content_type(), Some("application/json"));
        assert_eq!(kwargs.headers.get("x-retry").unwrap(), "3");
        assert_eq!(kwargs.data, Some(Payload::Json(json!({"a": 1}))));
        assert_eq!(kwargs.get("params"), Some(&json!({"page": 2})));
        assert_eq!(kwargs.get("timeout"), Some(&json!(5)));
        assert!(kwargs.auth.is_none());
    }

    #[test]
    fn test_from_json_rejects_bad_shapes() {
        assert!(RequestKwargs::from_json(json!([1, 2])).is_err());
        assert!(RequestKwargs::from_json(json!({"headers": "nope"})).is_err());
        assert!(RequestKwargs::from_json(json!({"headers": {"bad header": "x"}})).is_err());
    }

    #[test]
    fn test_payload_views() {
        assert_eq!(Payload::Json(json!("abc")).as_text(), Some("abc"));
        assert_eq!(Payload::Json(json!({"a": 1})).as_text(), None);
        assert_eq!(Payload::Bytes(vec![1]).kind(), "bytes");
        assert_eq!(Payload::Json(json!({})).kind(), "dict");
        assert!(Payload::Bytes(vec![1]).to_json().is_none());
    }
}
