//! Setup hooks, run before a request is sent

use tracing::{debug, trace};

use super::charset;
use super::kwargs::{Payload, RequestKwargs};
use super::HookError;
use crate::json;
use crate::middleware::{NtlmAuthProvider, NtlmCredentials};

/// Request key holding NTLM credentials
pub const NTLM_CREDENTIALS_KEY: &str = "httpntlmauth";

/// Extract the charset from a Content-Type value
///
/// The value is lower-cased and everything after `charset=` is returned,
/// so `application/json; charset=UTF-8` yields `utf-8`.
pub fn get_charset_from_content_type(content_type: &str) -> Option<String> {
    let content_type = content_type.to_lowercase();
    content_type
        .find("charset=")
        .map(|index| content_type[index + "charset=".len()..].to_string())
}

/// Serialize and encode a POST body according to its Content-Type
///
/// JSON content types get the body dumped to a JSON string first; a
/// charset parameter then encodes the (now textual) body to bytes.
pub fn setup_hook_prepare_kwargs(
    method: &str,
    url: &str,
    kwargs: &mut RequestKwargs,
) -> Result<(), HookError> {
    if method != "POST" {
        return Ok(());
    }
    let content_type = match kwargs.content_type() {
        Some(ct) if !ct.is_empty() => ct.to_string(),
        _ => return Ok(()),
    };
    let Some(data) = kwargs.data.as_ref() else {
        return Ok(());
    };

    let mut prepared = None;

    if content_type.starts_with("application/json") {
        let value = data.to_json().ok_or(HookError::NotSerializable { kind: data.kind() })?;
        let dumped = json::dumps(&value)?;
        trace!(url, body = %dumped, "Request data dumped to JSON");
        prepared = Some(Payload::Text(dumped));
    }

    if let Some(charset) = get_charset_from_content_type(&content_type).filter(|c| !c.is_empty()) {
        let current = prepared.as_ref().unwrap_or(data);
        let text = current.as_text().ok_or_else(|| HookError::NotText {
            kind: current.kind(),
            charset: charset.clone(),
        })?;
        let encoded = charset::encode(text, &charset)?;
        trace!(url, charset = %charset, bytes = encoded.len(), "Request data encoded");
        prepared = Some(Payload::Bytes(encoded));
    }

    if let Some(payload) = prepared {
        debug!(url, content_type = %content_type, kind = payload.kind(), "Prepared request data");
        kwargs.data = Some(payload);
    }
    Ok(())
}

/// Replace `httpntlmauth` credentials with an NTLM auth handler
pub fn setup_hook_httpntlmauth(
    provider: &dyn NtlmAuthProvider,
    _method: &str,
    url: &str,
    kwargs: &mut RequestKwargs,
) -> Result<(), HookError> {
    let Some(raw) = kwargs.remove(NTLM_CREDENTIALS_KEY) else {
        return Ok(());
    };

    let credentials: NtlmCredentials =
        serde_json::from_value(raw).map_err(HookError::InvalidCredentials)?;
    debug!(url, username = %credentials.username, "Installing NTLM auth");

    kwargs.auth = Some(provider.build(credentials)?);
    Ok(())
}
