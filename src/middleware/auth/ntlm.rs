//! NTLM authentication handler
//!
//! Installed by the `setup_hook_httpntlmauth` hook. Produces the messages
//! of the three-leg NTLM handshake:
//!
//! 1. `NEGOTIATE` (type 1), sent with the first request
//! 2. `CHALLENGE` (type 2), returned by the server in `WWW-Authenticate`
//! 3. `AUTHENTICATE` (type 3), the NTLMv2 response to the challenge

use base64::Engine;
use hmac::{Hmac, Mac};
use http::header::{HeaderMap, HeaderValue, AUTHORIZATION, WWW_AUTHENTICATE};
use md4::{Digest, Md4};
use md5_digest::Md5;
use rand::RngCore;

use super::{AuthError, AuthHandler};

type HmacMd5 = Hmac<Md5>;

const SIGNATURE: &[u8; 8] = b"NTLMSSP\0";

const NEGOTIATE_UNICODE: u32 = 0x0000_0001;
const NEGOTIATE_OEM: u32 = 0x0000_0002;
const REQUEST_TARGET: u32 = 0x0000_0004;
const NEGOTIATE_NTLM: u32 = 0x0000_0200;
const NEGOTIATE_ALWAYS_SIGN: u32 = 0x0000_8000;
const NEGOTIATE_EXTENDED_SESSIONSECURITY: u32 = 0x0008_0000;
const NEGOTIATE_TARGET_INFO: u32 = 0x0080_0000;
const NEGOTIATE_128: u32 = 0x2000_0000;
const NEGOTIATE_56: u32 = 0x8000_0000;

const NEGOTIATE_FLAGS: u32 = NEGOTIATE_UNICODE
    | NEGOTIATE_OEM
    | REQUEST_TARGET
    | NEGOTIATE_NTLM
    | NEGOTIATE_ALWAYS_SIGN
    | NEGOTIATE_EXTENDED_SESSIONSECURITY
    | NEGOTIATE_TARGET_INFO
    | NEGOTIATE_128
    | NEGOTIATE_56;

/// FILETIME of the Unix epoch (100ns ticks since 1601-01-01)
const FILETIME_UNIX_OFFSET: u64 = 116_444_736_000_000_000;

/// NTLM credentials for one user
#[derive(Debug, Clone)]
pub struct NtlmAuth {
    username: String,
    password: String,
    domain: Option<String>,
    workstation: Option<String>,
}

/// Parsed type 2 message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeMessage {
    pub server_challenge: [u8; 8],
    pub flags: u32,
    pub target_name: Option<String>,
    pub target_info: Option<Vec<u8>>,
}

impl NtlmAuth {
    /// Accepts `user`, `DOMAIN\user` or `user@domain`
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        let (user, domain) = match username.split_once('\\') {
            Some((domain, user)) => (user.to_string(), Some(domain.to_string())),
            None => match username.split_once('@') {
                Some((user, domain)) => (user.to_string(), Some(domain.to_string())),
                None => (username, None),
            },
        };

        Self {
            username: user,
            password: password.into(),
            domain,
            workstation: None,
        }
    }

    pub fn workstation(mut self, name: impl Into<String>) -> Self {
        self.workstation = Some(name.into());
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Type 1 message; domain and workstation are left for the type 3
    pub fn negotiate_message(&self) -> Vec<u8> {
        let mut msg = Vec::with_capacity(32);
        msg.extend_from_slice(SIGNATURE);
        msg.extend_from_slice(&1u32.to_le_bytes());
        msg.extend_from_slice(&NEGOTIATE_FLAGS.to_le_bytes());
        // Empty domain and workstation security buffers
        msg.extend_from_slice(&[0u8; 16]);
        msg
    }

    /// Type 3 message answering `challenge`
    pub fn authenticate_message(&self, challenge: &ChallengeMessage) -> Result<Vec<u8>, AuthError> {
        let mut client_challenge = [0u8; 8];
        rand::rng().fill_bytes(&mut client_challenge);
        self.authenticate_message_with(challenge, &client_challenge, filetime_now())
    }

    fn authenticate_message_with(
        &self,
        challenge: &ChallengeMessage,
        client_challenge: &[u8; 8],
        timestamp: u64,
    ) -> Result<Vec<u8>, AuthError> {
        let key = self.ntlmv2_key()?;

        let mut blob = Vec::with_capacity(32 + challenge.target_info.as_ref().map_or(0, Vec::len));
        blob.extend_from_slice(&[0x01, 0x01, 0x00, 0x00]);
        blob.extend_from_slice(&[0u8; 4]);
        blob.extend_from_slice(&timestamp.to_le_bytes());
        blob.extend_from_slice(client_challenge);
        blob.extend_from_slice(&[0u8; 4]);
        if let Some(info) = &challenge.target_info {
            blob.extend_from_slice(info);
        }
        blob.extend_from_slice(&[0u8; 4]);

        let mut nt_response = hmac_md5(&key, &[&challenge.server_challenge[..], &blob[..]])?;
        nt_response.extend_from_slice(&blob);

        let mut lm_response = hmac_md5(&key, &[&challenge.server_challenge[..], &client_challenge[..]])?;
        lm_response.extend_from_slice(client_challenge);

        let fields = [
            lm_response,
            nt_response,
            utf16le(self.domain.as_deref().unwrap_or("")),
            utf16le(&self.username),
            utf16le(self.workstation.as_deref().unwrap_or("")),
            // No session key
            Vec::new(),
        ];

        // Header: signature, type, six security buffers, flags
        let header_len = 8 + 4 + fields.len() * 8 + 4;
        let mut msg = Vec::with_capacity(header_len + fields.iter().map(Vec::len).sum::<usize>());
        msg.extend_from_slice(SIGNATURE);
        msg.extend_from_slice(&3u32.to_le_bytes());

        let mut offset = header_len as u32;
        for field in &fields {
            let len = u16::try_from(field.len())
                .map_err(|_| AuthError::InvalidCredentials("NTLM field too long".to_string()))?;
            msg.extend_from_slice(&len.to_le_bytes());
            msg.extend_from_slice(&len.to_le_bytes());
            msg.extend_from_slice(&offset.to_le_bytes());
            offset += u32::from(len);
        }
        msg.extend_from_slice(&challenge.flags.to_le_bytes());

        for field in &fields {
            msg.extend_from_slice(field);
        }
        Ok(msg)
    }

    /// HMAC-MD5(MD4(password), UPPER(user) + domain)
    fn ntlmv2_key(&self) -> Result<Vec<u8>, AuthError> {
        let nt_hash = Md4::digest(utf16le(&self.password));
        let identity = format!(
            "{}{}",
            self.username.to_uppercase(),
            self.domain.as_deref().unwrap_or("")
        );
        hmac_md5(&nt_hash, &[utf16le(&identity).as_slice()])
    }

    /// `Authorization` header carrying the type 3 message
    pub fn authenticate_header(&self, challenge: &ChallengeMessage) -> Result<HeaderValue, AuthError> {
        header_value(&self.authenticate_message(challenge)?)
    }
}

impl AuthHandler for NtlmAuth {
    fn scheme(&self) -> &'static str {
        "ntlm"
    }

    fn apply(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        headers.insert(AUTHORIZATION, header_value(&self.negotiate_message())?);
        Ok(())
    }

    fn principal(&self) -> Option<&str> {
        Some(&self.username)
    }
}

fn header_value(message: &[u8]) -> Result<HeaderValue, AuthError> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(message);
    HeaderValue::from_str(&format!("NTLM {}", encoded))
        .map_err(|e| AuthError::InvalidHeader(e.to_string()))
}

fn hmac_md5(key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>, AuthError> {
    let mut mac = HmacMd5::new_from_slice(key)
        .map_err(|e| AuthError::InvalidCredentials(format!("HMAC error: {}", e)))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().to_vec())
}

fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn filetime_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs() * 10_000_000 + u64::from(now.subsec_nanos()) / 100 + FILETIME_UNIX_OFFSET
}

fn read_u16(data: &[u8], at: usize) -> usize {
    u16::from_le_bytes([data[at], data[at + 1]]) as usize
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Slice referenced by the security buffer at `at`, if in bounds and non-empty
fn security_buffer(data: &[u8], at: usize) -> Option<&[u8]> {
    let len = read_u16(data, at);
    let offset = read_u32(data, at + 4) as usize;
    (len > 0).then(|| data.get(offset..offset.checked_add(len)?)).flatten()
}

/// Parse a raw type 2 message
pub fn parse_challenge_message(data: &[u8]) -> Result<ChallengeMessage, AuthError> {
    if data.len() < 32 {
        return Err(AuthError::InvalidChallenge("message too short".to_string()));
    }
    if &data[0..8] != SIGNATURE {
        return Err(AuthError::InvalidChallenge("invalid NTLM signature".to_string()));
    }
    let msg_type = read_u32(data, 8);
    if msg_type != 2 {
        return Err(AuthError::InvalidChallenge(format!(
            "expected type 2 message, got type {}",
            msg_type
        )));
    }

    let flags = read_u32(data, 20);
    let mut server_challenge = [0u8; 8];
    server_challenge.copy_from_slice(&data[24..32]);

    let target_name = security_buffer(data, 12).map(|bytes| {
        let units: Vec<u16> = bytes
            .chunks(2)
            .map(|c| u16::from_le_bytes([c[0], c.get(1).copied().unwrap_or(0)]))
            .collect();
        String::from_utf16_lossy(&units)
    });

    let target_info = if data.len() >= 48 && flags & NEGOTIATE_TARGET_INFO != 0 {
        security_buffer(data, 40).map(<[u8]>::to_vec)
    } else {
        None
    };

    Ok(ChallengeMessage {
        server_challenge,
        flags,
        target_name,
        target_info,
    })
}

/// Parse the type 2 message from a `WWW-Authenticate: NTLM ...` header
pub fn extract_challenge_from_header(headers: &HeaderMap) -> Result<ChallengeMessage, AuthError> {
    let value = headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix("NTLM "))
        .ok_or_else(|| AuthError::InvalidChallenge("no NTLM challenge in WWW-Authenticate".to_string()))?;

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(value.trim())
        .map_err(|e| AuthError::InvalidChallenge(format!("base64 decode error: {}", e)))?;

    parse_challenge_message(&decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge_bytes(target_info: Option<&[u8]>) -> Vec<u8> {
        let mut msg = vec![0u8; 48];
        msg[0..8].copy_from_slice(SIGNATURE);
        msg[8..12].copy_from_slice(&2u32.to_le_bytes());
        let mut flags = NEGOTIATE_UNICODE | NEGOTIATE_NTLM;
        if target_info.is_some() {
            flags |= NEGOTIATE_TARGET_INFO;
        }
        msg[20..24].copy_from_slice(&flags.to_le_bytes());
        msg[24..32].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        if let Some(info) = target_info {
            msg[40..42].copy_from_slice(&(info.len() as u16).to_le_bytes());
            msg[44..48].copy_from_slice(&48u32.to_le_bytes());
            msg.extend_from_slice(info);
        }
        msg
    }

    #[test]
    fn test_username_forms() {
        let auth = NtlmAuth::new("CORP\\alice", "pw");
        assert_eq!((auth.username(), auth.domain()), ("alice", Some("CORP")));

        let auth = NtlmAuth::new("alice@corp.example", "pw");
        assert_eq!((auth.username(), auth.domain()), ("alice", Some("corp.example")));

        let auth = NtlmAuth::new("alice", "pw");
        assert_eq!((auth.username(), auth.domain()), ("alice", None));
    }

    #[test]
    fn test_apply_sends_negotiate() {
        let mut headers = HeaderMap::new();
        NtlmAuth::new("alice", "pw").apply(&mut headers).unwrap();

        let value = headers.get(AUTHORIZATION).unwrap().to_str().unwrap();
        let encoded = value.strip_prefix("NTLM ").unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(&decoded[0..8], SIGNATURE);
        assert_eq!(read_u32(&decoded, 8), 1);
        assert_eq!(read_u32(&decoded, 12), NEGOTIATE_FLAGS);
    }

    #[test]
    fn test_parse_challenge() {
        let parsed = parse_challenge_message(&challenge_bytes(Some(&[2, 0, 0, 0]))).unwrap();
        assert_eq!(parsed.server_challenge, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(parsed.target_info, Some(vec![2, 0, 0, 0]));
        assert_eq!(parsed.target_name, None);
    }

    #[test]
    fn test_parse_challenge_rejects_garbage() {
        assert!(parse_challenge_message(b"short").is_err());

        let mut wrong_type = challenge_bytes(None);
        wrong_type[8..12].copy_from_slice(&3u32.to_le_bytes());
        assert!(parse_challenge_message(&wrong_type).is_err());
    }

    #[test]
    fn test_extract_challenge_from_header() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(challenge_bytes(None));
        let mut headers = HeaderMap::new();
        headers.append(WWW_AUTHENTICATE, HeaderValue::from_static("Negotiate"));
        headers.append(
            WWW_AUTHENTICATE,
            HeaderValue::from_str(&format!("NTLM {}", encoded)).unwrap(),
        );

        let parsed = extract_challenge_from_header(&headers).unwrap();
        assert_eq!(parsed.server_challenge, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_authenticate_message_layout() {
        let auth = NtlmAuth::new("CORP\\alice", "password").workstation("WS01");
        let challenge = parse_challenge_message(&challenge_bytes(Some(&[0, 0, 0, 0]))).unwrap();
        let msg = auth
            .authenticate_message_with(&challenge, &[9; 8], FILETIME_UNIX_OFFSET)
            .unwrap();

        assert_eq!(&msg[0..8], SIGNATURE);
        assert_eq!(read_u32(&msg, 8), 3);

        // LMv2 response is 16 bytes of proof plus the client challenge
        assert_eq!(read_u16(&msg, 12), 24);
        assert_eq!(read_u32(&msg, 16), 64);

        // Username buffer points at UTF-16LE "alice"
        let user_len = read_u16(&msg, 36);
        let user_offset = read_u32(&msg, 40) as usize;
        assert_eq!(&msg[user_offset..user_offset + user_len], utf16le("alice").as_slice());

        // Deterministic for fixed inputs
        let again = auth
            .authenticate_message_with(&challenge, &[9; 8], FILETIME_UNIX_OFFSET)
            .unwrap();
        assert_eq!(msg, again);
    }

    #[test]
    fn test_authenticate_header() {
        let auth = NtlmAuth::new("alice", "pw");
        let challenge = parse_challenge_message(&challenge_bytes(None)).unwrap();
        let header = auth.authenticate_header(&challenge).unwrap();
        assert!(header.to_str().unwrap().starts_with("NTLM "));
    }
}
