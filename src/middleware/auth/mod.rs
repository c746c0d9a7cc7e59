//! Authentication middleware
//!
//! Setup hooks install authentication into the request parameters as an
//! [`Auth`] handle. Handler construction for NTLM goes through the
//! [`NtlmAuthProvider`] trait so engines can supply their own
//! implementation, or build without the bundled one (`ntlm` feature).

#[cfg(feature = "ntlm")]
mod ntlm;

#[cfg(feature = "ntlm")]
pub use ntlm::{extract_challenge_from_header, parse_challenge_message, ChallengeMessage, NtlmAuth};

use std::fmt;
use std::sync::Arc;

use http::header::HeaderMap;
use serde::Deserialize;
use thiserror::Error;

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("invalid authentication challenge: {0}")]
    InvalidChallenge(String),

    #[error("NTLM authentication is not available in this build")]
    NtlmUnavailable,
}

/// An authentication scheme that can decorate request headers
pub trait AuthHandler: fmt::Debug + Send + Sync {
    /// Scheme name for display/debugging
    fn scheme(&self) -> &'static str;

    /// Apply the initial credentials to the outgoing headers
    fn apply(&self, headers: &mut HeaderMap) -> Result<(), AuthError>;

    /// User the handler authenticates as, if it has one
    fn principal(&self) -> Option<&str> {
        None
    }
}

/// Shared handle to an installed authentication handler
#[derive(Debug, Clone)]
pub struct Auth(Arc<dyn AuthHandler>);

impl Auth {
    pub fn new(handler: impl AuthHandler + 'static) -> Self {
        Auth(Arc::new(handler))
    }

    pub fn scheme(&self) -> &'static str {
        self.0.scheme()
    }

    pub fn principal(&self) -> Option<&str> {
        self.0.principal()
    }

    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        self.0.apply(headers)
    }
}

/// Credentials carried under the `httpntlmauth` request key
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct NtlmCredentials {
    pub username: String,
    pub password: String,
}

impl NtlmCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for NtlmCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NtlmCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Builds NTLM handlers from credentials
pub trait NtlmAuthProvider: Send + Sync {
    fn build(&self, credentials: NtlmCredentials) -> Result<Auth, AuthError>;
}

impl<F> NtlmAuthProvider for F
where
    F: Fn(NtlmCredentials) -> Result<Auth, AuthError> + Send + Sync,
{
    fn build(&self, credentials: NtlmCredentials) -> Result<Auth, AuthError> {
        self(credentials)
    }
}

/// Provider backed by the bundled NTLMv2 implementation
#[cfg(feature = "ntlm")]
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinNtlm;

#[cfg(feature = "ntlm")]
impl NtlmAuthProvider for BuiltinNtlm {
    fn build(&self, credentials: NtlmCredentials) -> Result<Auth, AuthError> {
        Ok(Auth::new(NtlmAuth::new(credentials.username, credentials.password)))
    }
}

/// Provider for builds without NTLM support; always fails
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableNtlm;

impl NtlmAuthProvider for UnavailableNtlm {
    fn build(&self, _credentials: NtlmCredentials) -> Result<Auth, AuthError> {
        Err(AuthError::NtlmUnavailable)
    }
}

/// The provider used when the engine does not inject one
pub fn default_ntlm_provider() -> Arc<dyn NtlmAuthProvider> {
    #[cfg(feature = "ntlm")]
    {
        Arc::new(BuiltinNtlm)
    }
    #[cfg(not(feature = "ntlm"))]
    {
        Arc::new(UnavailableNtlm)
    }
}
