//! Request lifecycle hooks
//!
//! Test cases attach hooks by name. Setup hooks run before a request is
//! sent and may rewrite its parameters; teardown hooks run after the
//! response arrives. [`HookRegistry`] resolves names and owns the
//! collaborators hooks need (the NTLM handler provider).

mod charset;
mod kwargs;
mod setup;
mod teardown;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

pub use charset::encode as encode_charset;
pub use kwargs::{HookResponse, Payload, RequestKwargs};
pub use setup::{
    get_charset_from_content_type, setup_hook_httpntlmauth, setup_hook_prepare_kwargs,
    NTLM_CREDENTIALS_KEY,
};
pub use teardown::{teardown_hook_sleep_1_secs, SLEEP_1_SECS};

use crate::middleware::auth::{default_ntlm_provider, AuthError, NtlmAuthProvider};

/// Hook failure; hooks never recover, every error aborts the step
#[derive(Debug, Error)]
pub enum HookError {
    #[error("failed to serialize request data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request data of type '{kind}' is not JSON serializable")]
    NotSerializable { kind: &'static str },

    #[error("cannot encode request data of type '{kind}' with charset '{charset}': data is not text")]
    NotText { kind: &'static str, charset: String },

    #[error("unknown charset: {0}")]
    UnknownCharset(String),

    #[error("'{charset}' codec can't encode request data")]
    Encode { charset: String },

    #[error("invalid NTLM credentials: {0}")]
    InvalidCredentials(serde_json::Error),

    #[error("invalid request arguments: {0}")]
    InvalidKwargs(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("unknown hook: {0}")]
    UnknownHook(String),

    #[error("hook is disabled: {0}")]
    Disabled(String),
}

/// Hooks run before a request is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetupHook {
    PrepareKwargs,
    HttpNtlmAuth,
}

/// Hooks run after a response is received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeardownHook {
    Sleep1Secs,
}

/// Any built-in hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Setup(SetupHook),
    Teardown(TeardownHook),
}

impl SetupHook {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetupHook::PrepareKwargs => "setup_hook_prepare_kwargs",
            SetupHook::HttpNtlmAuth => "setup_hook_httpntlmauth",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![SetupHook::PrepareKwargs, SetupHook::HttpNtlmAuth]
    }
}

impl TeardownHook {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeardownHook::Sleep1Secs => "teardown_hook_sleep_1_secs",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![TeardownHook::Sleep1Secs]
    }
}

impl Hook {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::Setup(hook) => hook.as_str(),
            Hook::Teardown(hook) => hook.as_str(),
        }
    }

    /// Get all available hooks
    pub fn all() -> Vec<Self> {
        SetupHook::all()
            .into_iter()
            .map(Hook::Setup)
            .chain(TeardownHook::all().into_iter().map(Hook::Teardown))
            .collect()
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hook {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hook::all()
            .into_iter()
            .find(|hook| hook.as_str() == s)
            .ok_or_else(|| HookError::UnknownHook(s.to_string()))
    }
}

/// Resolves hook names and runs them
#[derive(Clone)]
pub struct HookRegistry {
    ntlm: Arc<dyn NtlmAuthProvider>,
    enabled: Option<HashSet<Hook>>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new(default_ntlm_provider())
    }
}

impl HookRegistry {
    /// Registry with every hook enabled
    pub fn new(ntlm: Arc<dyn NtlmAuthProvider>) -> Self {
        Self { ntlm, enabled: None }
    }

    /// Restrict the registry to the given hooks
    pub fn with_enabled(mut self, hooks: impl IntoIterator<Item = Hook>) -> Self {
        self.enabled = Some(hooks.into_iter().collect());
        self
    }

    pub fn is_enabled(&self, hook: Hook) -> bool {
        self.enabled.as_ref().map_or(true, |set| set.contains(&hook))
    }

    fn resolve(&self, name: &str) -> Result<Hook, HookError> {
        let hook: Hook = name.parse()?;
        if !self.is_enabled(hook) {
            return Err(HookError::Disabled(name.to_string()));
        }
        Ok(hook)
    }

    /// Run a setup hook by name
    pub fn run_setup(
        &self,
        name: &str,
        method: &str,
        url: &str,
        kwargs: &mut RequestKwargs,
    ) -> Result<(), HookError> {
        let hook = match self.resolve(name)? {
            Hook::Setup(hook) => hook,
            Hook::Teardown(_) => return Err(HookError::UnknownHook(format!("{} (not a setup hook)", name))),
        };

        debug!(hook = hook.as_str(), method, url, "Running setup hook");
        match hook {
            SetupHook::PrepareKwargs => setup_hook_prepare_kwargs(method, url, kwargs),
            SetupHook::HttpNtlmAuth => setup_hook_httpntlmauth(self.ntlm.as_ref(), method, url, kwargs),
        }
    }

    /// Run setup hooks in order, stopping at the first failure
    pub fn run_setup_hooks<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
        method: &str,
        url: &str,
        kwargs: &mut RequestKwargs,
    ) -> Result<(), HookError> {
        for name in names {
            self.run_setup(name, method, url, kwargs)?;
        }
        Ok(())
    }

    /// Run a teardown hook by name
    ///
    /// Returns a replacement response if the hook produced one.
    pub fn run_teardown(
        &self,
        name: &str,
        response: &HookResponse,
    ) -> Result<Option<HookResponse>, HookError> {
        let hook = match self.resolve(name)? {
            Hook::Teardown(hook) => hook,
            Hook::Setup(_) => return Err(HookError::UnknownHook(format!("{} (not a teardown hook)", name))),
        };

        debug!(hook = hook.as_str(), url = %response.url, status = response.status, "Running teardown hook");
        match hook {
            TeardownHook::Sleep1Secs => teardown_hook_sleep_1_secs(response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::{Auth, AuthHandler, NtlmCredentials};
    use http::header::HeaderMap;
    use serde_json::json;

    #[derive(Debug)]
    struct Recorded(String);

    impl AuthHandler for Recorded {
        fn scheme(&self) -> &'static str {
            "recorded"
        }

        fn apply(&self, _headers: &mut HeaderMap) -> Result<(), AuthError> {
            Ok(())
        }

        fn principal(&self) -> Option<&str> {
            Some(&self.0)
        }
    }

    fn recording_registry() -> HookRegistry {
        HookRegistry::new(Arc::new(|c: NtlmCredentials| -> Result<Auth, AuthError> {
            Ok(Auth::new(Recorded(c.username)))
        }))
    }

    #[test]
    fn test_hook_names() {
        assert_eq!(Hook::Setup(SetupHook::PrepareKwargs).as_str(), "setup_hook_prepare_kwargs");
        assert_eq!(
            "teardown_hook_sleep_1_secs".parse::<Hook>().unwrap(),
            Hook::Teardown(TeardownHook::Sleep1Secs)
        );
        assert!(matches!("nope".parse::<Hook>(), Err(HookError::UnknownHook(_))));
        assert_eq!(Hook::all().len(), 3);
    }

    #[test]
    fn test_run_setup_ntlm_uses_injected_provider() {
        let registry = recording_registry();
        let mut kwargs = RequestKwargs::from_json(json!({
            "httpntlmauth": {"username": "alice", "password": "pw"},
            "timeout": 3
        }))
        .unwrap();

        registry
            .run_setup("setup_hook_httpntlmauth", "GET", "http://example.com", &mut kwargs)
            .unwrap();

        let auth = kwargs.auth.as_ref().unwrap();
        assert_eq!(auth.scheme(), "recorded");
        assert_eq!(auth.principal(), Some("alice"));
        assert!(kwargs.get(NTLM_CREDENTIALS_KEY).is_none());
        assert_eq!(kwargs.get("timeout"), Some(&json!(3)));
    }

    #[test]
    fn test_run_setup_hooks_in_order() {
        let registry = recording_registry();
        let mut kwargs = RequestKwargs::from_json(json!({
            "headers": {"content-type": "application/json"},
            "data": {"k": "v"},
            "httpntlmauth": {"username": "bob", "password": "pw"}
        }))
        .unwrap();

        registry
            .run_setup_hooks(
                ["setup_hook_prepare_kwargs", "setup_hook_httpntlmauth"],
                "POST",
                "http://example.com",
                &mut kwargs,
            )
            .unwrap();

        assert_eq!(kwargs.data, Some(Payload::Text(r#"{"k": "v"}"#.to_string())));
        assert!(kwargs.auth.is_some());
    }

    #[test]
    fn test_wrong_phase_is_rejected() {
        let registry = HookRegistry::default();
        let mut kwargs = RequestKwargs::new();
        let err = registry
            .run_setup("teardown_hook_sleep_1_secs", "GET", "http://example.com", &mut kwargs)
            .unwrap_err();
        assert!(matches!(err, HookError::UnknownHook(_)));

        let response = HookResponse::new("http://example.com", 200);
        let err = registry
            .run_teardown("setup_hook_prepare_kwargs", &response)
            .unwrap_err();
        assert!(matches!(err, HookError::UnknownHook(_)));
    }

    #[test]
    fn test_disabled_hook() {
        let registry = HookRegistry::default().with_enabled([Hook::Setup(SetupHook::PrepareKwargs)]);
        assert!(!registry.is_enabled(Hook::Teardown(TeardownHook::Sleep1Secs)));

        let response = HookResponse::new("http://example.com", 200);
        let err = registry
            .run_teardown("teardown_hook_sleep_1_secs", &response)
            .unwrap_err();
        assert!(matches!(err, HookError::Disabled(_)));
    }
}
