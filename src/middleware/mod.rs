//! Request middleware
//!
//! Authentication handlers that setup hooks install into the outgoing
//! request parameters.

pub mod auth;

pub use auth::{Auth, AuthError, AuthHandler, NtlmAuthProvider, NtlmCredentials};
