//! pulse-builtins library interface
//!
//! Built-in comparators and request hooks for a data-driven HTTP test
//! runner. The runner loads test cases, sends requests and looks the
//! helpers here up by name.
//!
//! # Module Organization
//!
//! - [`comparators`] - Named `(check, expect)` validators (equals, contains, regex_match, ...)
//! - [`hooks`] - Setup/teardown hooks run around each request
//! - [`middleware`] - Authentication handlers installed by hooks (NTLM)
//! - [`config`] - TOML configuration (comparator aliases, enabled hooks)
//! - [`errors`] - Error types (BuiltinsError, Result)
//! - [`json`] - Request-body JSON serialization
//! - [`logging`] - tracing subscriber setup

pub mod comparators;
pub mod config;
pub mod errors;
pub mod hooks;
pub mod json;
pub mod logging;
pub mod middleware;

pub use comparators::{compare, CompareError, Comparator, ComparatorRegistry, ValueType};
pub use config::Config;
pub use errors::{BuiltinsError, Result};
pub use hooks::{HookError, HookRegistry, HookResponse, Payload, RequestKwargs};
