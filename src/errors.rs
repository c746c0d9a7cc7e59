//! Error types for pulse-builtins

use thiserror::Error;

pub use crate::comparators::CompareError;
pub use crate::config::ConfigError;
pub use crate::hooks::HookError;
pub use crate::middleware::auth::AuthError;

/// Main error type for pulse-builtins
///
/// Each subsystem keeps its own error enum so callers can tell a
/// comparator mismatch apart from misuse; this type only aggregates them
/// for engines that want a single `?`-able error.
#[derive(Error, Debug)]
pub enum BuiltinsError {
    #[error(transparent)]
    Compare(#[from] CompareError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BuiltinsError {
    /// Whether this error is a comparator mismatch (as opposed to misuse)
    pub fn is_assertion(&self) -> bool {
        matches!(self, BuiltinsError::Compare(e) if e.is_assertion())
    }
}

pub type Result<T> = std::result::Result<T, BuiltinsError>;
