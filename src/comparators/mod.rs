//! Comparator library
//!
//! Comparators validate an actual value (`check`, usually extracted from a
//! response) against an expected value (`expect`, from the test case).
//! The engine looks them up by name, so dispatch goes through an explicit
//! name → function table built once per process.

mod builtin;
pub mod value;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub use builtin::{resolve_type, type_match_kind};
pub use value::ValueType;

/// Comparator failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompareError {
    /// The comparator ran and found a mismatch
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// The comparator was misused (bad arguments, unknown name)
    #[error("invalid parameters: {0}")]
    Params(String),
}

impl CompareError {
    pub fn is_assertion(&self) -> bool {
        matches!(self, CompareError::Assertion(_))
    }

    pub fn is_params(&self) -> bool {
        matches!(self, CompareError::Params(_))
    }
}

/// Uniform comparator signature
pub type ComparatorFn = fn(&Value, &Value) -> Result<(), CompareError>;

/// Built-in comparators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    StringEquals,
    LengthEquals,
    LengthGreaterThan,
    LengthGreaterThanOrEquals,
    LengthLessThan,
    LengthLessThanOrEquals,
    Contains,
    ContainedBy,
    TypeMatch,
    RegexMatch,
    StartsWith,
    EndsWith,
}

impl Comparator {
    /// Canonical comparator name
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Equals => "equals",
            Comparator::NotEquals => "not_equals",
            Comparator::LessThan => "less_than",
            Comparator::LessThanOrEquals => "less_than_or_equals",
            Comparator::GreaterThan => "greater_than",
            Comparator::GreaterThanOrEquals => "greater_than_or_equals",
            Comparator::StringEquals => "string_equals",
            Comparator::LengthEquals => "length_equals",
            Comparator::LengthGreaterThan => "length_greater_than",
            Comparator::LengthGreaterThanOrEquals => "length_greater_than_or_equals",
            Comparator::LengthLessThan => "length_less_than",
            Comparator::LengthLessThanOrEquals => "length_less_than_or_equals",
            Comparator::Contains => "contains",
            Comparator::ContainedBy => "contained_by",
            Comparator::TypeMatch => "type_match",
            Comparator::RegexMatch => "regex_match",
            Comparator::StartsWith => "startswith",
            Comparator::EndsWith => "endswith",
        }
    }

    /// Short aliases accepted in test cases
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Comparator::Equals => &["eq", "==", "is"],
            Comparator::NotEquals => &["ne"],
            Comparator::LessThan => &["lt"],
            Comparator::LessThanOrEquals => &["le"],
            Comparator::GreaterThan => &["gt"],
            Comparator::GreaterThanOrEquals => &["ge"],
            Comparator::StringEquals => &["str_eq"],
            Comparator::LengthEquals => &["len_eq", "count_eq"],
            Comparator::LengthGreaterThan => &["len_gt", "count_gt"],
            Comparator::LengthGreaterThanOrEquals => &["len_ge", "count_ge"],
            Comparator::LengthLessThan => &["len_lt", "count_lt"],
            Comparator::LengthLessThanOrEquals => &["len_le", "count_le"],
            Comparator::Contains
            | Comparator::ContainedBy
            | Comparator::TypeMatch
            | Comparator::RegexMatch
            | Comparator::StartsWith
            | Comparator::EndsWith => &[],
        }
    }

    /// The function implementing this comparator
    pub fn function(&self) -> ComparatorFn {
        match self {
            Comparator::Equals => builtin::equals,
            Comparator::NotEquals => builtin::not_equals,
            Comparator::LessThan => builtin::less_than,
            Comparator::LessThanOrEquals => builtin::less_than_or_equals,
            Comparator::GreaterThan => builtin::greater_than,
            Comparator::GreaterThanOrEquals => builtin::greater_than_or_equals,
            Comparator::StringEquals => builtin::string_equals,
            Comparator::LengthEquals => builtin::length_equals,
            Comparator::LengthGreaterThan => builtin::length_greater_than,
            Comparator::LengthGreaterThanOrEquals => builtin::length_greater_than_or_equals,
            Comparator::LengthLessThan => builtin::length_less_than,
            Comparator::LengthLessThanOrEquals => builtin::length_less_than_or_equals,
            Comparator::Contains => builtin::contains,
            Comparator::ContainedBy => builtin::contained_by,
            Comparator::TypeMatch => builtin::type_match,
            Comparator::RegexMatch => builtin::regex_match,
            Comparator::StartsWith => builtin::startswith,
            Comparator::EndsWith => builtin::endswith,
        }
    }

    /// Run this comparator
    pub fn check(&self, check: &Value, expect: &Value) -> Result<(), CompareError> {
        (self.function())(check, expect)
    }

    /// All built-in comparators
    pub fn all() -> Vec<Self> {
        vec![
            Comparator::Equals,
            Comparator::NotEquals,
            Comparator::LessThan,
            Comparator::LessThanOrEquals,
            Comparator::GreaterThan,
            Comparator::GreaterThanOrEquals,
            Comparator::StringEquals,
            Comparator::LengthEquals,
            Comparator::LengthGreaterThan,
            Comparator::LengthGreaterThanOrEquals,
            Comparator::LengthLessThan,
            Comparator::LengthLessThanOrEquals,
            Comparator::Contains,
            Comparator::ContainedBy,
            Comparator::TypeMatch,
            Comparator::RegexMatch,
            Comparator::StartsWith,
            Comparator::EndsWith,
        ]
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparator {
    type Err = CompareError;

    /// Parse a canonical name or a built-in alias
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BUILTIN
            .resolve(s)
            .ok_or_else(|| CompareError::Params(format!("unknown comparator: {}", s)))
    }
}

static BUILTIN: Lazy<ComparatorRegistry> = Lazy::new(ComparatorRegistry::new);

/// Name → comparator table
#[derive(Debug, Clone)]
pub struct ComparatorRegistry {
    names: HashMap<String, Comparator>,
}

impl Default for ComparatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComparatorRegistry {
    /// Table of canonical names and built-in aliases
    pub fn new() -> Self {
        let mut names = HashMap::new();
        for comparator in Comparator::all() {
            names.insert(comparator.as_str().to_string(), comparator);
            for alias in comparator.aliases() {
                names.insert((*alias).to_string(), comparator);
            }
        }
        Self { names }
    }

    /// The process-wide built-in table
    pub fn builtin() -> &'static ComparatorRegistry {
        &BUILTIN
    }

    /// Copy of this table extended with user aliases
    ///
    /// Each alias may target a canonical name or an alias already in the
    /// table (including one defined earlier in `aliases`). Aliases cannot
    /// shadow an existing name.
    pub fn with_aliases<'a, I>(&self, aliases: I) -> Result<Self, CompareError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut extended = self.clone();
        for (alias, target) in aliases {
            if extended.names.contains_key(alias) {
                return Err(CompareError::Params(format!(
                    "alias '{}' shadows an existing comparator",
                    alias
                )));
            }
            let comparator = extended.resolve(target).ok_or_else(|| {
                CompareError::Params(format!(
                    "alias '{}' targets unknown comparator '{}'",
                    alias, target
                ))
            })?;
            extended.names.insert(alias.to_string(), comparator);
        }
        Ok(extended)
    }

    /// Look up a comparator by name or alias
    pub fn resolve(&self, name: &str) -> Option<Comparator> {
        self.names.get(name).copied()
    }

    /// Dispatch a comparison by name
    pub fn compare(&self, name: &str, check: &Value, expect: &Value) -> Result<(), CompareError> {
        let comparator = self
            .resolve(name)
            .ok_or_else(|| CompareError::Params(format!("unknown comparator: {}", name)))?;

        let result = comparator.check(check, expect);
        debug!(
            comparator = %comparator,
            check = %check,
            expect = %expect,
            passed = result.is_ok(),
            "Comparator evaluated"
        );
        result
    }
}

/// Dispatch a comparison by name against the built-in table
pub fn compare(name: &str, check: &Value, expect: &Value) -> Result<(), CompareError> {
    BUILTIN.compare(name, check, expect)
}
