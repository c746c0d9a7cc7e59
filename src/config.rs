//! Config file handling
//!
//! ```toml
//! [comparators.aliases]
//! same = "equals"
//!
//! [hooks]
//! enabled = ["setup_hook_prepare_kwargs", "teardown_hook_sleep_1_secs"]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::comparators::{CompareError, ComparatorRegistry};
use crate::hooks::{Hook, HookError, HookRegistry};
use crate::middleware::NtlmAuthProvider;

const CONFIG_FILE: &str = "config.toml";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid comparator alias: {0}")]
    Alias(#[from] CompareError),

    #[error("invalid hook list: {0}")]
    Hook(#[from] HookError),
}

/// `[comparators]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ComparatorsConfig {
    /// Extra comparator names, alias → target
    pub aliases: IndexMap<String, String>,
}

/// `[hooks]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Hooks a registry may run; all when absent
    pub enabled: Option<Vec<String>>,
}

/// pulse-builtins configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub comparators: ComparatorsConfig,
    pub hooks: HooksConfig,
}

impl Config {
    /// Load from the default location; a missing file yields the defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_config_dir().join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(
            path = %path.display(),
            aliases = config.comparators.aliases.len(),
            "Config loaded"
        );
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.comparator_registry()?;
        config.enabled_hooks()?;
        Ok(config)
    }

    /// Get the default config directory
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("pulse-builtins"))
            .unwrap_or_else(|| PathBuf::from(".pulse-builtins"))
    }

    /// Built-in comparators extended with the configured aliases
    ///
    /// Aliases may refer to each other in any order.
    pub fn comparator_registry(&self) -> Result<ComparatorRegistry, ConfigError> {
        let mut registry = ComparatorRegistry::builtin().clone();
        let mut pending: Vec<(&str, &str)> = self
            .comparators
            .aliases
            .iter()
            .map(|(alias, target)| (alias.as_str(), target.as_str()))
            .collect();

        while !pending.is_empty() {
            let (ready, waiting): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|(_, target)| registry.resolve(target).is_some());

            if ready.is_empty() {
                let (alias, target) = waiting[0];
                return Err(CompareError::Params(format!(
                    "alias '{}' targets unknown comparator '{}'",
                    alias, target
                ))
                .into());
            }
            registry = registry.with_aliases(ready)?;
            pending = waiting;
        }
        Ok(registry)
    }

    /// Parsed `hooks.enabled`, if set
    pub fn enabled_hooks(&self) -> Result<Option<Vec<Hook>>, ConfigError> {
        let Some(names) = &self.hooks.enabled else {
            return Ok(None);
        };
        let hooks = names
            .iter()
            .map(|name| name.parse::<Hook>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(hooks))
    }

    /// Hook registry honoring `hooks.enabled`
    pub fn hook_registry(&self, ntlm: Arc<dyn NtlmAuthProvider>) -> Result<HookRegistry, ConfigError> {
        let registry = HookRegistry::new(ntlm);
        Ok(match self.enabled_hooks()? {
            Some(hooks) => registry.with_enabled(hooks),
            None => registry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparators::Comparator;

    #[test]
    fn test_empty_config() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.comparators.aliases.is_empty());
        assert!(config.enabled_hooks().unwrap().is_none());
    }

    #[test]
    fn test_aliases_in_any_order() {
        let config = Config::from_toml_str(
            r#"
            [comparators.aliases]
            twice = "same"
            same = "eq"
            "#,
        )
        .unwrap();

        let registry = config.comparator_registry().unwrap();
        assert_eq!(registry.resolve("twice"), Some(Comparator::Equals));
        assert_eq!(registry.resolve("same"), Some(Comparator::Equals));
    }

    #[test]
    fn test_alias_to_unknown_comparator() {
        let err = Config::from_toml_str(
            r#"
            [comparators.aliases]
            fuzzy = "roughly_equals"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Alias(_)));
    }

    #[test]
    fn test_unknown_hook_name() {
        let err = Config::from_toml_str(
            r#"
            [hooks]
            enabled = ["teardown_hook_sleep_2_secs"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Hook(HookError::UnknownHook(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml_str("[hooks\n").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
