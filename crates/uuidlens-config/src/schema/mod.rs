//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

mod schema_authority;
mod schema_pipeline;

pub use schema_authority::*;
pub use schema_pipeline::*;

/// Shared default helper used by submodules.
pub(crate) fn default_true() -> bool {
    true
}

/// Entity type names in classification priority order.
pub const ENTITY_TYPE_NAMES: [&str; 6] = [
    "organization-group",
    "product",
    "script",
    "tag",
    "application",
    "profile",
];

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: SettingsConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub annotator: AnnotatorConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Remote authority connection. Absent means resolution is unavailable.
    #[serde(default)]
    pub authority: Option<AuthorityConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// User-facing settings, the values a settings page would edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Master switch. When false nothing is scanned.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache entry lifetime in milliseconds.
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,

    /// Per entity type resolution switch, keyed by type name.
    #[serde(default = "default_entity_types")]
    pub entity_types: BTreeMap<String, bool>,
}

impl SettingsConfig {
    /// Whether resolution is enabled for the named type. Unlisted types are enabled.
    pub fn is_type_enabled(&self, name: &str) -> bool {
        self.entity_types.get(name).copied().unwrap_or(true)
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            cache_timeout_ms: default_cache_timeout_ms(),
            entity_types: default_entity_types(),
        }
    }
}

fn default_cache_timeout_ms() -> u64 {
    5 * 60 * 1000
}

fn default_entity_types() -> BTreeMap<String, bool> {
    ENTITY_TYPE_NAMES
        .iter()
        .map(|name| (name.to_string(), true))
        .collect()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files. Console only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
