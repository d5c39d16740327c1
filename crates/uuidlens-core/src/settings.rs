//! Runtime settings.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::warn;

use uuidlens_config::SettingsConfig;

use crate::cache::DEFAULT_CACHE_TIMEOUT;
use crate::entity::EntityType;

/// User-facing switches honoured by an enhancement session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// When false no scanning happens at all.
    pub enabled: bool,
    pub cache_timeout: Duration,
    /// Types not listed are enabled.
    pub entity_types: BTreeMap<EntityType, bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            entity_types: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn from_config(config: &SettingsConfig) -> Self {
        let mut entity_types = BTreeMap::new();
        for (name, enabled) in &config.entity_types {
            match name.parse::<EntityType>() {
                Ok(entity_type) => {
                    entity_types.insert(entity_type, *enabled);
                }
                Err(e) => warn!("Ignoring setting: {}", e),
            }
        }
        Self {
            enabled: config.enabled,
            cache_timeout: Duration::from_millis(config.cache_timeout_ms),
            entity_types,
        }
    }

    /// Whether occurrences of this type are resolved.
    pub fn is_type_enabled(&self, entity_type: EntityType) -> bool {
        self.entity_types.get(&entity_type).copied().unwrap_or(true)
    }

    pub fn with_type_enabled(mut self, entity_type: EntityType, enabled: bool) -> Self {
        self.entity_types.insert(entity_type, enabled);
        self
    }
}
