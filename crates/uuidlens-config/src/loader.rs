//! Configuration loader.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

static ENV_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a file, or the defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();

        for cap in ENV_VAR.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.config`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AuthConfig;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert!(config.settings.enabled);
        assert_eq!(config.scan.debounce_ms, 250);
    }

    #[test]
    fn test_load_settings() {
        let content = r#"
            [settings]
            enabled = false
            cache_timeout_ms = 60000

            [settings.entity_types]
            script = false
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert!(!config.settings.enabled);
        assert_eq!(config.settings.cache_timeout_ms, 60000);
        assert!(!config.settings.is_type_enabled("script"));
        assert!(config.settings.is_type_enabled("tag"));
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [scan]
            include = ["form", ".settings-panel"]
            debounce_ms = 100

            [classifier.keywords]
            script = ["script", "worker"]

            [classifier.phrases]
            "worker id" = "script"

            [resolver]
            max_concurrency = 4

            [authority]
            base_url = "https://uem.example.com"

            [authority.auth]
            type = "basic"
            username = "api"
            password = "secret"
            tenant_key = "tenant"

            [authority.endpoints]
            tag = "/v2/tags/{uuid}"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.scan.include.len(), 2);
        assert_eq!(config.scan.debounce_ms, 100);
        assert_eq!(config.classifier.keywords["script"].len(), 2);
        assert_eq!(config.classifier.phrases["worker id"], "script");
        assert_eq!(config.resolver.max_concurrency, 4);

        let authority = config.authority.unwrap();
        assert_eq!(authority.timeout_secs, 30);
        assert_eq!(authority.endpoint_for("tag").unwrap(), "/v2/tags/{uuid}");
        assert!(matches!(authority.auth, AuthConfig::Basic { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[settings]").unwrap();
        writeln!(file, "cache_timeout_ms = 1000").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.settings.cache_timeout_ms, 1000);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/uuidlens.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config =
            ConfigLoader::load_or_default(Path::new("/nonexistent/path/uuidlens.toml")).unwrap();
        assert!(config.settings.enabled);
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("UUIDLENS_TEST_CONFIG_VAR", "test_value");
        }
        let content = "value = \"${UUIDLENS_TEST_CONFIG_VAR}\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert!(expanded.contains("test_value"));
        unsafe {
            std::env::remove_var("UUIDLENS_TEST_CONFIG_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_UUIDLENS_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = ConfigLoader::expand_path("~/logs");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/logs"));
    }
}
