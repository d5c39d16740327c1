//! Configuration validation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;
use crate::schema::{AuthConfig, Config, ENTITY_TYPE_NAMES};

/// Grammar of a single compound selector: `tag.class#id[attr=value]`.
static SELECTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\*|[A-Za-z][\w-]*)?(\.[\w-]+|#[\w-]+|\[[\w-]+(=[^\]]*)?\])*$")
        .expect("selector pattern is valid")
});

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_settings(config, &mut result);
        Self::validate_scan(config, &mut result);
        Self::validate_classifier(config, &mut result);
        Self::validate_annotator(config, &mut result);
        Self::validate_resolver(config, &mut result);
        Self::validate_authority(config, &mut result);

        Ok(result)
    }

    /// Whether a string is a selector the DOM matcher understands.
    pub fn is_valid_selector(selector: &str) -> bool {
        !selector.trim().is_empty() && SELECTOR.is_match(selector.trim())
    }

    fn is_known_type(name: &str) -> bool {
        ENTITY_TYPE_NAMES.contains(&name)
    }

    fn validate_settings(config: &Config, result: &mut ValidationResult) {
        if config.settings.cache_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "settings.cache_timeout_ms",
                "cache_timeout_ms must be greater than 0",
            ));
        }

        for name in config.settings.entity_types.keys() {
            if !Self::is_known_type(name) {
                result.add_error(ValidationError::new(
                    format!("settings.entity_types.{}", name),
                    format!("Unknown entity type, valid values: {:?}", ENTITY_TYPE_NAMES),
                ));
            }
        }
    }

    fn validate_selectors(path: &str, selectors: &[String], result: &mut ValidationResult) {
        for selector in selectors {
            if !Self::is_valid_selector(selector) {
                result.add_error(ValidationError::new(
                    path,
                    format!("Unsupported selector '{}'", selector),
                ));
            }
        }
    }

    fn validate_scan(config: &Config, result: &mut ValidationResult) {
        let scan = &config.scan;
        Self::validate_selectors("scan.include", &scan.include, result);
        Self::validate_selectors("scan.exclude", &scan.exclude, result);
        Self::validate_selectors("scan.label_selectors", &scan.label_selectors, result);

        if scan.value_attributes.is_empty() {
            result.add_warning(ValidationWarning::new(
                "scan.value_attributes",
                "No value attributes configured, only text and form values are scanned",
            ));
        }

        if scan.debounce_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "scan.debounce_ms",
                "Debounce disabled, every mutation triggers a rescan",
            ));
        }

        if scan.debounce_ms + scan.reconcile_interval_ms >= 2000 {
            result.add_warning(ValidationWarning::new(
                "scan.reconcile_interval_ms",
                "Late values may take 2 seconds or more to be detected",
            ));
        }

        if scan.max_ancestor_depth == 0 {
            result.add_error(ValidationError::new(
                "scan.max_ancestor_depth",
                "max_ancestor_depth must be greater than 0",
            ));
        }
    }

    fn validate_classifier(config: &Config, result: &mut ValidationResult) {
        for (name, keywords) in &config.classifier.keywords {
            if !Self::is_known_type(name) {
                result.add_error(ValidationError::new(
                    format!("classifier.keywords.{}", name),
                    "Unknown entity type",
                ));
            } else if keywords.iter().all(|k| k.trim().is_empty()) {
                result.add_warning(ValidationWarning::new(
                    format!("classifier.keywords.{}", name),
                    "Empty keyword list, this type can only be matched by phrase",
                ));
            }
        }

        for (phrase, name) in &config.classifier.phrases {
            if !Self::is_known_type(name) {
                result.add_error(ValidationError::new(
                    format!("classifier.phrases.{}", phrase),
                    format!("Unknown entity type '{}'", name),
                ));
            }
        }
    }

    fn validate_annotator(config: &Config, result: &mut ValidationResult) {
        let marker = &config.annotator.marker_class;
        if marker.is_empty() || marker.contains(char::is_whitespace) {
            result.add_error(ValidationError::new(
                "annotator.marker_class",
                "marker_class must be a single non-empty class name",
            ));
        }
        Self::validate_selectors(
            "annotator.overlay_selectors",
            &config.annotator.overlay_selectors,
            result,
        );
    }

    fn validate_resolver(config: &Config, result: &mut ValidationResult) {
        let concurrency = config.resolver.max_concurrency;
        if concurrency == 0 {
            result.add_error(ValidationError::new(
                "resolver.max_concurrency",
                "max_concurrency must be greater than 0",
            ));
        } else if !(4..=8).contains(&concurrency) {
            result.add_warning(ValidationWarning::new(
                "resolver.max_concurrency",
                "max_concurrency outside the recommended range 4..=8",
            ));
        }
        if config.resolver.cache_capacity == 0 {
            result.add_error(ValidationError::new(
                "resolver.cache_capacity",
                "cache_capacity must be greater than 0",
            ));
        }
    }

    fn validate_authority(config: &Config, result: &mut ValidationResult) {
        let Some(ref authority) = config.authority else {
            result.add_warning(ValidationWarning::new(
                "authority",
                "No authority configured, UUIDs will be detected but not resolved",
            ));
            return;
        };

        if !authority.base_url.starts_with("http://") && !authority.base_url.starts_with("https://")
        {
            result.add_error(ValidationError::new(
                "authority.base_url",
                "base_url must start with http:// or https://",
            ));
        }

        if authority.timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "authority.timeout_secs",
                "timeout_secs must be greater than 0",
            ));
        }

        for (name, template) in &authority.endpoints {
            if !Self::is_known_type(name) {
                result.add_error(ValidationError::new(
                    format!("authority.endpoints.{}", name),
                    "Unknown entity type",
                ));
            }
            if !template.contains("{uuid}") {
                result.add_error(ValidationError::new(
                    format!("authority.endpoints.{}", name),
                    "Endpoint template must contain {uuid}",
                ));
            }
        }

        match &authority.auth {
            AuthConfig::Basic {
                username,
                password,
                tenant_key,
            } => {
                if username.is_empty() || password.is_empty() {
                    result.add_warning(ValidationWarning::new(
                        "authority.auth",
                        "Basic credentials are empty, requests will be rejected",
                    ));
                }
                if tenant_key.is_empty() {
                    result.add_warning(ValidationWarning::new(
                        "authority.auth.tenant_key",
                        "Tenant key is empty",
                    ));
                }
            }
            AuthConfig::Oauth {
                token_url,
                client_id,
                client_secret,
            } => {
                if !token_url.starts_with("http://") && !token_url.starts_with("https://") {
                    result.add_error(ValidationError::new(
                        "authority.auth.token_url",
                        "token_url must start with http:// or https://",
                    ));
                }
                if client_id.is_empty() || client_secret.is_empty() {
                    result.add_warning(ValidationWarning::new(
                        "authority.auth",
                        "OAuth client credentials are empty",
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
