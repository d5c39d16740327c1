    use super::*;
    use crate::schema::AuthorityConfig;
    use std::collections::BTreeMap;

    fn basic_authority(base_url: &str) -> AuthorityConfig {
        AuthorityConfig {
            base_url: base_url.to_string(),
            auth: AuthConfig::Basic {
                username: "api".to_string(),
                password: "secret".to_string(),
                tenant_key: "tenant".to_string(),
            },
            timeout_secs: 30,
            endpoints: BTreeMap::new(),
            user_agent: "test".to_string(),
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.is_valid());
        // No authority configured
        assert!(result.warnings.iter().any(|w| w.path == "authority"));
    }

    #[test]
    fn test_validate_zero_cache_timeout() {
        let mut config = Config::default();
        config.settings.cache_timeout_ms = 0;

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.path == "settings.cache_timeout_ms"));
    }

    #[test]
    fn test_validate_unknown_entity_type() {
        let mut config = Config::default();
        config.settings.entity_types.insert("device".to_string(), true);

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.path == "settings.entity_types.device"));
    }

    #[test]
    fn test_selector_grammar() {
        assert!(ConfigValidator::is_valid_selector("form"));
        assert!(ConfigValidator::is_valid_selector(".form-group"));
        assert!(ConfigValidator::is_valid_selector("a[href]"));
        assert!(ConfigValidator::is_valid_selector("[role=row]"));
        assert!(ConfigValidator::is_valid_selector("clr-input-container.wide#main"));
        assert!(!ConfigValidator::is_valid_selector(""));
        assert!(!ConfigValidator::is_valid_selector("div > span"));
        assert!(!ConfigValidator::is_valid_selector("li a"));
    }

    #[test]
    fn test_validate_bad_selector() {
        let mut config = Config::default();
        config.scan.exclude.push("ul > li".to_string());

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.path == "scan.exclude"));
    }

    #[test]
    fn test_validate_slow_detection_warning() {
        let mut config = Config::default();
        config.scan.reconcile_interval_ms = 5000;

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.path == "scan.reconcile_interval_ms"));
    }

    #[test]
    fn test_validate_classifier_overrides() {
        let mut config = Config::default();
        config
            .classifier
            .phrases
            .insert("device uuid".to_string(), "device".to_string());
        config
            .classifier
            .keywords
            .insert("script".to_string(), vec!["worker".to_string()]);

        let result = ConfigValidator::validate(&config).unwrap();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "classifier.phrases.device uuid");
    }

    #[test]
    fn test_validate_marker_class() {
        let mut config = Config::default();
        config.annotator.marker_class = "two classes".to_string();

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.errors.iter().any(|e| e.path == "annotator.marker_class"));
    }

    #[test]
    fn test_validate_concurrency() {
        let mut config = Config::default();
        config.resolver.max_concurrency = 0;
        let result = ConfigValidator::validate(&config).unwrap();
        assert!(!result.is_valid());

        config.resolver.max_concurrency = 16;
        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.path == "resolver.max_concurrency"));
    }

    #[test]
    fn test_validate_cache_capacity() {
        let mut config = Config::default();
        config.resolver.cache_capacity = 0;
        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result
            .errors
            .iter()
            .any(|e| e.path == "resolver.cache_capacity"));
    }

    #[test]
    fn test_validate_authority_base_url() {
        let mut config = Config::default();
        config.authority = Some(basic_authority("uem.example.com"));

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.errors.iter().any(|e| e.path == "authority.base_url"));
    }

    #[test]
    fn test_validate_authority_endpoint_template() {
        let mut authority = basic_authority("https://uem.example.com");
        authority
            .endpoints
            .insert("tag".to_string(), "/API/mdm/tags".to_string());
        let mut config = Config::default();
        config.authority = Some(authority);

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.errors.iter().any(|e| e.path == "authority.endpoints.tag"));
    }

    #[test]
    fn test_validate_valid_authority() {
        let mut config = Config::default();
        config.authority = Some(basic_authority("https://uem.example.com"));

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_validate_oauth_token_url() {
        let mut authority = basic_authority("https://uem.example.com");
        authority.auth = AuthConfig::Oauth {
            token_url: "token".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        };
        let mut config = Config::default();
        config.authority = Some(authority);

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.errors.iter().any(|e| e.path == "authority.auth.token_url"));
    }
