
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let result = ConfigValidator::validate(&Config::default());
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let mut config = Config::default();
        config.dom.poll_interval_ms = 0;

        let result = ConfigValidator::validate(&config);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.path == "dom.poll_interval_ms"));
    }

    #[test]
    fn test_validate_viewport_expansion_bounds() {
        let mut config = Config::default();
        config.dom.viewport_expansion = -1;
        assert!(ConfigValidator::validate(&config).is_valid());

        config.dom.viewport_expansion = -2;
        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.path == "dom.viewport_expansion"));
    }

    #[test]
    fn test_validate_high_attempts_warning() {
        let mut config = Config::default();
        config.resolver.max_attempts = 50;

        let result = ConfigValidator::validate(&config);
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.path == "resolver.max_attempts"));
    }

    #[test]
    fn test_into_result_reports_first_error() {
        let mut config = Config::default();
        config.browser.debug_port = 0;
        config.resolver.max_attempts = 0;

        let err = ConfigValidator::validate(&config).into_result().unwrap_err();
        match err {
            ConfigError::InvalidValue { field, .. } => assert_eq!(field, "browser.debug_port"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_into_result_passes_warnings() {
        let mut config = Config::default();
        config.dom.poll_interval_ms = 10_000;
        let warnings = ConfigValidator::validate(&config).into_result().unwrap();
        assert_eq!(warnings.len(), 1);
    }
