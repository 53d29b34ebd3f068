//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;
use crate::validator::ConfigValidator;

static ENV_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

/// Environment flag that turns telemetry off when set to `false`.
pub const TELEMETRY_ENV: &str = "ANONYMIZED_TELEMETRY";

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load, expand and validate a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::finish(Config::default()),
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Self::finish(config)
    }

    fn finish(mut config: Config) -> Result<Config, ConfigError> {
        Self::expand_paths(&mut config);
        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        ConfigValidator::validate(&config).into_result()?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        if content.matches("${").count() != ENV_VAR.find_iter(content).count() {
            return Err(ConfigError::InvalidFormat(
                "unterminated ${...} reference".to_string(),
            ));
        }
        let mut result = content.to_string();
        for cap in ENV_VAR.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }
        Ok(result)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(TELEMETRY_ENV) {
            if value.trim().eq_ignore_ascii_case("false") {
                config.telemetry.enabled = false;
            }
        }
    }

    fn expand_paths(config: &mut Config) {
        let paths = [
            &mut config.browser.profile_dir,
            &mut config.browser.chrome_path,
            &mut config.browser.cookies_file,
            &mut config.logging.log_dir,
        ];
        for path in paths.into_iter().flatten() {
            if let Some(raw) = path.to_str() {
                *path = PathBuf::from(Self::expand_path(raw));
            }
        }
    }

    /// Expand shell-style paths (e.g., `~/.webhands`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.browser.debug_port, 9222);
        assert_eq!(config.resolver.max_attempts, 3);
    }

    #[test]
    fn test_load_partial_sections() {
        let content = r#"
            [browser]
            headless = true
            debug_port = 9333

            [dom]
            viewport_expansion = -1
            include_shadow_roots = true

            [resolver]
            max_attempts = 5
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert!(config.browser.headless);
        assert_eq!(config.browser.debug_port, 9333);
        assert_eq!(config.browser.viewport_width, 1280);
        assert_eq!(config.dom.viewport_expansion, -1);
        assert!(config.dom.include_shadow_roots);
        assert_eq!(config.dom.poll_interval_ms, 100);
        assert_eq!(config.resolver.max_attempts, 5);
        assert_eq!(config.resolver.retry_delay_ms, 500);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[agent]").unwrap();
        writeln!(file, "wait_between_actions_ms = 50").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.agent.wait_between_actions_ms, 50);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_without_path() {
        let config = ConfigLoader::load_or_default(None).unwrap();
        assert_eq!(config.dom.find_timeout_ms, 5000);
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_validation_rejects_zero_attempts() {
        let result = ConfigLoader::load_str("[resolver]\nmax_attempts = 0");
        match result {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "resolver.max_attempts")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: unique test-only variable
        unsafe {
            std::env::set_var("WEBHANDS_TEST_PROFILE", "/tmp/profile");
        }
        let content = "[browser]\nprofile_dir = \"${WEBHANDS_TEST_PROFILE}\"";
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.browser.profile_dir, Some(PathBuf::from("/tmp/profile")));
        unsafe {
            std::env::remove_var("WEBHANDS_TEST_PROFILE");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_WEBHANDS_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_unterminated_env_reference() {
        let result = ConfigLoader::expand_env_vars("value = \"${HOME\"");
        assert!(matches!(result, Err(ConfigError::InvalidFormat(_))));
    }

    #[test]
    fn test_tilde_paths_expanded() {
        let config = ConfigLoader::load_str("[logging]\nlog_dir = \"~/webhands-logs\"").unwrap();
        let dir = config.logging.log_dir.unwrap();
        assert!(!dir.to_string_lossy().starts_with('~'));
        assert!(dir.ends_with("webhands-logs"));
    }

    #[test]
    fn test_telemetry_env_override() {
        let mut config = Config::default();
        ConfigLoader::apply_env_overrides(&mut config, |_| Some("true".into()));
        assert!(config.telemetry.enabled);

        ConfigLoader::apply_env_overrides(&mut config, |key| {
            (key == TELEMETRY_ENV).then(|| "False".into())
        });
        assert!(!config.telemetry.enabled);
    }
}
